//! Project-wide symbol table over both dialects.
//!
//! Declarations from every file share one id space and are keyed by their
//! canonical qualified name, so a Kotlin `object` and the Java view of it
//! meet at the same entry.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::index::models::{qualify, DeclId, Declaration, FileId, FileScope, TypeRef};
use crate::indexer::ExtractionResult;

/// A type after name resolution. `decl` is `None` for types outside the
/// project (library classes, type parameters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub decl: Option<DeclId>,
    pub name: String,
    pub args: Vec<ResolvedType>,
}

impl ResolvedType {
    pub fn external(name: impl Into<String>) -> Self {
        Self {
            decl: None,
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn of(table: &SymbolTable, decl: DeclId) -> Self {
        Self {
            decl: Some(decl),
            name: table.get(decl).fq_name.clone(),
            args: Vec::new(),
        }
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    decls: Vec<Declaration>,
    scopes: Vec<FileScope>,
    by_fq: HashMap<String, Vec<DeclId>>,
    members: HashMap<DeclId, Vec<DeclId>>,
    top_level: HashMap<String, Vec<DeclId>>,
    class_likes: Vec<Vec<DeclId>>,
}

impl SymbolTable {
    /// Builds the table; `results[i]` belongs to `FileId(i)`.
    pub fn build(results: Vec<ExtractionResult>) -> Self {
        let mut table = Self::default();

        for (index, result) in results.into_iter().enumerate() {
            let file = FileId(index);
            let offset = table.decls.len();
            let mut class_likes = Vec::new();

            for mut decl in result.declarations {
                decl.id = DeclId(offset + decl.id.0);
                decl.owner = decl.owner.map(|o| DeclId(offset + o.0));
                decl.file = file;

                table
                    .by_fq
                    .entry(decl.fq_name.clone())
                    .or_default()
                    .push(decl.id);
                match decl.owner {
                    Some(owner) => table.members.entry(owner).or_default().push(decl.id),
                    None => table
                        .top_level
                        .entry(decl.name.clone())
                        .or_default()
                        .push(decl.id),
                }
                if decl.kind.is_class_like() {
                    class_likes.push(decl.id);
                }
                table.decls.push(decl);
            }

            table.scopes.push(result.scope);
            table.class_likes.push(class_likes);
        }

        tracing::debug!(
            "Symbol table: {} declarations in {} files",
            table.decls.len(),
            table.scopes.len()
        );
        table
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn get(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter()
    }

    pub fn scope(&self, file: FileId) -> &FileScope {
        &self.scopes[file.0]
    }

    /// Canonical identity of a declaration.
    pub fn canonical_name(&self, id: DeclId) -> &str {
        &self.get(id).fq_name
    }

    pub fn by_fq_name(&self, fq: &str) -> &[DeclId] {
        self.by_fq.get(fq).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Class-like declarations with the given qualified name.
    pub fn find_classes(&self, fq: &str) -> Vec<DeclId> {
        self.by_fq_name(fq)
            .iter()
            .copied()
            .filter(|id| self.get(*id).kind.is_class_like())
            .collect()
    }

    /// The class-like declaration with this name, if there is exactly one.
    pub fn find_unique_class(&self, fq: &str) -> Option<DeclId> {
        match self.find_classes(fq).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    fn find_class(&self, fq: &str) -> Option<DeclId> {
        self.find_classes(fq).first().copied()
    }

    pub fn members(&self, owner: DeclId) -> &[DeclId] {
        self.members.get(&owner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct members of `owner` with a name, filtered by kind.
    pub fn direct_members(
        &self,
        owner: DeclId,
        name: &str,
        pred: impl Fn(&Declaration) -> bool,
    ) -> Vec<DeclId> {
        self.members(owner)
            .iter()
            .copied()
            .filter(|id| {
                let d = self.get(*id);
                d.name == name && pred(d)
            })
            .collect()
    }

    pub fn nested_class(&self, owner: DeclId, name: &str) -> Option<DeclId> {
        self.direct_members(owner, name, |d| d.kind.is_class_like())
            .first()
            .copied()
    }

    /// Members named `name` on `class` and its supertypes, nearest first.
    pub fn find_member(
        &self,
        class: DeclId,
        name: &str,
        pred: impl Fn(&Declaration) -> bool,
    ) -> Vec<DeclId> {
        let mut found = Vec::new();
        for ancestor in self.ancestors(class) {
            found.extend(self.direct_members(ancestor, name, &pred));
        }
        found
    }

    /// `class` followed by all its transitive supertypes, breadth first.
    pub fn ancestors(&self, class: DeclId) -> Vec<DeclId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([class]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            queue.extend(self.supertypes(current));
        }
        order
    }

    /// Project supertypes of a class-like declaration.
    pub fn supertypes(&self, class: DeclId) -> Vec<DeclId> {
        let decl = self.get(class);
        decl.supertypes
            .iter()
            .filter_map(|t| self.resolve_type_name(decl.file, decl.owner, &t.name))
            .filter(|id| *id != class)
            .collect()
    }

    /// Reflexive, transitive subtype check.
    pub fn is_subtype(&self, class: DeclId, ancestor: DeclId) -> bool {
        if class == ancestor {
            return true;
        }
        let target = &self.get(ancestor).fq_name;
        self.ancestors(class)
            .into_iter()
            .any(|a| a == ancestor || &self.get(a).fq_name == target)
    }

    /// True if `method` overrides or implements `base`.
    pub fn overrides(&self, method: DeclId, base: DeclId) -> bool {
        let m = self.get(method);
        let b = self.get(base);
        if !m.kind.is_callable() || !b.kind.is_callable() || m.name != b.name {
            return false;
        }
        if m.arity() != b.arity() {
            return false;
        }
        match (m.owner, b.owner) {
            (Some(mo), Some(bo)) => mo != bo && self.is_subtype(mo, bo),
            _ => false,
        }
    }

    /// Innermost class-like declaration of `file` whose body contains `offset`.
    pub fn enclosing_class(&self, file: FileId, offset: usize) -> Option<DeclId> {
        self.class_likes
            .get(file.0)?
            .iter()
            .copied()
            .filter(|id| {
                let span = &self.get(*id).span;
                span.start <= offset && offset < span.end
            })
            .min_by_key(|id| self.get(*id).span.len())
    }

    /// `context` and its lexically enclosing classes, innermost first.
    pub fn lexical_chain(&self, context: Option<DeclId>) -> Vec<DeclId> {
        let mut chain = Vec::new();
        let mut current = context;
        while let Some(id) = current {
            chain.push(id);
            current = self.get(id).owner;
        }
        chain
    }

    /// Resolves a type name as written in `file`, from inside `context`.
    pub fn resolve_type_name(
        &self,
        file: FileId,
        context: Option<DeclId>,
        name: &str,
    ) -> Option<DeclId> {
        if name.is_empty() {
            return None;
        }

        if let Some((head, rest)) = name.split_once('.') {
            if let Some(id) = self.find_class(name) {
                return Some(id);
            }
            let head_id = self.resolve_type_name(file, context, head)?;
            let nested = format!("{}.{}", self.get(head_id).fq_name, rest);
            return self.find_class(&nested);
        }

        for class in self.lexical_chain(context) {
            if self.get(class).name == name {
                return Some(class);
            }
            if let Some(nested) = self.nested_class(class, name) {
                return Some(nested);
            }
        }

        let scope = self.scope(file);

        for import in &scope.imports {
            if import.visible_name() == Some(name) {
                if let Some(id) = self.find_class(&import.path) {
                    return Some(id);
                }
            }
        }

        if let Some(id) = self.find_class(&qualify(&scope.package, name)) {
            return Some(id);
        }

        scope
            .imports
            .iter()
            .filter(|i| i.wildcard)
            .find_map(|i| self.find_class(&qualify(&i.path, name)))
    }

    pub fn resolve_type_ref(
        &self,
        file: FileId,
        context: Option<DeclId>,
        type_ref: &TypeRef,
    ) -> ResolvedType {
        let decl = self.resolve_type_name(file, context, &type_ref.name);
        ResolvedType {
            decl,
            name: decl
                .map(|d| self.get(d).fq_name.clone())
                .unwrap_or_else(|| type_ref.name.clone()),
            args: type_ref
                .args
                .iter()
                .map(|a| self.resolve_type_ref(file, context, a))
                .collect(),
        }
    }

    /// Resolves the declared type of a member in the scope it was written in.
    pub fn declared_type(&self, id: DeclId) -> Option<ResolvedType> {
        let decl = self.get(id);
        let type_ref = decl.type_ref.as_ref()?;
        Some(self.resolve_type_ref(decl.file, decl.owner, type_ref))
    }

    /// Top-level declarations named `name` that `file` can see without
    /// qualification: same package, explicit imports and wildcard imports.
    pub fn visible_top_level(
        &self,
        file: FileId,
        name: &str,
        pred: impl Fn(&Declaration) -> bool,
    ) -> Vec<DeclId> {
        let scope = self.scope(file);
        let imported: Vec<&str> = scope
            .imports
            .iter()
            .filter(|i| i.visible_name() == Some(name))
            .map(|i| i.path.as_str())
            .collect();

        let mut found: Vec<DeclId> = Vec::new();
        // Aliased imports resolve to a different simple name.
        for path in &imported {
            found.extend(
                self.by_fq_name(path)
                    .iter()
                    .copied()
                    .filter(|id| self.get(*id).owner.is_none() && pred(self.get(*id))),
            );
        }

        let Some(candidates) = self.top_level.get(name) else {
            return found;
        };
        for id in candidates.iter().copied() {
            if found.contains(&id) {
                continue;
            }
            let decl = self.get(id);
            if !pred(decl) {
                continue;
            }
            let package = &self.scope(decl.file).package;
            let visible = package == &scope.package
                || scope.imports.iter().any(|i| i.wildcard && &i.path == package);
            if visible {
                found.push(id);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::models::DeclKind;
    use crate::indexer::{DeclarationExtractor, Parser};
    use crate::languages::LanguageRegistry;
    use std::path::Path;

    fn table(sources: &[(&str, &str)]) -> SymbolTable {
        let parser = Parser::new(LanguageRegistry::new());
        let extractor = DeclarationExtractor::new();
        let results = sources
            .iter()
            .enumerate()
            .map(|(i, (path, source))| {
                let grammar = parser.registry().get_for_file(Path::new(path)).unwrap();
                let parsed = parser
                    .parse_source(Path::new(path), source.to_string(), grammar)
                    .unwrap();
                extractor.extract(&parsed, FileId(i))
            })
            .collect();
        SymbolTable::build(results)
    }

    fn class(table: &SymbolTable, fq: &str) -> DeclId {
        table.find_unique_class(fq).unwrap()
    }

    const BUS_JAVA: &str = r#"
package demo.util;

public interface IEventBus {
    void post(Object event);
    void observe(Class<?> type, Object observer);
}
"#;

    const IMPL_JAVA: &str = r#"
package demo.util;

public class EventBusImpl implements IEventBus {
    public void post(Object event) {}
    public void observe(Class<?> type, Object observer) {}
    public void observe(Object a, Object b, Object c) {}
}
"#;

    const OBJECT_KT: &str = r#"
package demo.app

import demo.util.IEventBus
import demo.util.EventBusImpl

object AppBus : IEventBus by EventBusImpl()
"#;

    #[test]
    fn test_ids_are_rebased_across_files() {
        let t = table(&[("IEventBus.java", BUS_JAVA), ("EventBusImpl.java", IMPL_JAVA)]);
        for decl in t.iter() {
            assert_eq!(t.get(decl.id).fq_name, decl.fq_name);
        }
        let impl_id = class(&t, "demo.util.EventBusImpl");
        assert_eq!(t.get(impl_id).file, FileId(1));
        assert_eq!(t.members(impl_id).len(), 3);
    }

    #[test]
    fn test_resolve_same_package_and_imports() {
        let t = table(&[
            ("IEventBus.java", BUS_JAVA),
            ("EventBusImpl.java", IMPL_JAVA),
            ("AppBus.kt", OBJECT_KT),
        ]);
        let bus = class(&t, "demo.util.IEventBus");
        assert_eq!(t.resolve_type_name(FileId(1), None, "IEventBus"), Some(bus));
        assert_eq!(t.resolve_type_name(FileId(2), None, "IEventBus"), Some(bus));
        assert_eq!(
            t.resolve_type_name(FileId(2), None, "demo.util.IEventBus"),
            Some(bus)
        );
        assert_eq!(t.resolve_type_name(FileId(2), None, "String"), None);
    }

    #[test]
    fn test_object_is_subtype_through_delegation() {
        let t = table(&[
            ("IEventBus.java", BUS_JAVA),
            ("EventBusImpl.java", IMPL_JAVA),
            ("AppBus.kt", OBJECT_KT),
        ]);
        let bus = class(&t, "demo.util.IEventBus");
        let app = class(&t, "demo.app.AppBus");
        assert!(t.is_subtype(app, bus));
        assert!(!t.is_subtype(bus, app));

        let posts = t.find_member(app, "post", |d| d.kind.is_callable());
        assert_eq!(posts.len(), 1);
        assert_eq!(t.get(posts[0]).fq_name, "demo.util.IEventBus.post");
    }

    #[test]
    fn test_overrides_requires_subtype_and_arity() {
        let t = table(&[("IEventBus.java", BUS_JAVA), ("EventBusImpl.java", IMPL_JAVA)]);
        let impl_id = class(&t, "demo.util.EventBusImpl");
        let base_observe = t.by_fq_name("demo.util.IEventBus.observe")[0];
        let observes = t.direct_members(impl_id, "observe", |d| d.kind.is_callable());
        assert_eq!(observes.len(), 2);

        let two = observes.iter().find(|id| t.get(**id).arity() == 2).unwrap();
        let three = observes.iter().find(|id| t.get(**id).arity() == 3).unwrap();
        assert!(t.overrides(*two, base_observe));
        assert!(!t.overrides(*three, base_observe));
        assert!(!t.overrides(base_observe, *two));
    }

    #[test]
    fn test_nested_class_resolution() {
        let t = table(&[(
            "Outer.java",
            r#"
package demo;

class Outer {
    static class Inner {}
    Inner field;
}

class Other {
    Outer.Inner ref;
}
"#,
        )]);
        let outer = class(&t, "demo.Outer");
        let inner = class(&t, "demo.Outer.Inner");
        assert_eq!(t.resolve_type_name(FileId(0), Some(outer), "Inner"), Some(inner));
        assert_eq!(t.resolve_type_name(FileId(0), None, "Outer.Inner"), Some(inner));
        assert_eq!(t.resolve_type_name(FileId(0), None, "Inner"), None);
    }

    #[test]
    fn test_enclosing_class_is_innermost() {
        let source = "package demo;\nclass Outer {\n  static class Inner { int x; }\n}\n";
        let t = table(&[("Outer.java", source)]);
        let inner = class(&t, "demo.Outer.Inner");
        let outer = class(&t, "demo.Outer");
        let x_offset = source.find("int x").unwrap();
        assert_eq!(t.enclosing_class(FileId(0), x_offset), Some(inner));
        let outer_offset = source.find('{').unwrap();
        assert_eq!(t.enclosing_class(FileId(0), outer_offset), Some(outer));
        assert_eq!(t.enclosing_class(FileId(0), 0), None);
    }

    #[test]
    fn test_visible_top_level_functions() {
        let t = table(&[
            (
                "Ext.kt",
                "package demo.util\n\nfun IEventBus.observe(block: () -> Unit) {}\n",
            ),
            (
                "Use.kt",
                "package demo.app\n\nimport demo.util.observe\n\nfun use() {}\n",
            ),
            ("Wild.kt", "package demo.other\n\nimport demo.util.*\n"),
            ("Blind.kt", "package demo.blind\n"),
        ]);
        let is_fn = |d: &Declaration| d.kind == DeclKind::Function;
        assert_eq!(t.visible_top_level(FileId(1), "observe", is_fn).len(), 1);
        assert_eq!(t.visible_top_level(FileId(2), "observe", is_fn).len(), 1);
        assert!(t.visible_top_level(FileId(3), "observe", is_fn).is_empty());
        assert_eq!(t.visible_top_level(FileId(0), "observe", is_fn).len(), 1);
    }

    #[test]
    fn test_declared_type_resolves_in_declaring_file() {
        let t = table(&[
            ("IEventBus.java", BUS_JAVA),
            (
                "Holder.java",
                "package demo.app;\nimport demo.util.IEventBus;\nclass Holder { static IEventBus BUS; }\n",
            ),
        ]);
        let field = t.by_fq_name("demo.app.Holder.BUS")[0];
        let ty = t.declared_type(field).unwrap();
        assert_eq!(ty.decl, Some(class(&t, "demo.util.IEventBus")));
        assert_eq!(ty.name, "demo.util.IEventBus");
    }
}
