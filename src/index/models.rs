use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::languages::Dialect;

/// Owned stand-in for a syntax node: enough to display it and navigate to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyntaxAnchor {
    pub file: PathBuf,
    pub dialect: Dialect,
    pub byte_range: Range<usize>,
    /// 1-based
    pub line: u32,
    /// 0-based
    pub column: u32,
    pub text: String,
}

impl SyntaxAnchor {
    pub fn contains(&self, offset: usize) -> bool {
        self.byte_range.start <= offset && offset < self.byte_range.end
    }
}

impl fmt::Display for SyntaxAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Class,
    Interface,
    Enum,
    /// Kotlin `object` or `companion object`
    Object,
    Method,
    /// Kotlin top-level (possibly extension) function
    Function,
    /// Java field, or the synthetic `INSTANCE` field of a Kotlin object
    Field,
    /// Kotlin property
    Property,
}

impl DeclKind {
    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            DeclKind::Class | DeclKind::Interface | DeclKind::Enum | DeclKind::Object
        )
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, DeclKind::Method | DeclKind::Function)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, DeclKind::Field | DeclKind::Property)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Class => "class",
            DeclKind::Interface => "interface",
            DeclKind::Enum => "enum",
            DeclKind::Object => "object",
            DeclKind::Method => "method",
            DeclKind::Function => "function",
            DeclKind::Field => "field",
            DeclKind::Property => "property",
        }
    }
}

/// A type as written in source, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Dotted name as written (`Foo`, `Outer.Inner`, `com.x.Foo`)
    pub name: String,
    pub args: Vec<TypeRef>,
}

impl TypeRef {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

/// A declaration contributed by one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclId,
    pub file: FileId,
    pub dialect: Dialect,
    pub kind: DeclKind,
    pub name: String,
    /// Canonical, dialect-independent qualified name
    pub fq_name: String,
    pub owner: Option<DeclId>,
    /// Name node, used for navigation
    pub anchor: SyntaxAnchor,
    /// Whole declaration, used for containment lookups
    pub span: Range<usize>,
    /// Supertypes as written (class-like declarations)
    pub supertypes: Vec<TypeRef>,
    /// Field/property type or callable return type
    pub type_ref: Option<TypeRef>,
    /// Parameter types of callables; `None` where not statically written
    pub params: Vec<Option<TypeRef>>,
    /// Extension receiver of a Kotlin function
    pub receiver: Option<TypeRef>,
    pub type_params: Vec<String>,
    pub is_static: bool,
    pub is_mutable: bool,
}

impl Declaration {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Package and import context of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileScope {
    pub package: String,
    pub imports: Vec<ImportDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Imported path without the trailing `.*`
    pub path: String,
    pub alias: Option<String>,
    pub wildcard: bool,
    pub is_static: bool,
}

impl ImportDecl {
    /// Simple name this import brings into scope, if it is a single-name import.
    pub fn visible_name(&self) -> Option<&str> {
        if self.wildcard {
            return None;
        }
        self.alias
            .as_deref()
            .or_else(|| self.path.rsplit('.').next())
    }
}

/// Joins a package and a name into a qualified name.
pub fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display() {
        let t = TypeRef::with_args("Class", vec![TypeRef::simple("com.x.Foo")]);
        assert_eq!(t.to_string(), "Class<com.x.Foo>");
        assert_eq!(TypeRef::simple("a.b.C").simple_name(), "C");
    }

    #[test]
    fn test_import_visible_name() {
        let plain = ImportDecl {
            path: "com.x.Foo".into(),
            alias: None,
            wildcard: false,
            is_static: false,
        };
        assert_eq!(plain.visible_name(), Some("Foo"));

        let aliased = ImportDecl {
            alias: Some("Bar".into()),
            ..plain.clone()
        };
        assert_eq!(aliased.visible_name(), Some("Bar"));

        let wildcard = ImportDecl {
            path: "com.x".into(),
            wildcard: true,
            ..plain
        };
        assert_eq!(wildcard.visible_name(), None);
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("", "Foo"), "Foo");
        assert_eq!(qualify("com.x", "Foo"), "com.x.Foo");
    }

    #[test]
    fn test_anchor_contains_and_display() {
        let anchor = SyntaxAnchor {
            file: PathBuf::from("A.java"),
            dialect: Dialect::Java,
            byte_range: 10..20,
            line: 3,
            column: 4,
            text: "post(e)".into(),
        };
        assert!(anchor.contains(10));
        assert!(anchor.contains(19));
        assert!(!anchor.contains(20));
        assert_eq!(anchor.to_string(), "A.java:3:5");
    }

    #[test]
    fn test_decl_kind_classes() {
        assert!(DeclKind::Object.is_class_like());
        assert!(!DeclKind::Field.is_class_like());
        assert!(DeclKind::Function.is_callable());
        assert!(DeclKind::Property.is_variable());
    }
}
