use tree_sitter::Node;

use crate::index::{
    qualify, DeclId, DeclKind, Declaration, FileId, FileScope, ImportDecl, TypeRef,
};
use crate::indexer::parser::ParsedFile;
use crate::indexer::syntax::{
    compact_text, first_named_child, first_named_child_of, has_token, is_kotlin_type_node,
    java_type_ref, kotlin_child_type, kotlin_type_ref, last_named_child, named_children,
};
use crate::languages::Dialect;

/// Name of the synthetic static field through which Java reaches a Kotlin `object`.
pub const OBJECT_INSTANCE_FIELD: &str = "INSTANCE";

/// Declarations and scope of one file. `DeclId`s are local to the file
/// until the symbol table rebases them.
#[derive(Debug, Default)]
pub struct ExtractionResult {
    pub scope: FileScope,
    pub declarations: Vec<Declaration>,
}

pub struct DeclarationExtractor;

impl DeclarationExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, parsed: &ParsedFile, file: FileId) -> ExtractionResult {
        let mut collector = Collector {
            parsed,
            file,
            result: ExtractionResult::default(),
        };

        let root = parsed.root_node();
        match parsed.dialect {
            Dialect::Java => collector.java_members(root, None),
            Dialect::Kotlin => collector.kotlin_members(root, None),
        }

        collector.result
    }
}

impl Default for DeclarationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct Collector<'a> {
    parsed: &'a ParsedFile,
    file: FileId,
    result: ExtractionResult,
}

struct NewDecl {
    kind: DeclKind,
    name: String,
    owner: Option<DeclId>,
    supertypes: Vec<TypeRef>,
    type_ref: Option<TypeRef>,
    params: Vec<Option<TypeRef>>,
    receiver: Option<TypeRef>,
    type_params: Vec<String>,
    is_static: bool,
    is_mutable: bool,
}

impl NewDecl {
    fn new(kind: DeclKind, name: impl Into<String>, owner: Option<DeclId>) -> Self {
        Self {
            kind,
            name: name.into(),
            owner,
            supertypes: Vec::new(),
            type_ref: None,
            params: Vec::new(),
            receiver: None,
            type_params: Vec::new(),
            is_static: false,
            is_mutable: false,
        }
    }
}

impl<'a> Collector<'a> {
    fn push(&mut self, decl: NewDecl, name_node: &Node, whole: &Node) -> DeclId {
        let id = DeclId(self.result.declarations.len());
        let fq_name = match decl.owner {
            Some(owner) => format!("{}.{}", self.result.declarations[owner.0].fq_name, decl.name),
            None => qualify(&self.result.scope.package, &decl.name),
        };

        self.result.declarations.push(Declaration {
            id,
            file: self.file,
            dialect: self.parsed.dialect,
            kind: decl.kind,
            name: decl.name,
            fq_name,
            owner: decl.owner,
            anchor: self.parsed.anchor(name_node),
            span: whole.byte_range(),
            supertypes: decl.supertypes,
            type_ref: decl.type_ref,
            params: decl.params,
            receiver: decl.receiver,
            type_params: decl.type_params,
            is_static: decl.is_static,
            is_mutable: decl.is_mutable,
        });
        id
    }

    fn owner_kind(&self, owner: Option<DeclId>) -> Option<DeclKind> {
        owner.map(|o| self.result.declarations[o.0].kind)
    }

    fn text(&self, node: &Node) -> String {
        self.parsed.node_text(node).to_string()
    }

    // ---- Java ----

    fn java_members(&mut self, node: Node, owner: Option<DeclId>) {
        for child in named_children(node) {
            match child.kind() {
                "package_declaration" => {
                    if let Some(name) =
                        first_named_child_of(child, &["scoped_identifier", "identifier"])
                    {
                        self.result.scope.package = compact_text(self.parsed, &name);
                    }
                }
                "import_declaration" => self.java_import(child),
                "class_declaration" | "interface_declaration" | "enum_declaration"
                | "record_declaration" | "annotation_type_declaration" => {
                    self.java_class(child, owner)
                }
                "method_declaration" => self.java_method(child, owner),
                "field_declaration" | "constant_declaration" => self.java_field(child, owner),
                "enum_constant" => self.java_enum_constant(child, owner),
                "enum_body_declarations" => self.java_members(child, owner),
                _ => {}
            }
        }
    }

    fn java_import(&mut self, node: Node) {
        let Some(path) = first_named_child_of(node, &["scoped_identifier", "identifier"]) else {
            return;
        };
        self.result.scope.imports.push(ImportDecl {
            path: compact_text(self.parsed, &path),
            alias: None,
            wildcard: first_named_child_of(node, &["asterisk"]).is_some(),
            is_static: has_token(node, "static"),
        });
    }

    fn java_is_static(&self, node: Node) -> bool {
        first_named_child_of(node, &["modifiers"])
            .map(|m| has_token(m, "static"))
            .unwrap_or(false)
    }

    fn java_is_final(&self, node: Node) -> bool {
        first_named_child_of(node, &["modifiers"])
            .map(|m| has_token(m, "final"))
            .unwrap_or(false)
    }

    fn java_type_params(&self, node: Node) -> Vec<String> {
        first_named_child_of(node, &["type_parameters"])
            .map(|params| {
                named_children(params)
                    .into_iter()
                    .filter(|p| p.kind() == "type_parameter")
                    .filter_map(|p| first_named_child_of(p, &["type_identifier", "identifier"]))
                    .map(|n| self.text(&n))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn java_class(&mut self, node: Node, owner: Option<DeclId>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };

        let kind = match node.kind() {
            "interface_declaration" | "annotation_type_declaration" => DeclKind::Interface,
            "enum_declaration" => DeclKind::Enum,
            _ => DeclKind::Class,
        };

        let mut decl = NewDecl::new(kind, self.text(&name), owner);
        decl.type_params = self.java_type_params(node);
        decl.is_static = self.java_is_static(node) || (owner.is_some() && kind != DeclKind::Class);

        for clause in named_children(node) {
            if !matches!(
                clause.kind(),
                "superclass" | "super_interfaces" | "extends_interfaces"
            ) {
                continue;
            }
            for ty in named_children(clause) {
                if ty.kind() == "type_list" {
                    decl.supertypes.extend(
                        named_children(ty)
                            .into_iter()
                            .filter_map(|t| java_type_ref(self.parsed, t)),
                    );
                } else if let Some(t) = java_type_ref(self.parsed, ty) {
                    decl.supertypes.push(t);
                }
            }
        }

        let id = self.push(decl, &name, &node);

        if let Some(body) = node.child_by_field_name("body") {
            self.java_members(body, Some(id));
        }
    }

    fn java_method(&mut self, node: Node, owner: Option<DeclId>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };

        let mut decl = NewDecl::new(DeclKind::Method, self.text(&name), owner);
        decl.type_params = self.java_type_params(node);
        decl.is_static = self.java_is_static(node);
        decl.type_ref = node
            .child_by_field_name("type")
            .and_then(|t| java_type_ref(self.parsed, t));

        if let Some(params) = node.child_by_field_name("parameters") {
            for param in named_children(params) {
                match param.kind() {
                    "formal_parameter" => decl.params.push(
                        param
                            .child_by_field_name("type")
                            .and_then(|t| java_type_ref(self.parsed, t)),
                    ),
                    "spread_parameter" => decl.params.push(
                        named_children(param)
                            .into_iter()
                            .filter(|c| c.kind() != "modifiers")
                            .find_map(|c| java_type_ref(self.parsed, c)),
                    ),
                    _ => {}
                }
            }
        }

        self.push(decl, &name, &node);
    }

    fn java_field(&mut self, node: Node, owner: Option<DeclId>) {
        let type_ref = node
            .child_by_field_name("type")
            .and_then(|t| java_type_ref(self.parsed, t));
        let in_interface = self.owner_kind(owner) == Some(DeclKind::Interface);
        let is_static = in_interface || self.java_is_static(node);
        let is_mutable = !in_interface && !self.java_is_final(node);

        for declarator in named_children(node) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let mut decl = NewDecl::new(DeclKind::Field, self.text(&name), owner);
            decl.type_ref = type_ref.clone();
            decl.is_static = is_static;
            decl.is_mutable = is_mutable;
            self.push(decl, &name, &node);
        }
    }

    fn java_enum_constant(&mut self, node: Node, owner: Option<DeclId>) {
        let Some(owner_id) = owner else {
            return;
        };
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let enum_fq = self.result.declarations[owner_id.0].fq_name.clone();
        let mut decl = NewDecl::new(DeclKind::Field, self.text(&name), owner);
        decl.type_ref = Some(TypeRef::simple(enum_fq));
        decl.is_static = true;
        self.push(decl, &name, &node);
    }

    // ---- Kotlin ----

    fn kotlin_members(&mut self, node: Node, owner: Option<DeclId>) {
        for child in named_children(node) {
            match child.kind() {
                "package_header" => {
                    if let Some(name) =
                        first_named_child_of(child, &["qualified_identifier", "identifier"])
                    {
                        self.result.scope.package = compact_text(self.parsed, &name);
                    }
                }
                "import" | "import_header" => self.kotlin_import(child),
                "class_declaration" => self.kotlin_class(child, owner),
                "object_declaration" => self.kotlin_object(child, owner, false),
                "companion_object" => self.kotlin_object(child, owner, true),
                "function_declaration" => self.kotlin_function(child, owner),
                "property_declaration" => self.kotlin_property(child, owner),
                "enum_entry" => self.kotlin_enum_entry(child, owner),
                "import_list" | "class_member_declarations" | "class_member_declaration"
                | "declaration" | "statement" => self.kotlin_members(child, owner),
                _ => {}
            }
        }
    }

    fn kotlin_name<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        node.child_by_field_name("name").or_else(|| {
            first_named_child_of(node, &["identifier", "type_identifier", "simple_identifier"])
        })
    }

    fn kotlin_import(&mut self, node: Node) {
        let named = named_children(node);
        let Some(path) = named
            .iter()
            .find(|c| matches!(c.kind(), "qualified_identifier" | "identifier"))
        else {
            return;
        };
        let path_text = compact_text(self.parsed, path);

        let alias = named
            .iter()
            .filter(|c| c.id() != path.id())
            .find_map(|c| match c.kind() {
                "identifier" | "simple_identifier" => Some(self.text(c)),
                "import_alias" => last_named_child(*c).map(|n| self.text(&n)),
                _ => None,
            });

        let wildcard = has_token(node, "*")
            || named.iter().any(|c| c.kind() == "wildcard_import")
            || path_text.ends_with(".*");

        self.result.scope.imports.push(ImportDecl {
            path: path_text.trim_end_matches(".*").to_string(),
            alias,
            wildcard,
            is_static: false,
        });
    }

    fn kotlin_type_params(&self, node: Node) -> Vec<String> {
        first_named_child_of(node, &["type_parameters"])
            .map(|params| {
                named_children(params)
                    .into_iter()
                    .filter(|p| p.kind() == "type_parameter")
                    .filter_map(|p| {
                        first_named_child_of(
                            p,
                            &["identifier", "type_identifier", "simple_identifier"],
                        )
                    })
                    .map(|n| self.text(&n))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn kotlin_supertypes(&self, node: Node) -> Vec<TypeRef> {
        let mut specifiers = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "delegation_specifier" => specifiers.push(child),
                "delegation_specifiers" => specifiers.extend(
                    named_children(child)
                        .into_iter()
                        .filter(|c| c.kind() == "delegation_specifier"),
                ),
                _ => {}
            }
        }

        specifiers
            .into_iter()
            .filter_map(|s| find_user_type(s).and_then(|t| kotlin_type_ref(self.parsed, t)))
            .collect()
    }

    fn kotlin_has_modifier(&self, node: Node, modifier: &str) -> bool {
        first_named_child_of(node, &["modifiers"])
            .map(|m| {
                self.parsed
                    .node_text(&m)
                    .split_whitespace()
                    .any(|w| w == modifier)
            })
            .unwrap_or(false)
    }

    fn kotlin_body<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        node.child_by_field_name("body")
            .or_else(|| first_named_child_of(node, &["class_body", "enum_class_body"]))
            .or_else(|| delegated_body(node))
    }

    fn kotlin_class(&mut self, node: Node, owner: Option<DeclId>) {
        let Some(name) = self.kotlin_name(node) else {
            return;
        };

        let kind = if has_token(node, "interface") {
            DeclKind::Interface
        } else if self.kotlin_has_modifier(node, "enum") {
            DeclKind::Enum
        } else {
            DeclKind::Class
        };

        let mut decl = NewDecl::new(kind, self.text(&name), owner);
        decl.type_params = self.kotlin_type_params(node);
        decl.supertypes = self.kotlin_supertypes(node);
        decl.is_static = owner.is_some() && !self.kotlin_has_modifier(node, "inner");

        let id = self.push(decl, &name, &node);

        if let Some(ctor) = first_named_child_of(node, &["primary_constructor"]) {
            self.kotlin_constructor_properties(ctor, id);
        }
        if let Some(body) = self.kotlin_body(node) {
            self.kotlin_members(body, Some(id));
        }
    }

    fn kotlin_constructor_properties(&mut self, ctor: Node, owner: DeclId) {
        let params = first_named_child_of(ctor, &["class_parameters"])
            .map(named_children)
            .unwrap_or_else(|| named_children(ctor));

        for param in params {
            if param.kind() != "class_parameter" {
                continue;
            }
            let is_var = has_token(param, "var");
            if !is_var && !has_token(param, "val") {
                continue;
            }
            let Some(name) = self.kotlin_name(param) else {
                continue;
            };
            let mut decl = NewDecl::new(DeclKind::Property, self.text(&name), Some(owner));
            decl.type_ref = kotlin_child_type(self.parsed, param);
            decl.is_mutable = is_var;
            self.push(decl, &name, &param);
        }
    }

    fn kotlin_object(&mut self, node: Node, owner: Option<DeclId>, companion: bool) {
        let name_node = self.kotlin_name(node);
        let name = match (&name_node, companion) {
            (Some(n), _) => self.text(n),
            (None, true) => "Companion".to_string(),
            (None, false) => return,
        };
        let anchor_node = name_node.unwrap_or(node);

        let mut decl = NewDecl::new(DeclKind::Object, name, owner);
        decl.supertypes = self.kotlin_supertypes(node);
        decl.is_static = true;

        let id = self.push(decl, &anchor_node, &node);

        if !companion {
            let object_fq = self.result.declarations[id.0].fq_name.clone();
            let mut instance = NewDecl::new(DeclKind::Field, OBJECT_INSTANCE_FIELD, Some(id));
            instance.type_ref = Some(TypeRef::simple(object_fq));
            instance.is_static = true;
            self.push(instance, &anchor_node, &node);
        }

        if let Some(body) = self.kotlin_body(node) {
            self.kotlin_members(body, Some(id));
        }
    }

    fn kotlin_function(&mut self, node: Node, owner: Option<DeclId>) {
        let Some(name) = self.kotlin_name(node) else {
            return;
        };

        let kind = if owner.is_some() {
            DeclKind::Method
        } else {
            DeclKind::Function
        };
        let mut decl = NewDecl::new(kind, self.text(&name), owner);
        decl.type_params = self.kotlin_type_params(node);
        decl.is_static = self.owner_kind(owner) == Some(DeclKind::Object);

        let mut seen_params = false;
        for child in named_children(node) {
            if child.kind() == "function_value_parameters" {
                seen_params = true;
                for param in named_children(child) {
                    let param = if param.kind() == "parameter" {
                        Some(param)
                    } else {
                        first_named_child_of(param, &["parameter"])
                    };
                    if let Some(param) = param {
                        decl.params.push(kotlin_child_type(self.parsed, param));
                    }
                }
            } else if is_kotlin_type_node(&child) {
                let type_ref = kotlin_type_ref(self.parsed, child);
                if !seen_params && child.start_byte() < name.start_byte() {
                    decl.receiver = type_ref;
                } else if seen_params && decl.type_ref.is_none() {
                    decl.type_ref = type_ref;
                }
            }
        }

        self.push(decl, &name, &node);
    }

    fn kotlin_property(&mut self, node: Node, owner: Option<DeclId>) {
        let Some(var) = first_named_child_of(node, &["variable_declaration"]) else {
            return;
        };
        let Some(name) = self.kotlin_name(var) else {
            return;
        };

        let mut decl = NewDecl::new(DeclKind::Property, self.text(&name), owner);
        decl.is_mutable = has_token(node, "var");
        decl.is_static = self.owner_kind(owner) == Some(DeclKind::Object);
        decl.type_ref = kotlin_child_type(self.parsed, var)
            .or_else(|| self.kotlin_constructor_type(node, var));

        self.push(decl, &name, &node);
    }

    /// Type of `val x = Foo(...)` initializers, inferred from an upper-case callee.
    fn kotlin_constructor_type(&self, property: Node, var: Node) -> Option<TypeRef> {
        let init = named_children(property)
            .into_iter()
            .filter(|c| c.start_byte() > var.end_byte())
            .find(|c| c.kind() == "call_expression")?;
        let callee = first_named_child(init)?;
        if !matches!(
            callee.kind(),
            "identifier" | "simple_identifier" | "navigation_expression"
        ) {
            return None;
        }
        let text = compact_text(self.parsed, &callee);
        let simple = text.rsplit('.').next()?;
        simple
            .chars()
            .next()
            .filter(|c| c.is_uppercase())
            .map(|_| TypeRef::simple(text.clone()))
    }

    fn kotlin_enum_entry(&mut self, node: Node, owner: Option<DeclId>) {
        let Some(owner_id) = owner else {
            return;
        };
        let Some(name) = self.kotlin_name(node) else {
            return;
        };
        let enum_fq = self.result.declarations[owner_id.0].fq_name.clone();
        let mut decl = NewDecl::new(DeclKind::Property, self.text(&name), owner);
        decl.type_ref = Some(TypeRef::simple(enum_fq));
        decl.is_static = true;
        self.push(decl, &name, &node);
    }
}

fn find_user_type(node: Node) -> Option<Node> {
    if node.kind() == "user_type" {
        return Some(node);
    }
    // Skip value arguments of `Base(arg)` and delegate expressions of `by x`.
    named_children(node)
        .into_iter()
        .filter(|c| c.kind() != "value_arguments" && !c.kind().contains("expression"))
        .find_map(find_user_type)
}

/// `object X : I by Impl() { ... }` parses the body as a trailing lambda of
/// the delegate call.
fn delegated_body(node: Node) -> Option<Node> {
    let mut last = named_children(node)
        .into_iter()
        .filter(|c| matches!(c.kind(), "delegation_specifiers" | "delegation_specifier"))
        .last()?;
    if last.kind() == "delegation_specifiers" {
        last = last_named_child(last)?;
    }
    let delegation = first_named_child_of(last, &["explicit_delegation"])?;
    let call = last_named_child(delegation)?;
    if call.kind() != "call_expression" {
        return None;
    }
    let lambda = last_named_child(call)?;
    if lambda.kind() != "annotated_lambda" {
        return None;
    }
    first_named_child_of(lambda, &["lambda_literal"])
}
