use tree_sitter::Node;

use super::{
    members_in_scope, pick_by_arity, return_type, variable_type, CallParts, DialectResolver,
    ExprType, FileContext, MAX_DEPTH,
};
use crate::index::{DeclId, DeclKind, Declaration, ResolvedType};
use crate::indexer::syntax::{compact_text, first_named_child, java_type_ref, named_children};
use crate::languages::Dialect;

pub struct JavaResolver;

/// A local variable or parameter visible at some point of a method body.
struct LocalVar<'t> {
    type_node: Option<Node<'t>>,
    init: Option<Node<'t>>,
}

impl JavaResolver {
    fn type_of_depth(&self, ctx: &FileContext, expr: Node, depth: usize) -> Option<ExprType> {
        if depth > MAX_DEPTH {
            return None;
        }

        match expr.kind() {
            "parenthesized_expression" => {
                self.type_of_depth(ctx, first_named_child(expr)?, depth + 1)
            }
            "identifier" => self.identifier_type(ctx, expr, depth),
            "this" => {
                let class = ctx.enclosing_class(&expr)?;
                Some(ExprType::Value(ResolvedType::of(ctx.table, class)))
            }
            "field_access" => self.field_access_type(ctx, expr, depth),
            "method_invocation" => {
                let callee = self.resolve_callee_depth(ctx, expr, depth + 1)?;
                return_type(ctx.table, callee)
            }
            "object_creation_expression" | "cast_expression" => {
                let type_node = expr.child_by_field_name("type")?;
                self.resolve_type_node(ctx, type_node).map(ExprType::Value)
            }
            "class_literal" => {
                let target = self.resolve_type_node(ctx, first_named_child(expr)?)?;
                Some(ExprType::Value(ResolvedType {
                    decl: None,
                    name: "java.lang.Class".to_string(),
                    args: vec![target],
                }))
            }
            "string_literal" => Some(ExprType::Value(ResolvedType::external("java.lang.String"))),
            _ => None,
        }
    }

    fn identifier_type(&self, ctx: &FileContext, node: Node, depth: usize) -> Option<ExprType> {
        let name = ctx.text(&node);

        if let Some(local) = find_local(ctx, node, name) {
            return self.local_type(ctx, local, depth);
        }

        let enclosing = ctx.enclosing_class(&node);
        if let Some(field) = self.field_in_scope(ctx, enclosing, name, |d| d.kind.is_variable()) {
            return variable_type(ctx.table, field);
        }

        ctx.resolve_type_name(enclosing, name).map(ExprType::ClassRef)
    }

    fn local_type(&self, ctx: &FileContext, local: LocalVar, depth: usize) -> Option<ExprType> {
        match (local.type_node, local.init) {
            (Some(type_node), _) => self.resolve_type_node(ctx, type_node).map(ExprType::Value),
            (None, Some(init)) => self.type_of_depth(ctx, init, depth + 1),
            (None, None) => None,
        }
    }

    /// Fields of enclosing classes, then statically imported ones.
    fn field_in_scope(
        &self,
        ctx: &FileContext,
        enclosing: Option<DeclId>,
        name: &str,
        pred: impl Fn(&Declaration) -> bool,
    ) -> Option<DeclId> {
        if let Some(field) = members_in_scope(ctx, enclosing, name, &pred).first() {
            return Some(*field);
        }

        let scope = ctx.table.scope(ctx.file_id);
        scope
            .imports
            .iter()
            .filter(|i| i.is_static && i.visible_name() == Some(name))
            .flat_map(|i| ctx.table.by_fq_name(&i.path).iter().copied())
            .find(|id| pred(ctx.table.get(*id)))
    }

    fn field_access_type(&self, ctx: &FileContext, node: Node, depth: usize) -> Option<ExprType> {
        let object = node.child_by_field_name("object")?;
        let field = node.child_by_field_name("field")?;
        let name = ctx.text(&field);

        match self.type_of_depth(ctx, object, depth + 1) {
            Some(object_type) => {
                let scope = object_type.member_scope()?;
                if let Some(member) = ctx
                    .table
                    .find_member(scope, name, |d| d.kind.is_variable())
                    .first()
                {
                    return variable_type(ctx.table, *member);
                }
                ctx.table.nested_class(scope, name).map(ExprType::ClassRef)
            }
            // `com.example.Holder` reads as a chain of field accesses
            None => ctx
                .resolve_type_name(ctx.enclosing_class(&node), &compact_text(ctx.file, &node))
                .map(ExprType::ClassRef),
        }
    }

    fn resolve_callee_depth(&self, ctx: &FileContext, call: Node, depth: usize) -> Option<DeclId> {
        if depth > MAX_DEPTH {
            return None;
        }
        let parts = self.call_parts(ctx, call)?;
        let name = ctx.text(&parts.name);
        let enclosing = ctx.enclosing_class(&call);
        let callable = |d: &Declaration| d.kind.is_callable();

        let candidates = match parts.receiver {
            None => members_in_scope(ctx, enclosing, name, callable),
            Some(receiver) if receiver.kind() == "super" => {
                let class = enclosing?;
                ctx.table
                    .supertypes(class)
                    .into_iter()
                    .flat_map(|s| ctx.table.find_member(s, name, callable))
                    .collect()
            }
            Some(receiver) => {
                let scope = self.type_of_depth(ctx, receiver, depth + 1)?.member_scope()?;
                ctx.table.find_member(scope, name, callable)
            }
        };

        pick_by_arity(ctx.table, &candidates, parts.arity)
    }
}

impl DialectResolver for JavaResolver {
    fn dialect(&self) -> Dialect {
        Dialect::Java
    }

    fn call_parts<'t>(&self, _ctx: &FileContext, call: Node<'t>) -> Option<CallParts<'t>> {
        if call.kind() != "method_invocation" {
            return None;
        }
        let args = call
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();
        let type_args = call
            .child_by_field_name("type_arguments")
            .map(named_children)
            .unwrap_or_default();

        Some(CallParts {
            name: call.child_by_field_name("name")?,
            receiver: call.child_by_field_name("object"),
            arity: args.len(),
            args,
            type_args,
        })
    }

    fn resolve_callee(&self, ctx: &FileContext, call: Node) -> Option<DeclId> {
        self.resolve_callee_depth(ctx, call, 0)
    }

    fn type_of(&self, ctx: &FileContext, expr: Node) -> Option<ExprType> {
        self.type_of_depth(ctx, expr, 0)
    }

    fn resolve_type_node(&self, ctx: &FileContext, type_node: Node) -> Option<ResolvedType> {
        let type_ref = java_type_ref(ctx.file, type_node)?;
        let enclosing = ctx.enclosing_class(&type_node);
        Some(ctx.table.resolve_type_ref(ctx.file_id, enclosing, &type_ref))
    }

    fn resolve_bus_receiver(&self, ctx: &FileContext, receiver: Node) -> Option<DeclId> {
        let is_field = |d: &Declaration| d.kind == DeclKind::Field;

        match receiver.kind() {
            "parenthesized_expression" => {
                self.resolve_bus_receiver(ctx, first_named_child(receiver)?)
            }
            "identifier" => {
                let name = ctx.text(&receiver);
                if find_local(ctx, receiver, name).is_some() {
                    tracing::trace!("Receiver `{}` is a local variable", name);
                    return None;
                }
                self.field_in_scope(ctx, ctx.enclosing_class(&receiver), name, is_field)
            }
            "field_access" => {
                let object = receiver.child_by_field_name("object")?;
                let field = receiver.child_by_field_name("field")?;
                let scope = self.type_of(ctx, object)?.member_scope()?;
                ctx.table
                    .find_member(scope, ctx.text(&field), is_field)
                    .first()
                    .copied()
            }
            _ => None,
        }
    }
}

/// Finds the innermost local variable or parameter named `name` declared
/// before `from` in an enclosing method body.
fn find_local<'t>(ctx: &FileContext, from: Node<'t>, name: &str) -> Option<LocalVar<'t>> {
    let mut child = from;

    while let Some(parent) = child.parent() {
        match parent.kind() {
            "block" | "constructor_body" | "switch_block_statement_group" => {
                let found = named_children(parent)
                    .into_iter()
                    .take_while(|stmt| stmt.start_byte() < from.start_byte())
                    .filter(|stmt| stmt.kind() == "local_variable_declaration")
                    .filter_map(|stmt| declared_in(ctx, stmt, name))
                    .last();
                if found.is_some() {
                    return found;
                }
            }
            "for_statement" => {
                let found = named_children(parent)
                    .into_iter()
                    .filter(|c| c.kind() == "local_variable_declaration")
                    .find_map(|c| declared_in(ctx, c, name));
                if found.is_some() {
                    return found;
                }
            }
            "enhanced_for_statement" | "catch_formal_parameter" | "resource" => {
                if let Some(local) = single_variable(ctx, parent, name) {
                    return Some(local);
                }
            }
            "catch_clause" => {
                let param = named_children(parent)
                    .into_iter()
                    .find(|c| c.kind() == "catch_formal_parameter");
                if let Some(local) = param.and_then(|p| single_variable(ctx, p, name)) {
                    return Some(local);
                }
            }
            "method_declaration" | "constructor_declaration" | "lambda_expression" => {
                if let Some(local) = parameter(ctx, parent, name) {
                    return Some(local);
                }
                if parent.kind() != "lambda_expression" {
                    return None;
                }
            }
            "class_body" | "interface_body" | "enum_body" | "program" => return None,
            _ => {}
        }
        child = parent;
    }
    None
}

fn declared_in<'t>(ctx: &FileContext, decl: Node<'t>, name: &str) -> Option<LocalVar<'t>> {
    let type_node = decl
        .child_by_field_name("type")
        .filter(|t| ctx.text(t) != "var");
    named_children(decl)
        .into_iter()
        .filter(|c| c.kind() == "variable_declarator")
        .find(|d| {
            d.child_by_field_name("name")
                .map(|n| ctx.text(&n) == name)
                .unwrap_or(false)
        })
        .map(|d| LocalVar {
            type_node,
            init: d.child_by_field_name("value"),
        })
}

fn single_variable<'t>(ctx: &FileContext, node: Node<'t>, name: &str) -> Option<LocalVar<'t>> {
    let declared = node.child_by_field_name("name")?;
    if ctx.text(&declared) != name {
        return None;
    }
    let type_node = node.child_by_field_name("type").or_else(|| {
        named_children(node)
            .into_iter()
            .find(|c| c.kind() == "catch_type")
            .and_then(first_named_child)
    });
    Some(LocalVar {
        type_node: type_node.filter(|t| ctx.text(t) != "var"),
        init: node.child_by_field_name("value"),
    })
}

fn parameter<'t>(ctx: &FileContext, callable: Node<'t>, name: &str) -> Option<LocalVar<'t>> {
    let params = callable.child_by_field_name("parameters")?;
    if params.kind() == "identifier" {
        return (ctx.text(&params) == name).then_some(LocalVar {
            type_node: None,
            init: None,
        });
    }

    for param in named_children(params) {
        match param.kind() {
            "formal_parameter" | "spread_parameter" => {
                let declared = param.child_by_field_name("name").or_else(|| {
                    named_children(param)
                        .into_iter()
                        .find(|c| c.kind() == "variable_declarator")
                        .and_then(|d| d.child_by_field_name("name"))
                });
                if declared.map(|n| ctx.text(&n) == name).unwrap_or(false) {
                    return Some(LocalVar {
                        type_node: param.child_by_field_name("type"),
                        init: None,
                    });
                }
            }
            "identifier" if ctx.text(&param) == name => {
                return Some(LocalVar {
                    type_node: None,
                    init: None,
                });
            }
            _ => {}
        }
    }
    None
}
