use tree_sitter::Node;

use super::{
    exact_arity, members_in_scope, return_type, variable_type, CallParts, DialectResolver,
    ExprType, FileContext, MAX_DEPTH,
};
use crate::index::{DeclId, DeclKind, Declaration, ResolvedType, SymbolTable};
use crate::indexer::syntax::{
    compact_text, first_named_child, has_only_lambda_suffix, is_kotlin_type_node, kotlin_type_ref,
    last_named_child, named_children,
};
use crate::indexer::OBJECT_INSTANCE_FIELD;
use crate::languages::Dialect;

pub struct KotlinResolver;

struct LocalVar<'t> {
    type_node: Option<Node<'t>>,
    init: Option<Node<'t>>,
}

/// Value of an `object`, or a qualifier for any other class.
fn class_expr(table: &SymbolTable, class: DeclId) -> ExprType {
    if table.get(class).kind == DeclKind::Object {
        ExprType::Value(ResolvedType::of(table, class))
    } else {
        ExprType::ClassRef(class)
    }
}

fn class_of(inner: ResolvedType) -> ResolvedType {
    ResolvedType {
        decl: None,
        name: "java.lang.Class".to_string(),
        args: vec![inner],
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .and_then(|s| s.chars().next())
        .map(char::is_uppercase)
        .unwrap_or(false)
}

/// Receiver and member name of a navigation expression.
fn navigation_parts(node: Node) -> Option<(Node, Node)> {
    let parts = named_children(node);
    let receiver = *parts.first()?;
    let last = *parts.last()?;
    let member = if last.kind() == "navigation_suffix" {
        last_named_child(last)?
    } else {
        last
    };
    (member.id() != receiver.id()).then_some((receiver, member))
}

impl KotlinResolver {
    fn type_of_depth(&self, ctx: &FileContext, expr: Node, depth: usize) -> Option<ExprType> {
        if depth > MAX_DEPTH {
            return None;
        }

        match expr.kind() {
            "parenthesized_expression" => {
                self.type_of_depth(ctx, first_named_child(expr)?, depth + 1)
            }
            "identifier" | "simple_identifier" => self.name_type(ctx, expr, depth),
            "this_expression" | "this" => {
                let class = ctx.enclosing_class(&expr)?;
                Some(ExprType::Value(ResolvedType::of(ctx.table, class)))
            }
            "navigation_expression" => self.navigation_type(ctx, expr, depth),
            "call_expression" => self.call_type(ctx, expr, depth),
            "as_expression" => {
                let target = named_children(expr)
                    .into_iter()
                    .rev()
                    .find(is_kotlin_type_node)?;
                self.resolve_type_node(ctx, target).map(ExprType::Value)
            }
            "callable_reference" => {
                // `Foo::class`
                let text = compact_text(ctx.file, &expr);
                let target = text.strip_suffix("::class")?;
                let class = ctx.resolve_type_name(ctx.enclosing_class(&expr), target)?;
                Some(ExprType::Value(ResolvedType {
                    decl: None,
                    name: "kotlin.reflect.KClass".to_string(),
                    args: vec![ResolvedType::of(ctx.table, class)],
                }))
            }
            "string_literal" => Some(ExprType::Value(ResolvedType::external("kotlin.String"))),
            _ => None,
        }
    }

    fn name_type(&self, ctx: &FileContext, node: Node, depth: usize) -> Option<ExprType> {
        let name = ctx.text(&node);

        if let Some(local) = find_local(ctx, node, name) {
            return self.local_type(ctx, local, depth);
        }

        let enclosing = ctx.enclosing_class(&node);
        let is_variable = |d: &Declaration| d.kind.is_variable();
        if let Some(property) = members_in_scope(ctx, enclosing, name, is_variable).first() {
            return variable_type(ctx.table, *property);
        }
        if let Some(property) = ctx
            .table
            .visible_top_level(ctx.file_id, name, is_variable)
            .first()
        {
            return variable_type(ctx.table, *property);
        }

        ctx.resolve_type_name(enclosing, name)
            .map(|class| class_expr(ctx.table, class))
    }

    fn local_type(&self, ctx: &FileContext, local: LocalVar, depth: usize) -> Option<ExprType> {
        match (local.type_node, local.init) {
            (Some(type_node), _) => self.resolve_type_node(ctx, type_node).map(ExprType::Value),
            (None, Some(init)) => self.type_of_depth(ctx, init, depth + 1),
            (None, None) => None,
        }
    }

    fn navigation_type(&self, ctx: &FileContext, node: Node, depth: usize) -> Option<ExprType> {
        let (receiver, member) = navigation_parts(node)?;
        let name = ctx.text(&member);

        let Some(receiver_type) = self.type_of_depth(ctx, receiver, depth + 1) else {
            // package-qualified class name
            let class = ctx.resolve_type_name(
                ctx.enclosing_class(&node),
                &compact_text(ctx.file, &node),
            )?;
            return Some(class_expr(ctx.table, class));
        };

        if let ExprType::Value(value) = &receiver_type {
            match name {
                "java" if value.simple_name() == "KClass" => {
                    return value.args.first().cloned().map(|t| ExprType::Value(class_of(t)));
                }
                "javaClass" => return Some(ExprType::Value(class_of(value.clone()))),
                _ => {}
            }
        }

        let scope = receiver_type.member_scope()?;
        let is_variable = |d: &Declaration| d.kind.is_variable();
        if let Some(property) = ctx.table.find_member(scope, name, is_variable).first() {
            return variable_type(ctx.table, *property);
        }
        if let Some(nested) = ctx.table.nested_class(scope, name) {
            return Some(class_expr(ctx.table, nested));
        }
        if let ExprType::ClassRef(class) = receiver_type {
            let companion = self.companion(ctx.table, class)?;
            let property = *ctx.table.find_member(companion, name, is_variable).first()?;
            return variable_type(ctx.table, property);
        }
        None
    }

    fn call_type(&self, ctx: &FileContext, call: Node, depth: usize) -> Option<ExprType> {
        let parts = self.call_parts(ctx, call)?;
        let enclosing = ctx.enclosing_class(&call);

        // Constructor calls: `Foo()`, `demo.Foo()`, `Outer.Inner()`
        let callee_text = match parts.receiver {
            None => ctx.text(&parts.name).to_string(),
            Some(receiver) => format!(
                "{}.{}",
                compact_text(ctx.file, &receiver),
                ctx.text(&parts.name)
            ),
        };
        if starts_uppercase(&callee_text) {
            if let Some(class) = ctx.resolve_type_name(enclosing, &callee_text) {
                if ctx.table.get(class).kind != DeclKind::Object {
                    return Some(ExprType::Value(ResolvedType::of(ctx.table, class)));
                }
            }
        }

        let callee = self.resolve_callee_depth(ctx, call, depth + 1)?;
        return_type(ctx.table, callee)
    }

    fn companion(&self, table: &SymbolTable, class: DeclId) -> Option<DeclId> {
        table
            .members(class)
            .iter()
            .copied()
            .find(|id| table.get(*id).kind == DeclKind::Object && table.get(*id).name == "Companion")
    }

    /// Top-level extension functions named `name` applicable to `receiver`.
    fn extensions(&self, ctx: &FileContext, name: &str, receiver: DeclId) -> Vec<DeclId> {
        let table = ctx.table;
        table
            .visible_top_level(ctx.file_id, name, |d| {
                d.kind == DeclKind::Function && d.receiver.is_some()
            })
            .into_iter()
            .filter(|id| {
                let decl = table.get(*id);
                decl.receiver
                    .as_ref()
                    .and_then(|r| table.resolve_type_name(decl.file, None, &r.name))
                    .map(|target| table.is_subtype(receiver, target))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn resolve_callee_depth(&self, ctx: &FileContext, call: Node, depth: usize) -> Option<DeclId> {
        if depth > MAX_DEPTH {
            return None;
        }
        let parts = self.call_parts(ctx, call)?;
        let name = ctx.text(&parts.name);
        let callable = |d: &Declaration| d.kind.is_callable();

        let (members, others) = match parts.receiver {
            None => {
                let enclosing = ctx.enclosing_class(&call);
                (
                    members_in_scope(ctx, enclosing, name, callable),
                    ctx.table.visible_top_level(ctx.file_id, name, |d| {
                        d.kind == DeclKind::Function && d.receiver.is_none()
                    }),
                )
            }
            Some(receiver) => {
                let receiver_type = self.type_of_depth(ctx, receiver, depth + 1)?;
                let scope = receiver_type.member_scope()?;
                let mut members = ctx.table.find_member(scope, name, callable);
                if let ExprType::ClassRef(class) = receiver_type {
                    if let Some(companion) = self.companion(ctx.table, class) {
                        members.extend(ctx.table.find_member(companion, name, callable));
                    }
                }
                (members, self.extensions(ctx, name, scope))
            }
        };

        // Members win over extensions of the same shape.
        exact_arity(ctx.table, &members, parts.arity)
            .or_else(|| exact_arity(ctx.table, &others, parts.arity))
            .or_else(|| members.first().copied())
            .or_else(|| others.first().copied())
    }

    /// `Holder.FIELD` where `FIELD` is a static Java field.
    fn static_field(&self, ctx: &FileContext, navigation: Node) -> Option<DeclId> {
        let (owner, member) = navigation_parts(navigation)?;
        let class = ctx.resolve_type_name(
            ctx.enclosing_class(&navigation),
            &compact_text(ctx.file, &owner),
        )?;
        ctx.table
            .find_member(class, ctx.text(&member), |d| {
                d.kind == DeclKind::Field && d.is_static
            })
            .first()
            .copied()
    }

    fn instance_field(&self, table: &SymbolTable, class: DeclId) -> Option<DeclId> {
        if table.get(class).kind != DeclKind::Object {
            return None;
        }
        table
            .direct_members(class, OBJECT_INSTANCE_FIELD, |d| d.kind == DeclKind::Field)
            .first()
            .copied()
    }
}

impl DialectResolver for KotlinResolver {
    fn dialect(&self) -> Dialect {
        Dialect::Kotlin
    }

    fn call_parts<'t>(&self, ctx: &FileContext, call: Node<'t>) -> Option<CallParts<'t>> {
        match call.kind() {
            "call_expression" => {}
            "binary_expression" => return type_argument_lambda_parts(call),
            _ => return None,
        }
        let named = named_children(call);
        let callee = *named.first()?;
        if callee.kind() == "call_expression" {
            if !has_only_lambda_suffix(call) {
                return None;
            }
            let mut parts = self.call_parts(ctx, callee)?;
            parts.arity += named.len() - 1;
            return Some(parts);
        }
        let (receiver, name) = callee_parts(callee)?;

        let mut parts = CallParts {
            name,
            receiver,
            args: Vec::new(),
            type_args: Vec::new(),
            arity: 0,
        };
        let mut lambdas = 0;
        for child in &named[1..] {
            collect_suffix(*child, &mut parts, &mut lambdas);
        }
        parts.arity = parts.args.len() + lambdas;
        Some(parts)
    }

    fn resolve_callee(&self, ctx: &FileContext, call: Node) -> Option<DeclId> {
        self.resolve_callee_depth(ctx, call, 0)
    }

    fn type_of(&self, ctx: &FileContext, expr: Node) -> Option<ExprType> {
        self.type_of_depth(ctx, expr, 0)
    }

    fn resolve_type_node(&self, ctx: &FileContext, type_node: Node) -> Option<ResolvedType> {
        let type_ref = kotlin_type_ref(ctx.file, type_node)?;
        let enclosing = ctx.enclosing_class(&type_node);
        Some(ctx.table.resolve_type_ref(ctx.file_id, enclosing, &type_ref))
    }

    /// Only `object` names and qualified static Java fields qualify;
    /// properties and locals holding a bus are not followed.
    fn resolve_bus_receiver(&self, ctx: &FileContext, receiver: Node) -> Option<DeclId> {
        let enclosing = ctx.enclosing_class(&receiver);

        let class = match receiver.kind() {
            "parenthesized_expression" => {
                return self.resolve_bus_receiver(ctx, first_named_child(receiver)?)
            }
            "identifier" | "simple_identifier" => {
                let name = ctx.text(&receiver);
                if find_local(ctx, receiver, name).is_some() {
                    tracing::trace!("Receiver `{}` is a local variable", name);
                    return None;
                }
                let is_property = |d: &Declaration| d.kind == DeclKind::Property;
                if !members_in_scope(ctx, enclosing, name, is_property).is_empty()
                    || !ctx
                        .table
                        .visible_top_level(ctx.file_id, name, is_property)
                        .is_empty()
                {
                    tracing::trace!("Receiver `{}` is a property", name);
                    return None;
                }
                ctx.resolve_type_name(enclosing, name)?
            }
            "navigation_expression" => {
                match ctx.resolve_type_name(enclosing, &compact_text(ctx.file, &receiver)) {
                    Some(class) => class,
                    None => return self.static_field(ctx, receiver),
                }
            }
            _ => return None,
        };

        self.instance_field(ctx.table, class)
    }
}

fn callee_parts(callee: Node) -> Option<(Option<Node>, Node)> {
    match callee.kind() {
        "identifier" | "simple_identifier" => Some((None, callee)),
        "navigation_expression" => {
            let (receiver, member) = navigation_parts(callee)?;
            Some((Some(receiver), member))
        }
        _ => None,
    }
}

/// `bus.observe<Foo> { }` parses as `(bus.observe < Foo) > { }`.
fn type_argument_lambda_parts(call: Node) -> Option<CallParts> {
    let operator = |node: Node| node.child_by_field_name("operator").map(|op| op.kind());
    let left = call.child_by_field_name("left")?;
    let right = call.child_by_field_name("right")?;
    if operator(call)? != ">"
        || left.kind() != "binary_expression"
        || operator(left)? != "<"
        || right.kind() != "lambda_literal"
    {
        return None;
    }

    let (receiver, name) = callee_parts(left.child_by_field_name("left")?)?;
    let type_arg = left.child_by_field_name("right")?;
    Some(CallParts {
        name,
        receiver,
        args: Vec::new(),
        type_args: vec![type_arg],
        arity: 1,
    })
}

fn collect_suffix<'t>(node: Node<'t>, parts: &mut CallParts<'t>, lambdas: &mut usize) {
    match node.kind() {
        "type_arguments" => parts.type_args = named_children(node),
        "value_arguments" => {
            for arg in named_children(node) {
                if arg.kind() == "value_argument" {
                    if let Some(expr) = last_named_child(arg) {
                        parts.args.push(expr);
                    }
                } else {
                    parts.args.push(arg);
                }
            }
        }
        "annotated_lambda" | "lambda_literal" => *lambdas += 1,
        "call_suffix" => {
            for child in named_children(node) {
                collect_suffix(child, parts, lambdas);
            }
        }
        _ => {}
    }
}

const PROPERTY_TAIL: &[&str] = &[
    "modifiers",
    "type_constraints",
    "getter",
    "setter",
    "property_delegate",
];

fn property_local<'t>(ctx: &FileContext, property: Node<'t>, name: &str) -> Option<LocalVar<'t>> {
    let var = named_children(property)
        .into_iter()
        .find(|c| c.kind() == "variable_declaration")?;
    if !declares(ctx, var, name) {
        return None;
    }
    let init = named_children(property)
        .into_iter()
        .filter(|c| c.start_byte() >= var.end_byte())
        .find(|c| !PROPERTY_TAIL.contains(&c.kind()) && !is_kotlin_type_node(c));
    Some(LocalVar {
        type_node: named_children(var).into_iter().find(is_kotlin_type_node),
        init,
    })
}

fn declares(ctx: &FileContext, var: Node, name: &str) -> bool {
    named_children(var)
        .into_iter()
        .find(|c| matches!(c.kind(), "identifier" | "simple_identifier"))
        .map(|n| ctx.text(&n) == name)
        .unwrap_or(false)
}

fn typed_variable<'t>(ctx: &FileContext, var: Node<'t>, name: &str) -> Option<LocalVar<'t>> {
    declares(ctx, var, name).then(|| LocalVar {
        type_node: named_children(var).into_iter().find(is_kotlin_type_node),
        init: None,
    })
}

/// Statements of a block, flattening a nested `statements` node.
fn statements(node: Node) -> Vec<Node> {
    named_children(node)
        .into_iter()
        .flat_map(|c| {
            if c.kind() == "statements" {
                named_children(c)
            } else {
                vec![c]
            }
        })
        .collect()
}

fn find_local<'t>(ctx: &FileContext, from: Node<'t>, name: &str) -> Option<LocalVar<'t>> {
    let mut child = from;

    while let Some(parent) = child.parent() {
        match parent.kind() {
            "block" | "statements" | "function_body" | "control_structure_body"
            | "lambda_literal" => {
                let found = statements(parent)
                    .into_iter()
                    .take_while(|s| s.start_byte() < from.start_byte())
                    .filter(|s| s.kind() == "property_declaration")
                    .filter_map(|s| property_local(ctx, s, name))
                    .last();
                if found.is_some() {
                    return found;
                }
                if parent.kind() == "lambda_literal" {
                    let param = named_children(parent)
                        .into_iter()
                        .filter(|c| c.kind() == "lambda_parameters")
                        .flat_map(named_children)
                        .find_map(|p| typed_variable(ctx, p, name));
                    if param.is_some() {
                        return param;
                    }
                }
            }
            "function_declaration" | "secondary_constructor" | "anonymous_function" => {
                let param = named_children(parent)
                    .into_iter()
                    .filter(|c| c.kind() == "function_value_parameters")
                    .flat_map(named_children)
                    .filter(|p| p.kind() == "parameter")
                    .find_map(|p| typed_variable(ctx, p, name));
                if param.is_some() {
                    return param;
                }
            }
            "for_statement" => {
                let var = named_children(parent)
                    .into_iter()
                    .filter(|c| c.kind() == "variable_declaration")
                    .find_map(|v| typed_variable(ctx, v, name));
                if var.is_some() {
                    return var;
                }
            }
            "class_body" | "enum_class_body" | "source_file" => return None,
            _ => {}
        }
        child = parent;
    }
    None
}
