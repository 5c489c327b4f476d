//! Small tree-sitter helpers shared by declaration extraction and the
//! dialect resolvers.

use tree_sitter::Node;

use crate::index::TypeRef;
use crate::indexer::parser::ParsedFile;

pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !is_comment(c))
        .collect()
}

pub fn first_named_child_of<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|c| kinds.contains(&c.kind()))
}

pub fn first_named_child<'t>(node: Node<'t>) -> Option<Node<'t>> {
    named_children(node).into_iter().next()
}

pub fn last_named_child<'t>(node: Node<'t>) -> Option<Node<'t>> {
    named_children(node).into_iter().last()
}

/// True if the node has an anonymous child token with the given text.
pub fn has_token(node: Node, token: &str) -> bool {
    children(node)
        .iter()
        .any(|c| !c.is_named() && c.kind() == token)
}

pub fn is_comment(node: &Node) -> bool {
    matches!(
        node.kind(),
        "comment" | "line_comment" | "block_comment" | "multiline_comment"
    )
}

/// Node text with all whitespace removed (`com . x . Foo` -> `com.x.Foo`).
pub fn compact_text(file: &ParsedFile, node: &Node) -> String {
    file.node_text(node)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Innermost ancestor (or self) of one of the given kinds.
pub fn ancestor_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut current = Some(node);
    while let Some(n) = current {
        if kinds.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// True for a Kotlin call whose only suffixes after the callee are
/// trailing lambdas: `f(x) { }` nests `f(x)` as the callee.
pub fn has_only_lambda_suffix(call: Node) -> bool {
    let named = named_children(call);
    named.len() > 1 && named[1..].iter().all(|c| c.kind() == "annotated_lambda")
}

/// The inner `f(x)` of `f(x) { }`, which belongs to the outer call.
pub fn is_trailing_lambda_callee(node: Node) -> bool {
    if node.kind() != "call_expression" {
        return false;
    }
    let Some(parent) = node.parent() else {
        return false;
    };
    parent.kind() == "call_expression"
        && first_named_child(parent).map(|c| c.id()) == Some(node.id())
        && has_only_lambda_suffix(parent)
}

/// Parses a Java type node into a `TypeRef`.
pub fn java_type_ref(file: &ParsedFile, node: Node) -> Option<TypeRef> {
    match node.kind() {
        "type_identifier" | "identifier" | "integral_type" | "floating_point_type"
        | "boolean_type" | "void_type" => Some(TypeRef::simple(file.node_text(&node))),
        "scoped_type_identifier" | "scoped_identifier" => {
            Some(TypeRef::simple(compact_text(file, &node)))
        }
        "generic_type" => {
            let base = first_named_child_of(node, &["type_identifier", "scoped_type_identifier"])?;
            let name = compact_text(file, &base);
            let args = first_named_child_of(node, &["type_arguments"])
                .map(|args| {
                    named_children(args)
                        .into_iter()
                        .filter_map(|a| java_type_ref(file, a))
                        .collect()
                })
                .unwrap_or_default();
            Some(TypeRef::with_args(name, args))
        }
        "annotated_type" | "wildcard" => last_named_child(node)
            .filter(|c| c.kind() != "annotation" && c.kind() != "marker_annotation")
            .and_then(|c| java_type_ref(file, c)),
        _ => None,
    }
}

/// Kotlin nodes that wrap a type without being one.
const KOTLIN_TYPE_WRAPPERS: &[&str] = &[
    "type",
    "nullable_type",
    "not_nullable_type",
    "parenthesized_type",
    "type_projection",
    "receiver_type",
    "type_reference",
];

pub fn is_kotlin_type_node(node: &Node) -> bool {
    node.kind() == "user_type" || KOTLIN_TYPE_WRAPPERS.contains(&node.kind())
}

/// Parses a Kotlin type node into a `TypeRef`; function types yield `None`.
pub fn kotlin_type_ref(file: &ParsedFile, node: Node) -> Option<TypeRef> {
    match node.kind() {
        "user_type" => {
            let mut segments = Vec::new();
            let mut args_node = None;
            collect_user_type(file, node, &mut segments, &mut args_node);
            if segments.is_empty() {
                return None;
            }
            let args = args_node
                .map(|args| {
                    named_children(args)
                        .into_iter()
                        .filter_map(|a| kotlin_type_ref(file, a))
                        .collect()
                })
                .unwrap_or_default();
            Some(TypeRef::with_args(segments.join("."), args))
        }
        "identifier" | "type_identifier" | "simple_identifier" => {
            Some(TypeRef::simple(file.node_text(&node)))
        }
        // `observe<demo.Foo> { }` reads the type argument as an expression
        "navigation_expression" => Some(TypeRef::simple(compact_text(file, &node))),
        kind if KOTLIN_TYPE_WRAPPERS.contains(&kind) => named_children(node)
            .into_iter()
            .filter(|c| !c.kind().contains("modifier") && !c.kind().contains("annotation"))
            .find_map(|c| kotlin_type_ref(file, c)),
        _ => None,
    }
}

fn collect_user_type<'t>(
    file: &ParsedFile,
    node: Node<'t>,
    segments: &mut Vec<String>,
    args_node: &mut Option<Node<'t>>,
) {
    for child in named_children(node) {
        match child.kind() {
            "identifier" | "type_identifier" | "simple_identifier" => {
                segments.push(file.node_text(&child).to_string());
                *args_node = None;
            }
            "type_arguments" => *args_node = Some(child),
            // older grammars nest each segment
            "simple_user_type" => collect_user_type(file, child, segments, args_node),
            _ => {}
        }
    }
}

/// First Kotlin type found among the direct named children of `node`.
pub fn kotlin_child_type(file: &ParsedFile, node: Node) -> Option<TypeRef> {
    named_children(node)
        .into_iter()
        .filter(is_kotlin_type_node)
        .find_map(|c| kotlin_type_ref(file, c))
}
