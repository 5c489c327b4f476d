//! Bus and event identity of a contract call.
//!
//! Identities are canonical qualified names, so a Java and a Kotlin view
//! of the same declaration compare equal.

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

use super::contract::Contract;
use super::model::{BusTarget, EventSource, EventTarget};
use crate::index::{DeclId, ResolvedType, SymbolTable, SyntaxAnchor};
use crate::indexer::syntax::compact_text;
use crate::languages::Dialect;
use crate::resolve::{resolver_for, CallParts, ExprType, FileContext};

/// Type names whose single type argument is the class they denote.
const CLASS_WRAPPERS: &[&str] = &[
    "java.lang.Class",
    "Class",
    "kotlin.reflect.KClass",
    "KClass",
];

/// Canonical, dialect-independent name of a declaration.
pub fn canonicalize(table: &SymbolTable, decl: DeclId) -> String {
    table.canonical_name(decl).to_string()
}

fn target_of<T>(table: &SymbolTable, decl: DeclId, make: impl Fn(String, SyntaxAnchor) -> T) -> T {
    make(canonicalize(table, decl), table.get(decl).anchor.clone())
}

/// Resolves the receiver of a contract call to the bus field it names.
pub fn resolve_bus_identity(ctx: &FileContext, parts: &CallParts) -> Option<(DeclId, BusTarget)> {
    let receiver = parts.receiver?;
    let field = resolver_for(ctx.file.dialect).resolve_bus_receiver(ctx, receiver)?;
    Some((field, target_of(ctx.table, field, |n, a| BusTarget::new(n, a))))
}

/// Resolves the event type of a contract call.
pub fn resolve_event_type(
    ctx: &FileContext,
    parts: &CallParts,
    contract: Contract,
) -> Option<(EventTarget, EventSource)> {
    let resolver = resolver_for(ctx.file.dialect);

    let (decl, source) = match contract {
        Contract::Post => {
            let arg = *parts.args.first()?;
            let ty = resolver.type_of(ctx, arg)?.into_value()?;
            (ty.decl?, EventSource::StaticType)
        }
        Contract::Observe => {
            let arg = *parts.args.first()?;
            match resolver.type_of(ctx, arg).and_then(class_argument) {
                Some(decl) => (decl, EventSource::TypeArgument),
                None => (
                    ClassLiteralPattern::resolve(ctx, arg)?,
                    EventSource::ClassLiteralPattern,
                ),
            }
        }
        Contract::ExtensionObserve => {
            let type_arg = *parts.type_args.first()?;
            let ty = resolver.resolve_type_node(ctx, type_arg)?;
            (ty.decl?, EventSource::TypeArgument)
        }
    };

    if !ctx.table.get(decl).kind.is_class_like() {
        return None;
    }
    Some((target_of(ctx.table, decl, |n, a| EventTarget::new(n, a)), source))
}

/// `X` of a `Class<X>` or `KClass<X>` value.
fn class_argument(ty: ExprType) -> Option<DeclId> {
    let ResolvedType { name, args, .. } = ty.into_value()?;
    if !CLASS_WRAPPERS.contains(&name.as_str()) {
        return None;
    }
    args.into_iter().next()?.decl
}

static CLASS_LITERAL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^(?P<class>[A-Za-z_][\w.]*?)(?:\.javaClass|::class\.java)$").ok()
});

/// Best-effort match of `X::class.java` and `X.javaClass` by text, for
/// arguments the Kotlin resolver could not type. Aliased class literals
/// (`val c = X::class.java; observe(c)`) are not followed.
pub struct ClassLiteralPattern;

impl ClassLiteralPattern {
    /// The `X` of a class literal expression text, whitespace ignored.
    pub fn class_text(text: &str) -> Option<String> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        CLASS_LITERAL
            .as_ref()?
            .captures(&compact)
            .and_then(|c| c.name("class"))
            .map(|m| m.as_str().to_string())
    }

    pub fn resolve(ctx: &FileContext, arg: Node) -> Option<DeclId> {
        if ctx.file.dialect != Dialect::Kotlin {
            return None;
        }
        let class = Self::class_text(&compact_text(ctx.file, &arg))?;
        let decl = ctx.resolve_type_name(ctx.enclosing_class(&arg), &class)?;
        tracing::trace!("Observed event {} resolved by class literal pattern", class);
        Some(decl)
    }
}
