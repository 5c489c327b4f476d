//! Static name and type resolution over syntax trees, one resolver per
//! dialect.
//!
//! Resolution is deliberately shallow: declared types of fields,
//! properties, locals and parameters, constructor calls, casts and
//! return types of resolvable calls. Anything else resolves to `None`.

pub mod java;
pub mod kotlin;

use tree_sitter::Node;

use crate::index::{DeclId, Declaration, FileId, ResolvedType, SymbolTable};
use crate::indexer::ParsedFile;
use crate::languages::Dialect;

pub use java::JavaResolver;
pub use kotlin::KotlinResolver;

/// Bound on mutually dependent local inference (`val a = b`, `val b = ...`).
pub(crate) const MAX_DEPTH: usize = 16;

/// One file together with the project symbol table.
#[derive(Clone, Copy)]
pub struct FileContext<'a> {
    pub file: &'a ParsedFile,
    pub file_id: FileId,
    pub table: &'a SymbolTable,
}

impl<'a> FileContext<'a> {
    pub fn text(&self, node: &Node) -> &'a str {
        self.file.node_text(node)
    }

    /// Innermost class-like declaration containing `node`.
    pub fn enclosing_class(&self, node: &Node) -> Option<DeclId> {
        self.table.enclosing_class(self.file_id, node.start_byte())
    }

    pub fn resolve_type_name(&self, context: Option<DeclId>, name: &str) -> Option<DeclId> {
        self.table.resolve_type_name(self.file_id, context, name)
    }
}

/// Static type of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprType {
    /// A value of this type.
    Value(ResolvedType),
    /// A class name used as a qualifier (`Foo.BAR`, `Foo.create()`).
    ClassRef(DeclId),
}

impl ExprType {
    /// Class whose members are reachable through this expression.
    pub fn member_scope(&self) -> Option<DeclId> {
        match self {
            ExprType::Value(t) => t.decl,
            ExprType::ClassRef(id) => Some(*id),
        }
    }

    pub fn into_value(self) -> Option<ResolvedType> {
        match self {
            ExprType::Value(t) => Some(t),
            ExprType::ClassRef(_) => None,
        }
    }
}

/// Syntactic pieces of a call expression.
#[derive(Debug, Clone)]
pub struct CallParts<'t> {
    /// Identifier naming the callee
    pub name: Node<'t>,
    pub receiver: Option<Node<'t>>,
    pub args: Vec<Node<'t>>,
    pub type_args: Vec<Node<'t>>,
    /// Argument count, counting a trailing lambda
    pub arity: usize,
}

pub trait DialectResolver: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn call_parts<'t>(&self, ctx: &FileContext, call: Node<'t>) -> Option<CallParts<'t>>;

    /// Declaration the call statically dispatches to.
    fn resolve_callee(&self, ctx: &FileContext, call: Node) -> Option<DeclId>;

    fn type_of(&self, ctx: &FileContext, expr: Node) -> Option<ExprType>;

    /// Resolves a type node (type argument, cast target) to a project class.
    fn resolve_type_node(&self, ctx: &FileContext, type_node: Node) -> Option<ResolvedType>;

    /// The field through which a bus receiver expression is reached.
    fn resolve_bus_receiver(&self, ctx: &FileContext, receiver: Node) -> Option<DeclId>;
}

static JAVA: JavaResolver = JavaResolver;
static KOTLIN: KotlinResolver = KotlinResolver;

pub fn resolver_for(dialect: Dialect) -> &'static dyn DialectResolver {
    match dialect {
        Dialect::Java => &JAVA,
        Dialect::Kotlin => &KOTLIN,
    }
}

/// Picks the candidate whose arity matches, else the first one.
pub fn pick_by_arity(table: &SymbolTable, candidates: &[DeclId], arity: usize) -> Option<DeclId> {
    exact_arity(table, candidates, arity).or_else(|| candidates.first().copied())
}

pub fn exact_arity(table: &SymbolTable, candidates: &[DeclId], arity: usize) -> Option<DeclId> {
    candidates
        .iter()
        .copied()
        .find(|id| table.get(*id).arity() == arity)
}

/// Type of a variable declaration, resolved where it was declared.
pub(crate) fn variable_type(table: &SymbolTable, id: DeclId) -> Option<ExprType> {
    table.declared_type(id).map(ExprType::Value)
}

/// Return type of a callable, resolved where it was declared.
pub(crate) fn return_type(table: &SymbolTable, id: DeclId) -> Option<ExprType> {
    let decl: &Declaration = table.get(id);
    if decl.type_params.iter().any(|p| {
        decl.type_ref
            .as_ref()
            .map(|t| &t.name == p)
            .unwrap_or(false)
    }) {
        return None;
    }
    table.declared_type(id).map(ExprType::Value)
}

/// Members of the enclosing classes, innermost first, then inherited.
pub(crate) fn members_in_scope(
    ctx: &FileContext,
    enclosing: Option<DeclId>,
    name: &str,
    pred: impl Fn(&Declaration) -> bool,
) -> Vec<DeclId> {
    let mut found = Vec::new();
    for class in ctx.table.lexical_chain(enclosing) {
        found.extend(ctx.table.find_member(class, name, &pred));
    }
    found
}
