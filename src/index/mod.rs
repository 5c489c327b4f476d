pub mod models;
pub mod symbols;

pub use models::*;
pub use symbols::{ResolvedType, SymbolTable};
