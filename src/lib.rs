pub mod bus;
pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod languages;
pub mod resolve;

pub use bus::{
    BusTarget, CallSite, ContractDetector, CorrelationIndex, EventOrder, EventTarget, IndexBuilder,
    LineMarker, PointQuery, Role,
};
pub use config::BusConfig;
pub use error::{BusError, Result};
pub use index::{Declaration, DeclId, DeclKind, FileId, SymbolTable, SyntaxAnchor};
pub use indexer::{FileWalker, Parser, ProgressReporter, Project};
pub use languages::{Dialect, LanguageRegistry};
