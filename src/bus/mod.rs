//! Event bus correlation: contract detection, call-site identity and the
//! (bus, event) index built from them.

pub mod builder;
pub mod calls;
pub mod contract;
pub mod identity;
pub mod model;
pub mod query;
pub mod scanner;

pub use builder::IndexBuilder;
pub use calls::{extract_calls, extract_calls_matching, CallExpression};
pub use contract::{Contract, ContractDetector};
pub use identity::{canonicalize, resolve_bus_identity, resolve_event_type, ClassLiteralPattern};
pub use model::{
    BusEntry, BusTarget, CallSite, CorrelationIndex, EventOrder, EventSource, EventTarget,
    LineMarker, Role, SortedGroup,
};
pub use query::PointQuery;
pub use scanner::{classify_call, scan_file};
