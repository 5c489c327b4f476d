pub mod extractor;
pub mod parser;
pub mod progress;
pub mod project;
pub mod syntax;
pub mod walker;

pub use extractor::{DeclarationExtractor, ExtractionResult, OBJECT_INSTANCE_FIELD};
pub use parser::{ParsedFile, Parser};
pub use progress::{IndicatifSink, NullSink, ProgressReporter, ProgressSink, TracingSink};
pub use project::Project;
pub use walker::FileWalker;
