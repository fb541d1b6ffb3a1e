// Retrieval module
// Turns ranked search hits into a grounded answer

pub mod context;
pub mod prompts;
pub mod query;

pub use context::{DocumentContext, DocumentSummary, assemble_context};
pub use query::{QueryEngine, build_conversation};
