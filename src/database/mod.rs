// Database module
// LanceDB-backed document store, one table per collection

pub mod lancedb;

pub use self::lancedb::{DocumentMetadata, DocumentRecord, DocumentStore, SearchHit};
