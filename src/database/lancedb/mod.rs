// LanceDB vector database module
// Collection lifecycle, sequential document ids and similarity search


pub mod vector_store;

pub use vector_store::{DocumentStore, SearchHit};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One indexed document stored in a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Row count of the collection at insert time
    pub id: u64,
    /// Embedding of the document description
    pub vector: Vec<f32>,
    pub metadata: DocumentMetadata,
}

/// Metadata stored alongside each document embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File extension of the source path, without the dot
    #[serde(rename = "type")]
    pub file_type: String,
    /// Generated description of the document
    pub description: String,
    /// Raw extracted text
    pub content: String,
    /// Source file path
    pub path: String,
}

impl DocumentMetadata {
    #[inline]
    pub fn new(description: &str, content: &str, path: &Path) -> Self {
        Self {
            file_type: file_type_of(path),
            description: description.to_string(),
            content: content.to_string(),
            path: path.to_string_lossy().into_owned(),
        }
    }
}

/// Text after the last `.` in the path's file name, or an empty string
///
/// Dotfiles such as `.env` yield the text after their leading dot.
#[inline]
pub fn file_type_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_string()))
        .unwrap_or_default()
}
