use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocuSenseError>;

#[derive(Error, Debug)]
pub enum DocuSenseError {
    #[error("Unsupported file format '{extension}' for {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Extraction error for {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Storage error on collection '{collection}' during {operation}: {message}")]
    Storage {
        collection: String,
        operation: &'static str,
        message: String,
    },

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl DocuSenseError {
    #[inline]
    pub fn storage(
        collection: &str,
        operation: &'static str,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Storage {
            collection: collection.to_string(),
            operation,
            message: message.to_string(),
        }
    }
}

pub mod commands;
pub mod completion;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod http;
pub mod ingest;
pub mod retrieval;
