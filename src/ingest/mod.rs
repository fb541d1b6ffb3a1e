// Ingest module
// File → description → embedded record


pub mod describer;
pub mod extractor;
pub mod ocr;

pub use describer::{CompletionDescriber, Describer, Description};
pub use extractor::{ExtractedContent, FileKind};
pub use ocr::{OcrsRecognizer, TextRecognition};

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::Result;
use crate::database::{DocumentRecord, DocumentStore};

/// Outcome of a multi-file ingestion
#[derive(Debug, Default)]
pub struct IngestReport {
    pub added: Vec<DocumentRecord>,
    pub failed: Vec<(PathBuf, String)>,
}

impl IngestReport {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Ingestor {
    store: Arc<DocumentStore>,
    describer: Arc<dyn Describer>,
}

impl Ingestor {
    #[inline]
    pub fn new(store: Arc<DocumentStore>, describer: Arc<dyn Describer>) -> Self {
        Self { store, describer }
    }

    /// Describe one file and store it; nothing is written if description fails
    #[inline]
    pub async fn add_document(&self, collection: &str, path: &Path) -> Result<DocumentRecord> {
        let description = self.describer.describe(path).await?;

        let record = self
            .store
            .insert(
                collection,
                &description.description,
                &description.raw_content,
                path,
            )
            .await?;

        info!(
            "Added {} to '{}' as document {}",
            path.display(),
            collection,
            record.id
        );
        Ok(record)
    }

    /// Ingest files one after another, recording failures instead of stopping
    ///
    /// Directories contribute their immediate regular files in name order.
    #[inline]
    pub async fn add_documents(&self, collection: &str, paths: &[PathBuf]) -> Result<IngestReport> {
        let files = expand_paths(paths)?;
        debug!("Ingesting {} files into '{}'", files.len(), collection);

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(files.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut report = IngestReport::default();
        for file in files {
            bar.set_message(file.display().to_string());
            match self.add_document(collection, &file).await {
                Ok(record) => report.added.push(record),
                Err(e) => {
                    warn!("Failed to add {}: {}", file.display(), e);
                    report.failed.push((file, e.to_string()));
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        info!(
            "Ingested {} of {} files into '{}'",
            report.added.len(),
            report.added.len() + report.failed.len(),
            collection
        );
        Ok(report)
    }
}

fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries = Vec::new();
            for entry in std::fs::read_dir(path)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    entries.push(entry.path());
                }
            }
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}
