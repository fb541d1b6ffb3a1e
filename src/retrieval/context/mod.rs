#[cfg(test)]
mod tests;

use itertools::Itertools;
use std::fmt;

use crate::completion::ChatMessage;
use crate::database::SearchHit;

/// Numbered summaries of retrieved documents, in rank order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentContext {
    documents: Vec<DocumentSummary>,
}

/// One retrieved document as presented to the answering model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    /// 1-based position in the ranking
    pub rank: usize,
    pub description: String,
    pub content: String,
    pub path: String,
}

impl DocumentSummary {
    #[inline]
    pub fn render(&self) -> String {
        format!(
            "Description: {}\nContent: {}\nPath: {}",
            self.description, self.content, self.path
        )
    }

    #[inline]
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::system(format!("Document {}: {}", self.rank, self.render()))
    }
}

impl DocumentContext {
    #[inline]
    pub fn documents(&self) -> &[DocumentSummary] {
        &self.documents
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// One system frame per document, rank 1 first
    #[inline]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.documents
            .iter()
            .map(DocumentSummary::to_message)
            .collect()
    }
}

impl fmt::Display for DocumentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .documents
            .iter()
            .map(|document| format!("Document {}: {}", document.rank, document.render()))
            .join("\n\n");
        f.write_str(&rendered)
    }
}

/// Build the numbered document list from hits, preserving their order
#[inline]
pub fn assemble_context(hits: &[SearchHit]) -> DocumentContext {
    let documents = hits
        .iter()
        .enumerate()
        .map(|(index, hit)| DocumentSummary {
            rank: index + 1,
            description: hit.metadata.description.clone(),
            content: hit.metadata.content.clone(),
            path: hit.metadata.path.clone(),
        })
        .collect();

    DocumentContext { documents }
}
