// Shared test doubles for integration tests
#![allow(dead_code)]

use docusense::completion::{ChatMessage, Completion, Role};
use docusense::database::DocumentStore;
use docusense::embeddings::Embedder;
use docusense::{DocuSenseError, Result};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const VOCABULARY: &[&str] = &[
    "apple", "pie", "recipe", "car", "engine", "manual", "orchard", "invoice", "total",
];

/// Counts vocabulary words into fixed slots, with a constant bias in the last slot
pub struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(DocuSenseError::Embedding("empty input".to_string()));
        }

        let mut vector = vec![0.0; self.dimension()];
        vector[VOCABULARY.len()] = 0.5;
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            if let Some(slot) = VOCABULARY.iter().position(|known| *known == word) {
                vector[slot] += 1.0;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len() + 1
    }
}

/// Answers like a well-behaved model: cites the first document frame or says nothing is relevant
#[derive(Default)]
pub struct ScriptedCompletion {
    pub conversations: Mutex<Vec<Vec<ChatMessage>>>,
}

pub const NO_RELEVANT_DOCUMENT: &str = "There is no relevant document for this question.";

impl ScriptedCompletion {
    pub fn calls(&self) -> usize {
        self.conversations
            .lock()
            .expect("lock should not be poisoned")
            .len()
    }
}

impl Completion for ScriptedCompletion {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.conversations
            .lock()
            .expect("lock should not be poisoned")
            .push(messages.to_vec());

        let first_document = messages
            .iter()
            .filter(|message| message.role == Role::System)
            .map(ChatMessage::text)
            .find(|text| text.starts_with("Document 1: "));

        Ok(match first_document {
            Some(frame) => {
                let path = frame
                    .lines()
                    .find_map(|line| line.strip_prefix("Path: "))
                    .unwrap_or_default()
                    .to_string();
                format!("Answer from the documents.\nPath: {}", path)
            }
            None => NO_RELEVANT_DOCUMENT.to_string(),
        })
    }
}

pub async fn create_store() -> (Arc<DocumentStore>, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = DocumentStore::open(temp_dir.path().join("vectors"), Arc::new(KeywordEmbedder))
        .await
        .expect("should open document store");
    (Arc::new(store), temp_dir)
}

pub fn top(k: usize) -> NonZeroUsize {
    NonZeroUsize::new(k).expect("k should be positive")
}

pub fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}
