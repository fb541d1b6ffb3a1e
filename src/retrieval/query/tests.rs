use super::*;
use crate::DocuSenseError;
use crate::completion::Role;
use crate::embeddings::Embedder;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

const VOCABULARY: &[&str] = &["apple", "pie", "recipe", "car", "engine", "manual"];

struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(DocuSenseError::Embedding("empty input".to_string()));
        }
        let mut vector = vec![0.0; VOCABULARY.len() + 1];
        vector[VOCABULARY.len()] = 0.5;
        for word in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
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

/// Records every conversation and replies with a fixed answer
#[derive(Default)]
struct RecordingCompletion {
    conversations: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RecordingCompletion {
    fn last_conversation(&self) -> Vec<ChatMessage> {
        self.conversations
            .lock()
            .expect("lock should not be poisoned")
            .last()
            .cloned()
            .expect("a conversation should have been recorded")
    }
}

impl Completion for RecordingCompletion {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.conversations
            .lock()
            .expect("lock should not be poisoned")
            .push(messages.to_vec());
        Ok("recorded answer".to_string())
    }
}

struct FailingCompletion;

impl Completion for FailingCompletion {
    fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(DocuSenseError::Completion("service unavailable".to_string()))
    }
}

async fn create_engine(completion: Arc<dyn Completion>) -> (QueryEngine, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = DocumentStore::open(temp_dir.path().join("vectors"), Arc::new(KeywordEmbedder))
        .await
        .expect("should open store");
    (QueryEngine::new(Arc::new(store), completion), temp_dir)
}

async fn seed(engine: &QueryEngine) {
    for (description, path) in [
        ("apple pie recipe", "/docs/a.txt"),
        ("car engine manual", "/docs/b.pdf"),
        ("apple orchard", "/docs/c.txt"),
    ] {
        engine
            .store()
            .insert("docs", description, "raw", Path::new(path))
            .await
            .expect("insert should succeed");
    }
}

fn top(k: usize) -> NonZeroUsize {
    NonZeroUsize::new(k).expect("k should be positive")
}

#[test]
fn conversation_layout() {
    let context = DocumentContext::default();
    let conversation = build_conversation("what is rust?", &context);

    assert_eq!(conversation.len(), 3);
    assert_eq!(conversation[0], ChatMessage::system(ANSWER_SYSTEM_PROMPT));
    assert_eq!(conversation[1], ChatMessage::user("what is rust?"));
    assert_eq!(conversation[2], ChatMessage::user(RETRIEVAL_PROMPT));
}

#[tokio::test]
async fn retrieve_ranks_matching_documents_first() {
    let completion = Arc::new(RecordingCompletion::default());
    let (engine, _temp_dir) = create_engine(completion).await;
    seed(&engine).await;

    let hits = engine
        .retrieve("docs", "apple", top(2), true)
        .await
        .expect("retrieve should succeed");

    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| hit.metadata.description.contains("apple")));
    assert!(hits[0].distance <= hits[1].distance);
}

#[tokio::test]
async fn query_sends_documents_between_question_and_instructions() {
    let completion = Arc::new(RecordingCompletion::default());
    let (engine, _temp_dir) = create_engine(completion.clone()).await;
    seed(&engine).await;

    let answer = engine
        .query("docs", "car engine", top(1), false)
        .await
        .expect("query should succeed");
    assert_eq!(answer, "recorded answer");

    let conversation = completion.last_conversation();
    assert_eq!(conversation.len(), 4);
    assert_eq!(conversation[0].role, Role::System);
    assert_eq!(conversation[1].text(), "car engine");
    assert_eq!(conversation[2].role, Role::System);
    let frame = conversation[2].text();
    assert!(frame.starts_with("Document 1: Description: car engine manual"));
    assert!(frame.ends_with("Path: /docs/b.pdf"));
    assert_eq!(conversation[3].text(), RETRIEVAL_PROMPT);
}

#[tokio::test]
async fn query_on_new_collection_sends_no_documents() {
    let completion = Arc::new(RecordingCompletion::default());
    let (engine, _temp_dir) = create_engine(completion.clone()).await;

    engine
        .query("new", "anything about apples", top(3), false)
        .await
        .expect("query should succeed");

    let conversation = completion.last_conversation();
    assert_eq!(conversation.len(), 3);
    assert!(
        conversation
            .iter()
            .all(|message| !message.text().starts_with("Document "))
    );
    assert_eq!(
        engine.store().count("new").await.expect("should count"),
        0
    );
}

#[tokio::test]
async fn completion_failure_is_surfaced() {
    let (engine, _temp_dir) = create_engine(Arc::new(FailingCompletion)).await;
    seed(&engine).await;

    let result = engine.query("docs", "apple", top(1), false).await;

    assert!(matches!(result, Err(DocuSenseError::Completion(_))));
}

#[tokio::test]
async fn answer_uses_given_hits_without_searching() {
    let completion = Arc::new(RecordingCompletion::default());
    let (engine, _temp_dir) = create_engine(completion.clone()).await;
    seed(&engine).await;

    let hits = engine
        .retrieve("docs", "apple pie", top(3), false)
        .await
        .expect("retrieve should succeed");
    engine
        .answer("apple pie", &hits[..1])
        .expect("answer should succeed");

    let conversation = completion.last_conversation();
    assert_eq!(conversation.len(), 4);
    assert!(conversation[2].text().contains("Path: /docs/a.txt"));
}
