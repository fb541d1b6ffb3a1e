#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::Result;
use crate::completion::{ChatMessage, Completion};
use crate::database::{DocumentStore, SearchHit};
use crate::retrieval::context::{DocumentContext, assemble_context};
use crate::retrieval::prompts::{ANSWER_SYSTEM_PROMPT, RETRIEVAL_PROMPT};

/// Answers questions from the documents of one collection
pub struct QueryEngine {
    store: Arc<DocumentStore>,
    completion: Arc<dyn Completion>,
}

impl QueryEngine {
    #[inline]
    pub fn new(store: Arc<DocumentStore>, completion: Arc<dyn Completion>) -> Self {
        Self { store, completion }
    }

    #[inline]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Search the collection; with `verbose` every ranked hit is logged
    #[inline]
    pub async fn retrieve(
        &self,
        collection: &str,
        user_query: &str,
        top_k: NonZeroUsize,
        verbose: bool,
    ) -> Result<Vec<SearchHit>> {
        let hits = self.store.search(collection, user_query, top_k).await?;

        if verbose {
            info!("Retrieved {} documents from '{}'", hits.len(), collection);
            for (rank, hit) in hits.iter().enumerate() {
                info!(
                    rank = rank + 1,
                    id = hit.id,
                    similarity = hit.similarity_score,
                    distance = hit.distance,
                    path = %hit.metadata.path,
                    "{}",
                    hit.metadata.description
                );
            }
        }

        Ok(hits)
    }

    /// Ask the completion model to answer `user_query` from already retrieved hits
    #[inline]
    pub fn answer(&self, user_query: &str, hits: &[SearchHit]) -> Result<String> {
        let context = assemble_context(hits);
        let conversation = build_conversation(user_query, &context);

        debug!(
            "Requesting answer with {} documents ({} messages)",
            context.len(),
            conversation.len()
        );

        self.completion.complete(&conversation)
    }

    /// Retrieve the `top_k` most similar documents and answer from them
    #[inline]
    pub async fn query(
        &self,
        collection: &str,
        user_query: &str,
        top_k: NonZeroUsize,
        verbose: bool,
    ) -> Result<String> {
        let hits = self
            .retrieve(collection, user_query, top_k, verbose)
            .await?;
        self.answer(user_query, &hits)
    }
}

/// System frame, the user's query, one frame per document, then the answering instructions
#[inline]
pub fn build_conversation(user_query: &str, context: &DocumentContext) -> Vec<ChatMessage> {
    let mut conversation = Vec::with_capacity(context.len() + 3);
    conversation.push(ChatMessage::system(ANSWER_SYSTEM_PROMPT));
    conversation.push(ChatMessage::user(user_query));
    conversation.extend(context.to_messages());
    conversation.push(ChatMessage::user(RETRIEVAL_PROMPT));
    conversation
}
