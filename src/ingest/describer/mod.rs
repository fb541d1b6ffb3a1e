
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::Result;
use crate::completion::{ChatMessage, Completion, ContentPart, ImageUrl};
use crate::ingest::extractor::{self, ExtractedContent};
use crate::ingest::ocr::TextRecognition;
use crate::retrieval::prompts::DESCRIPTION_PROMPT;

/// Searchable summary of a file plus the text it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub description: String,
    pub raw_content: String,
}

/// Produces the description that gets embedded for a file
#[async_trait]
pub trait Describer: Send + Sync {
    /// Fails with `UnsupportedFormat` for unrecognised extensions
    async fn describe(&self, path: &Path) -> Result<Description>;
}

/// Describes files by asking a completion model about their extracted content
pub struct CompletionDescriber {
    completion: Arc<dyn Completion>,
    ocr: Option<Arc<dyn TextRecognition>>,
}

impl CompletionDescriber {
    #[inline]
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self {
            completion,
            ocr: None,
        }
    }

    /// Read text from images before describing them
    #[inline]
    #[must_use]
    pub fn with_ocr(mut self, ocr: Arc<dyn TextRecognition>) -> Self {
        self.ocr = Some(ocr);
        self
    }
}

#[async_trait]
impl Describer for CompletionDescriber {
    async fn describe(&self, path: &Path) -> Result<Description> {
        let extracted = extractor::extract(path, self.ocr.clone()).await?;
        let messages = description_request(&extracted);

        let description = self.completion.complete(&messages)?;
        debug!(
            "Described {} ({} chars)",
            path.display(),
            description.len()
        );

        let raw_content = if extracted.image.is_some() {
            String::new()
        } else {
            extracted.text
        };

        Ok(Description {
            description,
            raw_content,
        })
    }
}

/// Generation prompt followed by the file's content, as text or as an image part
///
/// Images send their extracted text (file name and any recognised text)
/// after the picture.
#[inline]
pub fn description_request(extracted: &ExtractedContent) -> Vec<ChatMessage> {
    let content = match &extracted.image {
        Some(url) => ChatMessage::user_parts(vec![
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: url.clone() },
            },
            ContentPart::Text {
                text: extracted.text.clone(),
            },
        ]),
        None => ChatMessage::user(extracted.text.as_str()),
    };

    vec![ChatMessage::system(DESCRIPTION_PROMPT), content]
}
