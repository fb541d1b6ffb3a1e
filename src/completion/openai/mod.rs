
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::DocuSenseError;
use crate::completion::{ChatMessage, Completion};
use crate::config::CompletionConfig;
use crate::http::{DEFAULT_RETRY_ATTEMPTS, build_agent, request_with_retry};

/// Client for an OpenAI-compatible `chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: Url,
    model: String,
    max_tokens: u32,
    api_key: Option<String>,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatClient {
    /// Build a client from config, reading the API key from the configured environment variable
    #[inline]
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            warn!(
                "{} is not set, completion requests will be sent without authorization",
                config.api_key_env
            );
        }

        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key(config: &CompletionConfig, api_key: Option<String>) -> Result<Self> {
        let base_url = config
            .completion_url()
            .context("Failed to generate completion URL from config")?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key,
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the conversation and return the first choice's text
    #[inline]
    pub fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            "Requesting completion from {} with {} messages",
            self.model,
            messages.len()
        );

        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
        };

        let url = self
            .base_url
            .join("chat/completions")
            .context("Failed to build completion URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize completion request")?;

        let authorization = self.api_key.as_ref().map(|key| format!("Bearer {}", key));

        let response_text = request_with_retry(self.base_url.as_str(), self.retry_attempts, || {
            let mut request = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json");
            if let Some(authorization) = &authorization {
                request = request.header("Authorization", authorization);
            }
            request
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to request completion")?;

        let response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse completion response")?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Completion response contained no message content"))?;

        debug!("Received completion of {} characters", reply.len());
        Ok(reply)
    }
}

impl Completion for ChatClient {
    #[inline]
    fn complete(&self, messages: &[ChatMessage]) -> crate::Result<String> {
        self.chat(messages)
            .map_err(|e| DocuSenseError::Completion(format!("{:#}", e)))
    }
}
