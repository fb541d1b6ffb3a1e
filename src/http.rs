// Shared blocking HTTP plumbing for the Ollama and chat completion clients

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

#[inline]
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Run `request_fn`, retrying server errors and transport failures with exponential backoff.
///
/// Client errors (4xx) fail immediately.
#[inline]
pub fn request_with_retry<F>(target: &str, retry_attempts: u32, mut request_fn: F) -> Result<String>
where
    F: FnMut() -> Result<String, ureq::Error>,
{
    let mut last_error = None;

    for attempt in 1..=retry_attempts {
        debug!("HTTP request attempt {}/{}", attempt, retry_attempts);

        match request_fn() {
            Ok(response_text) => {
                debug!("Request succeeded on attempt {}", attempt);
                return Ok(response_text);
            }
            Err(error) => {
                let should_retry = match &error {
                    ureq::Error::StatusCode(status) => {
                        if *status >= 500 {
                            warn!(
                                "Server error (status {}), attempt {}/{}",
                                status, attempt, retry_attempts
                            );
                            true
                        } else {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                        }
                    }
                    ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_) => {
                        warn!(
                            "Transport error: {}, attempt {}/{}",
                            error, attempt, retry_attempts
                        );
                        true
                    }
                    _ => {
                        warn!("Non-retryable error: {}", error);
                        false
                    }
                };

                if !should_retry {
                    return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                }

                last_error = Some(anyhow::anyhow!("Request error: {}", error));

                if attempt < retry_attempts {
                    let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                    let delay = Duration::from_millis(delay_ms);
                    debug!("Waiting {:?} before retry", delay);
                    std::thread::sleep(delay);
                }
            }
        }
    }

    error!("All retry attempts failed for request to {}", target);

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
}
