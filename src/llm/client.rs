use super::models::{Usage, UsageMeter, UsageTotals};
use crate::config::Config;
use crate::error::{RepairError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Rate limit retry configuration
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;
const BACKOFF_MULTIPLIER: u64 = 2;

/// Response from the model including content and usage stats
#[derive(Debug)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client shared by the repair generator
/// and the model critic.
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_tokens: u32,
    meter: Arc<UsageMeter>,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            RepairError::InvalidConfig(format!(
                "No API key configured. Set REPAIR_LAB_API_KEY or add api_key to {}",
                Config::config_location()
            ))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RepairError::Llm(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url()),
            api_key,
            max_tokens: config.max_tokens(),
            meter: Arc::new(UsageMeter::default()),
        })
    }

    pub fn usage(&self) -> UsageTotals {
        self.meter.totals()
    }

    /// Single system+user exchange, with retry and exponential backoff on 429.
    pub async fn chat(&self, model: &str, system: &str, user: &str) -> Result<LlmResponse> {
        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: user,
        });
        let request = ChatRequest {
            model,
            messages,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let mut retry_count = 0;
        loop {
            let response = self
                .http
                .post(&self.endpoint)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
                .send()
                .await
                .map_err(|e| RepairError::Llm(describe_transport_error(&e)))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| RepairError::Llm(e.to_string()))?;

            if status.is_success() {
                let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
                    RepairError::Llm(format!(
                        "Failed to parse completion response: {}\n{}",
                        e,
                        truncate_str(&text, 200)
                    ))
                })?;
                self.meter.record(parsed.usage.as_ref());

                let content = parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .unwrap_or_default();
                debug!(model, chars = content.len(), "completion received");

                return Ok(LlmResponse {
                    content,
                    usage: parsed.usage,
                });
            }

            if status.as_u16() == 429 && retry_count < MAX_RETRIES {
                retry_count += 1;
                let retry_after = parse_retry_after(&text).unwrap_or_else(|| {
                    (INITIAL_BACKOFF_MS * BACKOFF_MULTIPLIER.pow(retry_count - 1)) / 1000
                });
                warn!(
                    model,
                    "rate limited; retrying in {}s (attempt {}/{})",
                    retry_after,
                    retry_count,
                    MAX_RETRIES
                );
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                continue;
            }

            let message = match status.as_u16() {
                401 => "Invalid API key.".to_string(),
                429 => format!("Rate limited after {} retries.", retry_count),
                500..=599 => format!(
                    "Server error ({}). The service may be temporarily unavailable.",
                    status
                ),
                _ => format!("API error {}: {}", status, truncate_str(&text, 200)),
            };
            return Err(RepairError::Llm(message));
        }
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("could not connect: {}", err)
    } else {
        err.to_string()
    }
}

/// Extract a retry-after hint such as "retry after 7 seconds" from an error body.
fn parse_retry_after(text: &str) -> Option<u64> {
    let text_lower = text.to_lowercase();
    let pos = text_lower.find("retry")?;
    text_lower[pos..]
        .split_whitespace()
        .skip(1)
        .take(5)
        .find_map(|word| {
            word.trim_matches(|c: char| !c.is_numeric())
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0 && *secs < 300)
        })
}

/// Truncate a string for display (Unicode-safe)
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
