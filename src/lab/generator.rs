use super::{RepairGenerator, RepairRequest};
use crate::error::Result;
use crate::llm::client::LlmClient;
use crate::llm::parse::extract_code;
use crate::llm::prompts::build_repair_prompt;
use tracing::debug;

/// Repair generator backed by a chat-completions model.
pub struct LlmRepairGenerator {
    client: LlmClient,
    model: String,
}

impl LlmRepairGenerator {
    pub fn new(client: LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl RepairGenerator for LlmRepairGenerator {
    async fn generate(&self, request: RepairRequest<'_>) -> Result<String> {
        let prompt = build_repair_prompt(&request);
        let response = self
            .client
            .chat(&self.model, &prompt.system, &prompt.user)
            .await?;
        let code = extract_code(&response.content);
        if code.is_empty() {
            debug!(model = %self.model, "reply contained no usable code");
        }
        Ok(code)
    }
}
