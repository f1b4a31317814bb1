use super::runner::{run_command, CommandSpec, TemplateVars};
use super::verifier::Workspace;
use super::Critic;
use crate::dataset::{DatasetFamily, Question};
use crate::error::{RepairError, Result};
use crate::llm::client::LlmClient;
use crate::llm::prompts::build_critique_prompt;
use std::time::Duration;
use tracing::debug;

const CLEAN_LINT_MESSAGE: &str = "No static analysis issues found.";

/// Linter for static analysis, plus an optional reviewer model for critiques.
pub struct ToolCritic {
    family: &'static dyn DatasetFamily,
    linter: Vec<String>,
    timeout: Duration,
    reviewer: Option<Reviewer>,
}

struct Reviewer {
    client: LlmClient,
    model: String,
}

impl ToolCritic {
    pub fn new(family: &'static dyn DatasetFamily, linter: &[String], timeout: Duration) -> Self {
        Self {
            family,
            linter: linter.to_vec(),
            timeout,
            reviewer: None,
        }
    }

    pub fn with_reviewer(mut self, client: LlmClient, model: impl Into<String>) -> Self {
        self.reviewer = Some(Reviewer {
            client,
            model: model.into(),
        });
        self
    }
}

impl Critic for ToolCritic {
    async fn static_analyze(&self, code: &str) -> Result<String> {
        let workspace = Workspace::create(code)?;
        let vars = TemplateVars {
            workdir: workspace.path().to_path_buf(),
            solution: workspace.solution_path(),
            test: None,
            id: String::new(),
        };
        let spec = CommandSpec::from_template("linter", &self.linter, &vars)?
            .cwd(workspace.path())
            .timeout(self.timeout);

        let outcome = tokio::task::spawn_blocking(move || run_command(&spec))
            .await
            .map_err(|e| RepairError::Verification(format!("linter task failed: {}", e)))??;
        drop(workspace);

        let report = outcome.output.trim();
        if report.is_empty() {
            Ok(CLEAN_LINT_MESSAGE.to_string())
        } else {
            Ok(report.to_string())
        }
    }

    async fn critique(&self, question: &Question, code: &str) -> Result<String> {
        let reviewer = self.reviewer.as_ref().ok_or_else(|| {
            RepairError::InvalidConfig("human_feedback needs a reviewer model".to_string())
        })?;
        let prompt = build_critique_prompt(
            self.family.name(),
            code,
            question.docstring.as_deref(),
            question.context.as_deref(),
        );
        let response = reviewer
            .client
            .chat(&reviewer.model, &prompt.system, &prompt.user)
            .await?;
        debug!(question = %question.key, model = %reviewer.model, "critique received");
        Ok(response.content.trim().to_string())
    }
}
