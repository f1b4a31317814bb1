//! Capabilities the repair engine drives, and their concrete implementations.
//!
//! The engine only sees the three traits below. `SandboxVerifier`,
//! `ToolCritic` and `LlmRepairGenerator` are the production implementations;
//! tests use the scripted fakes.

pub mod critic;
#[cfg(test)]
pub mod fakes;
pub mod generator;
pub mod runner;
pub mod verifier;

use crate::dataset::Question;
use crate::error::Result;
use crate::llm::prompts::PromptShape;

pub use critic::ToolCritic;
pub use generator::LlmRepairGenerator;
pub use verifier::SandboxVerifier;

/// Exit status meaning the oracle ran and passed.
pub const STATUS_PASSED: i32 = 0;
/// pytest's "no tests collected"; counted as a pass.
pub const STATUS_NO_TESTS: i32 = 5;

/// Result of running a candidate against its oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: i32,
    pub diagnostic: String,
}

impl Verdict {
    pub fn new(status: i32, diagnostic: impl Into<String>) -> Self {
        Self {
            status,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.status, STATUS_PASSED | STATUS_NO_TESTS)
    }
}

/// Everything the generator sees for one repair attempt.
#[derive(Debug, Clone, Copy)]
pub struct RepairRequest<'a> {
    pub code: &'a str,
    pub feedback: Option<&'a str>,
    pub docstring: Option<&'a str>,
    pub context: Option<&'a str>,
    pub shape: &'a PromptShape,
}

impl<'a> RepairRequest<'a> {
    pub fn for_question(
        question: &'a Question,
        code: &'a str,
        feedback: Option<&'a str>,
        shape: &'a PromptShape,
    ) -> Self {
        Self {
            code,
            feedback,
            docstring: question.docstring.as_deref(),
            context: question.context.as_deref(),
            shape,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait Verifier {
    /// Run `code` against the question's oracle. `Err` means the oracle could
    /// not be run at all, not that the code failed.
    async fn verify(&self, question: &Question, code: &str) -> Result<Verdict>;
}

#[allow(async_fn_in_trait)]
pub trait Critic {
    /// Static-analysis diagnostics for `code`.
    async fn static_analyze(&self, code: &str) -> Result<String>;

    /// A secondary model's explanation of what is wrong with `code`.
    async fn critique(&self, question: &Question, code: &str) -> Result<String>;
}

#[allow(async_fn_in_trait)]
pub trait RepairGenerator {
    /// One revised candidate. An empty string is a generation failure, not an error.
    async fn generate(&self, request: RepairRequest<'_>) -> Result<String>;
}
