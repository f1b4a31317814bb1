use thiserror::Error;

/// Errors surfaced by the repair harness.
///
/// Configuration problems (`InvalidDatasetKind`, `InvalidFeedbackKind`,
/// `InvalidConfig`) are raised before any generation work starts. The rest
/// are raised while processing a single candidate and are isolated by the
/// engine at candidate granularity.
#[derive(Error, Debug)]
pub enum RepairError {
    /// The dataset family name is not registered.
    #[error("invalid dataset: {0} (expected one of: {1})")]
    InvalidDatasetKind(String, String),

    /// The feedback kind name is not one of the four supported sources.
    #[error("invalid feedback kind: {0} (expected one of: test_feedback, compiler_feedback, human_feedback, simple_feedback)")]
    InvalidFeedbackKind(String),

    /// A run setting is out of range or a command template is unusable.
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// A dataset record lacks a field its family requires.
    #[error("record is missing required field '{0}'")]
    MissingField(String),

    /// The model endpoint failed (transport, HTTP status, or response shape).
    #[error("llm request failed: {0}")]
    Llm(String),

    /// The oracle could not be executed at all (not a failing test).
    #[error("verification could not run: {0}")]
    Verification(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RepairError>;
