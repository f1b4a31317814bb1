//! Where each run reads its input and writes its results.

use crate::feedback::FeedbackKind;
use crate::llm::prompts::PromptShape;
use std::path::{Path, PathBuf};

/// Subdirectory for single-round runs with non-default prompt flags.
pub const PROMPT_ABLATION_DIR: &str = "rq4-prompt";

/// `<dataset_dir>/<Dataset>/<Dataset>_feedback.jsonl`
pub fn input_path(dataset_dir: &Path, dataset: &str) -> PathBuf {
    dataset_dir
        .join(dataset)
        .join(format!("{}_feedback.jsonl", dataset))
}

/// Identity of one evaluation run, which fixes its output location.
#[derive(Debug, Clone)]
pub struct OutputLayout<'a> {
    pub results_dir: &'a Path,
    pub model: &'a str,
    pub dataset: &'a str,
    pub version: &'a str,
    pub feedback: FeedbackKind,
}

impl OutputLayout<'_> {
    /// Single-round results. Non-default prompt flags move the file under
    /// the ablation directory with all six flags in its name.
    pub fn single(&self, shape: &PromptShape) -> PathBuf {
        if shape.is_default() {
            self.results_dir
                .join(self.model)
                .join(self.dataset)
                .join("single")
                .join(format!("{}_{}.jsonl", self.version, self.feedback))
        } else {
            self.results_dir.join(PROMPT_ABLATION_DIR).join(format!(
                "{}_{}_{}.jsonl",
                self.version,
                self.feedback,
                shape.suffix()
            ))
        }
    }

    pub fn multi(&self) -> PathBuf {
        self.results_dir
            .join(self.model)
            .join(self.dataset)
            .join(format!("{}_multi_round_{}.jsonl", self.version, self.feedback))
    }
}

/// Run report written beside a results file: `x.jsonl` -> `x.report.json`.
pub fn report_path(results: &Path) -> PathBuf {
    results.with_extension("report.json")
}
