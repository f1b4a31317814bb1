use super::runner::{run_command, CommandSpec, TemplateVars};
use super::{Verdict, Verifier};
use crate::dataset::{DatasetFamily, Question};
use crate::error::{RepairError, Result};
use crate::util::tail_chars;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

pub const SOLUTION_FILE: &str = "solution.py";
pub const TEST_FILE: &str = "test_solution.py";

const DIAGNOSTIC_MAX_CHARS: usize = 4_000;

/// Runs candidates against the family's oracle command in a throwaway directory.
pub struct SandboxVerifier {
    family: &'static dyn DatasetFamily,
    oracle: Vec<String>,
    timeout: Duration,
}

impl SandboxVerifier {
    pub fn new(family: &'static dyn DatasetFamily, oracle: &[String], timeout: Duration) -> Self {
        Self {
            family,
            oracle: oracle.to_vec(),
            timeout,
        }
    }
}

impl Verifier for SandboxVerifier {
    async fn verify(&self, question: &Question, code: &str) -> Result<Verdict> {
        let workspace = Workspace::create(code)?;
        let test = match &question.test {
            Some(test) => Some(workspace.write_test(&render_test_module(question, test, code)?)?),
            None => None,
        };
        let vars = TemplateVars {
            workdir: workspace.path().to_path_buf(),
            solution: workspace.solution_path(),
            test,
            id: question.key.clone(),
        };
        let name = format!("{} oracle", self.family.name());
        let spec = CommandSpec::from_template(name, &self.oracle, &vars)?.timeout(self.timeout);

        let outcome = tokio::task::spawn_blocking(move || run_command(&spec))
            .await
            .map_err(|e| RepairError::Verification(format!("oracle task failed: {}", e)))??;
        drop(workspace);

        let diagnostic = if outcome.timed_out {
            format!(
                "Timed out after {}s\n{}",
                self.timeout.as_secs(),
                outcome.output
            )
        } else {
            outcome.output
        };
        Ok(Verdict::new(
            outcome.exit_code,
            tail_chars(&diagnostic, DIAGNOSTIC_MAX_CHARS),
        ))
    }
}

/// Temporary directory holding one candidate as `solution.py`.
pub(crate) struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub(crate) fn create(code: &str) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("repair-lab-").tempdir()?;
        fs::write(dir.path().join(SOLUTION_FILE), code)?;
        Ok(Self { dir })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn solution_path(&self) -> PathBuf {
        self.dir.path().join(SOLUTION_FILE)
    }

    fn write_test(&self, content: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(TEST_FILE);
        fs::write(&path, content)?;
        Ok(path)
    }
}

fn top_level_def() -> &'static Regex {
    static DEF: OnceLock<Regex> = OnceLock::new();
    DEF.get_or_init(|| {
        Regex::new(r"(?m)^def\s+([A-Za-z_]\w*)\s*\(")
            .unwrap_or_else(|e| panic!("invalid def regex: {e}"))
    })
}

/// Wrap a HumanEval-style `check(candidate)` block into a pytest module.
fn render_test_module(question: &Question, test: &str, code: &str) -> Result<String> {
    let entry_point = question
        .entry_point
        .clone()
        .filter(|e| !e.trim().is_empty())
        .or_else(|| {
            top_level_def()
                .captures_iter(code)
                .last()
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
        .ok_or_else(|| {
            RepairError::Verification(format!(
                "cannot determine entry point for '{}'",
                question.key
            ))
        })?;

    Ok(format!(
        "from solution import *\n\n{}\n\ndef test_check():\n    check({})\n",
        test.trim_end(),
        entry_point.trim()
    ))
}
