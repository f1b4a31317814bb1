//! In-memory capabilities for engine and scorer tests.

use super::{Critic, RepairGenerator, RepairRequest, Verdict, Verifier};
use crate::dataset::Question;
use crate::error::{RepairError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Verifier answering from a fixed sequence, or from a code → verdict table.
#[derive(Default)]
pub struct ScriptedVerifier {
    sequence: Mutex<VecDeque<Verdict>>,
    by_code: HashMap<String, Verdict>,
    faulty: HashSet<String>,
    checked: Mutex<Vec<String>>,
}

impl ScriptedVerifier {
    pub fn new(sequence: Vec<Verdict>) -> Self {
        Self {
            sequence: Mutex::new(sequence.into()),
            ..Self::default()
        }
    }

    /// Codes not in the table fail with status 1.
    pub fn by_code(table: &[(&str, Verdict)]) -> Self {
        Self {
            by_code: table
                .iter()
                .map(|(code, verdict)| (code.to_string(), verdict.clone()))
                .collect(),
            ..Self::default()
        }
    }

    /// Verifying `code` raises an error instead of returning a verdict.
    pub fn faulty_on(mut self, code: &str) -> Self {
        self.faulty.insert(code.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.checked.lock().unwrap().len()
    }

    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }
}

impl Verifier for ScriptedVerifier {
    async fn verify(&self, _question: &Question, code: &str) -> Result<Verdict> {
        self.checked.lock().unwrap().push(code.to_string());
        if self.faulty.contains(code) {
            return Err(RepairError::Verification(format!("oracle crashed on {code}")));
        }
        if let Some(verdict) = self.sequence.lock().unwrap().pop_front() {
            return Ok(verdict);
        }
        Ok(self
            .by_code
            .get(code)
            .cloned()
            .unwrap_or_else(|| Verdict::new(1, format!("AssertionError in {code}"))))
    }
}

/// Critic returning canned text and counting calls per source.
pub struct ScriptedCritic {
    static_text: String,
    critique_text: String,
    static_calls: AtomicUsize,
    critique_calls: AtomicUsize,
}

impl ScriptedCritic {
    pub fn new(static_text: &str, critique_text: &str) -> Self {
        Self {
            static_text: static_text.to_string(),
            critique_text: critique_text.to_string(),
            static_calls: AtomicUsize::new(0),
            critique_calls: AtomicUsize::new(0),
        }
    }

    pub fn static_calls(&self) -> usize {
        self.static_calls.load(Ordering::SeqCst)
    }

    pub fn critique_calls(&self) -> usize {
        self.critique_calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedCritic {
    fn default() -> Self {
        Self::new("lint output", "model critique")
    }
}

impl Critic for ScriptedCritic {
    async fn static_analyze(&self, _code: &str) -> Result<String> {
        self.static_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.static_text.clone())
    }

    async fn critique(&self, _question: &Question, _code: &str) -> Result<String> {
        self.critique_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.critique_text.clone())
    }
}

/// What the generator was asked, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub code: String,
    pub feedback: Option<String>,
}

/// Generator mapping input code to a scripted fix.
#[derive(Default)]
pub struct ScriptedGenerator {
    fixes: HashMap<String, String>,
    faulty: HashSet<String>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedGenerator {
    /// Inputs not in the table produce an empty generation.
    pub fn new(fixes: &[(&str, &str)]) -> Self {
        Self {
            fixes: fixes
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn faulty_on(mut self, code: &str) -> Self {
        self.faulty.insert(code.to_string());
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl RepairGenerator for ScriptedGenerator {
    async fn generate(&self, request: RepairRequest<'_>) -> Result<String> {
        self.seen.lock().unwrap().push(SeenRequest {
            code: request.code.to_string(),
            feedback: request.feedback.map(str::to_string),
        });
        if self.faulty.contains(request.code) {
            return Err(RepairError::Llm("connection reset".to_string()));
        }
        Ok(self.fixes.get(request.code).cloned().unwrap_or_default())
    }
}
