use serde::{Deserialize, Serialize};

/// One round of a candidate's repair history. Round 0 is the original
/// failing code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairEntry {
    pub round: u32,
    pub generate_code: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(rename = "isTrue")]
    pub is_true: bool,
}

impl RepairEntry {
    pub fn seed(code: &str, feedback: Option<String>) -> Self {
        Self {
            round: 0,
            generate_code: code.to_string(),
            feedback,
            is_true: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.generate_code.is_empty()
    }
}

/// Persisted view of a candidate. Engine-only state never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: usize,
    #[serde(default)]
    pub source: String,
    pub repair_history: Vec<RepairEntry>,
}

impl CandidateRecord {
    /// True when no round ever produced empty code.
    pub fn is_complete(&self) -> bool {
        self.repair_history.iter().all(|entry| !entry.is_empty())
    }

    pub fn last_round(&self) -> u32 {
        self.repair_history.last().map(|e| e.round).unwrap_or(0)
    }
}
