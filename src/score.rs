//! Pass-rate statistics over persisted repair results.
//!
//! Scoring never calls a model. The single-round scorer re-runs the oracle
//! on stored fixes; the multi-round statistic is pure arithmetic over the
//! stored histories.

use crate::dataset::{DatasetFamily, Question};
use crate::error::{RepairError, Result};
use crate::lab::Verifier;
use crate::repair::{CandidateRecord, FixedResult};
use serde_json::Value;
use tracing::warn;

pub const FIXED_RESULTS_FIELD: &str = "fixed_results";
pub const REPAIR_RESULTS_FIELD: &str = "repair_results";

/// `passed / attempted` over non-empty fixes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleScore {
    pub attempted: usize,
    pub passed: usize,
    /// Empty fixes; excluded from the denominator.
    pub skipped: usize,
}

impl SingleScore {
    /// Percentage in `0.0..=100.0`; zero when nothing was attempted.
    pub fn percent(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.passed as f64 / self.attempted as f64 * 100.0
    }

    fn merge(&mut self, other: SingleScore) {
        self.attempted += other.attempted;
        self.passed += other.passed;
        self.skipped += other.skipped;
    }
}

/// Verify every non-empty fix, setting `isTrue` and, on failure, `test_feedback`.
pub async fn score_fixed_results<V: Verifier>(
    question: &Question,
    results: &mut [FixedResult],
    verifier: &V,
) -> SingleScore {
    let mut score = SingleScore::default();
    for (idx, result) in results.iter_mut().enumerate() {
        if result.fixed_code.is_empty() {
            score.skipped += 1;
            continue;
        }
        score.attempted += 1;
        let (passed, diagnostic) = match verifier.verify(question, &result.fixed_code).await {
            Ok(verdict) => (verdict.passed(), verdict.diagnostic),
            Err(err) => {
                warn!(question = %question.key, candidate = idx, "verification failed: {}", err);
                (false, err.to_string())
            }
        };
        result.is_true = Some(passed);
        result.test_feedback = if passed { None } else { Some(diagnostic) };
        if passed {
            score.passed += 1;
        }
    }
    score
}

/// Score every row of a single-round results file in place.
pub async fn score_single_rows<V: Verifier>(
    family: &dyn DatasetFamily,
    rows: &mut [Value],
    verifier: &V,
) -> Result<SingleScore> {
    let mut total = SingleScore::default();
    for row in rows.iter_mut() {
        let question = family.parse_question(row)?;
        let mut results: Vec<FixedResult> = match row.get(FIXED_RESULTS_FIELD) {
            Some(value) => serde_json::from_value(value.clone())?,
            None => return Err(RepairError::MissingField(FIXED_RESULTS_FIELD.to_string())),
        };
        total.merge(score_fixed_results(&question, &mut results, verifier).await);
        if let Some(obj) = row.as_object_mut() {
            obj.insert(
                FIXED_RESULTS_FIELD.to_string(),
                serde_json::to_value(&results)?,
            );
        }
    }
    Ok(total)
}

/// Cumulative pass rate reached by a given round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundRate {
    pub round: u32,
    /// Eligible candidates that passed at or before this round.
    pub passed: usize,
    /// Fraction in `0.0..=1.0`.
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CumulativeReport {
    /// Candidates with no empty-code entry; the denominator.
    pub eligible: usize,
    /// Candidates dropped by the completeness filter.
    pub excluded: usize,
    pub rounds: Vec<RoundRate>,
}

/// Round-wise cumulative pass rate over complete candidates.
///
/// Passes are counted in an array indexed by round, sized by the deepest
/// stored round. A history deeper than `max_rounds` is rejected.
pub fn cumulative_pass_rate(
    records: &[CandidateRecord],
    max_rounds: u32,
) -> Result<CumulativeReport> {
    if max_rounds == 0 {
        return Err(RepairError::InvalidConfig(
            "max_rounds must be at least 1".to_string(),
        ));
    }
    let mut deepest = 0;
    for record in records {
        for entry in &record.repair_history {
            if entry.round > max_rounds {
                return Err(RepairError::InvalidConfig(format!(
                    "candidate {} has round {} but max_rounds is {}; score with a max_rounds of at least {}",
                    record.id, entry.round, max_rounds, entry.round
                )));
            }
            deepest = deepest.max(entry.round);
        }
    }

    let slots = deepest as usize + 1;
    let mut passes = vec![0usize; slots];
    let mut present = vec![false; slots];
    let mut report = CumulativeReport::default();

    for record in records {
        for entry in &record.repair_history {
            present[entry.round as usize] = true;
        }

        if !record.is_complete() {
            report.excluded += 1;
            continue;
        }
        report.eligible += 1;
        for entry in record.repair_history.iter().filter(|e| e.is_true) {
            passes[entry.round as usize] += 1;
        }
    }

    let mut cumulative = 0;
    for (round, count) in passes.iter().enumerate() {
        if !present[round] {
            continue;
        }
        cumulative += count;
        let rate = if report.eligible == 0 {
            0.0
        } else {
            cumulative as f64 / report.eligible as f64
        };
        report.rounds.push(RoundRate {
            round: round as u32,
            passed: cumulative,
            rate,
        });
    }
    Ok(report)
}

/// Candidate records from the rows of a multi-round results file.
pub fn records_from_rows(rows: &[Value]) -> Result<Vec<CandidateRecord>> {
    let mut records = Vec::new();
    for row in rows {
        let results = row
            .get(REPAIR_RESULTS_FIELD)
            .ok_or_else(|| RepairError::MissingField(REPAIR_RESULTS_FIELD.to_string()))?;
        let parsed: Vec<CandidateRecord> = serde_json::from_value(results.clone())?;
        records.extend(parsed);
    }
    Ok(records)
}
