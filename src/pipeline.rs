//! File-level runs: read a dataset or results file, drive the core over every
//! question, write the results back out.

use crate::dataset::jsonl::{read_jsonl, write_jsonl};
use crate::dataset::{DatasetFamily, Question};
use crate::feedback::FeedbackKind;
use crate::lab::{Critic, RepairGenerator, Verifier};
use crate::llm::prompts::PromptShape;
use crate::repair::{
    run_repair_loop, single_round_repair, Capabilities, CandidateState, RepairSettings,
};
use crate::score::{
    cumulative_pass_rate, records_from_rows, score_single_rows, CumulativeReport, SingleScore,
    FIXED_RESULTS_FIELD, REPAIR_RESULTS_FIELD,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SingleRepairSummary {
    pub questions: usize,
    pub candidates: usize,
    pub empty_fixes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MultiRepairSummary {
    pub questions: usize,
    pub candidates: usize,
    pub passed: usize,
    pub empty_retired: usize,
    pub budget_exhausted: usize,
    pub dropped: usize,
    /// Deepest round any candidate reached.
    pub deepest_round: u32,
}

fn load_questions(family: &dyn DatasetFamily, input: &Path) -> Result<Vec<Question>> {
    read_jsonl(input)?
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            family.parse_question(row).with_context(|| {
                format!(
                    "Invalid {} record #{} in '{}'",
                    family.name(),
                    idx + 1,
                    input.display()
                )
            })
        })
        .collect()
}

pub async fn run_single_repair<G: RepairGenerator>(
    family: &dyn DatasetFamily,
    input: &Path,
    output: &Path,
    feedback: FeedbackKind,
    shape: &PromptShape,
    generator: &G,
    concurrency: usize,
) -> Result<SingleRepairSummary> {
    let questions = load_questions(family, input)?;
    info!(questions = questions.len(), input = %input.display(), "single-round repair");

    let mut summary = SingleRepairSummary::default();
    let mut rows = Vec::with_capacity(questions.len());
    for question in &questions {
        let results =
            single_round_repair(question, feedback, shape, generator, concurrency).await;
        summary.questions += 1;
        summary.candidates += results.len();
        summary.empty_fixes += results.iter().filter(|r| r.fixed_code.is_empty()).count();
        rows.push(family.result_row(
            question,
            FIXED_RESULTS_FIELD,
            serde_json::to_value(&results)?,
        ));
    }

    write_jsonl(output, &rows)?;
    Ok(summary)
}

pub async fn run_multi_repair<G, V, C>(
    family: &dyn DatasetFamily,
    input: &Path,
    output: &Path,
    settings: &RepairSettings,
    caps: &Capabilities<'_, G, V, C>,
) -> Result<MultiRepairSummary>
where
    G: RepairGenerator,
    V: Verifier,
    C: Critic,
{
    settings.validate()?;
    let questions = load_questions(family, input)?;
    info!(
        questions = questions.len(),
        max_rounds = settings.max_rounds,
        feedback = %settings.feedback,
        "multi-round repair"
    );

    let mut summary = MultiRepairSummary::default();
    let mut rows = Vec::with_capacity(questions.len());
    for question in &questions {
        let report = run_repair_loop(question, settings, caps).await;
        summary.questions += 1;
        summary.candidates += report.records.len();
        summary.passed += report.count(CandidateState::PassedRetired);
        summary.empty_retired += report.count(CandidateState::EmptyRetired);
        summary.budget_exhausted += report.count(CandidateState::BudgetExhausted);
        summary.dropped += report.count(CandidateState::Dropped);
        summary.deepest_round = report
            .records
            .iter()
            .map(|record| record.last_round())
            .fold(summary.deepest_round, u32::max);
        rows.push(family.result_row(
            question,
            REPAIR_RESULTS_FIELD,
            serde_json::to_value(&report.records)?,
        ));
    }

    write_jsonl(output, &rows)?;
    Ok(summary)
}

/// Re-verify every stored fix and rewrite the file with the flags filled in.
pub async fn run_single_score<V: Verifier>(
    family: &dyn DatasetFamily,
    path: &Path,
    verifier: &V,
) -> Result<SingleScore> {
    let mut rows = read_jsonl(path)?;
    let score = score_single_rows(family, &mut rows, verifier)
        .await
        .with_context(|| format!("Failed to score '{}'", path.display()))?;
    write_jsonl(path, &rows)?;
    Ok(score)
}

pub fn run_multi_score(path: &Path, max_rounds: u32) -> Result<CumulativeReport> {
    let rows = read_jsonl(path)?;
    let records = records_from_rows(&rows)
        .with_context(|| format!("Invalid multi-round results in '{}'", path.display()))?;
    Ok(cumulative_pass_rate(&records, max_rounds)?)
}
