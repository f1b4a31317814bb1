use super::history::{CandidateRecord, RepairEntry};
use crate::dataset::Question;
use crate::error::{RepairError, Result};
use crate::feedback::{compute_feedback, FeedbackKind};
use crate::lab::{Critic, RepairGenerator, RepairRequest, Verdict, Verifier};
use crate::llm::prompts::PromptShape;
use crate::util::truncate;
use futures::future::join_all;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ROUNDS: u32 = 3;
const FAULT_MESSAGE_MAX_CHARS: usize = 300;

#[derive(Debug, Clone)]
pub struct RepairSettings {
    pub max_rounds: u32,
    /// Candidates processed at once within a round.
    pub concurrency: usize,
    pub feedback: FeedbackKind,
    pub shape: PromptShape,
}

impl RepairSettings {
    pub fn new(feedback: FeedbackKind) -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            concurrency: 1,
            feedback,
            shape: PromptShape::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(RepairError::InvalidConfig(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(RepairError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The capabilities one repair loop drives.
pub struct Capabilities<'a, G, V, C> {
    pub generator: &'a G,
    pub verifier: &'a V,
    pub critic: &'a C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    Active,
    PassedRetired,
    EmptyRetired,
    BudgetExhausted,
    /// A fault interrupted processing; no further rounds.
    Dropped,
}

impl CandidateState {
    pub fn is_terminal(self) -> bool {
        self != CandidateState::Active
    }
}

/// Engine-local view of a candidate. `current_code` is never persisted.
#[derive(Debug)]
struct WorkingCandidate {
    record: CandidateRecord,
    current_code: String,
    state: CandidateState,
}

impl WorkingCandidate {
    fn seed_feedback(&self) -> Option<&str> {
        self.record
            .repair_history
            .first()
            .and_then(|entry| entry.feedback.as_deref())
    }
}

/// What one candidate produced in one round.
#[derive(Debug)]
enum StepOutcome {
    Empty {
        feedback: Option<String>,
    },
    Verified {
        code: String,
        feedback: Option<String>,
        verdict: Verdict,
    },
}

/// Final state of each candidate, alongside the persisted records.
#[derive(Debug, Default)]
pub struct LoopReport {
    pub records: Vec<CandidateRecord>,
    pub states: Vec<CandidateState>,
}

impl LoopReport {
    pub fn count(&self, state: CandidateState) -> usize {
        self.states.iter().filter(|s| **s == state).count()
    }
}

/// Drive every failing seed of `question` through up to `max_rounds`
/// generate-then-verify rounds.
pub async fn run_repair_loop<G, V, C>(
    question: &Question,
    settings: &RepairSettings,
    caps: &Capabilities<'_, G, V, C>,
) -> LoopReport
where
    G: RepairGenerator,
    V: Verifier,
    C: Critic,
{
    let mut candidates: Vec<WorkingCandidate> = question
        .false_results
        .iter()
        .enumerate()
        .map(|(id, seed)| WorkingCandidate {
            record: CandidateRecord {
                id,
                source: seed.source.clone(),
                repair_history: vec![RepairEntry::seed(
                    &seed.generate_code,
                    seed.feedback(settings.feedback),
                )],
            },
            current_code: seed.generate_code.clone(),
            state: CandidateState::Active,
        })
        .collect();

    for round in 1..=settings.max_rounds {
        let active: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.state == CandidateState::Active)
            .map(|(idx, _)| idx)
            .collect();
        if active.is_empty() {
            break;
        }
        debug!(question = %question.key, round, active = active.len(), "starting round");

        // Outcomes are applied only once the whole round has run.
        let mut outcomes: Vec<(usize, Result<StepOutcome>)> = Vec::with_capacity(active.len());
        for group in active.chunks(settings.concurrency.max(1)) {
            let futures: Vec<_> = group
                .iter()
                .map(|&idx| {
                    let candidate = &candidates[idx];
                    async move { (idx, step(question, candidate, round, settings, caps).await) }
                })
                .collect();
            outcomes.extend(join_all(futures).await);
        }

        for (idx, outcome) in outcomes {
            let candidate = &mut candidates[idx];
            match outcome {
                Ok(StepOutcome::Empty { feedback }) => {
                    candidate.record.repair_history.push(RepairEntry {
                        round,
                        generate_code: String::new(),
                        feedback,
                        is_true: false,
                    });
                    candidate.state = CandidateState::EmptyRetired;
                }
                Ok(StepOutcome::Verified {
                    code,
                    feedback,
                    verdict,
                }) => {
                    let passed = verdict.passed();
                    candidate.record.repair_history.push(RepairEntry {
                        round,
                        generate_code: code.clone(),
                        feedback,
                        is_true: passed,
                    });
                    candidate.current_code = code;
                    if passed {
                        candidate.state = CandidateState::PassedRetired;
                    }
                }
                Err(err) => {
                    warn!(
                        question = %question.key,
                        candidate = candidate.record.id,
                        round,
                        "candidate dropped: {}",
                        truncate(&err.to_string(), FAULT_MESSAGE_MAX_CHARS)
                    );
                    candidate.state = CandidateState::Dropped;
                }
            }
        }
    }

    for candidate in &mut candidates {
        if candidate.state == CandidateState::Active {
            candidate.state = CandidateState::BudgetExhausted;
        }
    }

    let report = LoopReport {
        states: candidates.iter().map(|c| c.state).collect(),
        records: candidates.into_iter().map(|c| c.record).collect(),
    };
    info!(
        question = %question.key,
        candidates = report.records.len(),
        passed = report.count(CandidateState::PassedRetired),
        empty = report.count(CandidateState::EmptyRetired),
        dropped = report.count(CandidateState::Dropped),
        "repair loop finished"
    );
    report
}

async fn step<G, V, C>(
    question: &Question,
    candidate: &WorkingCandidate,
    round: u32,
    settings: &RepairSettings,
    caps: &Capabilities<'_, G, V, C>,
) -> Result<StepOutcome>
where
    G: RepairGenerator,
    V: Verifier,
    C: Critic,
{
    let feedback = if round == 1 {
        candidate.seed_feedback().map(str::to_string)
    } else {
        Some(
            compute_feedback(
                settings.feedback,
                caps.verifier,
                caps.critic,
                question,
                &candidate.current_code,
            )
            .await?,
        )
    };

    let request = RepairRequest::for_question(
        question,
        &candidate.current_code,
        feedback.as_deref(),
        &settings.shape,
    );
    let fixed = caps.generator.generate(request).await?;
    if fixed.trim().is_empty() {
        return Ok(StepOutcome::Empty { feedback });
    }

    let verdict = caps.verifier.verify(question, &fixed).await?;
    Ok(StepOutcome::Verified {
        code: fixed,
        feedback,
        verdict,
    })
}
