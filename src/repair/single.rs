use crate::dataset::Question;
use crate::feedback::FeedbackKind;
use crate::lab::{RepairGenerator, RepairRequest};
use crate::llm::prompts::PromptShape;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// One single-round repair. `isTrue` and `test_feedback` are filled in by
/// the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedResult {
    #[serde(default)]
    pub source: String,
    pub false_code: String,
    #[serde(default)]
    pub fixed_code: String,
    #[serde(rename = "isTrue", default, skip_serializing_if = "Option::is_none")]
    pub is_true: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_feedback: Option<String>,
    /// Anything else a scorer or later tool attached.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FixedResult {
    pub fn new(source: &str, false_code: &str, fixed_code: String) -> Self {
        Self {
            source: source.to_string(),
            false_code: false_code.to_string(),
            fixed_code,
            is_true: None,
            test_feedback: None,
            extra: Map::new(),
        }
    }
}

/// One repair per failing seed, using the feedback already attached to it.
/// Generator errors are logged and recorded as an empty fix.
pub async fn single_round_repair<G: RepairGenerator>(
    question: &Question,
    feedback: FeedbackKind,
    shape: &PromptShape,
    generator: &G,
    concurrency: usize,
) -> Vec<FixedResult> {
    let seeds: Vec<_> = question.false_results.iter().enumerate().collect();
    let mut results = Vec::with_capacity(seeds.len());
    for group in seeds.chunks(concurrency.max(1)) {
        let futures: Vec<_> = group
            .iter()
            .map(|&(idx, seed)| async move {
                let seed_feedback = seed.feedback(feedback);
                let request = RepairRequest::for_question(
                    question,
                    &seed.generate_code,
                    seed_feedback.as_deref(),
                    shape,
                );
                let fixed = match generator.generate(request).await {
                    Ok(code) if code.trim().is_empty() => String::new(),
                    Ok(code) => code,
                    Err(err) => {
                        warn!(
                            question = %question.key,
                            candidate = idx,
                            "generation failed: {}",
                            err
                        );
                        String::new()
                    }
                };
                FixedResult::new(&seed.source, &seed.generate_code, fixed)
            })
            .collect();
        results.extend(join_all(futures).await);
    }
    results
}
