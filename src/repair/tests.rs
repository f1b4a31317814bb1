use super::*;
use crate::dataset::{FailingResult, Question};
use crate::feedback::{FeedbackKind, GENERIC_FEEDBACK};
use crate::lab::fakes::{ScriptedCritic, ScriptedGenerator, ScriptedVerifier, SeenRequest};
use crate::lab::Verdict;
use crate::llm::prompts::PromptShape;
use serde_json::{Map, Value};

fn seed(code: &str, kind: FeedbackKind, feedback: Option<&str>) -> FailingResult {
    let mut fields = Map::new();
    if let Some(text) = feedback {
        fields.insert(kind.as_str().to_string(), Value::String(text.to_string()));
    }
    FailingResult {
        source: "gpt-3.5".to_string(),
        generate_code: code.to_string(),
        fields,
    }
}

fn question(seeds: Vec<FailingResult>) -> Question {
    Question {
        key: "HumanEval/7".to_string(),
        docstring: Some("Filter strings.".to_string()),
        false_results: seeds,
        ..Question::default()
    }
}

fn settings(max_rounds: u32, feedback: FeedbackKind) -> RepairSettings {
    RepairSettings {
        max_rounds,
        ..RepairSettings::new(feedback)
    }
}

fn flags(record: &CandidateRecord) -> Vec<bool> {
    record.repair_history.iter().map(|e| e.is_true).collect()
}

fn rounds(record: &CandidateRecord) -> Vec<u32> {
    record.repair_history.iter().map(|e| e.round).collect()
}

#[tokio::test]
async fn fails_twice_then_passes_in_final_round() {
    let question = question(vec![seed("c0", FeedbackKind::Simple, Some(GENERIC_FEEDBACK))]);
    let generator = ScriptedGenerator::new(&[("c0", "c1"), ("c1", "c2")]);
    let verifier = ScriptedVerifier::by_code(&[("c2", Verdict::new(0, ""))]);
    let critic = ScriptedCritic::default();
    let caps = Capabilities {
        generator: &generator,
        verifier: &verifier,
        critic: &critic,
    };

    let report = run_repair_loop(&question, &settings(2, FeedbackKind::Simple), &caps).await;

    let record = &report.records[0];
    assert_eq!(record.repair_history.len(), 3);
    assert_eq!(flags(record), vec![false, false, true]);
    assert_eq!(record.repair_history[2].generate_code, "c2");
    assert_eq!(report.states, vec![CandidateState::PassedRetired]);
}

#[tokio::test]
async fn empty_generation_retires_without_verification() {
    let question = question(vec![seed("c0", FeedbackKind::Test, Some("assert failed"))]);
    let generator = ScriptedGenerator::new(&[]);
    let verifier = ScriptedVerifier::default();
    let critic = ScriptedCritic::default();
    let caps = Capabilities {
        generator: &generator,
        verifier: &verifier,
        critic: &critic,
    };

    let report = run_repair_loop(&question, &settings(3, FeedbackKind::Test), &caps).await;

    let record = &report.records[0];
    assert_eq!(record.repair_history.len(), 2);
    assert_eq!(record.repair_history[1].generate_code, "");
    assert!(!record.repair_history[1].is_true);
    assert_eq!(
        record.repair_history[1].feedback.as_deref(),
        Some("assert failed")
    );
    assert_eq!(report.states, vec![CandidateState::EmptyRetired]);
    assert_eq!(generator.seen().len(), 1);
    assert_eq!(verifier.calls(), 0);
}

#[tokio::test]
async fn status_five_is_treated_as_a_pass() {
    let question = question(vec![seed("c0", FeedbackKind::Test, Some("boom"))]);
    let generator = ScriptedGenerator::new(&[("c0", "c1")]);
    let verifier = ScriptedVerifier::by_code(&[("c1", Verdict::new(5, "no tests ran"))]);
    let critic = ScriptedCritic::default();
    let caps = Capabilities {
        generator: &generator,
        verifier: &verifier,
        critic: &critic,
    };

    let report = run_repair_loop(&question, &settings(3, FeedbackKind::Test), &caps).await;

    assert_eq!(flags(&report.records[0]), vec![false, true]);
    assert_eq!(report.states, vec![CandidateState::PassedRetired]);
    assert_eq!(generator.seen().len(), 1);
}

#[tokio::test]
async fn histories_are_gap_free_and_stop_after_terminal_entries() {
    let question = question(vec![
        seed("a0", FeedbackKind::Simple, None),
        seed("b0", FeedbackKind::Simple, None),
        seed("c0", FeedbackKind::Simple, None),
        seed("d0", FeedbackKind::Simple, None),
    ]);
    // a: passes round 2; b: empty at round 2; c: never passes; d: passes round 1
    let generator = ScriptedGenerator::new(&[
        ("a0", "a1"),
        ("a1", "a2"),
        ("b0", "b1"),
        ("c0", "c1"),
        ("c1", "c2"),
        ("c2", "c3"),
        ("d0", "d1"),
    ]);
    let verifier = ScriptedVerifier::by_code(&[
        ("a2", Verdict::new(0, "")),
        ("d1", Verdict::new(0, "")),
    ]);
    let critic = ScriptedCritic::default();
    let caps = Capabilities {
        generator: &generator,
        verifier: &verifier,
        critic: &critic,
    };

    let report = run_repair_loop(&question, &settings(3, FeedbackKind::Simple), &caps).await;

    assert_eq!(rounds(&report.records[0]), vec![0, 1, 2]);
    assert_eq!(rounds(&report.records[1]), vec![0, 1, 2]);
    assert_eq!(rounds(&report.records[2]), vec![0, 1, 2, 3]);
    assert_eq!(rounds(&report.records[3]), vec![0, 1]);
    assert_eq!(
        report.states,
        vec![
            CandidateState::PassedRetired,
            CandidateState::EmptyRetired,
            CandidateState::BudgetExhausted,
            CandidateState::PassedRetired,
        ]
    );
    assert!(report.states.iter().all(|s| s.is_terminal()));

    for record in &report.records {
        let stop = record
            .repair_history
            .iter()
            .position(|e| e.is_true || e.generate_code.is_empty());
        if let Some(pos) = stop {
            assert_eq!(pos, record.repair_history.len() - 1);
        }
    }
}

#[tokio::test]
async fn faulted_candidate_is_dropped_and_siblings_continue() {
    let question = question(vec![
        seed("a0", FeedbackKind::Simple, None),
        seed("b0", FeedbackKind::Simple, None),
        seed("c0", FeedbackKind::Simple, None),
    ]);
    let generator =
        ScriptedGenerator::new(&[("b0", "b1"), ("c0", "c1"), ("c1", "c2")]).faulty_on("a0");
    let verifier = ScriptedVerifier::by_code(&[("b1", Verdict::new(0, ""))]).faulty_on("c2");
    let critic = ScriptedCritic::default();
    let caps = Capabilities {
        generator: &generator,
        verifier: &verifier,
        critic: &critic,
    };
    let settings = RepairSettings {
        concurrency: 3,
        ..settings(3, FeedbackKind::Simple)
    };

    let report = run_repair_loop(&question, &settings, &caps).await;

    assert_eq!(rounds(&report.records[0]), vec![0]);
    assert_eq!(flags(&report.records[1]), vec![false, true]);
    assert_eq!(rounds(&report.records[2]), vec![0, 1]);
    assert_eq!(
        report.states,
        vec![
            CandidateState::Dropped,
            CandidateState::PassedRetired,
            CandidateState::Dropped,
        ]
    );
    let ids: Vec<usize> = report.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[tokio::test]
async fn round_one_reuses_seed_feedback_and_later_rounds_recompute_lazily() {
    let question = question(vec![seed(
        "c0",
        FeedbackKind::Compiler,
        Some("E0602: undefined variable"),
    )]);
    let generator = ScriptedGenerator::new(&[("c0", "c1"), ("c1", "c2"), ("c2", "c3")]);
    let verifier = ScriptedVerifier::default();
    let critic = ScriptedCritic::new("W0612: unused variable", "unused");
    let caps = Capabilities {
        generator: &generator,
        verifier: &verifier,
        critic: &critic,
    };

    let report = run_repair_loop(&question, &settings(3, FeedbackKind::Compiler), &caps).await;

    let feedback: Vec<Option<&str>> = report.records[0]
        .repair_history
        .iter()
        .map(|e| e.feedback.as_deref())
        .collect();
    assert_eq!(
        feedback,
        vec![
            Some("E0602: undefined variable"),
            Some("E0602: undefined variable"),
            Some("W0612: unused variable"),
            Some("W0612: unused variable"),
        ]
    );
    assert_eq!(critic.static_calls(), 2);
    assert_eq!(critic.critique_calls(), 0);
    // only the three verifications; the oracle is never used for feedback here
    assert_eq!(verifier.checked(), vec!["c1", "c2", "c3"]);
    assert_eq!(report.states, vec![CandidateState::BudgetExhausted]);
}

#[tokio::test]
async fn each_round_repairs_the_previous_fix() {
    let question = question(vec![seed("c0", FeedbackKind::Test, Some("seed diagnostic"))]);
    let generator = ScriptedGenerator::new(&[("c0", "c1"), ("c1", "c2")]);
    let verifier = ScriptedVerifier::default();
    let critic = ScriptedCritic::default();
    let caps = Capabilities {
        generator: &generator,
        verifier: &verifier,
        critic: &critic,
    };

    run_repair_loop(&question, &settings(2, FeedbackKind::Test), &caps).await;

    assert_eq!(
        generator.seen(),
        vec![
            SeenRequest {
                code: "c0".to_string(),
                feedback: Some("seed diagnostic".to_string()),
            },
            SeenRequest {
                code: "c1".to_string(),
                feedback: Some("AssertionError in c1".to_string()),
            },
        ]
    );
    // verify c1, recompute feedback on c1, verify c2
    assert_eq!(verifier.checked(), vec!["c1", "c1", "c2"]);
}

#[tokio::test]
async fn question_without_seeds_yields_nothing() {
    let question = question(Vec::new());
    let generator = ScriptedGenerator::default();
    let verifier = ScriptedVerifier::default();
    let critic = ScriptedCritic::default();
    let caps = Capabilities {
        generator: &generator,
        verifier: &verifier,
        critic: &critic,
    };

    let report = run_repair_loop(&question, &settings(3, FeedbackKind::Human), &caps).await;

    assert!(report.records.is_empty());
    assert!(generator.seen().is_empty());
}

#[test]
fn settings_validation() {
    assert!(settings(1, FeedbackKind::Test).validate().is_ok());
    assert!(settings(0, FeedbackKind::Test).validate().is_err());
    let zero_concurrency = RepairSettings {
        concurrency: 0,
        ..RepairSettings::new(FeedbackKind::Test)
    };
    assert!(zero_concurrency.validate().is_err());
}

#[tokio::test]
async fn single_round_uses_attached_feedback_and_records_failures_as_empty() {
    let question = question(vec![
        seed("a0", FeedbackKind::Human, Some("off by one")),
        seed("b0", FeedbackKind::Human, None),
        seed("c0", FeedbackKind::Human, None),
    ]);
    let generator = ScriptedGenerator::new(&[("a0", "a1")]).faulty_on("b0");

    let results = single_round_repair(
        &question,
        FeedbackKind::Human,
        &PromptShape::default(),
        &generator,
        2,
    )
    .await;

    let fixed: Vec<&str> = results.iter().map(|r| r.fixed_code.as_str()).collect();
    assert_eq!(fixed, vec!["a1", "", ""]);
    assert_eq!(results[0].false_code, "a0");
    assert_eq!(results[0].source, "gpt-3.5");
    assert_eq!(generator.seen()[0].feedback.as_deref(), Some("off by one"));
    assert!(results.iter().all(|r| r.is_true.is_none()));
}
