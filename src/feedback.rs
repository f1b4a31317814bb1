use crate::dataset::Question;
use crate::error::{RepairError, Result};
use crate::lab::{Critic, Verifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder feedback for the generic-prompt baseline.
pub const GENERIC_FEEDBACK: &str = "The code is wrong. Please fix it.";

/// Which diagnostic source seeds a repair prompt.
///
/// The string forms double as the field names under which each failing
/// result carries its pre-computed round-0 feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackKind {
    /// Test runner output.
    #[serde(rename = "test_feedback")]
    Test,
    /// Static-analysis (linter) output.
    #[serde(rename = "compiler_feedback")]
    Compiler,
    /// A secondary model's critique.
    #[serde(rename = "human_feedback")]
    Human,
    /// Constant "the code is wrong" message.
    #[serde(rename = "simple_feedback")]
    Simple,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 4] = [
        FeedbackKind::Test,
        FeedbackKind::Compiler,
        FeedbackKind::Human,
        FeedbackKind::Simple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Test => "test_feedback",
            FeedbackKind::Compiler => "compiler_feedback",
            FeedbackKind::Human => "human_feedback",
            FeedbackKind::Simple => "simple_feedback",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = RepairError;

    fn from_str(s: &str) -> Result<Self> {
        FeedbackKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| RepairError::InvalidFeedbackKind(s.to_string()))
    }
}

/// Compute fresh feedback for `code`. Only the source selected by `kind`
/// is invoked; the others are never touched.
pub async fn compute_feedback<V, C>(
    kind: FeedbackKind,
    verifier: &V,
    critic: &C,
    question: &Question,
    code: &str,
) -> Result<String>
where
    V: Verifier,
    C: Critic,
{
    match kind {
        FeedbackKind::Test => Ok(verifier.verify(question, code).await?.diagnostic),
        FeedbackKind::Compiler => critic.static_analyze(code).await,
        FeedbackKind::Human => critic.critique(question, code).await,
        FeedbackKind::Simple => Ok(GENERIC_FEEDBACK.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::fakes::{ScriptedCritic, ScriptedVerifier};
    use crate::lab::Verdict;

    #[test]
    fn parses_known_kinds() {
        for kind in FeedbackKind::ALL {
            assert_eq!(kind.as_str().parse::<FeedbackKind>().unwrap(), kind);
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = "lint_feedback".parse::<FeedbackKind>().unwrap_err();
        assert!(matches!(err, RepairError::InvalidFeedbackKind(ref s) if s == "lint_feedback"));
    }

    #[test]
    fn serde_uses_field_names() {
        let json = serde_json::to_string(&FeedbackKind::Human).unwrap();
        assert_eq!(json, "\"human_feedback\"");
    }

    #[tokio::test]
    async fn only_selected_source_is_invoked() {
        let verifier = ScriptedVerifier::new(vec![Verdict::new(1, "assert 1 == 2")]);
        let critic = ScriptedCritic::new("unused import", "off by one");
        let question = Question::default();

        let text = compute_feedback(FeedbackKind::Compiler, &verifier, &critic, &question, "x")
            .await
            .unwrap();
        assert_eq!(text, "unused import");
        assert_eq!(verifier.calls(), 0);
        assert_eq!(critic.critique_calls(), 0);

        let text = compute_feedback(FeedbackKind::Test, &verifier, &critic, &question, "x")
            .await
            .unwrap();
        assert_eq!(text, "assert 1 == 2");
        assert_eq!(verifier.calls(), 1);
        assert_eq!(critic.static_calls(), 1);

        let text = compute_feedback(FeedbackKind::Simple, &verifier, &critic, &question, "x")
            .await
            .unwrap();
        assert_eq!(text, GENERIC_FEEDBACK);
        assert_eq!(verifier.calls(), 1);
        assert_eq!(critic.critique_calls(), 0);
    }
}
