//! Benchmark questions and the dataset families they come from.
//!
//! A family decides which field identifies a question and which auxiliary
//! fields travel with it into the result files. Everything else about a
//! question (oracle, docstring, context, failing seeds) is read the same way
//! for every family, so adding a family means adding one registry entry.

pub mod jsonl;

use crate::error::{RepairError, Result};
use crate::feedback::FeedbackKind;
use serde_json::{Map, Value};

/// Shape of a benchmark family's records.
pub trait DatasetFamily: Send + Sync {
    /// Canonical name, used in paths (`dataset/<name>/<name>_feedback.jsonl`).
    fn name(&self) -> &'static str;

    /// Field holding the question identifier.
    fn id_field(&self) -> &'static str;

    /// Fields copied verbatim from the input record into every output record.
    fn passthrough_fields(&self) -> &'static [&'static str];

    /// Passthrough fields that may be absent, as in files written before
    /// they were carried.
    fn optional_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Field holding inline test code, if the family ships tests with the record.
    fn test_field(&self) -> Option<&'static str> {
        None
    }

    fn docstring_field(&self) -> Option<&'static str> {
        None
    }

    fn context_field(&self) -> Option<&'static str> {
        None
    }

    /// Parse one input row. Result rows parse too: they keep the id and
    /// passthrough fields, and simply have no `false_results`.
    fn parse_question(&self, row: &Value) -> Result<Question> {
        let obj = row
            .as_object()
            .ok_or_else(|| RepairError::MissingField(self.id_field().to_string()))?;

        let key = obj
            .get(self.id_field())
            .and_then(value_as_text)
            .ok_or_else(|| RepairError::MissingField(self.id_field().to_string()))?;

        let text_field = |field: Option<&'static str>| {
            field.and_then(|f| obj.get(f)).and_then(value_as_text)
        };

        let false_results = match obj.get("false_results") {
            Some(Value::Array(items)) => items
                .iter()
                .map(FailingResult::from_value)
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        let mut passthrough = Map::new();
        for field in self.passthrough_fields() {
            match obj.get(*field) {
                Some(value) => {
                    passthrough.insert((*field).to_string(), value.clone());
                }
                None if self.id_field() == *field || self.optional_fields().contains(field) => {}
                None => {
                    return Err(RepairError::MissingField((*field).to_string()));
                }
            }
        }

        Ok(Question {
            key,
            test: text_field(self.test_field()),
            entry_point: obj.get("entry_point").and_then(value_as_text),
            docstring: text_field(self.docstring_field()),
            context: text_field(self.context_field()),
            false_results,
            passthrough,
        })
    }

    /// Build an output row: id field, the results under `results_field`,
    /// then the passthrough fields.
    fn result_row(&self, question: &Question, results_field: &str, results: Value) -> Value {
        let mut row = Map::new();
        row.insert(self.id_field().to_string(), Value::String(question.key.clone()));
        row.insert(results_field.to_string(), results);
        for (field, value) in &question.passthrough {
            row.entry(field.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(row)
    }
}

/// HumanEval-style records: `task_id` plus inline `test` code checked
/// against `entry_point`.
pub struct HumanEval;

impl DatasetFamily for HumanEval {
    fn name(&self) -> &'static str {
        "HumanEval"
    }

    fn id_field(&self) -> &'static str {
        "task_id"
    }

    fn passthrough_fields(&self) -> &'static [&'static str] {
        &["test", "entry_point"]
    }

    fn optional_fields(&self) -> &'static [&'static str] {
        &["entry_point"]
    }

    fn test_field(&self) -> Option<&'static str> {
        Some("test")
    }
}

/// CoderEval-style records: `_id` keyed, tests live in the project runner.
pub struct CoderEval;

impl DatasetFamily for CoderEval {
    fn name(&self) -> &'static str {
        "CoderEval"
    }

    fn id_field(&self) -> &'static str {
        "_id"
    }

    fn passthrough_fields(&self) -> &'static [&'static str] {
        &["level", "oracle_context", "docstring"]
    }

    fn docstring_field(&self) -> Option<&'static str> {
        Some("docstring")
    }

    fn context_field(&self) -> Option<&'static str> {
        Some("oracle_context")
    }
}

static FAMILIES: &[&dyn DatasetFamily] = &[&HumanEval, &CoderEval];

/// Look up a family by name (case-insensitive).
pub fn resolve_family(name: &str) -> Result<&'static dyn DatasetFamily> {
    FAMILIES
        .iter()
        .copied()
        .find(|family| family.name().eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| {
            RepairError::InvalidDatasetKind(
                name.to_string(),
                FAMILIES
                    .iter()
                    .map(|f| f.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        })
}

/// One task to repair. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Question {
    pub key: String,
    /// Inline test code, for families that carry it.
    pub test: Option<String>,
    pub entry_point: Option<String>,
    pub docstring: Option<String>,
    pub context: Option<String>,
    pub false_results: Vec<FailingResult>,
    pub passthrough: Map<String, Value>,
}

/// One initially failing solution with the feedback captured for it.
#[derive(Debug, Clone, Default)]
pub struct FailingResult {
    pub source: String,
    pub generate_code: String,
    /// Remaining fields, including one entry per pre-computed feedback kind.
    pub fields: Map<String, Value>,
}

impl FailingResult {
    fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| RepairError::MissingField("generate_code".to_string()))?;
        let generate_code = obj
            .get("generate_code")
            .and_then(value_as_text)
            .ok_or_else(|| RepairError::MissingField("generate_code".to_string()))?;
        let source = obj.get("source").and_then(value_as_text).unwrap_or_default();

        let mut fields = obj.clone();
        fields.remove("generate_code");
        fields.remove("source");

        Ok(Self {
            source,
            generate_code,
            fields,
        })
    }

    /// The feedback datum recorded for `kind`, if any.
    pub fn feedback(&self, kind: FeedbackKind) -> Option<String> {
        self.fields.get(kind.as_str()).and_then(value_as_text)
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_families_case_insensitively() {
        assert_eq!(resolve_family("humaneval").unwrap().name(), "HumanEval");
        assert_eq!(resolve_family("CoderEval").unwrap().id_field(), "_id");
    }

    #[test]
    fn unknown_family_is_rejected() {
        let err = resolve_family("MBPP").err().unwrap();
        assert!(matches!(err, RepairError::InvalidDatasetKind(ref name, _) if name == "MBPP"));
        assert!(err.to_string().contains("HumanEval, CoderEval"));
    }

    #[test]
    fn parses_humaneval_row() {
        let row = json!({
            "task_id": "HumanEval/0",
            "test": "def check(candidate):\n    assert candidate(1) == 2\n",
            "entry_point": "inc",
            "false_results": [
                {"source": "gpt", "generate_code": "def inc(x): return x", "test_feedback": "AssertionError"}
            ]
        });
        let q = HumanEval.parse_question(&row).unwrap();
        assert_eq!(q.key, "HumanEval/0");
        assert_eq!(q.entry_point.as_deref(), Some("inc"));
        assert!(q.docstring.is_none());
        assert_eq!(q.false_results.len(), 1);
        assert_eq!(
            q.false_results[0].feedback(FeedbackKind::Test).as_deref(),
            Some("AssertionError")
        );
        assert_eq!(q.false_results[0].feedback(FeedbackKind::Compiler), None);
        assert!(q.passthrough.contains_key("test"));
    }

    #[test]
    fn parses_codereval_row_and_writes_back_aux_fields() {
        let row = json!({
            "_id": "62e60f43d76274f8a4026e28",
            "level": "self_contained",
            "oracle_context": "{ \"apis\" : \"[]\" }",
            "docstring": "Convert nanoseconds.",
            "false_results": []
        });
        let q = CoderEval.parse_question(&row).unwrap();
        assert_eq!(q.docstring.as_deref(), Some("Convert nanoseconds."));
        assert!(q.context.is_some());

        let out = CoderEval.result_row(&q, "fixed_results", json!([]));
        assert_eq!(out["_id"], "62e60f43d76274f8a4026e28");
        assert_eq!(out["level"], "self_contained");
        assert_eq!(out["fixed_results"], json!([]));
        assert!(out.get("false_results").is_none());
    }

    #[test]
    fn missing_id_field_is_an_error() {
        let row = json!({"test": "", "false_results": []});
        let err = HumanEval.parse_question(&row).unwrap_err();
        assert!(matches!(err, RepairError::MissingField(ref f) if f == "task_id"));
    }

    #[test]
    fn humaneval_result_row_keeps_entry_point() {
        let row = json!({
            "task_id": "HumanEval/10",
            "test": "def check(candidate):\n    assert candidate('cat') == 'catac'\n",
            "entry_point": "make_palindrome",
            "false_results": []
        });
        let q = HumanEval.parse_question(&row).unwrap();
        let out = HumanEval.result_row(&q, "fixed_results", json!([]));
        assert_eq!(out["entry_point"], "make_palindrome");

        let reparsed = HumanEval.parse_question(&out).unwrap();
        assert_eq!(reparsed.entry_point.as_deref(), Some("make_palindrome"));
    }

    #[test]
    fn humaneval_rows_without_entry_point_still_parse() {
        let row = json!({"task_id": "HumanEval/0", "test": "def check(c): pass", "fixed_results": []});
        let q = HumanEval.parse_question(&row).unwrap();
        assert!(q.entry_point.is_none());
        let out = HumanEval.result_row(&q, "fixed_results", json!([]));
        assert!(out.get("entry_point").is_none());
    }

    #[test]
    fn missing_passthrough_field_is_an_error() {
        let row = json!({"_id": "x", "level": "file_runnable"});
        assert!(CoderEval.parse_question(&row).is_err());
    }
}
