// src/models/question.rs

use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

/// A candidate exam question produced by the external generator.
///
/// Read-only for the validation engine. Rejected questions are discarded,
/// accepted ones are handed on to the question bank by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    /// Unit or topic the generator produced this question for.
    pub unit_id: String,

    /// The text content of the question.
    pub stem: String,

    /// Answer options in display order (e.g., ["12", "14", "16"]).
    #[serde(default)]
    pub options: Vec<String>,

    /// Must equal the text of one of `options`.
    pub correct_answer: String,

    #[serde(default)]
    pub difficulty: Option<Difficulty>,

    /// Mapped from the generator's `type` field.
    #[serde(default, rename = "type")]
    pub question_type: Option<QuestionType>,

    /// Explanation or analysis of the correct answer.
    #[serde(default)]
    pub explanation: Option<String>,

    /// Figure shown next to the stem, if any.
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// One correct option among several.
    Single,
    /// Exactly two options.
    TrueFalse,
}

/// Outcome of one validation pass.
///
/// `reason` is present exactly when the question is invalid and always starts
/// with the name of the rule that rejected it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(rule: &str, detail: impl AsRef<str>) -> Self {
        Self {
            is_valid: false,
            reason: Some(format!("{}: {}", rule, detail.as_ref())),
        }
    }

    /// Name of the rule that failed, if any.
    pub fn failed_rule(&self) -> Option<&str> {
        self.reason
            .as_deref()
            .map(|r| r.split_once(':').map_or(r, |(rule, _)| rule))
    }
}

/// Per-question line of a batch validation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionVerdict {
    /// Position of the question in the submitted list.
    pub index: usize,
    pub unit_id: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Validation outcome for a list of generated questions, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBatchReport {
    verdicts: Vec<QuestionVerdict>,
}

impl QuestionBatchReport {
    pub fn new(verdicts: Vec<QuestionVerdict>) -> Self {
        Self { verdicts }
    }

    pub fn verdicts(&self) -> &[QuestionVerdict] {
        &self.verdicts
    }

    pub fn admitted_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_valid).count()
    }

    pub fn rejected_count(&self) -> usize {
        self.verdicts.len() - self.admitted_count()
    }

    /// Indexes of the questions that may enter the question bank.
    pub fn admitted_indexes(&self) -> Vec<usize> {
        self.verdicts
            .iter()
            .filter(|v| v.is_valid)
            .map(|v| v.index)
            .collect()
    }
}

/// Counts are derived from the verdict list when serialized.
impl Serialize for QuestionBatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("QuestionBatchReport", 3)?;
        state.serialize_field("verdicts", &self.verdicts)?;
        state.serialize_field("admitted_count", &self.admitted_count())?;
        state.serialize_field("rejected_count", &self.rejected_count())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_reason_carries_rule_name() {
        let result = ValidationResult::invalid("stem_present", "stem is empty");
        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some("stem_present: stem is empty"));
        assert_eq!(result.failed_rule(), Some("stem_present"));
        assert_eq!(ValidationResult::valid().failed_rule(), None);
    }

    #[test]
    fn test_question_deserializes_generator_payload() {
        let question: GeneratedQuestion = serde_json::from_value(serde_json::json!({
            "unit_id": "u-3",
            "stem": "What is 2 + 3?",
            "options": ["4", "5", "6"],
            "correct_answer": "5",
            "difficulty": "easy",
            "type": "single"
        }))
        .unwrap();

        assert_eq!(question.difficulty, Some(Difficulty::Easy));
        assert_eq!(question.question_type, Some(QuestionType::Single));
        assert!(question.image_url.is_none());
    }

    #[test]
    fn test_batch_report_counts_follow_verdicts() {
        let verdict = |index, is_valid: bool| QuestionVerdict {
            index,
            unit_id: "u".to_string(),
            is_valid,
            reason: (!is_valid).then(|| "option_count: too few".to_string()),
        };
        let report = QuestionBatchReport::new(vec![verdict(0, true), verdict(1, false), verdict(2, true)]);

        assert_eq!(report.admitted_count(), 2);
        assert_eq!(report.rejected_count(), 1);
        assert_eq!(report.admitted_indexes(), vec![0, 2]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["admitted_count"], 2);
        assert_eq!(json["rejected_count"], 1);
        assert_eq!(json["verdicts"][1]["reason"], "option_count: too few");
    }
}
