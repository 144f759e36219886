use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub(crate) const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GradingResult {
    pub(crate) assignment_info: AssignmentInfo,
    pub(crate) score: f64,
    pub(crate) level: CompletionLevel,
    pub(crate) integrity_check: IntegrityCheck,
    pub(crate) question_results: Vec<QuestionResult>,
    pub(crate) student_feedback: StudentFeedback,
    pub(crate) teacher_report: TeacherReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignmentInfo {
    pub(crate) grade: String,
    pub(crate) topic: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum CompletionLevel {
    #[serde(rename = "Hoàn thành tốt")]
    Excellent,
    #[serde(rename = "Hoàn thành")]
    Completed,
    #[serde(rename = "Chưa hoàn thành")]
    NotCompleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IntegrityCheck {
    pub(crate) is_plagiarism_suspected: bool,
    pub(crate) confidence: f64,
    pub(crate) reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum QuestionOutcome {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionResult {
    pub(crate) question_id: String,
    pub(crate) status: QuestionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) short_explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StudentFeedback {
    pub(crate) pros: Vec<String>,
    pub(crate) cons: Vec<String>,
    pub(crate) suggestions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TeacherReport {
    pub(crate) accuracy_rate: String,
    pub(crate) common_mistakes: Vec<String>,
    pub(crate) teaching_suggestions: String,
}

impl GradingResult {
    /// Value checks serde cannot express. Question coverage is checked later,
    /// against the assignment, by the reconciler.
    pub(crate) fn check_values(&self) -> Result<(), String> {
        check_score(self.score)?;

        if !self.integrity_check.confidence.is_finite() || self.integrity_check.confidence < 0.0 {
            return Err(format!(
                "integrityCheck.confidence must be a non-negative number, got {}",
                self.integrity_check.confidence
            ));
        }

        if let Some(blank) =
            self.question_results.iter().position(|item| item.question_id.trim().is_empty())
        {
            return Err(format!("questionResults[{blank}].questionId is empty"));
        }

        Ok(())
    }
}

pub(crate) fn check_score(score: f64) -> Result<(), String> {
    if score.is_finite() && (0.0..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(format!("score must be within [0, {MAX_SCORE}], got {score}"))
    }
}

/// JSON schema handed to the model as `response_format`. Mirrors the structs
/// above; only `shortExplanation` is optional.
pub(crate) fn response_schema() -> Value {
    let string = json!({"type": "string"});
    let string_list = json!({"type": "array", "items": {"type": "string"}});

    json!({
        "type": "object",
        "properties": {
            "assignmentInfo": {
                "type": "object",
                "properties": {"grade": string, "topic": string, "type": string},
                "required": ["grade", "topic", "type"]
            },
            "score": {"type": "number", "minimum": 0, "maximum": MAX_SCORE},
            "level": {"type": "string", "enum": ["Hoàn thành tốt", "Hoàn thành", "Chưa hoàn thành"]},
            "integrityCheck": {
                "type": "object",
                "properties": {
                    "isPlagiarismSuspected": {"type": "boolean"},
                    "confidence": {"type": "number"},
                    "reasoning": string
                },
                "required": ["isPlagiarismSuspected", "confidence", "reasoning"]
            },
            "questionResults": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "questionId": string,
                        "status": {"type": "string", "enum": ["correct", "incorrect"]},
                        "shortExplanation": string
                    },
                    "required": ["questionId", "status"]
                }
            },
            "studentFeedback": {
                "type": "object",
                "properties": {"pros": string_list, "cons": string_list, "suggestions": string},
                "required": ["pros", "cons", "suggestions"]
            },
            "teacherReport": {
                "type": "object",
                "properties": {
                    "accuracyRate": string,
                    "commonMistakes": string_list,
                    "teachingSuggestions": string
                },
                "required": ["accuracyRate", "commonMistakes", "teachingSuggestions"]
            }
        },
        "required": [
            "assignmentInfo",
            "score",
            "level",
            "integrityCheck",
            "questionResults",
            "studentFeedback",
            "teacherReport"
        ]
    })
}
