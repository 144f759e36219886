use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::db::types::{
    AssignmentType, FailureKind, Grade, QuestionLevel, QuestionType, SubmissionStatus, UserRole,
};
use crate::schemas::grading::GradingResult;

pub(crate) const MCQ_OPTION_COUNT: usize = 4;
const OPTION_LETTERS: [&str; MCQ_OPTION_COUNT] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) text: String,
    #[serde(rename = "type")]
    pub(crate) kind: QuestionType,
    pub(crate) level: QuestionLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<String>,
}

impl Question {
    /// Checks the per-question invariants: non-empty id and text, and for
    /// multiple choice exactly four options plus an answer drawn from them.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("question id must not be empty".to_string());
        }
        if self.text.trim().is_empty() {
            return Err(format!("question {} has empty text", self.id));
        }

        match self.kind {
            QuestionType::Mcq => {
                let options = self.options.as_deref().unwrap_or_default();
                if options.len() != MCQ_OPTION_COUNT {
                    return Err(format!(
                        "mcq question {} must have {MCQ_OPTION_COUNT} options, got {}",
                        self.id,
                        options.len()
                    ));
                }
                if options.iter().any(|option| option.trim().is_empty()) {
                    return Err(format!("mcq question {} has an empty option", self.id));
                }
                let answer = self.correct_answer.as_deref().map(str::trim).unwrap_or_default();
                if !answer_matches_option(answer, options) {
                    return Err(format!(
                        "mcq question {} has correct answer {answer:?} outside its options",
                        self.id
                    ));
                }
            }
            QuestionType::Essay => {
                if self.options.is_some() {
                    return Err(format!("essay question {} must not carry options", self.id));
                }
            }
        }

        Ok(())
    }
}

fn answer_matches_option(answer: &str, options: &[String]) -> bool {
    if answer.is_empty() {
        return false;
    }
    let letter = answer.trim_end_matches(['.', ')']).to_ascii_uppercase();
    OPTION_LETTERS.contains(&letter.as_str())
        || options.iter().any(|option| option.trim() == answer)
}

/// Validates a full question list, including id uniqueness.
pub(crate) fn check_question_set(questions: &[Question]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for question in questions {
        question.check()?;
        if !seen.insert(question.id.as_str()) {
            return Err(format!("duplicate question id {}", question.id));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) questions: Vec<Question>,
    pub(crate) grade: Grade,
    #[serde(default = "default_subject")]
    pub(crate) subject: String,
    #[serde(rename = "type")]
    pub(crate) kind: AssignmentType,
    pub(crate) rubric: String,
    pub(crate) created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) folder_id: Option<String>,
}

impl Assignment {
    pub(crate) fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }
}

fn default_subject() -> String {
    "KHTN".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionError {
    pub(crate) kind: FailureKind,
    pub(crate) message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    #[serde(default)]
    pub(crate) image_url: String,
    pub(crate) status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) result: Option<GradingResult>,
    pub(crate) timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) online_answers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<SubmissionError>,
}

impl Submission {
    pub(crate) fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Folder {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) grade: Grade,
}

/// Account record owned by the external sign-in flow. The password is kept so
/// that rewriting the collection does not drop it; responses never expose it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,
    pub(crate) role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) password: Option<String>,
}
