use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::db::models::Question;
use crate::db::types::{AssignmentType, Grade, QuestionLevel, QuestionType};

pub(crate) const MAX_QUESTIONS_PER_KIND: u32 = 40;

/// Requested number of questions per cognitive level, split by question type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct QuestionMatrix {
    #[serde(default)]
    pub(crate) mcq: BTreeMap<QuestionLevel, u32>,
    #[serde(default)]
    pub(crate) essay: BTreeMap<QuestionLevel, u32>,
}

impl QuestionMatrix {
    /// Spreads flat totals over the four levels, giving any remainder to the
    /// lower levels first (7 → 2, 2, 2, 1).
    pub(crate) fn from_flat(mcq: u32, essay: u32) -> Self {
        Self { mcq: spread(mcq), essay: spread(essay) }
    }

    pub(crate) fn count(&self, kind: QuestionType, level: QuestionLevel) -> u32 {
        let row = match kind {
            QuestionType::Mcq => &self.mcq,
            QuestionType::Essay => &self.essay,
        };
        row.get(&level).copied().unwrap_or(0)
    }

    /// Saturates instead of wrapping so oversized cells still exceed the cap.
    pub(crate) fn total(&self, kind: QuestionType) -> u32 {
        QuestionLevel::ALL
            .into_iter()
            .map(|level| self.count(kind, level))
            .fold(0, u32::saturating_add)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.total(QuestionType::Mcq) == 0 && self.total(QuestionType::Essay) == 0
    }
}

fn spread(total: u32) -> BTreeMap<QuestionLevel, u32> {
    let levels = QuestionLevel::ALL.len() as u32;
    let base = total / levels;
    let remainder = total % levels;

    QuestionLevel::ALL
        .into_iter()
        .enumerate()
        .map(|(idx, level)| (level, base + u32::from((idx as u32) < remainder)))
        .collect()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationRequest {
    #[validate(length(min = 1, max = 200, message = "topic must be 1-200 characters"))]
    pub(crate) topic: String,
    pub(crate) grade: Grade,
    #[serde(rename = "type")]
    pub(crate) kind: AssignmentType,
    #[serde(default)]
    pub(crate) matrix: Option<QuestionMatrix>,
    #[serde(default)]
    #[validate(range(max = 40, message = "mcqCount must be at most 40"))]
    pub(crate) mcq_count: Option<u32>,
    #[serde(default)]
    #[validate(range(max = 40, message = "essayCount must be at most 40"))]
    pub(crate) essay_count: Option<u32>,
}

impl GenerationRequest {
    /// An explicit matrix wins over flat counts.
    pub(crate) fn resolved_matrix(&self) -> QuestionMatrix {
        match &self.matrix {
            Some(matrix) => matrix.clone(),
            None => QuestionMatrix::from_flat(
                self.mcq_count.unwrap_or(0),
                self.essay_count.unwrap_or(0),
            ),
        }
    }

    pub(crate) fn check_matrix_size(&self) -> Result<(), String> {
        let matrix = self.resolved_matrix();
        for kind in [QuestionType::Mcq, QuestionType::Essay] {
            if matrix.total(kind) > MAX_QUESTIONS_PER_KIND {
                return Err(format!(
                    "at most {MAX_QUESTIONS_PER_KIND} questions of each type may be requested"
                ));
            }
        }
        Ok(())
    }
}

/// Validated generation output. Nothing here is persisted; the teacher
/// reviews it and creates the assignment explicitly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeneratedContent {
    pub(crate) description: String,
    pub(crate) rubric: String,
    pub(crate) questions: Vec<Question>,
}

/// Top-level shape of the model's reply. Questions stay untyped so one bad
/// item can be dropped without failing the whole response.
#[derive(Debug, Deserialize)]
pub(crate) struct RawGeneratedContent {
    pub(crate) description: String,
    pub(crate) rubric: String,
    pub(crate) questions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawQuestion {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) text: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) level: String,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) correct_answer: Option<String>,
}

pub(crate) fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "description": {"type": "string"},
            "rubric": {"type": "string"},
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "text": {"type": "string"},
                        "type": {"type": "string", "enum": ["mcq", "essay"]},
                        "level": {"type": "string", "enum": ["Biết", "Hiểu", "Vận dụng", "Vận dụng cao"]},
                        "options": {"type": "array", "items": {"type": "string"}},
                        "correctAnswer": {"type": "string"}
                    },
                    "required": ["id", "text", "type", "level"]
                }
            }
        },
        "required": ["description", "rubric", "questions"]
    })
}
