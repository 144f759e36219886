use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::db::models::Question;
use crate::db::types::{AssignmentType, Grade};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignmentCreate {
    #[validate(
        length(min = 1, max = 200, message = "title must be 1-200 characters"),
        custom(function = "not_blank", message = "title must not be blank")
    )]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) questions: Vec<Question>,
    pub(crate) grade: Grade,
    #[serde(rename = "type")]
    pub(crate) kind: AssignmentType,
    #[validate(custom(function = "not_blank", message = "rubric must not be blank"))]
    pub(crate) rubric: String,
    #[serde(default)]
    pub(crate) folder_id: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignmentListQuery {
    #[serde(default)]
    pub(crate) grade: Option<Grade>,
    #[serde(default)]
    pub(crate) folder_id: Option<String>,
}
