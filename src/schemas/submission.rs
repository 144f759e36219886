use std::collections::BTreeMap;

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionCreate {
    #[validate(length(min = 1, message = "assignmentId must not be empty"))]
    pub(crate) assignment_id: String,
    #[validate(length(min = 1, message = "studentId must not be empty"))]
    pub(crate) student_id: String,
    #[validate(length(min = 1, message = "studentName must not be empty"))]
    pub(crate) student_name: String,
    /// Data URL (or bare base64) of one photographed page.
    #[serde(default, alias = "image")]
    pub(crate) image_url: Option<String>,
    #[serde(default)]
    pub(crate) online_answers: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionListQuery {
    #[serde(default)]
    pub(crate) assignment_id: Option<String>,
    #[serde(default)]
    pub(crate) student_id: Option<String>,
}
