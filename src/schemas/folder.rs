use serde::Deserialize;
use validator::Validate;

use crate::db::types::Grade;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct FolderCreate {
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub(crate) name: String,
    pub(crate) grade: Grade,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FolderListQuery {
    #[serde(default)]
    pub(crate) grade: Option<Grade>,
}
