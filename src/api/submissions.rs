use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::validation::validate_image;
use crate::core::state::AppState;
use crate::core::time::now_millis;
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::repositories;
use crate::repositories::submissions::PendingInsert;
use crate::schemas::submission::{SubmissionCreate, SubmissionListQuery};
use crate::tasks::grading::spawn_grading;

#[cfg(test)]
mod tests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_submissions).post(submit))
        .route("/:submission_id", get(get_submission))
}

/// Stores the pending record, then grades it in the background. The caller
/// polls the submission for the terminal state.
async fn submit(
    State(state): State<AppState>,
    Json(payload): Json<SubmissionCreate>,
) -> Result<(StatusCode, Json<Submission>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let assignment = repositories::assignments::find_by_id(state.store(), &payload.assignment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    let image_url = match payload.image_url.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => validate_image(raw, state.settings().uploads())?.data_url(),
        _ => String::new(),
    };

    let online_answers = (!payload.online_answers.is_empty()).then_some(payload.online_answers);

    let submission = Submission {
        id: Uuid::new_v4().to_string(),
        assignment_id: assignment.id,
        student_id: payload.student_id,
        student_name: payload.student_name.trim().to_string(),
        image_url,
        status: SubmissionStatus::Pending,
        result: None,
        timestamp: now_millis(),
        online_answers,
        error: None,
    };

    match repositories::submissions::create_pending(state.store(), submission.clone()).await? {
        PendingInsert::Live(existing) => {
            return Err(ApiError::Conflict(format!(
                "Student already has a {} submission ({}) for this assignment",
                match existing.status {
                    SubmissionStatus::Graded => "graded",
                    _ => "pending",
                },
                existing.id
            )));
        }
        PendingInsert::ReplacedFailed { previous_id } => {
            tracing::info!(
                submission_id = %submission.id,
                previous_id = %previous_id,
                "Replacing failed submission with a new grading cycle"
            );
        }
        PendingInsert::Created => {}
    }

    tracing::info!(
        submission_id = %submission.id,
        assignment_id = %submission.assignment_id,
        student_id = %submission.student_id,
        has_image = submission.has_image(),
        "Submission accepted for grading"
    );

    spawn_grading(state.clone(), submission.id.clone());

    Ok((StatusCode::ACCEPTED, Json(submission)))
}

async fn list_submissions(
    State(state): State<AppState>,
    Query(params): Query<SubmissionListQuery>,
) -> Result<Json<Vec<Submission>>, ApiError> {
    let submissions = repositories::submissions::list(
        state.store(),
        params.assignment_id.as_deref(),
        params.student_id.as_deref(),
    )
    .await?;
    Ok(Json(submissions))
}

async fn get_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> Result<Json<Submission>, ApiError> {
    repositories::submissions::find_by_id(state.store(), &submission_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))
}
