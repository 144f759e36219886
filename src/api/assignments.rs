use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::now_millis;
use crate::db::models::{check_question_set, Assignment};
use crate::repositories;
use crate::schemas::assignment::{AssignmentCreate, AssignmentListQuery};
use crate::schemas::generation::{GeneratedContent, GenerationRequest};


const SUBJECT: &str = "KHTN";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assignments).post(create_assignment))
        .route("/generate", post(generate_content))
        .route("/:assignment_id", get(get_assignment).delete(delete_assignment))
}

async fn list_assignments(
    State(state): State<AppState>,
    Query(params): Query<AssignmentListQuery>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    let assignments = repositories::assignments::list(
        state.store(),
        params.grade,
        params.folder_id.as_deref(),
    )
    .await?;
    Ok(Json(assignments))
}

async fn create_assignment(
    State(state): State<AppState>,
    Json(payload): Json<AssignmentCreate>,
) -> Result<(StatusCode, Json<Assignment>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    check_question_set(&payload.questions).map_err(ApiError::BadRequest)?;

    if let Some(folder_id) = payload.folder_id.as_deref() {
        let folders = repositories::folders::list(state.store(), None).await?;
        if !folders.iter().any(|folder| folder.id == folder_id) {
            return Err(ApiError::BadRequest(format!("Folder {folder_id} does not exist")));
        }
    }

    let assignment = Assignment {
        id: Uuid::new_v4().to_string(),
        title: payload.title.trim().to_string(),
        description: payload.description,
        questions: payload.questions,
        grade: payload.grade,
        subject: SUBJECT.to_string(),
        kind: payload.kind,
        rubric: payload.rubric,
        created_at: now_millis(),
        folder_id: payload.folder_id,
    };
    repositories::assignments::insert(state.store(), assignment.clone()).await?;

    tracing::info!(
        assignment_id = %assignment.id,
        grade = %assignment.grade,
        questions = assignment.questions.len(),
        "Assignment created"
    );
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<String>,
) -> Result<Json<Assignment>, ApiError> {
    repositories::assignments::find_by_id(state.store(), &assignment_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))
}

/// Removes the assignment and then every submission that references it.
async fn delete_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !repositories::assignments::delete(state.store(), &assignment_id).await? {
        return Err(ApiError::NotFound("Assignment not found".to_string()));
    }

    let removed =
        repositories::submissions::delete_for_assignment(state.store(), &assignment_id).await?;
    tracing::info!(assignment_id = %assignment_id, submissions_removed = removed, "Assignment deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn generate_content(
    State(state): State<AppState>,
    Json(payload): Json<GenerationRequest>,
) -> Result<Json<GeneratedContent>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    payload.check_matrix_size().map_err(ApiError::BadRequest)?;

    let content = state.generator().generate(&payload).await?;
    Ok(Json(content))
}
