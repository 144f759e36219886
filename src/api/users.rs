use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::user::UserResponse;


pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students))
        .route("/:user_id", delete(delete_student))
}

async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let students = repositories::users::list_students(state.store()).await?;
    Ok(Json(students.into_iter().map(UserResponse::from).collect()))
}

async fn delete_student(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !repositories::users::delete_student(state.store(), &user_id).await? {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    tracing::info!(user_id = %user_id, "Student removed");
    Ok(StatusCode::NO_CONTENT)
}
