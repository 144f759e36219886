use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::user::{SessionUpdate, UserResponse};

/// The signed-in user as recorded by the external sign-in flow.
pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(current).put(set_current).delete(clear_current))
}

async fn current(State(state): State<AppState>) -> Result<Json<Option<UserResponse>>, ApiError> {
    let user = repositories::users::current(state.store()).await?;
    Ok(Json(user.map(UserResponse::from)))
}

async fn set_current(
    State(state): State<AppState>,
    Json(payload): Json<SessionUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user = repositories::users::find_by_id(state.store(), &payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    repositories::users::set_current(state.store(), &user).await?;

    Ok(Json(UserResponse::from(user)))
}

async fn clear_current(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    repositories::users::clear_current(state.store()).await?;
    Ok(StatusCode::NO_CONTENT)
}
