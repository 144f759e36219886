use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::Folder;
use crate::repositories;
use crate::schemas::folder::{FolderCreate, FolderListQuery};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_folders).post(create_folder))
        .route("/:folder_id", delete(delete_folder))
}

async fn list_folders(
    State(state): State<AppState>,
    Query(params): Query<FolderListQuery>,
) -> Result<Json<Vec<Folder>>, ApiError> {
    let folders = repositories::folders::list(state.store(), params.grade).await?;
    Ok(Json(folders))
}

async fn create_folder(
    State(state): State<AppState>,
    Json(payload): Json<FolderCreate>,
) -> Result<(StatusCode, Json<Folder>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Folder name must not be blank".to_string()));
    }

    let folder =
        Folder { id: Uuid::new_v4().to_string(), name: name.to_string(), grade: payload.grade };
    repositories::folders::insert(state.store(), folder.clone()).await?;

    tracing::info!(folder_id = %folder.id, grade = %folder.grade, "Folder created");
    Ok((StatusCode::CREATED, Json(folder)))
}

/// Assignments filed under the folder survive with `folderId` cleared.
async fn delete_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !repositories::folders::delete(state.store(), &folder_id).await? {
        return Err(ApiError::NotFound("Folder not found".to_string()));
    }

    let detached = repositories::assignments::detach_folder(state.store(), &folder_id).await?;
    tracing::info!(folder_id = %folder_id, detached, "Folder deleted");

    Ok(StatusCode::NO_CONTENT)
}
