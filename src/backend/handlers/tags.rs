use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::backend::auth::CurrentUser;
use crate::backend::extract::{ApiJson, ApiPath};
use crate::backend::AppState;
use crate::database::db::queries::tags;
use crate::database::models::{Tag, TagPayload};
use crate::error::{AppError, AppResult};

pub async fn list_tags(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(tags::list_tags(&state.db, current.id()).await?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<TagPayload>,
) -> AppResult<impl IntoResponse> {
    let name = payload.into_name()?;
    let tag = tags::create_tag(&state.db, current.id(), &name).await?;
    tracing::info!(user_id = current.id(), tag_id = tag.id, "tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    if !tags::delete_tag(&state.db, current.id(), id).await? {
        return Err(AppError::NotFound("tag"));
    }
    tracing::info!(user_id = current.id(), tag_id = id, "tag deleted");
    Ok(StatusCode::NO_CONTENT)
}
