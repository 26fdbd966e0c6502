use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::backend::auth::CurrentUser;
use crate::backend::extract::{ApiJson, ApiPath, ApiQuery};
use crate::backend::AppState;
use crate::database::db::queries::categories;
use crate::database::models::{
    Subcategory, SubcategoryFields, SubcategoryFilter, SubcategoryPayload,
};
use crate::error::{AppError, AppResult};

pub async fn list_subcategories(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(filter): ApiQuery<SubcategoryFilter>,
) -> AppResult<Json<Vec<Subcategory>>> {
    let rows = categories::list_subcategories(&state.db, current.id(), filter.category_id).await?;
    Ok(Json(rows))
}

async fn active_subcategory(state: &AppState, user_id: i64, id: i64) -> AppResult<Subcategory> {
    categories::get_subcategory(&state.db, user_id, id)
        .await?
        .filter(|s| s.is_active)
        .ok_or(AppError::NotFound("subcategory"))
}

/// The parent must be one of the caller's active categories.
async fn check_parent(state: &AppState, user_id: i64, fields: &SubcategoryFields) -> AppResult<()> {
    let parent = categories::get_category(&state.db, user_id, fields.category_id).await?;
    match parent {
        Some(category) if category.is_active => Ok(()),
        _ => Err(AppError::field(
            "category_id",
            format!(
                "Invalid pk \"{}\" - object does not exist.",
                fields.category_id
            ),
        )),
    }
}

pub async fn create_subcategory(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<SubcategoryPayload>,
) -> AppResult<impl IntoResponse> {
    let fields = payload.into_fields(None)?;
    check_parent(&state, current.id(), &fields).await?;

    let mut conn = state.db.acquire().await?;
    let subcategory = categories::create_subcategory(&mut *conn, current.id(), &fields).await?;
    tracing::info!(
        user_id = current.id(),
        subcategory_id = subcategory.id,
        category_id = subcategory.category_id,
        "subcategory created"
    );
    Ok((StatusCode::CREATED, Json(subcategory)))
}

pub async fn get_subcategory(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Subcategory>> {
    Ok(Json(active_subcategory(&state, current.id(), id).await?))
}

pub async fn replace_subcategory(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<SubcategoryPayload>,
) -> AppResult<Json<Subcategory>> {
    write_subcategory(state, current, id, payload, false).await
}

pub async fn patch_subcategory(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<SubcategoryPayload>,
) -> AppResult<Json<Subcategory>> {
    write_subcategory(state, current, id, payload, true).await
}

async fn write_subcategory(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<SubcategoryPayload>,
    partial: bool,
) -> AppResult<Json<Subcategory>> {
    let stored = active_subcategory(&state, current.id(), id).await?;
    let fields = payload.into_fields(partial.then_some(&stored))?;
    if fields.category_id != stored.category_id {
        check_parent(&state, current.id(), &fields).await?;
    }

    let mut conn = state.db.acquire().await?;
    let subcategory = categories::update_subcategory(&mut *conn, current.id(), id, &fields)
        .await?
        .ok_or(AppError::NotFound("subcategory"))?;
    tracing::info!(user_id = current.id(), subcategory_id = id, partial, "subcategory updated");
    Ok(Json(subcategory))
}

pub async fn delete_subcategory(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    if !categories::deactivate_subcategory(&state.db, current.id(), id).await? {
        return Err(AppError::NotFound("subcategory"));
    }
    tracing::info!(user_id = current.id(), subcategory_id = id, "subcategory deactivated");
    Ok(StatusCode::NO_CONTENT)
}
