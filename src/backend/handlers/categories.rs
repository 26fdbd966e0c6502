use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::backend::auth::CurrentUser;
use crate::backend::extract::{ApiJson, ApiPath, ApiQuery};
use crate::backend::AppState;
use crate::database::db::queries::categories;
use crate::database::models::{
    Category, CategoryDetail, CategoryFilter, CategoryPayload, CategoryType, Subcategory,
};
use crate::error::{AppError, AppResult};

pub async fn list_categories(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(filter): ApiQuery<CategoryFilter>,
) -> AppResult<Json<Vec<Category>>> {
    let kind = match filter.transaction_type.as_deref() {
        None => None,
        Some(raw) => Some(CategoryType::parse(raw).ok_or_else(|| {
            AppError::field(
                "transaction_type",
                format!("Select a valid choice. {raw} is not one of the available choices."),
            )
        })?),
    };
    let rows = categories::list_categories(&state.db, current.id(), kind).await?;
    Ok(Json(rows))
}

/// Owned and still active; retired categories behave as missing.
async fn active_category(state: &AppState, user_id: i64, id: i64) -> AppResult<Category> {
    categories::get_category(&state.db, user_id, id)
        .await?
        .filter(|c| c.is_active)
        .ok_or(AppError::NotFound("category"))
}

pub async fn create_category(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> AppResult<impl IntoResponse> {
    let fields = payload.into_fields(None)?;
    let category = categories::create_category(&state.db, current.id(), &fields).await?;
    tracing::info!(user_id = current.id(), category_id = category.id, "category created");
    Ok((
        StatusCode::CREATED,
        Json(CategoryDetail {
            category,
            subcategories: Vec::new(),
        }),
    ))
}

pub async fn get_category(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<CategoryDetail>> {
    let category = active_category(&state, current.id(), id).await?;
    let subcategories = categories::list_subcategories(&state.db, current.id(), Some(id)).await?;
    Ok(Json(CategoryDetail {
        category,
        subcategories,
    }))
}

pub async fn replace_category(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<CategoryPayload>,
) -> AppResult<Json<CategoryDetail>> {
    write_category(state, current, id, payload, false).await
}

pub async fn patch_category(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<CategoryPayload>,
) -> AppResult<Json<CategoryDetail>> {
    write_category(state, current, id, payload, true).await
}

async fn write_category(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CategoryPayload>,
    partial: bool,
) -> AppResult<Json<CategoryDetail>> {
    let stored = active_category(&state, current.id(), id).await?;
    let fields = payload.into_fields(partial.then_some(&stored))?;

    let mut tx = state.db.begin().await?;
    let category = categories::update_category(&mut *tx, current.id(), id, &fields)
        .await?
        .ok_or(AppError::NotFound("category"))?;
    if !category.is_active {
        categories::deactivate_subcategories_of(&mut *tx, current.id(), id).await?;
    }
    tx.commit().await?;
    tracing::info!(
        user_id = current.id(),
        category_id = id,
        partial,
        is_active = category.is_active,
        "category updated"
    );

    let subcategories = categories::list_subcategories(&state.db, current.id(), Some(id)).await?;
    Ok(Json(CategoryDetail {
        category,
        subcategories,
    }))
}

/// Soft delete. The category and its subcategories are deactivated together;
/// transactions keep their references.
pub async fn delete_category(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    let mut tx = state.db.begin().await?;
    if !categories::deactivate_category(&mut *tx, current.id(), id).await? {
        return Err(AppError::NotFound("category"));
    }
    tx.commit().await?;

    tracing::info!(user_id = current.id(), category_id = id, "category deactivated");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_category_subcategories(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Vec<Subcategory>>> {
    active_category(&state, current.id(), id).await?;
    let rows = categories::list_subcategories(&state.db, current.id(), Some(id)).await?;
    Ok(Json(rows))
}
