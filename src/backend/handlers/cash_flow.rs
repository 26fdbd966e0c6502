use std::collections::HashSet;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use sqlx::PgExecutor;

use crate::backend::auth::CurrentUser;
use crate::backend::extract::{ApiJson, ApiPath, ApiQuery};
use crate::backend::AppState;
use crate::database::db::queries::{cash_flow, categories};
use crate::database::models::{CashFlowView, CashFlowViewDetail, CashFlowViewFields, CashFlowViewPayload};
use crate::error::{AppError, AppResult};
use crate::services::billing::YearMonth;
use crate::services::cash_flow_report::{
    build_report, CashFlowReport, CategoryLayout, GroupLayout, ResultLayout,
};

async fn detail(
    db: impl PgExecutor<'_> + Copy,
    view: CashFlowView,
) -> Result<CashFlowViewDetail, sqlx::Error> {
    let groups = cash_flow::list_groups(db, view.id).await?;
    let results = cash_flow::list_results(db, view.id).await?;
    Ok(CashFlowViewDetail {
        view,
        groups,
        results,
    })
}

async fn fetch_view(state: &AppState, user_id: i64, id: i64) -> AppResult<CashFlowView> {
    cash_flow::get_view(&state.db, user_id, id)
        .await?
        .ok_or(AppError::NotFound("cash flow view"))
}

/// Every category a group lists must be one of the caller's.
async fn check_categories(
    state: &AppState,
    user_id: i64,
    fields: &CashFlowViewFields,
) -> AppResult<()> {
    let wanted = fields.category_ids();
    if wanted.is_empty() {
        return Ok(());
    }
    let owned: HashSet<i64> = categories::get_categories_by_ids(&state.db, user_id, &wanted)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let unknown: Vec<String> = wanted
        .iter()
        .filter(|id| !owned.contains(id))
        .map(|id| id.to_string())
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(AppError::field(
            "groups",
            format!("Unknown category ids: {}.", unknown.join(", ")),
        ))
    }
}

pub async fn list_views(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<CashFlowViewDetail>>> {
    let views = cash_flow::list_views(&state.db, current.id()).await?;
    let mut out = Vec::with_capacity(views.len());
    for view in views {
        out.push(detail(&state.db, view).await?);
    }
    Ok(Json(out))
}

pub async fn create_view(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<CashFlowViewPayload>,
) -> AppResult<impl IntoResponse> {
    let fields = payload.into_fields()?;
    check_categories(&state, current.id(), &fields).await?;

    let mut tx = state.db.begin().await?;
    let id = cash_flow::create_view(&mut *tx, current.id(), &fields).await?;
    tx.commit().await?;
    tracing::info!(user_id = current.id(), view_id = id, "cash flow view created");

    let view = fetch_view(&state, current.id(), id).await?;
    Ok((StatusCode::CREATED, Json(detail(&state.db, view).await?)))
}

pub async fn get_view(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<CashFlowViewDetail>> {
    let view = fetch_view(&state, current.id(), id).await?;
    Ok(Json(detail(&state.db, view).await?))
}

/// Renames the view and replaces all of its groups and results.
pub async fn replace_view(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CashFlowViewPayload>,
) -> AppResult<Json<CashFlowViewDetail>> {
    fetch_view(&state, current.id(), id).await?;
    let fields = payload.into_fields()?;
    check_categories(&state, current.id(), &fields).await?;

    let mut tx = state.db.begin().await?;
    if !cash_flow::replace_view(&mut *tx, current.id(), id, &fields).await? {
        return Err(AppError::NotFound("cash flow view"));
    }
    tx.commit().await?;
    tracing::info!(user_id = current.id(), view_id = id, "cash flow view replaced");

    let view = fetch_view(&state, current.id(), id).await?;
    Ok(Json(detail(&state.db, view).await?))
}

pub async fn delete_view(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    if !cash_flow::delete_view(&state.db, current.id(), id).await? {
        return Err(AppError::NotFound("cash flow view"));
    }
    tracing::info!(user_id = current.id(), view_id = id, "cash flow view deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub year: Option<i32>,
}

pub async fn get_report(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> AppResult<Json<CashFlowReport>> {
    let year = query
        .year
        .ok_or_else(|| AppError::field("year", "This query parameter is required."))?;
    if !(1900..=2100).contains(&year) {
        return Err(AppError::field("year", "Year must be between 1900 and 2100."));
    }
    let view = fetch_view(&state, current.id(), id).await?;

    let groups = cash_flow::list_groups(&state.db, view.id).await?;
    let results = cash_flow::list_results(&state.db, view.id).await?;

    let category_ids: Vec<i64> = groups
        .iter()
        .flat_map(|g| g.category_ids.iter().copied())
        .collect();
    let category_rows = categories::get_categories_by_ids(&state.db, current.id(), &category_ids).await?;
    let subcategory_rows =
        categories::list_subcategories_of(&state.db, current.id(), &category_ids).await?;

    // both row sets arrive ordered by name
    let layouts: Vec<CategoryLayout> = category_rows
        .into_iter()
        .map(|c| CategoryLayout {
            subcategories: subcategory_rows
                .iter()
                .filter(|s| s.category_id == c.id)
                .map(|s| (s.id, s.name.clone()))
                .collect(),
            id: c.id,
            name: c.name,
        })
        .collect();
    let group_layouts = groups
        .into_iter()
        .map(|g| GroupLayout {
            categories: layouts
                .iter()
                .filter(|c| g.category_ids.contains(&c.id))
                .cloned()
                .collect(),
            name: g.name,
            position: g.position,
        })
        .collect();
    let result_layouts = results
        .into_iter()
        .map(|r| ResultLayout {
            name: r.name,
            position: r.position,
        })
        .collect();

    let start = YearMonth { year, month: 1 };
    let amounts = cash_flow::monthly_amounts(
        &state.db,
        current.id(),
        start.first_day(),
        start.add_months(12).first_day(),
    )
    .await?;

    Ok(Json(build_report(
        view.id,
        view.name,
        year,
        group_layouts,
        result_layouts,
        &amounts,
    )))
}
