use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::backend::auth::CurrentUser;
use crate::backend::extract::{ApiJson, ApiPath, ApiQuery};
use crate::backend::AppState;
use crate::database::db::queries::accounts;
use crate::database::models::{Account, AccountFilter, AccountPayload, AccountType};
use crate::error::{AppError, AppResult};

pub async fn list_accounts(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(filter): ApiQuery<AccountFilter>,
) -> AppResult<Json<Vec<Account>>> {
    if let Some(raw) = filter.account_type.as_deref() {
        if AccountType::parse(raw).is_none() {
            return Err(AppError::field(
                "account_type",
                format!("Select a valid choice. {raw} is not one of the available choices."),
            ));
        }
    }
    let rows = accounts::list_accounts(&state.db, current.id(), &filter).await?;
    Ok(Json(rows))
}

pub async fn create_account(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<AccountPayload>,
) -> AppResult<impl IntoResponse> {
    let fields = payload.into_fields(None)?;
    let account = accounts::create_account(&state.db, current.id(), &fields).await?;
    tracing::info!(user_id = current.id(), account_id = account.id, "account created");
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn get_account(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Account>> {
    let account = accounts::get_account(&state.db, current.id(), id)
        .await?
        .ok_or(AppError::NotFound("account"))?;
    Ok(Json(account))
}

pub async fn replace_account(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<AccountPayload>,
) -> AppResult<Json<Account>> {
    write_account(state, current, id, payload, false).await
}

pub async fn patch_account(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<AccountPayload>,
) -> AppResult<Json<Account>> {
    write_account(state, current, id, payload, true).await
}

async fn write_account(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<AccountPayload>,
    partial: bool,
) -> AppResult<Json<Account>> {
    let stored = accounts::get_account(&state.db, current.id(), id)
        .await?
        .ok_or(AppError::NotFound("account"))?;
    let fields = payload.into_fields(partial.then_some(&stored))?;

    let account = accounts::update_account(&state.db, current.id(), id, &fields)
        .await?
        .ok_or(AppError::NotFound("account"))?;
    tracing::info!(user_id = current.id(), account_id = id, partial, "account updated");
    Ok(Json(account))
}

pub async fn delete_account(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    if !accounts::delete_account(&state.db, current.id(), id).await? {
        return Err(AppError::NotFound("account"));
    }
    tracing::info!(user_id = current.id(), account_id = id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
