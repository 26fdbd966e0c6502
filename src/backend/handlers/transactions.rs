use std::collections::{BTreeSet, HashMap};

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use super::check_references;
use crate::backend::auth::CurrentUser;
use crate::backend::extract::{ApiJson, ApiPath, ApiQuery};
use crate::backend::pagination::{Page, Pagination};
use crate::backend::AppState;
use crate::database::db::queries::transactions;
use crate::database::models::{
    BulkUpdateRequest, Transaction, TransactionFilter, TransactionPayload, TransactionResponse,
    TransactionType,
};
use crate::error::{AppError, AppResult};

async fn fetch_response(
    state: &AppState,
    user_id: i64,
    id: i64,
) -> AppResult<TransactionResponse> {
    let row = transactions::get_transaction(&state.db, user_id, id)
        .await?
        .ok_or(AppError::NotFound("transaction"))?;
    transactions::with_tags(&state.db, vec![row])
        .await?
        .pop()
        .ok_or(AppError::NotFound("transaction"))
}

async fn list_page(
    state: &AppState,
    user_id: i64,
    filter: TransactionFilter,
    uri: &axum::http::Uri,
) -> AppResult<Page<TransactionResponse>> {
    if let Some(raw) = filter.transaction_type.as_deref() {
        if TransactionType::parse(raw).is_none() {
            return Err(AppError::field(
                "transaction_type",
                format!("Select a valid choice. {raw} is not one of the available choices."),
            ));
        }
    }
    let pagination = Pagination::new(filter.page, filter.page_size)?;

    let count = transactions::count_transactions(&state.db, user_id, &filter).await?;
    pagination.check_in_range(count)?;

    let rows = transactions::list_transactions(
        &state.db,
        user_id,
        &filter,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    let results = transactions::with_tags(&state.db, rows).await?;
    Ok(Page::new(uri, pagination, count, results))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    current: CurrentUser,
    OriginalUri(uri): OriginalUri,
    ApiQuery(filter): ApiQuery<TransactionFilter>,
) -> AppResult<Json<Page<TransactionResponse>>> {
    Ok(Json(list_page(&state, current.id(), filter, &uri).await?))
}

pub async fn needing_review(
    State(state): State<AppState>,
    current: CurrentUser,
    OriginalUri(uri): OriginalUri,
    ApiQuery(mut filter): ApiQuery<TransactionFilter>,
) -> AppResult<Json<Page<TransactionResponse>>> {
    filter.need_review = Some(true);
    Ok(Json(list_page(&state, current.id(), filter, &uri).await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<TransactionPayload>,
) -> AppResult<impl IntoResponse> {
    let mut new = payload.into_new(None)?;

    let mut tx = state.db.begin().await?;
    check_references(&mut *tx, current.id(), &mut new, None)
        .await?
        .into_result()?;
    let id = transactions::insert_transaction(&mut *tx, current.id(), &new).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = current.id(),
        transaction_id = id,
        amount = %new.amount,
        "transaction created"
    );
    let response = fetch_response(&state, current.id(), id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<TransactionResponse>> {
    Ok(Json(fetch_response(&state, current.id(), id).await?))
}

pub async fn replace_transaction(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<TransactionPayload>,
) -> AppResult<Json<TransactionResponse>> {
    write_transaction(state, current, id, payload, false).await
}

pub async fn patch_transaction(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<TransactionPayload>,
) -> AppResult<Json<TransactionResponse>> {
    write_transaction(state, current, id, payload, true).await
}

async fn write_transaction(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TransactionPayload>,
    partial: bool,
) -> AppResult<Json<TransactionResponse>> {
    let mut tx = state.db.begin().await?;
    let stored = transactions::get_transactions_for_update(&mut *tx, current.id(), &[id])
        .await?
        .pop()
        .ok_or(AppError::NotFound("transaction"))?;

    let mut new = if partial {
        let tag_ids = transactions::tag_ids_of(&mut *tx, id).await?;
        payload.into_new(Some((&stored, tag_ids.as_slice())))?
    } else {
        let mut new = payload.into_new(None)?;
        // a full rewrite still belongs to the same plan
        new.installments_total = stored.installments_total;
        new.installment_number = stored.installment_number;
        new.installment_group_id = stored.installment_group_id;
        new
    };

    check_references(&mut *tx, current.id(), &mut new, Some(&stored))
        .await?
        .into_result()?;
    transactions::update_transaction(&mut *tx, current.id(), &stored, &new).await?;
    tx.commit().await?;

    tracing::info!(user_id = current.id(), transaction_id = id, partial, "transaction updated");
    Ok(Json(fetch_response(&state, current.id(), id).await?))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    let mut tx = state.db.begin().await?;
    let stored = transactions::get_transactions_for_update(&mut *tx, current.id(), &[id])
        .await?
        .pop()
        .ok_or(AppError::NotFound("transaction"))?;
    if !transactions::delete_transaction(&mut *tx, current.id(), &stored).await? {
        return Err(AppError::NotFound("transaction"));
    }
    tx.commit().await?;

    tracing::info!(user_id = current.id(), transaction_id = id, "transaction deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct BulkUpdateResponse {
    pub updated_count: usize,
    pub transactions: Vec<TransactionResponse>,
}

/// Applies every item or none. Ownership is checked for the whole batch first;
/// per-item validation errors are collected and reported together.
pub async fn bulk_update(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<BulkUpdateRequest>,
) -> AppResult<Json<BulkUpdateResponse>> {
    if request.transactions.is_empty() {
        return Err(AppError::field("transactions", "This list may not be empty."));
    }
    let ids: Vec<i64> = request.transactions.iter().map(|item| item.id).collect();
    let unique: BTreeSet<i64> = ids.iter().copied().collect();
    if unique.len() != ids.len() {
        return Err(AppError::field(
            "transactions",
            "Each transaction may appear only once.",
        ));
    }
    let ids: Vec<i64> = unique.into_iter().collect();

    let mut tx = state.db.begin().await?;
    let stored: HashMap<i64, Transaction> =
        transactions::get_transactions_for_update(&mut *tx, current.id(), &ids)
            .await?
            .into_iter()
            .map(|row| (row.id, row))
            .collect();

    let missing: Vec<i64> = ids
        .iter()
        .copied()
        .filter(|id| !stored.contains_key(id))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::BadRequest {
            message: "Some transactions were not found.".to_string(),
            details: json!({ "missing_transaction_ids": missing }),
        });
    }

    let mut item_errors: Vec<Value> = Vec::new();
    for item in request.transactions {
        let Some(row) = stored.get(&item.id) else {
            continue;
        };
        let tag_ids = transactions::tag_ids_of(&mut *tx, item.id).await?;
        let mut new = match item.fields.into_new(Some((row, tag_ids.as_slice()))) {
            Ok(new) => new,
            Err(errors) => {
                item_errors.push(json!({ "transaction_id": item.id, "errors": errors }));
                continue;
            }
        };
        let errors = check_references(&mut *tx, current.id(), &mut new, Some(row)).await?;
        if !errors.is_empty() {
            item_errors.push(json!({ "transaction_id": item.id, "errors": errors }));
            continue;
        }
        transactions::update_transaction(&mut *tx, current.id(), row, &new).await?;
    }

    if !item_errors.is_empty() {
        // dropping `tx` rolls back the items that did apply
        return Err(AppError::BadRequest {
            message: "Bulk update failed; no transactions were changed.".to_string(),
            details: json!({ "transaction_errors": item_errors }),
        });
    }
    tx.commit().await?;
    tracing::info!(user_id = current.id(), updated = ids.len(), "transactions bulk updated");

    let rows = transactions::get_transactions_by_ids(&state.db, current.id(), &ids).await?;
    let transactions = transactions::with_tags(&state.db, rows).await?;
    Ok(Json(BulkUpdateResponse {
        updated_count: transactions.len(),
        transactions,
    }))
}
