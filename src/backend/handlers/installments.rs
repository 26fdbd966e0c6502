use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::check_references;
use crate::backend::auth::CurrentUser;
use crate::backend::extract::{ApiJson, ApiPath};
use crate::backend::AppState;
use crate::database::db::queries::{credit_cards, transactions};
use crate::database::models::{
    serialize_money, zero_money, InstallmentPayload, NewTransaction, Transaction,
    TransactionResponse,
};
use crate::error::{AppError, AppResult};
use crate::services::installments::{self, Funding, SplitError};

#[derive(Debug, Serialize)]
pub struct InstallmentPlan {
    pub installment_group_id: Option<Uuid>,
    #[serde(serialize_with = "serialize_money")]
    pub principal: Decimal,
    pub installments_total: i32,
    pub installments: Vec<TransactionResponse>,
}

impl InstallmentPlan {
    fn new(group_id: Option<Uuid>, installments: Vec<TransactionResponse>) -> Self {
        Self {
            installment_group_id: group_id,
            principal: installments
                .iter()
                .fold(zero_money(), |acc, t| acc + t.amount),
            installments_total: installments.len() as i32,
            installments,
        }
    }
}

fn split_error(err: SplitError) -> AppError {
    AppError::field(err.field(), err.to_string())
}

/// Books a purchase as `installments` transactions sharing one group id.
pub async fn create_plan(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<InstallmentPayload>,
) -> AppResult<impl IntoResponse> {
    let InstallmentPayload {
        principal,
        installments: count,
        mut transaction,
    } = payload;

    let first_charge = transaction.charge_at_card.flatten();
    transaction.amount = principal;
    let base = transaction.into_new(None).map_err(|mut errors| {
        errors.rename("amount", "principal");
        errors
    });

    let (mut base, principal, count) = match (base, principal, count) {
        (Ok(base), Some(principal), Some(count)) => {
            installments::split_principal(principal, count).map_err(split_error)?;
            (base, principal, count)
        }
        (base, principal, count) => {
            let mut errors = base.err().unwrap_or_default();
            if principal.is_none() && errors.get("principal").is_none() {
                errors.add("principal", "This field is required.");
            }
            if count.is_none() {
                errors.add("installments", "This field is required.");
            }
            return Err(errors.into());
        }
    };

    let mut tx = state.db.begin().await?;
    check_references(&mut *tx, current.id(), &mut base, None)
        .await?
        .into_result()?;

    let funding = match base.credit_card_id {
        Some(card_id) => {
            let card = credit_cards::get_credit_card(&mut *tx, current.id(), card_id)
                .await?
                .ok_or(AppError::NotFound("credit card"))?;
            Funding::Card {
                cycle: card.billing_cycle(),
                first_charge,
            }
        }
        None => Funding::Account,
    };
    let planned =
        installments::plan(principal, count, base.occurred_at, funding).map_err(split_error)?;

    let total = planned.len() as i32;
    let group_id = (total > 1).then(Uuid::new_v4);
    let mut ids = Vec::with_capacity(planned.len());
    for part in planned {
        let row = NewTransaction {
            amount: part.amount,
            occurred_at: part.occurred_at,
            charge_at_card: part.charge_at_card,
            installments_total: total,
            installment_number: part.number,
            installment_group_id: group_id,
            ..base.clone()
        };
        ids.push(transactions::insert_transaction(&mut *tx, current.id(), &row).await?);
    }
    tx.commit().await?;

    tracing::info!(
        user_id = current.id(),
        installment_group_id = ?group_id,
        installments = total,
        principal = %principal,
        "installment plan created"
    );

    let rows = transactions::get_transactions_by_ids(&state.db, current.id(), &ids).await?;
    let responses = transactions::with_tags(&state.db, rows).await?;
    Ok((StatusCode::CREATED, Json(InstallmentPlan::new(group_id, responses))))
}

async fn load_group(state: &AppState, user_id: i64, group_id: Uuid) -> AppResult<Vec<Transaction>> {
    let rows = transactions::list_installment_group(&state.db, user_id, group_id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("installment plan"));
    }
    Ok(rows)
}

pub async fn get_plan(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(group_id): ApiPath<Uuid>,
) -> AppResult<Json<InstallmentPlan>> {
    let rows = load_group(&state, current.id(), group_id).await?;
    let responses = transactions::with_tags(&state.db, rows).await?;
    Ok(Json(InstallmentPlan::new(Some(group_id), responses)))
}

/// Removes every part of the plan, reverting account balances, in one go.
pub async fn delete_plan(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(group_id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    let mut tx = state.db.begin().await?;
    let rows = transactions::list_installment_group(&mut *tx, current.id(), group_id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("installment plan"));
    }
    for row in &rows {
        transactions::delete_transaction(&mut *tx, current.id(), row).await?;
    }
    tx.commit().await?;

    tracing::info!(
        user_id = current.id(),
        installment_group_id = %group_id,
        deleted = rows.len(),
        "installment plan deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
