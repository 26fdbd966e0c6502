use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::backend::auth::CurrentUser;
use crate::backend::extract::{ApiJson, ApiPath, ApiQuery};
use crate::backend::AppState;
use crate::database::db::queries::{credit_cards, transactions};
use crate::database::models::{
    serialize_money, serialize_opt_money, zero_money, CreditCard, CreditCardFilter,
    CreditCardPayload, TransactionResponse,
};
use crate::error::{AppError, AppResult};
use crate::services::billing::YearMonth;

pub async fn list_credit_cards(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(filter): ApiQuery<CreditCardFilter>,
) -> AppResult<Json<Vec<CreditCard>>> {
    let rows = credit_cards::list_credit_cards(&state.db, current.id(), &filter).await?;
    Ok(Json(rows))
}

pub async fn create_credit_card(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<CreditCardPayload>,
) -> AppResult<impl IntoResponse> {
    let fields = payload.into_fields(None)?;
    let card = credit_cards::create_credit_card(&state.db, current.id(), &fields).await?;
    tracing::info!(user_id = current.id(), credit_card_id = card.id, "credit card created");
    Ok((StatusCode::CREATED, Json(card)))
}

async fn fetch_card(state: &AppState, user_id: i64, id: i64) -> AppResult<CreditCard> {
    credit_cards::get_credit_card(&state.db, user_id, id)
        .await?
        .ok_or(AppError::NotFound("credit card"))
}

pub async fn get_credit_card(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<CreditCard>> {
    Ok(Json(fetch_card(&state, current.id(), id).await?))
}

pub async fn replace_credit_card(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<CreditCardPayload>,
) -> AppResult<Json<CreditCard>> {
    write_credit_card(state, current, id, payload, false).await
}

pub async fn patch_credit_card(
    state: State<AppState>,
    current: CurrentUser,
    id: ApiPath<i64>,
    payload: ApiJson<CreditCardPayload>,
) -> AppResult<Json<CreditCard>> {
    write_credit_card(state, current, id, payload, true).await
}

async fn write_credit_card(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CreditCardPayload>,
    partial: bool,
) -> AppResult<Json<CreditCard>> {
    let stored = fetch_card(&state, current.id(), id).await?;
    let fields = payload.into_fields(partial.then_some(&stored))?;

    let card = credit_cards::update_credit_card(&state.db, current.id(), id, &fields)
        .await?
        .ok_or(AppError::NotFound("credit card"))?;
    tracing::info!(user_id = current.id(), credit_card_id = id, partial, "credit card updated");
    Ok(Json(card))
}

pub async fn delete_credit_card(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    if !credit_cards::delete_credit_card(&state.db, current.id(), id).await? {
        return Err(AppError::NotFound("credit card"));
    }
    tracing::info!(user_id = current.id(), credit_card_id = id, "credit card deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct BillQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Bill {
    pub credit_card: CreditCard,
    pub year: i32,
    pub month: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub close_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(serialize_with = "serialize_money")]
    pub total: Decimal,
    #[serde(serialize_with = "serialize_opt_money")]
    pub credit_limit: Option<Decimal>,
    #[serde(serialize_with = "serialize_opt_money")]
    pub available_limit: Option<Decimal>,
    pub transactions: Vec<TransactionResponse>,
}

/// The statement charged in `year-month` (the current month by default).
pub async fn get_bill(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<BillQuery>,
) -> AppResult<Json<Bill>> {
    let today = YearMonth::of(Utc::now().date_naive());
    let year = query.year.unwrap_or(today.year);
    if !(1900..=2100).contains(&year) {
        return Err(AppError::field("year", "Year must be between 1900 and 2100."));
    }
    let month = YearMonth::new(year, query.month.unwrap_or(today.month))
        .ok_or_else(|| AppError::field("month", "Month must be between 1 and 12."))?;

    let card = fetch_card(&state, current.id(), id).await?;
    let statement = card.billing_cycle().statement(month);

    let rows = transactions::list_card_charges(
        &state.db,
        current.id(),
        card.id,
        month.first_day(),
        month.last_day(),
    )
    .await?;
    let total = rows.iter().fold(zero_money(), |acc, t| {
        acc - t.transaction_type.balance_delta(t.amount)
    });

    let available_limit = match card.credit_limit {
        Some(limit) => {
            let open =
                credit_cards::open_charges(&state.db, current.id(), card.id, month.first_day())
                    .await?;
            Some(limit - open)
        }
        None => None,
    };

    let transactions = transactions::with_tags(&state.db, rows).await?;
    Ok(Json(Bill {
        year,
        month: month.month,
        period_start: statement.period_start,
        period_end: statement.period_end,
        close_date: statement.close_date,
        due_date: statement.due_date,
        total,
        credit_limit: card.credit_limit,
        available_limit,
        transactions,
        credit_card: card,
    }))
}
