use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::does_not_exist;
use crate::backend::auth::CurrentUser;
use crate::backend::extract::{ApiPath, ApiQuery};
use crate::backend::AppState;
use crate::database::db::queries::imported_reports::{self, ReportOutcome};
use crate::database::db::queries::{accounts, credit_cards, transactions};
use crate::database::models::{
    ImportRequest, ImportStatus, ImportTarget, ImportedReport, NewTransaction,
};
use crate::error::{AppError, AppResult};
use crate::services::billing::BillingCycle;
use crate::services::statement_import::{self, StatementLine};

pub async fn list_reports(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<ImportedReport>>> {
    Ok(Json(imported_reports::list_reports(&state.db, current.id()).await?))
}

pub async fn get_report(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ImportedReport>> {
    imported_reports::get_report(&state.db, current.id(), id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("imported report"))
}

fn imported_transaction(
    line: &StatementLine,
    target: ImportTarget,
    cycle: Option<&BillingCycle>,
    origin: &str,
) -> NewTransaction {
    NewTransaction {
        transaction_type: line.transaction_type,
        amount: line.amount,
        description: line.description.clone(),
        occurred_at: line.occurred_at,
        charge_at_card: cycle.map(|cycle| cycle.charge_date(line.occurred_at)),
        account_id: target.account_id(),
        credit_card_id: target.credit_card_id(),
        category_id: None,
        subcategory_id: None,
        tag_ids: Vec::new(),
        need_review: true,
        origin: origin.to_string(),
        installments_total: 1,
        installment_number: 1,
        installment_group_id: None,
    }
}

/// Books every readable row of an uploaded statement on one account or card.
/// Imported rows are flagged for review and carry the file name as origin.
/// Unreadable rows are skipped and listed on the report.
pub async fn import_statement(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(request): ApiQuery<ImportRequest>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let (file_name, target) = request.validate()?;
    if body.is_empty() {
        return Err(AppError::field("file", "The submitted file is empty."));
    }

    let mut tx = state.db.begin().await?;
    let cycle = match target {
        ImportTarget::Account(id) => {
            match accounts::get_account(&mut *tx, current.id(), id).await? {
                None => return Err(AppError::field("account_id", does_not_exist(id))),
                Some(account) if !account.is_active => {
                    return Err(AppError::field("account_id", "This account is inactive."))
                }
                Some(_) => None,
            }
        }
        ImportTarget::CreditCard(id) => {
            match credit_cards::get_credit_card(&mut *tx, current.id(), id).await? {
                None => return Err(AppError::field("credit_card_id", does_not_exist(id))),
                Some(card) if !card.is_active => {
                    return Err(AppError::field(
                        "credit_card_id",
                        "This credit card is inactive.",
                    ))
                }
                Some(card) => Some(card.billing_cycle()),
            }
        }
    };

    let report_id =
        imported_reports::start_report(&mut *tx, current.id(), &file_name, target).await?;

    let (handler_type, imported, row_errors, status, failed_reason) =
        match statement_import::parse_statement(&body) {
            Ok(parsed) => {
                for line in &parsed.lines {
                    let new = imported_transaction(line, target, cycle.as_ref(), &file_name);
                    transactions::insert_transaction(&mut *tx, current.id(), &new).await?;
                }
                let (status, reason) =
                    ImportStatus::settle(parsed.lines.len(), parsed.errors.len());
                (
                    parsed.format.handler_type(),
                    parsed.lines.len(),
                    parsed.errors,
                    status,
                    reason,
                )
            }
            Err(err) => ("", 0, Vec::new(), ImportStatus::Failed, err.to_string()),
        };

    let report = imported_reports::finish_report(
        &mut *tx,
        current.id(),
        report_id,
        &ReportOutcome {
            status,
            handler_type,
            failed_reason: &failed_reason,
            success_count: i32::try_from(imported).unwrap_or(i32::MAX),
            errors: &row_errors,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        user_id = current.id(),
        report_id,
        file_name = %report.file_name,
        handler_type,
        status = status.as_str(),
        imported,
        errors = row_errors.len(),
        "statement imported"
    );
    Ok((StatusCode::CREATED, Json(report)))
}
