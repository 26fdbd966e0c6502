use sqlx::types::Json;
use sqlx::PgExecutor;

use crate::database::models::{ImportStatus, ImportTarget, ImportedReport};

const REPORT_COLUMNS: &str = "id, user_id, account_id, credit_card_id, status, file_name, \
                              handler_type, failed_reason, success_count, error_count, errors, \
                              created_at, updated_at, processed_at";

/*========== Imported Report Queries ==========*/

pub async fn list_reports(
    db: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Vec<ImportedReport>, sqlx::Error> {
    sqlx::query_as::<_, ImportedReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM imported_reports WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn get_report(
    db: impl PgExecutor<'_>,
    user_id: i64,
    report_id: i64,
) -> Result<Option<ImportedReport>, sqlx::Error> {
    sqlx::query_as::<_, ImportedReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM imported_reports WHERE id = $1 AND user_id = $2"
    ))
    .bind(report_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Opens a report in `PROCESSING` state.
pub async fn start_report(
    db: impl PgExecutor<'_>,
    user_id: i64,
    file_name: &str,
    target: ImportTarget,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO imported_reports (user_id, account_id, credit_card_id, status, file_name)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(target.account_id())
    .bind(target.credit_card_id())
    .bind(ImportStatus::Processing.as_str())
    .bind(file_name)
    .fetch_one(db)
    .await
}

/// What processing a file produced, written back onto its report.
#[derive(Debug, Clone)]
pub struct ReportOutcome<'a> {
    pub status: ImportStatus,
    pub handler_type: &'a str,
    pub failed_reason: &'a str,
    pub success_count: i32,
    pub errors: &'a [String],
}

pub async fn finish_report(
    db: impl PgExecutor<'_>,
    user_id: i64,
    report_id: i64,
    outcome: &ReportOutcome<'_>,
) -> Result<ImportedReport, sqlx::Error> {
    sqlx::query_as::<_, ImportedReport>(&format!(
        r#"
        UPDATE imported_reports
        SET status = $3, handler_type = $4, failed_reason = $5,
            success_count = $6, error_count = $7, errors = $8,
            processed_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING {REPORT_COLUMNS}
        "#
    ))
    .bind(report_id)
    .bind(user_id)
    .bind(outcome.status.as_str())
    .bind(outcome.handler_type)
    .bind(outcome.failed_reason)
    .bind(outcome.success_count)
    .bind(i32::try_from(outcome.errors.len()).unwrap_or(i32::MAX))
    .bind(Json(outcome.errors))
    .fetch_one(db)
    .await
}
