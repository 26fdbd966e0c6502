use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::UnknownVariant;
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportStatus {
    Sent,
    Processing,
    Imported,
    Failed,
}

impl ImportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportStatus::Sent => "SENT",
            ImportStatus::Processing => "PROCESSING",
            ImportStatus::Imported => "IMPORTED",
            ImportStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SENT" => Some(ImportStatus::Sent),
            "PROCESSING" => Some(ImportStatus::Processing),
            "IMPORTED" => Some(ImportStatus::Imported),
            "FAILED" => Some(ImportStatus::Failed),
            _ => None,
        }
    }

    /// Final status and failure reason of a processed file.
    pub fn settle(success_count: usize, error_count: usize) -> (Self, String) {
        match (success_count, error_count) {
            (_, 0) if success_count > 0 => (ImportStatus::Imported, String::new()),
            (_, 0) => (
                ImportStatus::Failed,
                "No transactions were imported".to_string(),
            ),
            (_, errors) => (
                ImportStatus::Failed,
                format!("Import completed with {errors} errors. See errors list for details."),
            ),
        }
    }
}

impl TryFrom<String> for ImportStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownVariant {
            kind: "import_status",
            value,
        })
    }
}

/// One uploaded statement file and what became of its rows.
#[derive(FromRow, Debug, Clone, Serialize)]
pub struct ImportedReport {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub account_id: Option<i64>,
    pub credit_card_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: ImportStatus,
    pub file_name: String,
    pub handler_type: String,
    pub failed_reason: String,
    pub success_count: i32,
    pub error_count: i32,
    #[sqlx(json)]
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Query string of `POST /transactions/import-report`; the file itself is
/// the request body.
#[derive(Debug, Default, Deserialize)]
pub struct ImportRequest {
    pub file_name: Option<String>,
    pub account_id: Option<i64>,
    pub credit_card_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    Account(i64),
    CreditCard(i64),
}

impl ImportTarget {
    pub fn account_id(self) -> Option<i64> {
        match self {
            ImportTarget::Account(id) => Some(id),
            ImportTarget::CreditCard(_) => None,
        }
    }

    pub fn credit_card_id(self) -> Option<i64> {
        match self {
            ImportTarget::CreditCard(id) => Some(id),
            ImportTarget::Account(_) => None,
        }
    }
}

impl ImportRequest {
    /// The file's base name and where its transactions are booked.
    pub fn validate(self) -> Result<(String, ImportTarget), FieldErrors> {
        let mut errors = FieldErrors::new();

        let file_name = self
            .file_name
            .as_deref()
            .map(|name| name.rsplit(['/', '\\']).next().unwrap_or(name).trim())
            .unwrap_or_default()
            .to_string();
        if file_name.is_empty() {
            errors.add("file_name", "This field is required.");
        } else if file_name.chars().count() > 255 {
            errors.add("file_name", "Ensure this field has no more than 255 characters.");
        } else if !file_name.to_lowercase().ends_with(".csv") {
            errors.add("file_name", "File must be a CSV file (.csv extension).");
        }

        let target = match (self.account_id, self.credit_card_id) {
            (Some(id), None) => Some(ImportTarget::Account(id)),
            (None, Some(id)) => Some(ImportTarget::CreditCard(id)),
            (Some(_), Some(_)) => {
                errors.add(
                    "non_field_errors",
                    "Cannot specify both account_id and credit_card_id.",
                );
                None
            }
            (None, None) => {
                errors.add(
                    "non_field_errors",
                    "Either account_id or credit_card_id is required.",
                );
                None
            }
        };

        match target {
            Some(target) if errors.is_empty() => Ok((file_name, target)),
            _ => Err(errors),
        }
    }
}
