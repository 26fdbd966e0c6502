//! Error type shared by every handler and its mapping onto HTTP responses.
//!
//! All failures leave the server in the same envelope:
//!
//! ```json
//! {"error": {"code": "validation_failed", "message": "validation failed", "details": {...}}}
//! ```

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Field name to list of messages, as reported back to the client.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Moves the messages of `from` under `to`, e.g. when one request field is
    /// validated through another one's rules.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(messages) = self.0.remove(from) {
            self.0.entry(to.to_string()).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was collected, otherwise a validation error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationFailed,
    BadRequest,
    InvalidRequest,
    Unauthorized,
    NotFound,
    InternalError,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    /// A request that is well-formed but rejected as a whole, with optional
    /// structured details (for example per-item errors of a bulk update).
    #[error("{message}")]
    BadRequest { message: String, details: Value },

    /// Body, query string or path could not be decoded.
    #[error("{1}")]
    InvalidRequest(StatusCode, String),

    #[error("authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: Value::Null,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(status, _) => *status,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(err) if unique_violation_field(err).is_some() => StatusCode::BAD_REQUEST,
            Self::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        let (code, message, details) = match self {
            Self::Validation(fields) => (
                ErrorCode::ValidationFailed,
                self.to_string(),
                json!({ "field_errors": fields }),
            ),
            Self::BadRequest { message, details } => {
                (ErrorCode::BadRequest, message.clone(), details.clone())
            }
            Self::InvalidRequest(_, message) => {
                (ErrorCode::InvalidRequest, message.clone(), Value::Null)
            }
            Self::Unauthorized => (ErrorCode::Unauthorized, self.to_string(), Value::Null),
            Self::NotFound(_) => (ErrorCode::NotFound, self.to_string(), Value::Null),
            Self::Database(err) => match unique_violation_field(err) {
                Some(field) => (
                    ErrorCode::ValidationFailed,
                    "validation failed".to_string(),
                    json!({ "field_errors": FieldErrors::single(field, "already exists") }),
                ),
                None if matches!(err, sqlx::Error::RowNotFound) => (
                    ErrorCode::NotFound,
                    "record not found".to_string(),
                    Value::Null,
                ),
                None => (
                    ErrorCode::InternalError,
                    "internal server error".to_string(),
                    Value::Null,
                ),
            },
            Self::Internal(_) => (
                ErrorCode::InternalError,
                "internal server error".to_string(),
                Value::Null,
            ),
        };
        json!({ "error": { "code": code, "message": message, "details": details } })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, debug = ?self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

/// Maps a unique-constraint violation onto the field the client sent.
fn unique_violation_field(err: &sqlx::Error) -> Option<&'static str> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    let constraint = db_err.constraint().unwrap_or_default();
    Some(if constraint.contains("username") {
        "username"
    } else if constraint.contains("position") {
        "position"
    } else {
        "name"
    })
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(StatusCode::NOT_FOUND, rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            AppError::field("name", "required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("account").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_body_lists_field_messages() {
        let mut fields = FieldErrors::new();
        fields.add("amount", "must be greater than zero");
        fields.add("amount", "at most 2 decimal places");
        fields.add("occurred_at", "required");
        let body = AppError::Validation(fields).body();

        assert_eq!(body["error"]["code"], "validation_failed");
        let amount = body["error"]["details"]["field_errors"]["amount"]
            .as_array()
            .expect("amount messages");
        assert_eq!(amount.len(), 2);
        assert_eq!(
            body["error"]["details"]["field_errors"]["occurred_at"][0],
            "required"
        );
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let body = AppError::Internal(anyhow::anyhow!("password=hunter2")).body();
        assert_eq!(body["error"]["message"], "internal server error");
        assert!(!body.to_string().contains("hunter2"));
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        let err = FieldErrors::single("name", "required").into_result().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn query_rejections_keep_the_extractor_status() {
        #[allow(dead_code)]
        #[derive(Debug, serde::Deserialize)]
        struct Paging {
            page: u32,
        }

        let uri: axum::http::Uri = "/transactions?page=abc".parse().unwrap();
        let rejection = axum::extract::Query::<Paging>::try_from_uri(&uri).unwrap_err();
        let status = rejection.status();
        let err = AppError::from(rejection);
        assert_eq!(err.status_code(), status);
        assert_eq!(err.body()["error"]["code"], "invalid_request");
    }
}
