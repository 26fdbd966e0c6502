// each transaction can carry several tags

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::check_name;
use crate::error::FieldErrors;

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Tag {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TagPayload {
    pub name: Option<String>,
}

impl TagPayload {
    pub fn into_name(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "name", self.name.as_deref(), 50);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(self.name.unwrap_or_default().trim().to_string())
    }
}
