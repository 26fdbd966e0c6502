use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{check_money, check_name, double_option, merge, serialize_opt_money};
use crate::error::FieldErrors;
use crate::services::billing::BillingCycle;

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct CreditCard {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub name: String,
    pub close_day: i32, // statement closing day, 1..=31
    pub due_day: i32,   // payment due day, 1..=31
    #[serde(serialize_with = "serialize_opt_money")]
    pub credit_limit: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditCard {
    pub fn billing_cycle(&self) -> BillingCycle {
        BillingCycle::new(self.close_day as u32, self.due_day as u32)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreditCardPayload {
    pub name: Option<String>,
    pub close_day: Option<i32>,
    pub due_day: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub credit_limit: Option<Option<Decimal>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreditCardFilter {
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreditCardFields {
    pub name: String,
    pub close_day: i32,
    pub due_day: i32,
    pub credit_limit: Option<Decimal>,
    pub is_active: bool,
}

fn check_day(errors: &mut FieldErrors, field: &str, value: Option<i32>) {
    match value {
        None => errors.add(field, "This field is required."),
        Some(day) if !(1..=31).contains(&day) => {
            errors.add(field, "Day must be between 1 and 31.")
        }
        Some(_) => {}
    }
}

impl CreditCardPayload {
    pub fn into_fields(self, current: Option<&CreditCard>) -> Result<CreditCardFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = merge(self.name, current.map(|c| &c.name));
        check_name(&mut errors, "name", name.as_deref(), 100);

        let close_day = self.close_day.or(current.map(|c| c.close_day));
        let due_day = self.due_day.or(current.map(|c| c.due_day));
        check_day(&mut errors, "close_day", close_day);
        check_day(&mut errors, "due_day", due_day);

        let credit_limit = match self.credit_limit {
            Some(limit) => limit,
            None => current.and_then(|c| c.credit_limit),
        };
        if let Some(limit) = credit_limit {
            if limit.is_sign_negative() {
                errors.add("credit_limit", "Ensure this value is greater than or equal to 0.");
            }
            check_money(&mut errors, "credit_limit", limit);
        }

        let is_active = self
            .is_active
            .or(current.map(|c| c.is_active))
            .unwrap_or(true);

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(CreditCardFields {
            name: name.unwrap_or_default().trim().to_string(),
            close_day: close_day.unwrap_or(1),
            due_day: due_day.unwrap_or(1),
            credit_limit,
            is_active,
        })
    }
}
