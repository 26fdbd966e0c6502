use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{check_name, merge, serialize_money, UnknownVariant};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
    Investment,
    Wallet,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Checking,
        AccountType::Savings,
        AccountType::Investment,
        AccountType::Wallet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Investment => "investment",
            AccountType::Wallet => "wallet",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl TryFrom<String> for AccountType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownVariant {
            kind: "account_type",
            value,
        })
    }
}

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub name: String,
    #[serde(serialize_with = "serialize_money")]
    pub current_balance: Decimal, // maintained by transaction writes only
    #[sqlx(try_from = "String")]
    pub account_type: AccountType,
    pub currency: String, // ISO 4217, e.g. BRL
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for create, PUT and PATCH. `current_balance` is read-only and
/// ignored when sent.
#[derive(Debug, Default, Deserialize)]
pub struct AccountPayload {
    pub name: Option<String>,
    pub account_type: Option<String>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountFilter {
    pub is_active: Option<bool>,
    pub account_type: Option<String>,
    pub currency: Option<String>,
}

/// Validated column values ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountFields {
    pub name: String,
    pub account_type: AccountType,
    pub currency: String,
    pub is_active: bool,
}

impl AccountPayload {
    /// `current` is the stored row for PATCH, `None` for create and PUT.
    pub fn into_fields(self, current: Option<&Account>) -> Result<AccountFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = merge(self.name, current.map(|a| &a.name));
        check_name(&mut errors, "name", name.as_deref(), 100);

        let account_type = match self.account_type.as_deref() {
            Some(raw) => AccountType::parse(raw).unwrap_or_else(|| {
                errors.add("account_type", format!("\"{raw}\" is not a valid choice."));
                AccountType::default()
            }),
            None => current.map(|a| a.account_type).unwrap_or_default(),
        };

        let currency = merge(self.currency, current.map(|a| &a.currency))
            .unwrap_or_else(|| "BRL".to_string())
            .trim()
            .to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.add("currency", "Currency must be a 3-letter code.");
        }

        let is_active = self
            .is_active
            .or(current.map(|a| a.is_active))
            .unwrap_or(true);

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(AccountFields {
            name: name.unwrap_or_default().trim().to_string(),
            account_type,
            currency,
            is_active,
        })
    }
}
