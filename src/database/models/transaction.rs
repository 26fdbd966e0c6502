use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{check_money, double_option, serialize_money, UnknownVariant};
use crate::error::FieldErrors;

pub const MAX_DESCRIPTION_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
            TransactionType::Transfer => "TRANSFER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INCOME" => Some(TransactionType::Income),
            "EXPENSE" => Some(TransactionType::Expense),
            "TRANSFER" => Some(TransactionType::Transfer),
            _ => None,
        }
    }

    /// Signed effect of `amount` on the funding account's balance.
    /// Transfers leave the account they are booked on.
    pub fn balance_delta(self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Income => amount,
            TransactionType::Expense | TransactionType::Transfer => -amount,
        }
    }
}

impl TryFrom<String> for TransactionType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownVariant {
            kind: "transaction_type",
            value,
        })
    }
}

/// A transaction row with the display names of everything it references.
#[derive(FromRow, Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(try_from = "String")]
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub occurred_at: NaiveDate,
    pub charge_at_card: Option<NaiveDate>, // due date of the card bill it lands on
    pub account_id: Option<i64>,
    pub credit_card_id: Option<i64>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub installments_total: i32,
    pub installment_number: i32,
    pub installment_group_id: Option<Uuid>,
    pub need_review: bool,
    pub origin: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub account_name: Option<String>,
    pub credit_card_name: Option<String>,
    pub category_name: Option<String>,
    pub subcategory_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

fn named(id: Option<i64>, name: Option<String>) -> Option<NamedRef> {
    Some(NamedRef {
        id: id?,
        name: name.unwrap_or_default(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub transaction_type: TransactionType,
    #[serde(serialize_with = "serialize_money")]
    pub amount: Decimal,
    pub description: Option<String>,
    pub occurred_at: NaiveDate,
    pub charge_at_card: Option<NaiveDate>,
    pub account: Option<NamedRef>,
    pub credit_card: Option<NamedRef>,
    pub category: Option<NamedRef>,
    pub subcategory: Option<NamedRef>,
    pub tags: Vec<NamedRef>,
    pub installments_total: i32,
    pub installment_number: i32,
    pub installment_group_id: Option<Uuid>,
    pub need_review: bool,
    pub origin: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionResponse {
    pub fn new(row: Transaction, tags: Vec<NamedRef>) -> Self {
        Self {
            id: row.id,
            transaction_type: row.transaction_type,
            amount: row.amount,
            description: row.description,
            occurred_at: row.occurred_at,
            charge_at_card: row.charge_at_card,
            account: named(row.account_id, row.account_name),
            credit_card: named(row.credit_card_id, row.credit_card_name),
            category: named(row.category_id, row.category_name),
            subcategory: named(row.subcategory_id, row.subcategory_name),
            tags,
            installments_total: row.installments_total,
            installment_number: row.installment_number,
            installment_group_id: row.installment_group_id,
            need_review: row.need_review,
            origin: row.origin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Body of create, PUT, PATCH and each bulk-update item. Nullable references
/// use [`double_option`] so PATCH can clear them.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionPayload {
    pub transaction_type: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub occurred_at: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub charge_at_card: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub account_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub credit_card_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub subcategory_id: Option<Option<i64>>,
    pub tag_ids: Option<Vec<i64>>,
    pub need_review: Option<bool>,
    pub origin: Option<String>,
}

/// Validated column values for an insert or a full rewrite of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub occurred_at: NaiveDate,
    pub charge_at_card: Option<NaiveDate>, // None on a card means "derive from the cycle"
    pub account_id: Option<i64>,
    pub credit_card_id: Option<i64>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub need_review: bool,
    pub origin: String,
    pub installments_total: i32,
    pub installment_number: i32,
    pub installment_group_id: Option<Uuid>,
}

fn pick<T: Clone>(patch: Option<Option<T>>, current: Option<T>) -> Option<T> {
    match patch {
        Some(value) => value,
        None => current,
    }
}

impl TransactionPayload {
    /// Checks everything that does not need the database. `current` carries
    /// the stored row and its tag ids for PATCH; create and PUT pass `None`.
    pub fn into_new(
        self,
        current: Option<(&Transaction, &[i64])>,
    ) -> Result<NewTransaction, FieldErrors> {
        let row = current.map(|(row, _)| row);
        let mut errors = FieldErrors::new();

        let transaction_type = match self.transaction_type.as_deref() {
            Some(raw) => {
                let parsed = TransactionType::parse(raw);
                if parsed.is_none() {
                    errors.add("transaction_type", format!("\"{raw}\" is not a valid choice."));
                }
                parsed
            }
            None => {
                let stored = row.map(|r| r.transaction_type);
                if stored.is_none() {
                    errors.add("transaction_type", "This field is required.");
                }
                stored
            }
        };

        let amount = self.amount.or(row.map(|r| r.amount));
        match amount {
            None => errors.add("amount", "This field is required."),
            Some(value) if value <= Decimal::ZERO => {
                errors.add("amount", "Ensure this value is greater than 0.")
            }
            Some(value) => check_money(&mut errors, "amount", value),
        }

        let description = pick(self.description, row.and_then(|r| r.description.clone()))
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description
            .as_deref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            errors.add(
                "description",
                format!("Ensure this field has no more than {MAX_DESCRIPTION_LEN} characters."),
            );
        }

        let occurred_at = self.occurred_at.or(row.map(|r| r.occurred_at));
        if occurred_at.is_none() {
            errors.add("occurred_at", "This field is required.");
        }

        let account_id = pick(self.account_id, row.and_then(|r| r.account_id));
        let credit_card_id = pick(self.credit_card_id, row.and_then(|r| r.credit_card_id));
        match (account_id, credit_card_id) {
            (Some(_), Some(_)) => errors.add(
                "non_field_errors",
                "A transaction cannot be associated with both an account and a credit card.",
            ),
            (None, None) => errors.add(
                "non_field_errors",
                "A transaction must be associated with an account or a credit card.",
            ),
            _ => {}
        }

        let card_changed = row.is_some_and(|r| r.credit_card_id != credit_card_id);
        let date_changed = row.is_some_and(|r| Some(r.occurred_at) != occurred_at);
        let single = row.map_or(true, |r| r.installments_total == 1);
        let charge_at_card = match self.charge_at_card {
            Some(explicit) => explicit,
            None if card_changed || (date_changed && single) => None,
            None => row.and_then(|r| r.charge_at_card),
        };
        let charge_at_card = if credit_card_id.is_none() {
            if matches!(self.charge_at_card, Some(Some(_))) {
                errors.add("charge_at_card", "Only credit card transactions have a charge date.");
            }
            None
        } else {
            charge_at_card
        };

        let category_id = pick(self.category_id, row.and_then(|r| r.category_id));
        let subcategory_id = pick(self.subcategory_id, row.and_then(|r| r.subcategory_id));
        if subcategory_id.is_some() && category_id.is_none() {
            errors.add("subcategory_id", "A subcategory requires its category to be selected.");
        }

        let mut tag_ids = match self.tag_ids {
            Some(ids) => ids,
            None => current.map(|(_, tags)| tags.to_vec()).unwrap_or_default(),
        };
        tag_ids.sort_unstable();
        tag_ids.dedup();

        let need_review = self
            .need_review
            .or(row.map(|r| r.need_review))
            .unwrap_or(false);
        let origin = self
            .origin
            .or(row.map(|r| r.origin.clone()))
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| "manual".to_string());
        if origin.chars().count() > 255 {
            errors.add("origin", "Ensure this field has no more than 255 characters.");
        }

        match (errors.is_empty(), transaction_type, amount, occurred_at) {
            (true, Some(transaction_type), Some(amount), Some(occurred_at)) => Ok(NewTransaction {
                transaction_type,
                amount,
                description,
                occurred_at,
                charge_at_card,
                account_id,
                credit_card_id,
                category_id,
                subcategory_id,
                tag_ids,
                need_review,
                origin,
                installments_total: row.map_or(1, |r| r.installments_total),
                installment_number: row.map_or(1, |r| r.installment_number),
                installment_group_id: row.and_then(|r| r.installment_group_id),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    #[serde(default)]
    pub transactions: Vec<BulkUpdateItem>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateItem {
    pub id: i64,
    #[serde(flatten)]
    pub fields: TransactionPayload,
}

/// Body of `POST /installments`: the purchase plus how to split it. Any
/// `amount` sent is ignored in favour of the computed parts.
#[derive(Debug, Deserialize)]
pub struct InstallmentPayload {
    pub principal: Option<Decimal>,
    pub installments: Option<u32>,
    #[serde(flatten)]
    pub transaction: TransactionPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub transaction_type: Option<String>,
    pub account_id: Option<i64>,
    pub credit_card_id: Option<i64>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub occurred_at: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub need_review: Option<bool>,
    #[serde(default)]
    pub inactive_categories: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn payload(json: &str) -> TransactionPayload {
        serde_json::from_str(json).unwrap()
    }

    fn stored_card_purchase() -> Transaction {
        Transaction {
            id: 10,
            user_id: 1,
            transaction_type: TransactionType::Expense,
            amount: Decimal::from_str("99.90").unwrap(),
            description: Some("Market".into()),
            occurred_at: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            charge_at_card: NaiveDate::from_ymd_opt(2025, 3, 10),
            account_id: None,
            credit_card_id: Some(4),
            category_id: Some(2),
            subcategory_id: None,
            installments_total: 1,
            installment_number: 1,
            installment_group_id: None,
            need_review: true,
            origin: "manual".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            account_name: None,
            credit_card_name: Some("Visa".into()),
            category_name: Some("Food".into()),
            subcategory_name: None,
        }
    }

    #[test]
    fn balance_delta_signs() {
        let ten = Decimal::from(10);
        assert_eq!(TransactionType::Income.balance_delta(ten), ten);
        assert_eq!(TransactionType::Expense.balance_delta(ten), -ten);
        assert_eq!(TransactionType::Transfer.balance_delta(ten), -ten);
    }

    #[test]
    fn exactly_one_funding_source() {
        let both = payload(
            r#"{"transaction_type":"EXPENSE","amount":"10.00","occurred_at":"2025-01-05",
                "account_id":1,"credit_card_id":2}"#,
        )
        .into_new(None)
        .unwrap_err();
        assert!(both.get("non_field_errors").is_some());

        let neither = payload(
            r#"{"transaction_type":"EXPENSE","amount":"10.00","occurred_at":"2025-01-05"}"#,
        )
        .into_new(None)
        .unwrap_err();
        assert!(neither.get("non_field_errors").is_some());
    }

    #[test]
    fn amount_must_be_positive_with_two_places() {
        let zero = payload(
            r#"{"transaction_type":"INCOME","amount":"0","occurred_at":"2025-01-05","account_id":1}"#,
        )
        .into_new(None)
        .unwrap_err();
        assert!(zero.get("amount").is_some());

        let fine = payload(
            r#"{"transaction_type":"INCOME","amount":12.5,"occurred_at":"2025-01-05","account_id":1}"#,
        )
        .into_new(None)
        .unwrap();
        assert_eq!(fine.amount, Decimal::from_str("12.5").unwrap());
        assert_eq!(fine.origin, "manual");
        assert_eq!(fine.installments_total, 1);
    }

    #[test]
    fn subcategory_without_category_is_rejected() {
        let errors = payload(
            r#"{"transaction_type":"EXPENSE","amount":"1.00","occurred_at":"2025-01-05",
                "account_id":1,"subcategory_id":9}"#,
        )
        .into_new(None)
        .unwrap_err();
        assert!(errors.get("subcategory_id").is_some());
    }

    #[test]
    fn account_transactions_cannot_carry_a_charge_date() {
        let errors = payload(
            r#"{"transaction_type":"EXPENSE","amount":"1.00","occurred_at":"2025-01-05",
                "account_id":1,"charge_at_card":"2025-02-10"}"#,
        )
        .into_new(None)
        .unwrap_err();
        assert!(errors.get("charge_at_card").is_some());
    }

    #[test]
    fn patch_merges_onto_stored_row() {
        let row = stored_card_purchase();
        let tags = [3i64, 5];
        let merged = payload(r#"{"need_review":false,"category_id":null,"description":"  "}"#)
            .into_new(Some((&row, &tags)))
            .unwrap();
        assert_eq!(merged.amount, row.amount);
        assert_eq!(merged.credit_card_id, Some(4));
        assert_eq!(merged.charge_at_card, row.charge_at_card);
        assert_eq!(merged.category_id, None);
        assert_eq!(merged.description, None);
        assert_eq!(merged.tag_ids, vec![3, 5]);
        assert!(!merged.need_review);
    }

    #[test]
    fn moving_a_purchase_clears_its_charge_date() {
        let row = stored_card_purchase();
        let moved = payload(r#"{"occurred_at":"2025-03-20"}"#)
            .into_new(Some((&row, &[])))
            .unwrap();
        assert_eq!(moved.charge_at_card, None);

        let to_account = payload(r#"{"credit_card_id":null,"account_id":8}"#)
            .into_new(Some((&row, &[])))
            .unwrap();
        assert_eq!(to_account.account_id, Some(8));
        assert_eq!(to_account.charge_at_card, None);
    }

    #[test]
    fn bulk_items_flatten_their_fields() {
        let request: BulkUpdateRequest = serde_json::from_str(
            r#"{"transactions":[{"id":1,"need_review":false},{"id":2,"category_id":null}]}"#,
        )
        .unwrap();
        assert_eq!(request.transactions.len(), 2);
        assert_eq!(request.transactions[0].fields.need_review, Some(false));
        assert_eq!(request.transactions[1].fields.category_id, Some(None));
    }
}
