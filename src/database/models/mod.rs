pub mod account;
pub mod cash_flow_view;
pub mod category;
pub mod credit_card;
pub mod imported_report;
pub mod tag;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountFields, AccountFilter, AccountPayload, AccountType};
pub use cash_flow_view::{
    CashFlowGroup, CashFlowResult, CashFlowView, CashFlowViewDetail, CashFlowViewFields,
    CashFlowViewPayload,
};
pub use category::{
    Category, CategoryDetail, CategoryFields, CategoryFilter, CategoryPayload, CategoryType,
    Subcategory, SubcategoryFields, SubcategoryFilter, SubcategoryPayload,
};
pub use credit_card::{CreditCard, CreditCardFields, CreditCardFilter, CreditCardPayload};
pub use imported_report::{ImportRequest, ImportStatus, ImportTarget, ImportedReport};
pub use tag::{Tag, TagPayload};
pub use transaction::{
    BulkUpdateItem, BulkUpdateRequest, InstallmentPayload, NamedRef, NewTransaction, Transaction,
    TransactionFilter, TransactionPayload, TransactionResponse, TransactionType,
};
pub use user::{LoginRequest, NewUser, Session, User};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FieldErrors;

/// A text column held a value outside the enum it maps to.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Lets PATCH bodies tell "field absent" (`None`) from "field set to null"
/// (`Some(None)`). Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Picks the PATCH value when present, otherwise the stored one.
pub(crate) fn merge<T: Clone>(patch: Option<T>, current: Option<&T>) -> Option<T> {
    patch.or_else(|| current.cloned())
}

pub(crate) fn check_name(errors: &mut FieldErrors, field: &str, value: Option<&str>, max: usize) {
    match value.map(str::trim) {
        None => errors.add(field, "This field is required."),
        Some("") => errors.add(field, "This field may not be blank."),
        Some(v) if v.chars().count() > max => errors.add(
            field,
            format!("Ensure this field has no more than {max} characters."),
        ),
        Some(_) => {}
    }
}

/// Money columns are `NUMERIC(12, 2)`.
pub(crate) fn check_money(errors: &mut FieldErrors, field: &str, value: Decimal) {
    if value.normalize().scale() > 2 {
        errors.add(field, "Ensure that there are no more than 2 decimal places.");
    }
    if value.abs() >= Decimal::from(10_000_000_000i64) {
        errors.add(field, "Ensure that there are no more than 12 digits in total.");
    }
}

/// Zero with two decimal places so it serializes as `"0.00"`.
pub fn zero_money() -> Decimal {
    Decimal::new(0, 2)
}

/// `serialize_with` for money: always two decimal places. PostgreSQL hands
/// back a bare `0` for zero `NUMERIC` values.
pub fn serialize_money<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    let mut value = *value;
    value.rescale(2);
    Serialize::serialize(&value, serializer)
}

pub fn serialize_opt_money<S: Serializer>(
    value: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serialize_money(value, serializer),
        None => serializer.serialize_none(),
    }
}
