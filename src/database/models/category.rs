use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{check_name, merge, UnknownVariant};
use crate::error::FieldErrors;

/// Direction of the money a category classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(CategoryType::Income),
            "expense" => Some(CategoryType::Expense),
            _ => None,
        }
    }
}

impl TryFrom<String> for CategoryType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownVariant {
            kind: "category transaction_type",
            value,
        })
    }
}

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub transaction_type: CategoryType,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category with its active subcategories, as returned by the detail endpoint.
#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<Subcategory>,
}

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Subcategory {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub transaction_type: CategoryType, // joined from the parent category
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryFilter {
    pub transaction_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubcategoryFilter {
    pub category_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryPayload {
    pub name: Option<String>,
    pub transaction_type: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFields {
    pub name: String,
    pub transaction_type: CategoryType,
    pub description: String,
    pub is_active: bool,
}

impl CategoryPayload {
    pub fn into_fields(self, current: Option<&Category>) -> Result<CategoryFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = merge(self.name, current.map(|c| &c.name));
        check_name(&mut errors, "name", name.as_deref(), 100);

        let transaction_type = match self.transaction_type.as_deref() {
            Some(raw) => {
                let parsed = CategoryType::parse(raw);
                if parsed.is_none() {
                    errors.add("transaction_type", format!("\"{raw}\" is not a valid choice."));
                }
                parsed
            }
            None => current.map(|c| c.transaction_type),
        };
        if transaction_type.is_none() && self.transaction_type.is_none() {
            errors.add("transaction_type", "This field is required.");
        }

        let description = merge(self.description, current.map(|c| &c.description))
            .unwrap_or_default();
        let is_active = self
            .is_active
            .or(current.map(|c| c.is_active))
            .unwrap_or(true);

        match (errors.is_empty(), transaction_type) {
            (true, Some(transaction_type)) => Ok(CategoryFields {
                name: name.unwrap_or_default().trim().to_string(),
                transaction_type,
                description,
                is_active,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SubcategoryPayload {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubcategoryFields {
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

impl SubcategoryPayload {
    /// Ownership of `category_id` is checked against the database by the caller.
    pub fn into_fields(
        self,
        current: Option<&Subcategory>,
    ) -> Result<SubcategoryFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let category_id = self.category_id.or(current.map(|s| s.category_id));
        if category_id.is_none() {
            errors.add("category_id", "This field is required.");
        }
        let name = merge(self.name, current.map(|s| &s.name));
        check_name(&mut errors, "name", name.as_deref(), 100);

        let description = merge(self.description, current.map(|s| &s.description))
            .unwrap_or_default();
        let is_active = self
            .is_active
            .or(current.map(|s| s.is_active))
            .unwrap_or(true);

        match (errors.is_empty(), category_id) {
            (true, Some(category_id)) => Ok(SubcategoryFields {
                category_id,
                name: name.unwrap_or_default().trim().to_string(),
                description,
                is_active,
            }),
            _ => Err(errors),
        }
    }
}
