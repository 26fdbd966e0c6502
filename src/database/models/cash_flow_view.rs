use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::check_name;
use crate::error::FieldErrors;

/// A user-defined layout for the yearly cash-flow report.
#[derive(FromRow, Debug, Clone, Serialize)]
pub struct CashFlowView {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A report row summing the transactions of its categories.
#[derive(FromRow, Debug, Clone, Serialize)]
pub struct CashFlowGroup {
    pub id: i64,
    #[serde(skip_serializing)]
    pub view_id: i64,
    pub name: String,
    pub position: i32,
    pub category_ids: Vec<i64>,
}

/// A report row summing every group placed above it.
#[derive(FromRow, Debug, Clone, Serialize)]
pub struct CashFlowResult {
    pub id: i64,
    #[serde(skip_serializing)]
    pub view_id: i64,
    pub name: String,
    pub position: i32,
}

#[derive(Debug, Serialize)]
pub struct CashFlowViewDetail {
    #[serde(flatten)]
    pub view: CashFlowView,
    pub groups: Vec<CashFlowGroup>,
    pub results: Vec<CashFlowResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CashFlowViewPayload {
    pub name: Option<String>,
    #[serde(default)]
    pub groups: Vec<GroupPayload>,
    #[serde(default)]
    pub results: Vec<ResultPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupPayload {
    pub name: Option<String>,
    pub position: Option<i32>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultPayload {
    pub name: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupFields {
    pub name: String,
    pub position: i32,
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultFields {
    pub name: String,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashFlowViewFields {
    pub name: String,
    pub groups: Vec<GroupFields>,
    pub results: Vec<ResultFields>,
}

impl CashFlowViewFields {
    /// Every category referenced by any group, deduplicated.
    pub fn category_ids(&self) -> Vec<i64> {
        self.groups
            .iter()
            .flat_map(|g| g.category_ids.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl CashFlowViewPayload {
    pub fn into_fields(self) -> Result<CashFlowViewFields, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "name", self.name.as_deref(), 100);

        let mut seen = BTreeSet::new();
        let mut check_position = |errors: &mut FieldErrors, field: &str, position: Option<i32>| {
            match position {
                None => errors.add(field, "Every item needs a position."),
                Some(p) if p < 0 => errors.add(field, "Positions cannot be negative."),
                Some(p) if !seen.insert(p) => errors.add(
                    field,
                    format!("Position {p} is used more than once across groups and results."),
                ),
                Some(_) => {}
            }
        };

        let mut groups = Vec::with_capacity(self.groups.len());
        for group in self.groups {
            check_name(&mut errors, "groups", group.name.as_deref(), 100);
            check_position(&mut errors, "groups", group.position);
            let mut category_ids = group.category_ids;
            category_ids.sort_unstable();
            category_ids.dedup();
            groups.push(GroupFields {
                name: group.name.unwrap_or_default().trim().to_string(),
                position: group.position.unwrap_or_default(),
                category_ids,
            });
        }

        let mut results = Vec::with_capacity(self.results.len());
        for result in self.results {
            check_name(&mut errors, "results", result.name.as_deref(), 100);
            check_position(&mut errors, "results", result.position);
            results.push(ResultFields {
                name: result.name.unwrap_or_default().trim().to_string(),
                position: result.position.unwrap_or_default(),
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        groups.sort_by_key(|g| g.position);
        results.sort_by_key(|r| r.position);
        Ok(CashFlowViewFields {
            name: self.name.unwrap_or_default().trim().to_string(),
            groups,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> CashFlowViewPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn positions_are_unique_across_groups_and_results() {
        let errors = payload(
            r#"{"name":"Monthly","groups":[{"name":"Income","position":1,"category_ids":[1]}],
                "results":[{"name":"Net","position":1}]}"#,
        )
        .into_fields()
        .unwrap_err();
        assert!(errors.get("results").is_some());
    }

    #[test]
    fn groups_come_back_sorted_with_deduplicated_categories() {
        let fields = payload(
            r#"{"name":"Monthly","groups":[
                    {"name":"Costs","position":2,"category_ids":[4,3,4]},
                    {"name":"Income","position":1,"category_ids":[1]}],
                "results":[{"name":"Net","position":3}]}"#,
        )
        .into_fields()
        .unwrap();
        assert_eq!(fields.groups[0].name, "Income");
        assert_eq!(fields.groups[1].category_ids, vec![3, 4]);
        assert_eq!(fields.category_ids(), vec![1, 3, 4]);
    }

    #[test]
    fn missing_position_is_reported() {
        let errors = payload(r#"{"name":"V","groups":[{"name":"G"}]}"#)
            .into_fields()
            .unwrap_err();
        assert!(errors.get("groups").is_some());
    }
}
