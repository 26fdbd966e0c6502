//! Yearly cash-flow report assembled from per-month aggregates.
//!
//! The database hands over signed monthly sums per (category, subcategory);
//! this module arranges them into the groups and results of a view.

use std::collections::{BTreeMap, HashSet};
use std::ops::AddAssign;

use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::database::models::zero_money;

/// Twelve monthly amounts, serialized as `{"1": "0.00", ..., "12": "0.00"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyTotals([Decimal; 12]);

impl Default for MonthlyTotals {
    fn default() -> Self {
        Self([zero_money(); 12])
    }
}

impl MonthlyTotals {
    /// `month` is 1-based; out-of-range months are ignored.
    pub fn add(&mut self, month: u32, amount: Decimal) {
        if let Some(slot) = month
            .checked_sub(1)
            .and_then(|i| self.0.get_mut(i as usize))
        {
            *slot += amount;
        }
    }

    pub fn annual(&self) -> Decimal {
        self.0.iter().fold(zero_money(), |acc, v| acc + v)
    }
}

impl AddAssign<&MonthlyTotals> for MonthlyTotals {
    fn add_assign(&mut self, other: &MonthlyTotals) {
        for (slot, value) in self.0.iter_mut().zip(other.0.iter()) {
            *slot += *value;
        }
    }
}

impl Serialize for MonthlyTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(12))?;
        for (i, value) in self.0.iter().enumerate() {
            map.serialize_entry(&(i + 1).to_string(), value)?;
        }
        map.end()
    }
}

/// Signed sum of one (category, subcategory) pair in one month. Income
/// categories are positive and expense categories negative.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAmount {
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub month: u32,
    pub total: Decimal,
}

#[derive(Debug, Clone)]
pub struct CategoryLayout {
    pub id: i64,
    pub name: String,
    pub subcategories: Vec<(i64, String)>, // active only, ordered by name
}

#[derive(Debug, Clone)]
pub struct GroupLayout {
    pub name: String,
    pub position: i32,
    pub categories: Vec<CategoryLayout>, // ordered by name
}

#[derive(Debug, Clone)]
pub struct ResultLayout {
    pub name: String,
    pub position: i32,
}

#[derive(Debug, Serialize)]
pub struct CashFlowReport {
    pub view_id: i64,
    pub view_name: String,
    pub year: i32,
    pub items: Vec<ReportItem>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReportItem {
    Group {
        name: String,
        position: i32,
        categories: Vec<CategoryLine>,
        monthly_totals: MonthlyTotals,
        annual_total: Decimal,
    },
    Result {
        name: String,
        position: i32,
        monthly_totals: MonthlyTotals,
        annual_total: Decimal,
    },
    Uncategorized {
        name: String,
        monthly_totals: MonthlyTotals,
        annual_total: Decimal,
    },
}

#[derive(Debug, Serialize)]
pub struct CategoryLine {
    pub id: i64,
    pub name: String,
    pub monthly_totals: MonthlyTotals,
    pub annual_total: Decimal,
    pub subcategories: Vec<SubcategoryLine>,
}

#[derive(Debug, Serialize)]
pub struct SubcategoryLine {
    pub id: Option<i64>, // None for the "Uncategorized" bucket
    pub name: String,
    pub monthly_totals: MonthlyTotals,
    pub annual_total: Decimal,
}

const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Default)]
struct Totals {
    by_category: BTreeMap<i64, MonthlyTotals>,
    by_subcategory: BTreeMap<(i64, i64), MonthlyTotals>,
    without_subcategory: BTreeMap<i64, MonthlyTotals>,
}

impl Totals {
    fn category(&self, id: i64) -> MonthlyTotals {
        self.by_category.get(&id).copied().unwrap_or_default()
    }
}

pub fn build_report(
    view_id: i64,
    view_name: String,
    year: i32,
    groups: Vec<GroupLayout>,
    results: Vec<ResultLayout>,
    amounts: &[MonthlyAmount],
) -> CashFlowReport {
    let grouped: HashSet<i64> = groups
        .iter()
        .flat_map(|g| g.categories.iter().map(|c| c.id))
        .collect();

    let mut totals = Totals::default();
    let mut uncategorized = MonthlyTotals::default();
    for amount in amounts {
        match amount.category_id {
            Some(category) if grouped.contains(&category) => {
                totals
                    .by_category
                    .entry(category)
                    .or_default()
                    .add(amount.month, amount.total);
                let bucket = match amount.subcategory_id {
                    Some(sub) => totals.by_subcategory.entry((category, sub)).or_default(),
                    None => totals.without_subcategory.entry(category).or_default(),
                };
                bucket.add(amount.month, amount.total);
            }
            _ => uncategorized.add(amount.month, amount.total),
        }
    }

    let mut items = Vec::with_capacity(groups.len() + results.len() + 1);
    let mut group_totals: Vec<(i32, MonthlyTotals)> = Vec::with_capacity(groups.len());

    let mut groups = groups;
    groups.sort_by_key(|g| g.position);
    for group in groups {
        let mut monthly = MonthlyTotals::default();
        let categories = group
            .categories
            .into_iter()
            .map(|category| {
                let category_totals = totals.category(category.id);
                monthly += &category_totals;
                category_line(category, category_totals, &totals)
            })
            .collect();
        group_totals.push((group.position, monthly));
        items.push(ReportItem::Group {
            name: group.name,
            position: group.position,
            categories,
            annual_total: monthly.annual(),
            monthly_totals: monthly,
        });
    }

    let mut results = results;
    results.sort_by_key(|r| r.position);
    for result in results {
        let mut monthly = MonthlyTotals::default();
        for (_, totals) in group_totals.iter().filter(|(pos, _)| *pos < result.position) {
            monthly += totals;
        }
        items.push(ReportItem::Result {
            name: result.name,
            position: result.position,
            annual_total: monthly.annual(),
            monthly_totals: monthly,
        });
    }

    if !uncategorized.annual().is_zero() {
        items.push(ReportItem::Uncategorized {
            name: UNCATEGORIZED.to_string(),
            annual_total: uncategorized.annual(),
            monthly_totals: uncategorized,
        });
    }

    CashFlowReport {
        view_id,
        view_name,
        year,
        items,
    }
}

fn category_line(category: CategoryLayout, monthly: MonthlyTotals, totals: &Totals) -> CategoryLine {
    let mut subcategories: Vec<SubcategoryLine> = category
        .subcategories
        .into_iter()
        .filter_map(|(id, name)| {
            let monthly = totals.by_subcategory.get(&(category.id, id)).copied()?;
            let annual_total = monthly.annual();
            (!annual_total.is_zero()).then_some(SubcategoryLine {
                id: Some(id),
                name,
                monthly_totals: monthly,
                annual_total,
            })
        })
        .collect();

    if let Some(loose) = totals.without_subcategory.get(&category.id) {
        if !loose.annual().is_zero() {
            subcategories.push(SubcategoryLine {
                id: None,
                name: UNCATEGORIZED.to_string(),
                monthly_totals: *loose,
                annual_total: loose.annual(),
            });
        }
    }

    CategoryLine {
        id: category.id,
        name: category.name,
        annual_total: monthly.annual(),
        monthly_totals: monthly,
        subcategories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn amount(category: Option<i64>, sub: Option<i64>, month: u32, total: &str) -> MonthlyAmount {
        MonthlyAmount {
            category_id: category,
            subcategory_id: sub,
            month,
            total: dec(total),
        }
    }

    fn layout() -> (Vec<GroupLayout>, Vec<ResultLayout>) {
        let groups = vec![
            GroupLayout {
                name: "Expenses".into(),
                position: 2,
                categories: vec![CategoryLayout {
                    id: 20,
                    name: "Food".into(),
                    subcategories: vec![(200, "Groceries".into()), (201, "Restaurants".into())],
                }],
            },
            GroupLayout {
                name: "Income".into(),
                position: 1,
                categories: vec![CategoryLayout {
                    id: 10,
                    name: "Salary".into(),
                    subcategories: vec![],
                }],
            },
        ];
        let results = vec![
            ResultLayout {
                name: "Net".into(),
                position: 3,
            },
            ResultLayout {
                name: "After income".into(),
                position: 2,
            },
        ];
        (groups, results)
    }

    #[test]
    fn monthly_totals_serialize_with_month_keys() {
        let mut totals = MonthlyTotals::default();
        totals.add(1, dec("10.50"));
        totals.add(12, dec("-2.00"));
        totals.add(13, dec("99"));
        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json["1"], "10.50");
        assert_eq!(json["2"], "0.00");
        assert_eq!(json["12"], "-2.00");
        assert_eq!(json.as_object().unwrap().len(), 12);
        assert_eq!(totals.annual(), dec("8.50"));
    }

    #[test]
    fn results_sum_groups_above_them() {
        let (groups, results) = layout();
        let amounts = vec![
            amount(Some(10), None, 1, "5000.00"),
            amount(Some(20), Some(200), 1, "-800.00"),
            amount(Some(20), None, 1, "-50.00"),
            amount(Some(20), Some(201), 2, "-120.00"),
        ];
        let report = build_report(1, "Main".into(), 2025, groups, results, &amounts);
        let json = serde_json::to_value(&report).unwrap();
        let items = json["items"].as_array().unwrap();

        assert_eq!(items[0]["type"], "group");
        assert_eq!(items[0]["name"], "Income");
        assert_eq!(items[1]["name"], "Expenses");
        assert_eq!(items[1]["monthly_totals"]["1"], "-850.00");
        assert_eq!(items[1]["annual_total"], "-970.00");

        assert_eq!(items[2]["type"], "result");
        assert_eq!(items[2]["name"], "After income");
        assert_eq!(items[2]["monthly_totals"]["1"], "5000.00");
        assert_eq!(items[3]["name"], "Net");
        assert_eq!(items[3]["monthly_totals"]["1"], "4150.00");
        assert_eq!(items[3]["annual_total"], "4030.00");
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn category_breakdown_lists_active_subcategories_and_loose_amounts() {
        let (groups, results) = layout();
        let amounts = vec![
            amount(Some(20), Some(200), 3, "-10.00"),
            amount(Some(20), None, 3, "-1.00"),
        ];
        let report = build_report(1, "Main".into(), 2025, groups, results, &amounts);
        let ReportItem::Group { categories, .. } = &report.items[1] else {
            panic!("expected group");
        };
        let food = &categories[0];
        assert_eq!(food.annual_total, dec("-11.00"));
        assert_eq!(food.subcategories.len(), 2);
        assert_eq!(food.subcategories[0].name, "Groceries");
        assert_eq!(food.subcategories[1].id, None);
        assert_eq!(food.subcategories[1].name, "Uncategorized");
    }

    #[test]
    fn amounts_outside_every_group_become_uncategorized() {
        let (groups, results) = layout();
        let amounts = vec![
            amount(Some(99), None, 4, "-30.00"),
            amount(None, None, 4, "12.00"),
        ];
        let report = build_report(1, "Main".into(), 2025, groups, results, &amounts);
        let last = serde_json::to_value(report.items.last().unwrap()).unwrap();
        assert_eq!(last["type"], "uncategorized");
        assert_eq!(last["monthly_totals"]["4"], "-18.00");
        assert!(last.get("position").is_none());
    }

    #[test]
    fn zero_uncategorized_is_omitted() {
        let (groups, results) = layout();
        let report = build_report(1, "Main".into(), 2025, groups, results, &[]);
        assert_eq!(report.items.len(), 4);
        assert!(matches!(report.items[0], ReportItem::Group { .. }));
    }
}
