//! Splitting a purchase into equal monthly parts.

use chrono::{Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use super::billing::BillingCycle;

pub const MAX_INSTALLMENTS: u32 = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("installments must be between 1 and {MAX_INSTALLMENTS}")]
    Count(u32),

    #[error("principal must have at most 2 decimal places")]
    Precision,

    #[error("principal must be at least 0.01 per installment")]
    TooSmall,
}

impl SplitError {
    /// Request field the error is reported on.
    pub fn field(&self) -> &'static str {
        match self {
            SplitError::Count(_) => "installments",
            SplitError::Precision | SplitError::TooSmall => "principal",
        }
    }
}

/// Splits `principal` into `count` parts that differ by at most one cent and
/// add up to exactly `principal`. Leftover cents go to the first parts.
pub fn split_principal(principal: Decimal, count: u32) -> Result<Vec<Decimal>, SplitError> {
    if count == 0 || count > MAX_INSTALLMENTS {
        return Err(SplitError::Count(count));
    }
    if principal.normalize().scale() > 2 {
        return Err(SplitError::Precision);
    }
    let cents = (principal * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or(SplitError::Precision)?;
    let count = i64::from(count);
    if cents < count {
        return Err(SplitError::TooSmall);
    }

    let base = cents / count;
    let remainder = cents % count;
    Ok((0..count)
        .map(|i| Decimal::new(base + i64::from(i < remainder), 2))
        .collect())
}

/// One scheduled part of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInstallment {
    pub number: i32,
    pub amount: Decimal,
    pub occurred_at: NaiveDate,
    pub charge_at_card: Option<NaiveDate>,
}

/// Where the plan is paid from, which decides how periods advance.
#[derive(Debug, Clone, Copy)]
pub enum Funding {
    /// Each part moves `occurred_at` forward one month.
    Account,
    /// Each part lands on the next statement. An explicit first charge date
    /// overrides the one derived from the cycle.
    Card {
        cycle: BillingCycle,
        first_charge: Option<NaiveDate>,
    },
}

pub fn plan(
    principal: Decimal,
    count: u32,
    purchase: NaiveDate,
    funding: Funding,
) -> Result<Vec<PlannedInstallment>, SplitError> {
    let parts = split_principal(principal, count)?;
    Ok(parts
        .into_iter()
        .zip(0u32..)
        .map(|(amount, index)| {
            let shift = |date: NaiveDate| {
                date.checked_add_months(Months::new(index)).unwrap_or(date)
            };
            let (occurred_at, charge_at_card) = match funding {
                Funding::Account => (shift(purchase), None),
                Funding::Card {
                    first_charge: Some(first),
                    ..
                } => (purchase, Some(shift(first))),
                Funding::Card { cycle, .. } => (
                    purchase,
                    Some(cycle.installment_charge_date(purchase, index)),
                ),
            };
            PlannedInstallment {
                number: index as i32 + 1,
                amount,
                occurred_at,
                charge_at_card,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn remainder_cents_go_first() {
        let parts = split_principal(dec("100.00"), 3).unwrap();
        assert_eq!(parts, vec![dec("33.34"), dec("33.33"), dec("33.33")]);
        assert_eq!(parts.iter().sum::<Decimal>(), dec("100.00"));
    }

    #[test]
    fn parts_always_sum_to_principal() {
        for (principal, count) in [("0.05", 5), ("999.99", 7), ("1234.56", 120), ("10", 4)] {
            let principal = dec(principal);
            let parts = split_principal(principal, count).unwrap();
            assert_eq!(parts.len(), count as usize);
            assert_eq!(parts.iter().sum::<Decimal>(), principal);
            let max = parts.iter().max().unwrap();
            let min = parts.iter().min().unwrap();
            assert!(*max - *min <= dec("0.01"));
        }
    }

    #[test]
    fn invalid_splits_are_rejected() {
        assert_eq!(split_principal(dec("10"), 0), Err(SplitError::Count(0)));
        assert_eq!(split_principal(dec("10"), 121), Err(SplitError::Count(121)));
        assert_eq!(split_principal(dec("0.02"), 3), Err(SplitError::TooSmall));
        assert_eq!(split_principal(dec("1.005"), 2), Err(SplitError::Precision));
        assert_eq!(SplitError::TooSmall.field(), "principal");
    }

    #[test]
    fn account_plans_advance_the_date() {
        let parts = plan(dec("300.00"), 3, date(2025, 1, 31), Funding::Account).unwrap();
        let dates: Vec<_> = parts.iter().map(|p| p.occurred_at).collect();
        assert_eq!(dates, vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]);
        assert!(parts.iter().all(|p| p.charge_at_card.is_none()));
        assert_eq!(parts[2].number, 3);
    }

    #[test]
    fn card_plans_advance_the_statement() {
        let funding = Funding::Card {
            cycle: BillingCycle::new(3, 10),
            first_charge: None,
        };
        let parts = plan(dec("90.00"), 2, date(2025, 6, 20), funding).unwrap();
        assert!(parts.iter().all(|p| p.occurred_at == date(2025, 6, 20)));
        assert_eq!(parts[0].charge_at_card, Some(date(2025, 7, 10)));
        assert_eq!(parts[1].charge_at_card, Some(date(2025, 8, 10)));
    }
}
