//! Credit card statement arithmetic.
//!
//! Statement `M` (a calendar month) is due on `due_day` of `M`. It closes on
//! `close_day` of `M` when the card closes before it is due in the same
//! month, otherwise on `close_day` of the month before. Days past the end of a
//! month are clamped to its last day.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn add_months(self, months: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + months;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn first_day(self) -> NaiveDate {
        self.day(1)
    }

    pub fn last_day(self) -> NaiveDate {
        self.add_months(1).first_day() - Days::new(1)
    }

    /// `day` of this month, clamped to the month's length.
    pub fn day(self, day: u32) -> NaiveDate {
        (1..=day.clamp(1, 31))
            .rev()
            .find_map(|d| NaiveDate::from_ymd_opt(self.year, self.month, d))
            .unwrap_or(NaiveDate::MIN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingCycle {
    close_day: u32,
    due_day: u32,
}

/// Date bounds of one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub close_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl BillingCycle {
    pub fn new(close_day: u32, due_day: u32) -> Self {
        Self {
            close_day: close_day.clamp(1, 31),
            due_day: due_day.clamp(1, 31),
        }
    }

    pub fn due_date(&self, statement: YearMonth) -> NaiveDate {
        statement.day(self.due_day)
    }

    pub fn close_date(&self, statement: YearMonth) -> NaiveDate {
        if self.close_day < self.due_day {
            statement.day(self.close_day)
        } else {
            statement.add_months(-1).day(self.close_day)
        }
    }

    /// First statement that closes on or after the purchase date.
    pub fn statement_for(&self, purchase: NaiveDate) -> YearMonth {
        let mut month = YearMonth::of(purchase);
        while self.close_date(month) < purchase {
            month = month.add_months(1);
        }
        month
    }

    /// Due date of the bill a purchase lands on.
    pub fn charge_date(&self, purchase: NaiveDate) -> NaiveDate {
        self.due_date(self.statement_for(purchase))
    }

    /// Charge date of installment `index` (0-based) of a purchase.
    pub fn installment_charge_date(&self, purchase: NaiveDate, index: u32) -> NaiveDate {
        self.due_date(self.statement_for(purchase).add_months(index as i32))
    }

    pub fn statement(&self, month: YearMonth) -> Statement {
        let close_date = self.close_date(month);
        let previous_close = self.close_date(month.add_months(-1));
        Statement {
            period_start: previous_close + Days::new(1),
            period_end: close_date,
            close_date,
            due_date: self.due_date(month),
        }
    }
}
