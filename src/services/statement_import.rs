//! Bank and credit card statement files.
//!
//! A statement is recognised by its header row. Rows that cannot be read are
//! reported by line number and skipped; the rest become [`StatementLine`]s.

use std::str::FromStr;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::database::models::transaction::MAX_DESCRIPTION_LEN;
use crate::database::models::TransactionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    /// Banco Inter checking account export: five metadata lines, then a
    /// `;`-separated table. Negative values leave the account.
    InterBankStatement,
    /// Banco Inter card invoice export: plain `,`-separated table with
    /// `R$` amounts. Negative values are refunds.
    InterCreditCard,
}

impl StatementFormat {
    pub const ALL: [StatementFormat; 2] = [
        StatementFormat::InterBankStatement,
        StatementFormat::InterCreditCard,
    ];

    pub fn handler_type(self) -> &'static str {
        match self {
            StatementFormat::InterBankStatement => "banco_inter_bank_statement",
            StatementFormat::InterCreditCard => "banco_inter_credit_card",
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            StatementFormat::InterBankStatement => b';',
            StatementFormat::InterCreditCard => b',',
        }
    }

    fn metadata_lines(self) -> usize {
        match self {
            StatementFormat::InterBankStatement => 5,
            StatementFormat::InterCreditCard => 0,
        }
    }

    /// Date, amount and description columns, in that order.
    fn columns(self) -> [&'static str; 3] {
        match self {
            StatementFormat::InterBankStatement => ["data lançamento", "valor", "descrição"],
            StatementFormat::InterCreditCard => ["data", "valor", "lançamento"],
        }
    }

    fn required_headers(self) -> &'static [&'static str] {
        match self {
            StatementFormat::InterBankStatement => {
                &["data lançamento", "descrição", "valor", "saldo"]
            }
            StatementFormat::InterCreditCard => &["data", "lançamento", "categoria", "tipo", "valor"],
        }
    }

    fn kind_of(self, signed: Decimal) -> TransactionType {
        let negative = signed.is_sign_negative();
        match (self, negative) {
            (StatementFormat::InterBankStatement, true) => TransactionType::Expense,
            (StatementFormat::InterBankStatement, false) => TransactionType::Income,
            (StatementFormat::InterCreditCard, true) => TransactionType::Income,
            (StatementFormat::InterCreditCard, false) => TransactionType::Expense,
        }
    }
}

/// One importable row of a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementLine {
    pub line: usize,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub occurred_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub format: StatementFormat,
    pub lines: Vec<StatementLine>,
    pub errors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum StatementError {
    #[error("The file is not valid UTF-8 text.")]
    Encoding,

    #[error("The file does not match any supported statement layout.")]
    UnknownLayout,
}

/// Detects the layout of `bytes` and parses every data row.
pub fn parse_statement(bytes: &[u8]) -> Result<ParsedStatement, StatementError> {
    let text = std::str::from_utf8(bytes).map_err(|_| StatementError::Encoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    for format in StatementFormat::ALL {
        let Some(table) = skip_lines(text, format.metadata_lines()) else {
            continue;
        };
        let mut reader = ReaderBuilder::new()
            .delimiter(format.delimiter())
            .flexible(true)
            .trim(Trim::All)
            .from_reader(table.as_bytes());
        let Ok(headers) = reader.headers() else {
            continue;
        };
        let Some(columns) = locate_columns(format, headers) else {
            continue;
        };

        let mut parsed = ParsedStatement {
            format,
            lines: Vec::new(),
            errors: Vec::new(),
        };
        for (index, record) in reader.records().enumerate() {
            // header is on the line after the metadata; rows are 1-based
            let line = format.metadata_lines() + index + 2;
            match record
                .map_err(|err| format!("Row {line}: {err}"))
                .and_then(|record| parse_row(format, &record, columns, line))
            {
                Ok(row) => parsed.lines.push(row),
                Err(message) => parsed.errors.push(message),
            }
        }
        return Ok(parsed);
    }
    Err(StatementError::UnknownLayout)
}

fn skip_lines(text: &str, count: usize) -> Option<&str> {
    let mut rest = text;
    for _ in 0..count {
        rest = rest.split_once('\n')?.1;
    }
    Some(rest)
}

fn locate_columns(format: StatementFormat, headers: &StringRecord) -> Option<[usize; 3]> {
    let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let position = |wanted: &str| names.iter().position(|name| name == wanted);
    if !format.required_headers().iter().all(|h| position(h).is_some()) {
        return None;
    }
    let [date, amount, description] = format.columns();
    Some([position(date)?, position(amount)?, position(description)?])
}

fn parse_row(
    format: StatementFormat,
    record: &StringRecord,
    [date_col, amount_col, description_col]: [usize; 3],
    line: usize,
) -> Result<StatementLine, String> {
    let [date_name, amount_name, _] = format.columns();

    let raw_date = record.get(date_col).unwrap_or_default();
    if raw_date.is_empty() {
        return Err(format!("Row {line}: Missing required field: {date_name}"));
    }
    let occurred_at = parse_date(raw_date)
        .ok_or_else(|| format!("Row {line}: Invalid date format: {raw_date}"))?;

    let raw_amount = record.get(amount_col).unwrap_or_default();
    if raw_amount.is_empty() {
        return Err(format!("Row {line}: Missing required field: {amount_name}"));
    }
    let signed = parse_amount(raw_amount)
        .ok_or_else(|| format!("Row {line}: Invalid amount format: {raw_amount}"))?;
    let amount = signed.abs();
    if amount.is_zero() {
        return Err(format!("Row {line}: Amount must be greater than zero."));
    }
    if amount.normalize().scale() > 2 || amount >= Decimal::from(10_000_000_000i64) {
        return Err(format!("Row {line}: Amount out of range: {raw_amount}"));
    }

    let description = record
        .get(description_col)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    if description
        .as_deref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(format!(
            "Row {line}: Description is longer than {MAX_DESCRIPTION_LEN} characters."
        ));
    }

    Ok(StatementLine {
        line,
        transaction_type: format.kind_of(signed),
        amount,
        description,
        occurred_at,
    })
}

/// `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

/// Brazilian notation: `.` groups thousands and `,` marks the decimals, with
/// an optional `R$` and leading minus (`-R$ 1.468,78`, `-5.000,00`).
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned = raw.replace("R$", "");
    let cleaned = cleaned.trim();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest.trim()),
        None => (false, cleaned),
    };
    if digits.is_empty() || digits.starts_with('-') {
        return None;
    }
    let value = Decimal::from_str(&digits.replace('.', "").replace(',', ".")).ok()?;
    Some(if negative { -value } else { value })
}
