//! Domain rules that need no database access.

pub mod billing;
pub mod cash_flow_report;
pub mod installments;
pub mod statement_import;
