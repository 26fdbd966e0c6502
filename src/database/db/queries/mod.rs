//! Hand-written PostgreSQL queries, one module per resource.
//!
//! Every function takes the owning `user_id` and filters on it, so rows of
//! other users behave as if they did not exist. Single statements accept any
//! executor (pool or open transaction); multi-statement writes take a
//! `&mut PgConnection` and expect the caller to hold a transaction.

pub mod accounts;
pub mod cash_flow;
pub mod categories;
pub mod credit_cards;
pub mod imported_reports;
pub mod tags;
pub mod transactions;
pub mod users;
