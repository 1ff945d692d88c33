//! Loanbook Backend Library
//!
//! Loans, payments and the ledger that keeps each loan's running totals
//! consistent with the payments recorded against it.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod loan;
pub mod middleware;
pub mod models;
pub mod payment;
pub mod person;
pub mod routes;
pub mod services;
pub mod state;
