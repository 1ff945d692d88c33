//! API handlers for the Loanbook backend

pub mod analytics;
pub mod health;
pub mod loan;
pub mod payment;
pub mod person;

pub use analytics::*;
pub use health::*;
pub use loan::*;
pub use payment::*;
pub use person::*;
