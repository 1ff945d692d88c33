//! Business logic services for Loanbook

mod analytics;

pub use analytics::{collection_rate, fill_months, AnalyticsService, DashboardStats, MonthlyCollection};
