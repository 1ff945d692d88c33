//! Middleware for the Loanbook API
//!
//! Request tracing, per-client rate limiting and security headers.

mod rate_limiter;
mod security;
mod tracing;

pub use rate_limiter::{rate_limit, RateLimiter};
pub use security::{hsts_header, security_headers};
pub use self::tracing::{request_tracing, REQUEST_ID_HEADER};
