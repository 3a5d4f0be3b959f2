//! # Service Layer
//!
//! The [`Enforcer`] and the token buckets behind its rate limits.

pub mod enforcer;
pub mod limiter;

pub use enforcer::{bucket_cleanup_task, Enforcer};
pub use limiter::RateLimiterTable;
