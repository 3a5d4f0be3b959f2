//! # Domain Layer
//!
//! Targets, roles and rate limits. No I/O: the stores are reached through
//! the ports in [`crate::ports`].

pub mod config;
pub mod errors;
pub mod rate_limit;
pub mod role;
pub mod target;

pub use config::*;
pub use errors::*;
pub use rate_limit::*;
pub use role::*;
pub use target::*;
