//! # Gate Container
//!
//! Configuration and the shared context built from it.

pub mod config;
pub mod context;

pub use config::{ConfigError, GateConfig, RealmSettings, RedisSettings};
pub use context::GateContext;
