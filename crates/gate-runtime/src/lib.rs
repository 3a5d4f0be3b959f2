//! # Gate Runtime Library
//!
//! Exposes the runtime's building blocks for tests. The entry point is the
//! `main.rs` binary.
//!
//! - `container/`: configuration and the shared [`GateContext`]
//! - `realm`: router with the gate attached
//! - `procedures`: role administration served by the gate

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod container;
pub mod procedures;
pub mod realm;

pub use container::{ConfigError, GateConfig, GateContext};
pub use procedures::serve_role_procedures;
pub use realm::GateRealm;
