//! # Adapters Layer
//!
//! Store implementations for the outbound ports.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::{InMemoryGuildDirectory, InMemoryPermissionStore, InMemoryRoleStore};
#[cfg(feature = "redis")]
pub use self::redis::RedisPermissionStore;
