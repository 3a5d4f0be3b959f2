//! # Ports Layer
//!
//! - **Driving Ports (Inbound)**: [`PermissionEnforcer`], used by the
//!   authorization pipeline and handler guards.
//! - **Driven Ports (Outbound)**: [`PermissionStore`], [`RoleStore`] and
//!   [`GuildDirectory`], implemented by adapters.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
