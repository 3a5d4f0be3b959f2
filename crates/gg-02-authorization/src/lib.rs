//! # Authorization Subsystem (gg-02)
//!
//! The gate between sessions and the router.
//!
//! ## Trust Model
//!
//! | Session role | Identity source | Denials |
//! |--------------|-----------------|---------|
//! | `user` | session details (`guild_id`, `user_id`) | silent |
//! | `multi-user`, `api` | first two call arguments, consumed | classified |
//!
//! ## Components
//!
//! - [`GateAuthorizer`]: per-message decision (call, subscribe, publish,
//!   register, cancel, unsubscribe, other).
//! - [`GatePublishFilterFactory`]: per-subscriber delivery decision for each
//!   publication.
//! - [`ProcedureRegistry`]: the permission set each procedure requires.
//!
//! Every check is a live read through the
//! [`PermissionEnforcer`](gg_01_rbac::PermissionEnforcer). A failed read is a
//! denial with the internal error code, never an allow.

pub mod authorizer;
pub mod denial;
pub mod filter;
pub mod identity;
pub mod registry;

pub use authorizer::GateAuthorizer;
pub use denial::Denial;
pub use filter::{Constraints, GatePublishFilter, GatePublishFilterFactory, TAG_TOPIC};
pub use identity::{Identity, MissingIdentity};
pub use registry::{declared_permissions, ProcedureRegistry, KEY_PERMISSIONS};
