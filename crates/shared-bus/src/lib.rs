//! # Shared Bus - Message Bus Substrate
//!
//! The bus carries remote procedure calls and publish/subscribe events
//! between services and end-user sessions. This crate models the pieces of
//! the bus the access-control gate plugs into.
//!
//! ## Seams
//!
//! ```text
//! ┌──────────────┐   message    ┌──────────────┐   invoke    ┌──────────────┐
//! │   Session    │ ───────────→ │    Router    │ ──────────→ │    Callee    │
//! └──────────────┘              │              │             └──────────────┘
//!                               │  Authorizer  │
//!                               │ PublishFilter│ ──event───→ subscribers
//!                               └──────────────┘
//! ```
//!
//! - [`Authorizer`]: runs for every inbound message before the router acts.
//! - [`PublishFilter`]: runs once per subscriber at delivery time.
//! - [`InvocationHandler`]: callee-side procedure implementation.
//!
//! Every outcome is an [`InvokeResult`] envelope.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod envelope;
pub mod messages;
pub mod router;
pub mod session;
pub mod subscriber;

// Re-export main types
pub use envelope::{codes, InvokeResult};
pub use messages::{
    BusMessage, Call, Cancel, Event, Invocation, MessageKind, Publish, Register, Subscribe,
    SubscriptionId, Unsubscribe,
};
pub use router::{
    handler_fn, AllowAll, Authorizer, HandlerFn, InvocationHandler, PublishFilter,
    PublishFilterFactory, Router,
};
pub use session::{Session, SessionHandle, SessionRole, UnknownRole};
pub use subscriber::{Subscription, SubscriptionError};

/// Session metadata key holding the guild a user session belongs to.
pub const KEY_GUILD_ID: &str = "guild_id";

/// Session metadata key holding the user a session belongs to.
pub const KEY_USER_ID: &str = "user_id";

/// Call option set once the gate has charged the call against the caller's
/// rate limit.
pub const KEY_RATE_ADMITTED: &str = "rate_admitted";

/// Maximum events to buffer per subscriber before dropping.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
