//! # Guild-Gate Test Suite
//!
//! Cross-crate scenarios driving the realm end to end.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs       # realm + stores + sessions
//!     ├── call_flow.rs      # identity, rate limit, permissions on calls
//!     ├── publish_flow.rs   # per-subscriber delivery
//!     └── fault_flow.rs     # store failures, cancellation, crash containment
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gg-tests
//! cargo test -p gg-tests integration::publish_flow
//! ```

#![allow(dead_code)]

pub mod integration;
