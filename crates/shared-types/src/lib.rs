//! # Shared Types Crate
//!
//! This crate contains the payload model carried by the bus, the identifiers
//! the bus assigns to sessions, requests and registrations, and the numeric
//! permission codes granted to targets.
//!
//! ## Design Principles
//!
//! - **Closed value model**: call arguments and option bags are made of
//!   [`Value`]s. Reading a typed value out of a payload goes through an
//!   explicit extraction that fails with a [`ValueError`] instead of coercing.
//! - **Single Source of Truth**: every type that crosses a crate boundary is
//!   defined here.

pub mod errors;
pub mod ids;
pub mod permission;
pub mod value;

pub use errors::ValueError;
pub use ids::{IdGenerator, RegistrationId, RequestId, SessionId};
pub use permission::{permissions_to_value, Permission};
pub use value::{get_dict_value, get_list_value, pop_list_value, Dict, List, Value};
