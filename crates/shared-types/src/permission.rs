//! # Permission Codes
//!
//! A permission is identified by a numeric code. In the permission store the
//! code's decimal string is the field name of a grant.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric permission code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    /// Read the current queue.
    pub const QUEUE_READ: Permission = Permission(1);
    /// Enqueue, remove and reorder queue entries.
    pub const QUEUE_MODIFY: Permission = Permission(2);
    /// Pause, resume, seek and skip.
    pub const PLAYER_CONTROL: Permission = Permission(3);
    /// Read saved playlists.
    pub const PLAYLIST_READ: Permission = Permission(4);
    /// Create and edit saved playlists.
    pub const PLAYLIST_MODIFY: Permission = Permission(5);
    /// Create roles and assign them to targets.
    pub const ROLES_MANAGE: Permission = Permission(6);

    #[must_use]
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Field name of this permission inside a target's grant record.
    #[must_use]
    pub fn field(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Permission> for Value {
    fn from(p: Permission) -> Self {
        Value::Int(i64::from(p.0))
    }
}

/// Encode a permission set as a list value (used for diagnostics and
/// publication constraints).
#[must_use]
pub fn permissions_to_value(permissions: &[Permission]) -> Value {
    Value::List(permissions.iter().copied().map(Value::from).collect())
}
