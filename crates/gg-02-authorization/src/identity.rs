//! Identity extraction.
//!
//! User sessions carry their identity in session metadata, placed there by
//! authentication. Service sessions act on behalf of users and name them in
//! the first two positional call arguments.

use shared_bus::{KEY_GUILD_ID, KEY_USER_ID};
use shared_types::{get_dict_value, pop_list_value, Dict, List, Value};
use std::fmt;
use thiserror::Error;

/// Which half of an identity a service call failed to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingIdentity {
    #[error("guild_id missing")]
    GuildId,

    #[error("user_id missing")]
    UserId,
}

/// A verified (guild, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub guild_id: String,
    pub user_id: String,
}

impl Identity {
    /// Read from session metadata. `None` unless both ids are present.
    #[must_use]
    pub fn from_details(details: &Dict) -> Option<Self> {
        let guild_id = get_dict_value(details, KEY_GUILD_ID)?.as_snowflake().ok()?;
        let user_id = get_dict_value(details, KEY_USER_ID)?.as_snowflake().ok()?;
        Some(Self { guild_id, user_id })
    }

    /// Consume guild id then user id from the front of `arguments`.
    pub fn take_from_arguments(arguments: &mut List) -> Result<Self, MissingIdentity> {
        let guild_id = pop_list_value(arguments, 0)
            .and_then(|v| v.as_snowflake().ok())
            .ok_or(MissingIdentity::GuildId)?;
        let user_id = pop_list_value(arguments, 0)
            .and_then(|v| v.as_snowflake().ok())
            .ok_or(MissingIdentity::UserId)?;
        Ok(Self { guild_id, user_id })
    }

    /// Write into a call's own option bag.
    pub fn write_to(&self, options: &mut Dict) {
        options.insert(KEY_GUILD_ID.to_string(), Value::from(self.guild_id.as_str()));
        options.insert(KEY_USER_ID.to_string(), Value::from(self.user_id.as_str()));
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.guild_id, self.user_id)
    }
}
