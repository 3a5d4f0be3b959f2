//! # Target Address Model
//!
//! A target names who a permission grant or role assignment applies to.
//!
//! ## Syntax
//!
//! ```text
//! [<guild id> ":"] [<prefix>] <id>
//!
//!   68          global user
//!   55:68       member 68 of guild 55
//!   55:@7       role 7 of guild 55
//!   $owner      global special target
//!   55:$everyone
//! ```
//!
//! | Prefix | Type | Constraint |
//! |--------|------|------------|
//! | (none) | User | id starts with a decimal digit |
//! | `@` | Role | never global |
//! | `$` | Special | - |
//!
//! Parsing the canonical string of a valid target yields an equal target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const GUILD_DELIMITER: char = ':';

/// Special target: configured bot owners.
pub const SPECIAL_OWNER: &str = "owner";
/// Special target: every user (globally, or within a guild).
pub const SPECIAL_EVERYONE: &str = "everyone";
/// Special target: the owner of a guild.
pub const SPECIAL_GUILD_OWNER: &str = "guild_owner";
/// Special target: administrators of a guild.
pub const SPECIAL_GUILD_ADMIN: &str = "guild_admin";

/// Target parse and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetParseError {
    #[error("target id must not be empty")]
    EmptySyntax,

    #[error("unknown target type: {0:?}")]
    UnknownType(char),

    #[error("role targets must not be global")]
    RoleRequiresGuild,

    #[error("ambiguous '{GUILD_DELIMITER}' in target: {0}")]
    AmbiguousDelimiter(String),
}

/// Kind of entity a target addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetType {
    User,
    Role,
    Special,
}

impl TargetType {
    /// Single-character prefix in the canonical form.
    #[must_use]
    pub fn prefix(self) -> Option<char> {
        match self {
            TargetType::User => None,
            TargetType::Role => Some('@'),
            TargetType::Special => Some('$'),
        }
    }

    fn from_leading(c: char) -> Result<Self, TargetParseError> {
        match c {
            '@' => Ok(TargetType::Role),
            '$' => Ok(TargetType::Special),
            c if c.is_ascii_digit() => Ok(TargetType::User),
            other => Err(TargetParseError::UnknownType(other)),
        }
    }
}

/// Canonical principal/role address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    guild_id: Option<String>,
    kind: TargetType,
    id: String,
}

impl Target {
    /// Build a validated target. An empty guild id means global.
    pub fn new(
        guild_id: Option<&str>,
        kind: TargetType,
        id: impl Into<String>,
    ) -> Result<Self, TargetParseError> {
        let target = Self {
            guild_id: guild_id.filter(|g| !g.is_empty()).map(str::to_string),
            kind,
            id: id.into(),
        };
        target.check()?;
        Ok(target)
    }

    /// Parse a target from its canonical string.
    pub fn parse(raw: &str) -> Result<Self, TargetParseError> {
        let (guild_id, rest) = match raw.split_once(GUILD_DELIMITER) {
            Some((guild, rest)) => (Some(guild), rest),
            None => (None, raw),
        };

        let first = rest.chars().next().ok_or(TargetParseError::EmptySyntax)?;
        let kind = TargetType::from_leading(first)?;
        let id = match kind {
            TargetType::User => rest,
            _ => &rest[first.len_utf8()..],
        };

        Self::new(guild_id, kind, id)
    }

    /// Global user target. Panics on an invalid id; trusted call sites only.
    #[must_use]
    pub fn user(user_id: &str) -> Self {
        Self::must(None, TargetType::User, user_id)
    }

    /// Guild member target. Panics on an invalid id; trusted call sites only.
    #[must_use]
    pub fn member(guild_id: &str, user_id: &str) -> Self {
        Self::must(Some(guild_id), TargetType::User, user_id)
    }

    /// Guild role target. Panics on an invalid id; trusted call sites only.
    #[must_use]
    pub fn role(guild_id: &str, role_id: &str) -> Self {
        Self::must(Some(guild_id), TargetType::Role, role_id)
    }

    /// Special target, global when `guild_id` is `None`.
    #[must_use]
    pub fn special(guild_id: Option<&str>, name: &str) -> Self {
        Self::must(guild_id, TargetType::Special, name)
    }

    #[allow(clippy::panic)]
    fn must(guild_id: Option<&str>, kind: TargetType, id: &str) -> Self {
        match Self::new(guild_id, kind, id) {
            Ok(target) => target,
            Err(e) => panic!("invalid {kind:?} target {id:?}: {e}"),
        }
    }

    fn check(&self) -> Result<(), TargetParseError> {
        // The first delimiter always separates the guild.
        let ambiguous = match &self.guild_id {
            Some(guild) => guild.contains(GUILD_DELIMITER),
            None => self.id.contains(GUILD_DELIMITER),
        };
        if ambiguous {
            return Err(TargetParseError::AmbiguousDelimiter(self.to_string()));
        }

        let first = self.id.chars().next().ok_or(TargetParseError::EmptySyntax)?;
        match self.kind {
            TargetType::User if !first.is_ascii_digit() => {
                Err(TargetParseError::UnknownType(first))
            }
            TargetType::Role if self.is_global() => Err(TargetParseError::RoleRequiresGuild),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn guild_id(&self) -> Option<&str> {
        self.guild_id.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> TargetType {
        self.kind
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The target without its guild segment (`@7`, `$everyone`, `68`).
    #[must_use]
    pub fn guild_target(&self) -> String {
        match self.kind.prefix() {
            Some(prefix) => format!("{prefix}{}", self.id),
            None => self.id.clone(),
        }
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.guild_id.is_none()
    }

    /// Global user target.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.is_global() && self.kind == TargetType::User
    }

    /// Guild-bound user target.
    #[must_use]
    pub fn is_member(&self) -> bool {
        !self.is_global() && self.kind == TargetType::User
    }

    #[must_use]
    pub fn is_role(&self) -> bool {
        self.kind == TargetType::Role
    }

    #[must_use]
    pub fn is_special(&self) -> bool {
        self.kind == TargetType::Special
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(guild) = &self.guild_id {
            write!(f, "{guild}{GUILD_DELIMITER}")?;
        }
        if let Some(prefix) = self.kind.prefix() {
            write!(f, "{prefix}")?;
        }
        f.write_str(&self.id)
    }
}

impl FromStr for Target {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Target {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
