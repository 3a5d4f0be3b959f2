//! Procedure registry: the permission set each procedure requires.
//!
//! Callees declare requirements in the `perms` option of their
//! registration. Procedures without a declaration require nothing.

use dashmap::DashMap;
use shared_types::{get_dict_value, Dict, Permission, Value, ValueError};
use tracing::debug;

/// Registration option holding the required permission codes. Publications
/// use the same key for their delivery constraint.
pub const KEY_PERMISSIONS: &str = "perms";

/// Read the permission set declared in a registration or publication.
/// Absent or null means none.
pub fn declared_permissions(options: &Dict) -> Result<Vec<Permission>, ValueError> {
    match get_dict_value(options, KEY_PERMISSIONS) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => value.as_permissions(),
    }
}

/// Required permissions per registered procedure.
#[derive(Debug, Default)]
pub struct ProcedureRegistry {
    required: DashMap<String, Vec<Permission>>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the requirement for `procedure`.
    pub fn declare(&self, procedure: impl Into<String>, permissions: Vec<Permission>) {
        let procedure = procedure.into();
        debug!(procedure = %procedure, count = permissions.len(), "Declared procedure permissions");
        self.required.insert(procedure, permissions);
    }

    /// Permissions a caller needs one of. Empty for unknown procedures.
    pub fn required(&self, procedure: &str) -> Vec<Permission> {
        self.required
            .get(procedure)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn remove(&self, procedure: &str) -> Option<Vec<Permission>> {
        self.required.remove(procedure).map(|(_, perms)| perms)
    }

    pub fn len(&self) -> usize {
        self.required.len()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}
