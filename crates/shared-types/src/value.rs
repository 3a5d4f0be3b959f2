//! # Bus Values
//!
//! Positional arguments, keyword arguments and option bags on the bus are
//! schemaless on the wire. Inside the gate they are represented by the closed
//! [`Value`] enum, and every read goes through a typed extraction.
//!
//! | Extraction | Accepts | Fails with |
//! |------------|---------|------------|
//! | [`Value::as_str`] | `Str` | `TypeMismatch` |
//! | [`Value::as_i64`] | `Int` | `TypeMismatch` |
//! | [`Value::as_snowflake`] | non-empty `Str`, non-negative `Int` | `EmptyIdentifier`, `NegativeIdentifier`, `TypeMismatch` |
//! | [`Value::as_permissions`] | `List` of `Int` / decimal `Str` | `InvalidPermission`, `TypeMismatch` |

use crate::errors::ValueError;
use crate::permission::Permission;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Positional payload.
pub type List = Vec<Value>;

/// Keyword payload / option bag.
pub type Dict = BTreeMap<String, Value>;

/// A single payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(List),
    Dict(Dict),
}

impl Value {
    /// Name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    /// Borrow the value as a string.
    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    /// Read the value as an integer.
    pub fn as_i64(&self) -> Result<i64, ValueError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(other.mismatch("int")),
        }
    }

    /// Read the value as a snowflake identifier.
    ///
    /// Unlike [`Value::as_str`] this also accepts integers, rendered in
    /// decimal.
    pub fn as_snowflake(&self) -> Result<String, ValueError> {
        match self {
            Value::Str(s) if s.is_empty() => Err(ValueError::EmptyIdentifier),
            Value::Str(s) => Ok(s.clone()),
            Value::Int(i) if *i < 0 => Err(ValueError::NegativeIdentifier(*i)),
            Value::Int(i) => Ok(i.to_string()),
            other => Err(other.mismatch("snowflake")),
        }
    }

    /// Read the value as a list of permission codes.
    pub fn as_permissions(&self) -> Result<Vec<Permission>, ValueError> {
        let Value::List(items) = self else {
            return Err(self.mismatch("list"));
        };

        items
            .iter()
            .map(|item| match item {
                Value::Int(code) => u32::try_from(*code)
                    .map(Permission::new)
                    .map_err(|_| ValueError::InvalidPermission(code.to_string())),
                Value::Str(code) => code
                    .parse::<u32>()
                    .map(Permission::new)
                    .map_err(|_| ValueError::InvalidPermission(code.clone())),
                other => Err(ValueError::InvalidPermission(other.kind().to_string())),
            })
            .collect()
    }

    /// Whether the value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Dict> for Value {
    fn from(dict: Dict) -> Self {
        Value::Dict(dict)
    }
}

/// Safely get the value at `index` of a list.
#[must_use]
pub fn get_list_value(list: &List, index: usize) -> Option<&Value> {
    list.get(index)
}

/// Remove and return the value at `index` of a list.
///
/// The remaining values shift left. Returns `None` when the index is out of
/// bounds, leaving the list untouched.
pub fn pop_list_value(list: &mut List, index: usize) -> Option<Value> {
    if index >= list.len() {
        return None;
    }
    Some(list.remove(index))
}

/// Safely get the value stored under `key`.
#[must_use]
pub fn get_dict_value<'a>(dict: &'a Dict, key: &str) -> Option<&'a Value> {
    dict.get(key)
}
