//! Identity types for Ledgerline entities

use crate::error::TagParseError;
use crate::tag::LIST_SENTINEL;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque identifier of a server-side entity (account, booking, product...).
///
/// The server hands out string ids; numeric ids in payloads are accepted and
/// kept in their decimal form. An `EntityId` is never empty and never the
/// collection sentinel `"LIST"`, so `Account:LIST` always means the list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Build an id from raw text. Returns `None` for blank input and for the
    /// reserved `"LIST"`.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        Self::parse(raw.into()).ok()
    }

    fn parse(raw: String) -> Result<Self, TagParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TagParseError::EmptyId);
        }
        if trimmed == LIST_SENTINEL {
            return Err(TagParseError::ReservedId(LIST_SENTINEL));
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Extract an id from an arbitrary JSON value.
    ///
    /// Non-empty strings and non-zero integers are ids. Everything else
    /// (`null`, `""`, `0`, `false`, objects, arrays, fractional numbers) is
    /// treated as "no id".
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s.as_str()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    (i != 0).then(|| Self(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    (u != 0).then(|| Self(u.to_string()))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntityId {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for EntityId {
    type Error = TagParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value.to_string())
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
