use serde::{Deserialize, Serialize};

use super::node::Node;
use crate::RuleError;

/// Free-form rule metadata. `description` is the only required field; any
/// other members are carried through untouched.
///
/// Every way of building one, deserialization included, goes through the
/// same check, so a `Metadata` always has a non-empty description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Metadata {
    description: String,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Metadata {
    /// Metadata with only a description.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::MissingMetadata`] if `description` is empty.
    pub fn new(description: impl Into<String>) -> Result<Self, RuleError> {
        let description = description.into();
        if description.is_empty() {
            return Err(RuleError::MissingMetadata);
        }
        Ok(Self {
            description,
            extra: serde_json::Map::new(),
        })
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Members other than `description`.
    #[must_use]
    pub fn extra(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.extra
    }

    /// Validate caller-supplied metadata.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::MissingMetadata`] unless `json` is an object whose
    /// `description` is a non-empty string.
    pub fn from_json(json: serde_json::Value) -> Result<Self, RuleError> {
        let serde_json::Value::Object(mut map) = json else {
            return Err(RuleError::MissingMetadata);
        };
        let description = match map.remove("description") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            _ => return Err(RuleError::MissingMetadata),
        };
        Ok(Self {
            description,
            extra: map,
        })
    }
}

impl TryFrom<serde_json::Value> for Metadata {
    type Error = RuleError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_json(json)
    }
}

/// The persisted unit: the raw rule string plus its metadata. ASTs are never
/// stored; they are rebuilt from `rule_string` whenever needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub id: String,
    pub rule_string: String,
    pub metadata: Metadata,
}

/// A record returned to callers together with the AST parsed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRule {
    #[serde(flatten)]
    pub record: RuleRecord,
    pub ast: Node,
}
