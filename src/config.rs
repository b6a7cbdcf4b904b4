use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AttributeSet, RuleError};

/// Engine configuration, loadable from JSON.
///
/// ```json
/// { "attributes": ["age", "department", "salary", "experience", "tier"] }
/// ```
///
/// Omitted fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Attribute names rules may compare against.
    pub attributes: AttributeSet,
}

impl EngineConfig {
    /// Parse a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Json`] if the input is not a valid configuration.
    pub fn from_json(input: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Read a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] on I/O or JSON failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)?;
        let config = Self::from_json(&input)?;
        info!(
            path = %path.display(),
            attributes = %config.attributes,
            "loaded engine configuration"
        );
        Ok(config)
    }
}
