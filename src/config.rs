//! Registry configuration.

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Default namespace for new DIDs when the store holds none
pub const DEFAULT_NAMESPACE: &str = "testnet";

/// Upper bound on the canonical sign bytes of a payload
pub const MAX_PAYLOAD_SIZE: usize = 10_000; // 10KB

/// Settings for a [`crate::Registry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)] // missing fields take their default values
pub struct RegistryConfig {
    /// Namespace used until one is stored
    pub default_namespace: String,

    /// Largest accepted payload in bytes
    pub max_payload_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }
}

impl RegistryConfig {
    /// Loads a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(json).map_err(|e| RegistryError::Internal(format!("invalid registry config: {}", e)))
    }
}
