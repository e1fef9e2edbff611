use serde::{Deserialize, Serialize};

use crate::did;
use crate::error::RegistryError;
use crate::types::{did_field_error, field_error, validate_owned_fragment_url};

const MAX_SERVICE_TYPE_LENGTH: usize = 255;

/// A service endpoint in a DID Document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// The unique identifier for this service
    pub id: String,

    /// The type of the service
    #[serde(rename = "type")]
    pub service_type: String,

    /// The endpoint URLs
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: Vec<String>,
}

impl Service {
    pub fn new(id: impl Into<String>, service_type: impl Into<String>, service_endpoint: Vec<String>) -> Self {
        Self {
            id: id.into(),
            service_type: service_type.into(),
            service_endpoint,
        }
    }

    pub fn validate(&self, base_did: &str, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
        validate_owned_fragment_url(&self.id, base_did, allowed_namespaces).map_err(|e| did_field_error("id", e))?;

        let type_length = self.service_type.chars().count();
        if type_length == 0 || type_length > MAX_SERVICE_TYPE_LENGTH {
            return Err(field_error(
                "type",
                format!("length must be between 1 and {}", MAX_SERVICE_TYPE_LENGTH),
            ));
        }

        if self.service_endpoint.is_empty() {
            return Err(field_error("serviceEndpoint", "at least one endpoint is required"));
        }
        if self.service_endpoint.iter().any(|endpoint| endpoint.is_empty()) {
            return Err(field_error("serviceEndpoint", "endpoints cannot be blank"));
        }

        Ok(())
    }

    pub fn replace_dids(&mut self, old: &str, new: &str) {
        self.id = did::replace_did_in_did_url(&self.id, old, new);
    }

    pub fn normalize(&mut self) {
        self.id = did::normalize_did_url(&self.id);
    }
}
