use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::did::{self, DidUrl, DID_METHOD};
use crate::error::RegistryError;
use crate::types::{did_field_error, field_error, validate_owned_fragment_url};
use crate::verification::VerificationMaterial;

/// Supported verification method types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationMethodType {
    /// Multibase base58btc Ed25519 key with the `0xed01` multicodec prefix
    Ed25519VerificationKey2020,
    /// Plain base58 Ed25519 key
    Ed25519VerificationKey2018,
    /// JSON Web Key
    JsonWebKey2020,
}

impl VerificationMethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519VerificationKey2020 => "Ed25519VerificationKey2020",
            Self::Ed25519VerificationKey2018 => "Ed25519VerificationKey2018",
            Self::JsonWebKey2020 => "JsonWebKey2020",
        }
    }
}

impl fmt::Display for VerificationMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verification method in a DID Document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// DID URL of the method, `<did>#<fragment>`
    pub id: String,

    /// The type of the verification method
    #[serde(rename = "type")]
    pub verification_method_type: VerificationMethodType,

    /// The DID controlling this key
    pub controller: String,

    /// Encoded public key; the encoding depends on the type
    #[serde(rename = "verificationMaterial")]
    pub verification_material: String,
}

impl VerificationMethod {
    pub fn new(
        id: impl Into<String>,
        verification_method_type: VerificationMethodType,
        controller: impl Into<String>,
        verification_material: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            verification_method_type,
            controller: controller.into(),
            verification_material: verification_material.into(),
        }
    }

    /// Validates the id, controller and key material of this method
    pub fn validate(&self, base_did: &str, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
        validate_owned_fragment_url(&self.id, base_did, allowed_namespaces).map_err(|e| did_field_error("id", e))?;
        did::validate_did(&self.controller, DID_METHOD, allowed_namespaces)
            .map_err(|e| did_field_error("controller", e))?;
        VerificationMaterial::decode(self.verification_method_type, &self.verification_material)
            .map_err(|e| field_error("verificationMaterial", e))?;
        Ok(())
    }

    pub fn replace_dids(&mut self, old: &str, new: &str) {
        if self.controller == old {
            self.controller = new.to_string();
        }
        self.id = did::replace_did_in_did_url(&self.id, old, new);
    }

    pub fn normalize(&mut self) {
        self.controller = did::normalize_did(&self.controller);
        self.id = did::normalize_did_url(&self.id);
    }

    /// Returns the fragment of the method id, or an empty string when it has none
    pub fn fragment(&self) -> String {
        DidUrl::parse(&self.id).map(|url| url.fragment).unwrap_or_default()
    }
}

/// Finds a verification method by its full id
pub fn find_verification_method<'a>(vms: &'a [VerificationMethod], id: &str) -> Option<&'a VerificationMethod> {
    vms.iter().find(|vm| vm.id == id)
}

/// Indexes verification methods by the fragment of their id
pub fn verification_methods_by_fragment(vms: &[VerificationMethod]) -> BTreeMap<String, &VerificationMethod> {
    vms.iter().map(|vm| (vm.fragment(), vm)).collect()
}
