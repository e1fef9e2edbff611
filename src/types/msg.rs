use serde::{Deserialize, Serialize};
use serde_json_canonicalizer::to_string as jcs_canonicalize;

use crate::did::{self, DID_METHOD};
use crate::error::RegistryError;
use crate::types::sign_info::{normalize_sign_info_list, validate_sign_info_list};
use crate::types::{did_field_error, field_error, nested_error, DidDoc, SignInfo};

/// Serializes a payload with RFC 8785 canonicalization
fn canonical_bytes<T: Serialize>(payload: &T) -> Result<Vec<u8>, RegistryError> {
    jcs_canonicalize(payload)
        .map(String::into_bytes)
        .map_err(|e| RegistryError::Internal(format!("canonicalization failed: {}", e)))
}

fn validate_version_id(version_id: &str) -> Result<(), RegistryError> {
    if version_id.is_empty() {
        return Err(field_error("versionId", "cannot be blank"));
    }
    Ok(())
}

/// Payload of a create request: the first version of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateDidDocPayload {
    #[serde(flatten)]
    pub did_doc: DidDoc,

    /// Id of the first version
    #[serde(rename = "versionId")]
    pub version_id: String,
}

impl MsgCreateDidDocPayload {
    pub fn new(did_doc: DidDoc, version_id: impl Into<String>) -> Self {
        Self {
            did_doc,
            version_id: version_id.into(),
        }
    }

    /// The bytes signers sign; computed before normalization
    pub fn sign_bytes(&self) -> Result<Vec<u8>, RegistryError> {
        canonical_bytes(self)
    }

    pub fn validate(&self, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
        self.did_doc.validate(allowed_namespaces)?;
        validate_version_id(&self.version_id)
    }

    pub fn normalize(&mut self) {
        self.did_doc.normalize();
        self.version_id = did::normalize_id(&self.version_id);
    }

    pub fn to_did_doc(&self) -> DidDoc {
        self.did_doc.clone()
    }
}

/// Payload of an update request: the full proposed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateDidDocPayload {
    #[serde(flatten)]
    pub did_doc: DidDoc,

    /// The latest version id the caller observed
    #[serde(rename = "versionId")]
    pub version_id: String,
}

impl MsgUpdateDidDocPayload {
    pub fn new(did_doc: DidDoc, version_id: impl Into<String>) -> Self {
        Self {
            did_doc,
            version_id: version_id.into(),
        }
    }

    pub fn sign_bytes(&self) -> Result<Vec<u8>, RegistryError> {
        canonical_bytes(self)
    }

    pub fn validate(&self, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
        self.did_doc.validate(allowed_namespaces)?;
        validate_version_id(&self.version_id)
    }

    pub fn normalize(&mut self) {
        self.did_doc.normalize();
        self.version_id = did::normalize_id(&self.version_id);
    }

    pub fn to_did_doc(&self) -> DidDoc {
        self.did_doc.clone()
    }
}

/// Payload of a deactivate request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDeactivateDidDocPayload {
    pub id: String,

    /// Id of the terminal version
    #[serde(rename = "versionId")]
    pub version_id: String,
}

impl MsgDeactivateDidDocPayload {
    pub fn new(id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version_id: version_id.into(),
        }
    }

    pub fn sign_bytes(&self) -> Result<Vec<u8>, RegistryError> {
        canonical_bytes(self)
    }

    pub fn validate(&self, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
        did::validate_did(&self.id, DID_METHOD, allowed_namespaces).map_err(|e| did_field_error("id", e))?;
        validate_version_id(&self.version_id)
    }

    pub fn normalize(&mut self) {
        self.id = did::normalize_did(&self.id);
        self.version_id = did::normalize_id(&self.version_id);
    }
}

/// Request to register a new DID Document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateDidDoc {
    pub payload: MsgCreateDidDocPayload,
    pub signatures: Vec<SignInfo>,
}

/// Request to append a new version to an existing DID Document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateDidDoc {
    pub payload: MsgUpdateDidDocPayload,
    pub signatures: Vec<SignInfo>,
}

/// Request to deactivate a DID Document and its whole history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDeactivateDidDoc {
    pub payload: MsgDeactivateDidDocPayload,
    pub signatures: Vec<SignInfo>,
}

macro_rules! impl_signed_msg {
    ($msg:ty, $payload:ty) => {
        impl $msg {
            pub fn new(payload: $payload, signatures: Vec<SignInfo>) -> Self {
                Self { payload, signatures }
            }

            pub fn validate(&self, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
                self.payload
                    .validate(allowed_namespaces)
                    .map_err(|e| nested_error("payload", e))?;
                validate_sign_info_list(&self.signatures, allowed_namespaces)
            }

            pub fn normalize(&mut self) {
                self.payload.normalize();
                normalize_sign_info_list(&mut self.signatures);
            }
        }
    };
}

impl_signed_msg!(MsgCreateDidDoc, MsgCreateDidDocPayload);
impl_signed_msg!(MsgUpdateDidDoc, MsgUpdateDidDocPayload);
impl_signed_msg!(MsgDeactivateDidDoc, MsgDeactivateDidDocPayload);
