use std::collections::BTreeSet;

use base58::ToBase58;
use serde::{Deserialize, Serialize};

use crate::did::{self, DidUrl, DID_METHOD};
use crate::error::RegistryError;
use crate::types::{did_field_error, field_error, nested_error};

/// A signature over the sign bytes of a payload, made with the named verification method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInfo {
    /// DID URL of the verification method that produced the signature
    #[serde(rename = "verificationMethodId")]
    pub verification_method_id: String,

    /// Raw signature bytes
    pub signature: Vec<u8>,
}

impl SignInfo {
    pub fn new(verification_method_id: impl Into<String>, signature: Vec<u8>) -> Self {
        Self {
            verification_method_id: verification_method_id.into(),
            signature,
        }
    }

    pub fn validate(&self, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
        did::validate_did_url(&self.verification_method_id, DID_METHOD, allowed_namespaces)
            .map_err(|e| did_field_error("verificationMethodId", e))?;

        let url = DidUrl::parse(&self.verification_method_id)?;
        if !url.path.is_empty() || !url.query.is_empty() || url.fragment.is_empty() {
            return Err(field_error(
                "verificationMethodId",
                "must be a DID URL with a fragment and no path or query",
            ));
        }

        if self.signature.is_empty() {
            return Err(field_error("signature", "cannot be blank"));
        }

        Ok(())
    }

    pub fn normalize(&mut self) {
        self.verification_method_id = did::normalize_did_url(&self.verification_method_id);
    }

    /// The DID part of the verification method id
    pub fn signer(&self) -> String {
        DidUrl::parse(&self.verification_method_id)
            .map(|url| url.did)
            .unwrap_or_default()
    }
}

/// Returns false when the same (method id, signature) pair appears twice
pub fn is_unique_sign_info_list(infos: &[SignInfo]) -> bool {
    let mut seen = BTreeSet::new();
    infos
        .iter()
        .all(|si| seen.insert(format!("{}:{}", si.verification_method_id, si.signature.to_base58())))
}

/// Validates each signature and rejects exact duplicates
pub fn validate_sign_info_list(infos: &[SignInfo], allowed_namespaces: &[String]) -> Result<(), RegistryError> {
    if !is_unique_sign_info_list(infos) {
        return Err(field_error("signatures", "there are full sign info duplicates"));
    }
    for info in infos {
        info.validate(allowed_namespaces)
            .map_err(|e| nested_error("signatures", e))?;
    }
    Ok(())
}

pub fn normalize_sign_info_list(infos: &mut [SignInfo]) {
    for info in infos {
        info.normalize();
    }
}
