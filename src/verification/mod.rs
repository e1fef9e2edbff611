//! Signature verification for DID Document verification methods.
//!
//! Key material is decoded once into a [`VerificationMaterial`], a closed set of the
//! supported verification method types, each carrying a parsed public key. Decoding is
//! used by structural validation; verification by the authorization engine.

mod ed25519;
mod jwk;

pub use ed25519::ED25519_MULTICODEC_PREFIX;
pub use jwk::JwkPublicKey;

use thiserror::Error;

use crate::types::{VerificationMethod, VerificationMethodType};

/// Errors produced while decoding key material or checking a signature
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The verification material cannot be decoded into a public key
    #[error("invalid verification material: {0}")]
    InvalidMaterial(String),

    /// The signature bytes are not a well-formed signature for the key type
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The signature does not match the message and key
    #[error("signature mismatch")]
    Mismatch,
}

/// A decoded public key together with the scheme it verifies with
#[derive(Debug, Clone)]
pub enum VerificationMaterial {
    Ed25519VerificationKey2020(ed25519_dalek::VerifyingKey),
    Ed25519VerificationKey2018(ed25519_dalek::VerifyingKey),
    JsonWebKey2020(JwkPublicKey),
}

impl VerificationMaterial {
    /// Decodes `material` according to the verification method type
    pub fn decode(method_type: VerificationMethodType, material: &str) -> Result<Self, VerificationError> {
        match method_type {
            VerificationMethodType::Ed25519VerificationKey2020 => {
                ed25519::decode_multibase_key(material).map(Self::Ed25519VerificationKey2020)
            }
            VerificationMethodType::Ed25519VerificationKey2018 => {
                ed25519::decode_base58_key(material).map(Self::Ed25519VerificationKey2018)
            }
            VerificationMethodType::JsonWebKey2020 => JwkPublicKey::parse(material).map(Self::JsonWebKey2020),
        }
    }

    /// Verifies `signature` over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), VerificationError> {
        match self {
            Self::Ed25519VerificationKey2020(key) | Self::Ed25519VerificationKey2018(key) => {
                ed25519::verify(key, message, signature)
            }
            Self::JsonWebKey2020(key) => key.verify(message, signature),
        }
    }
}

/// Verifies a signature made with the key of a verification method
pub fn verify_signature(
    vm: &VerificationMethod,
    message: &[u8],
    signature: &[u8],
) -> Result<(), VerificationError> {
    VerificationMaterial::decode(vm.verification_method_type, &vm.verification_material)?.verify(message, signature)
}
