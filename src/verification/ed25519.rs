//! Ed25519 key decoding for the 2018 and 2020 verification key suites.

use base58::FromBase58;
use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH};
use multibase::Base;

use super::VerificationError;

/// Multicodec prefix of an Ed25519 public key
pub const ED25519_MULTICODEC_PREFIX: [u8; 2] = [0xed, 0x01];

/// Decodes a base58btc multibase string carrying a multicodec-prefixed key
pub(super) fn decode_multibase_key(material: &str) -> Result<VerifyingKey, VerificationError> {
    let (base, bytes) =
        multibase::decode(material).map_err(|e| VerificationError::InvalidMaterial(e.to_string()))?;

    if base != Base::Base58Btc {
        return Err(VerificationError::InvalidMaterial(
            "multibase encoding must be base58btc".to_string(),
        ));
    }

    let key = bytes.strip_prefix(&ED25519_MULTICODEC_PREFIX).ok_or_else(|| {
        VerificationError::InvalidMaterial("missing ed25519 multicodec prefix".to_string())
    })?;

    key_from_bytes(key)
}

/// Decodes a plain base58 key
pub(super) fn decode_base58_key(material: &str) -> Result<VerifyingKey, VerificationError> {
    let bytes = material
        .from_base58()
        .map_err(|e| VerificationError::InvalidMaterial(format!("base58 decoding failed: {:?}", e)))?;

    key_from_bytes(&bytes)
}

pub(super) fn key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey, VerificationError> {
    let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
        VerificationError::InvalidMaterial(format!(
            "ed25519 public key must be {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            bytes.len()
        ))
    })?;

    VerifyingKey::from_bytes(&bytes).map_err(|e| VerificationError::InvalidMaterial(e.to_string()))
}

pub(super) fn verify(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<(), VerificationError> {
    let signature =
        Signature::from_slice(signature).map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;

    key.verify(message, &signature).map_err(|_| VerificationError::Mismatch)
}
