//! JSON Web Key verification material.
//!
//! Supports RSA keys (PSS with SHA-256), EC keys on P-256 and secp256k1 (DER-encoded
//! ECDSA with SHA-256) and OKP Ed25519 keys.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rsa::signature::Verifier;
use rsa::{BigUint, RsaPublicKey};
use serde::Deserialize;
use sha2::Sha256;

use super::{ed25519, VerificationError};

const EC_COORDINATE_LENGTH: usize = 32;

/// Raw JWK members relevant to public keys
#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    #[serde(default)]
    crv: Option<String>,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// A public key parsed from a JWK
#[derive(Debug, Clone)]
pub enum JwkPublicKey {
    Rsa(RsaPublicKey),
    P256(p256::ecdsa::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

fn invalid(reason: impl Into<String>) -> VerificationError {
    VerificationError::InvalidMaterial(reason.into())
}

/// Decodes a required base64url member
fn member(value: &Option<String>, name: &str) -> Result<Vec<u8>, VerificationError> {
    let value = value.as_deref().ok_or_else(|| invalid(format!("jwk member `{}` is missing", name)))?;
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| invalid(format!("jwk member `{}`: {}", name, e)))
}

/// Decodes an EC coordinate, which must be exactly one field element long
fn coordinate(value: &Option<String>, name: &str) -> Result<[u8; EC_COORDINATE_LENGTH], VerificationError> {
    let bytes = member(value, name)?;
    <[u8; EC_COORDINATE_LENGTH]>::try_from(bytes).map_err(|bytes| {
        invalid(format!(
            "jwk member `{}` must be {} bytes, got {}",
            name,
            EC_COORDINATE_LENGTH,
            bytes.len()
        ))
    })
}

impl JwkPublicKey {
    /// Parses JWK JSON into a public key
    pub fn parse(material: &str) -> Result<Self, VerificationError> {
        let jwk: Jwk = serde_json::from_str(material).map_err(|e| invalid(format!("can't parse jwk: {}", e)))?;

        match (jwk.kty.as_str(), jwk.crv.as_deref()) {
            ("RSA", _) => {
                let n = member(&jwk.n, "n")?;
                let e = member(&jwk.e, "e")?;
                RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
                    .map(Self::Rsa)
                    .map_err(|e| invalid(e.to_string()))
            }
            ("EC", Some("P-256")) => {
                let x = coordinate(&jwk.x, "x")?;
                let y = coordinate(&jwk.y, "y")?;
                let point = p256::EncodedPoint::from_affine_coordinates(
                    &p256::FieldBytes::from(x),
                    &p256::FieldBytes::from(y),
                    false,
                );
                p256::ecdsa::VerifyingKey::from_encoded_point(&point)
                    .map(Self::P256)
                    .map_err(|e| invalid(e.to_string()))
            }
            ("EC", Some("secp256k1")) => {
                let x = coordinate(&jwk.x, "x")?;
                let y = coordinate(&jwk.y, "y")?;
                let point = k256::EncodedPoint::from_affine_coordinates(
                    &k256::FieldBytes::from(x),
                    &k256::FieldBytes::from(y),
                    false,
                );
                k256::ecdsa::VerifyingKey::from_encoded_point(&point)
                    .map(Self::Secp256k1)
                    .map_err(|e| invalid(e.to_string()))
            }
            ("OKP", Some("Ed25519")) => {
                let x = member(&jwk.x, "x")?;
                ed25519::key_from_bytes(&x).map(Self::Ed25519)
            }
            (kty, crv) => Err(invalid(format!(
                "unsupported jwk key: kty `{}`, crv `{}`",
                kty,
                crv.unwrap_or_default()
            ))),
        }
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), VerificationError> {
        match self {
            Self::Rsa(key) => {
                let key = rsa::pss::VerifyingKey::<Sha256>::new(key.clone());
                let signature = rsa::pss::Signature::try_from(signature)
                    .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
                key.verify(message, &signature).map_err(|_| VerificationError::Mismatch)
            }
            Self::P256(key) => {
                let signature = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
                key.verify(message, &signature).map_err(|_| VerificationError::Mismatch)
            }
            Self::Secp256k1(key) => {
                let signature = k256::ecdsa::Signature::from_der(signature)
                    .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
                // k256 only accepts low-S signatures
                let signature = signature.normalize_s().unwrap_or(signature);
                key.verify(message, &signature).map_err(|_| VerificationError::Mismatch)
            }
            Self::Ed25519(key) => ed25519::verify(key, message, signature),
        }
    }
}
