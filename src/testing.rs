//! Shared fixtures for unit tests.

use base58::ToBase58;
use ed25519_dalek::{Signer, SigningKey};
use multibase::Base;

use crate::types::{DidDoc, SignInfo, VerificationMethod, VerificationMethodType};
use crate::verification::ED25519_MULTICODEC_PREFIX;

pub const TEST_DID: &str = "did:cheqd:testnet:zABCDEFG123456789abcd";

/// A valid testnet DID whose unique id is `[seed; 16]` in base58
pub fn test_did(seed: u8) -> String {
    format!("did:cheqd:testnet:{}", [seed; 16].to_base58())
}

pub fn ed25519_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn ed25519_2020_material(seed: u8) -> String {
    let mut bytes = ED25519_MULTICODEC_PREFIX.to_vec();
    bytes.extend_from_slice(ed25519_key(seed).verifying_key().as_bytes());
    multibase::encode(Base::Base58Btc, bytes)
}

pub fn ed25519_2018_material(seed: u8) -> String {
    ed25519_key(seed).verifying_key().as_bytes().to_base58()
}

pub fn ed25519_vm(did: &str, fragment: &str, controller: &str, seed: u8) -> VerificationMethod {
    VerificationMethod::new(
        format!("{}#{}", did, fragment),
        VerificationMethodType::Ed25519VerificationKey2020,
        controller,
        ed25519_2020_material(seed),
    )
}

/// A document controlled by itself through `#key-1`
pub fn self_controlled_doc(did: &str, seed: u8) -> DidDoc {
    DidDoc {
        context: vec!["https://www.w3.org/ns/did/v1".to_string()],
        controller: vec![did.to_string()],
        verification_method: vec![ed25519_vm(did, "key-1", did, seed)],
        authentication: vec![format!("{}#key-1", did)],
        ..DidDoc::new(did)
    }
}

pub fn sign(vm_id: &str, seed: u8, message: &[u8]) -> SignInfo {
    SignInfo::new(vm_id, ed25519_key(seed).sign(message).to_bytes().to_vec())
}
