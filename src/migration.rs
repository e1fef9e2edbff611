//! Identifier migrations applied to stored DIDs across upgrades.
//!
//! These are pure functions. Running them over a store is left to the host's
//! upgrade handler, which rewrites snapshots through [`crate::state`].

use base58::ToBase58;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::did::{self, Did};
use crate::types::DidDocWithMetadata;

/// Length of an indy-style unique id in bytes
const INDY_ID_LENGTH: usize = 16;

/// Maps a UUID id that is not lower-case to a name-based UUIDv5
///
/// The name is the original id, hashed in the nil namespace. Lower-case UUIDs and
/// non-UUID ids are returned unchanged.
pub fn migrate_uuid_id(id: &str) -> String {
    if !did::is_valid_uuid(id) || id == id.to_lowercase() {
        return id.to_string();
    }

    Uuid::new_v5(&Uuid::nil(), id.as_bytes()).to_string()
}

/// Maps a non-UUID id to base58 of the first 16 bytes of its SHA-256
pub fn indy_style_id(id: &str) -> String {
    if did::is_valid_uuid(id) {
        return id.to_string();
    }

    let hash = Sha256::digest(id.as_bytes());
    hash[..INDY_ID_LENGTH].to_base58()
}

/// Applies an id migration to the unique id of a DID
///
/// Strings that don't parse as a DID are returned unchanged.
pub fn migrate_did(did: &str, migrate_id: impl Fn(&str) -> String) -> String {
    match Did::parse(did) {
        Ok(parsed) => Did::new(parsed.method, parsed.namespace, migrate_id(&parsed.id)).to_string(),
        Err(_) => did.to_string(),
    }
}

/// Applies an id migration to every DID referenced by a stored snapshot
///
/// Covers the subject, the controllers and the verification method controllers,
/// wherever they appear in the document. Metadata is kept as is.
pub fn migrate_did_doc(doc: &mut DidDocWithMetadata, migrate_id: impl Fn(&str) -> String) {
    let mut dids = vec![doc.did_doc.id.clone()];
    dids.extend(doc.did_doc.all_controller_dids());

    for old in did::unique_sorted(dids) {
        let new = migrate_did(&old, &migrate_id);
        if new != old {
            doc.did_doc.replace_dids_everywhere(&old, &new);
        }
    }
}
