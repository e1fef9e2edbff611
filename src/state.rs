//! Version store for DID Documents.
//!
//! Every DID owns a chain of immutable snapshots keyed by `(did, version id)`, plus a
//! pointer to its latest version. Adding a version links it to the previous latest one
//! in both directions. Snapshots are only rewritten while linking and when a DID is
//! deactivated.

use cosmwasm_std::{Order, StdResult, Storage};
use cw_storage_plus::{Item, Map};
use tracing::debug;

use crate::error::RegistryError;
use crate::types::{DidDocWithMetadata, Metadata};

/// Namespace accepted for new DIDs
pub const DID_NAMESPACE: Item<String> = Item::new("namespace");

/// Number of distinct DIDs ever created
pub const DID_COUNT: Item<u64> = Item::new("count");

/// DID to its latest version id
pub const LATEST_VERSION: Map<&str, String> = Map::new("latest");

/// (DID, version id) to snapshot
pub const VERSIONS: Map<(&str, &str), DidDocWithMetadata> = Map::new("version");

/// Whether a write may replace an existing snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if the version is already stored
    Insert,
    /// Replace the stored version
    Overwrite,
}

/// Returns the stored namespace, or `default` when none was set
pub fn namespace(storage: &dyn Storage, default: &str) -> StdResult<String> {
    Ok(DID_NAMESPACE
        .may_load(storage)?
        .unwrap_or_else(|| default.to_string()))
}

pub fn set_namespace(storage: &mut dyn Storage, namespace: &str) -> StdResult<()> {
    DID_NAMESPACE.save(storage, &namespace.to_string())
}

pub fn did_doc_count(storage: &dyn Storage) -> StdResult<u64> {
    Ok(DID_COUNT.may_load(storage)?.unwrap_or_default())
}

pub fn set_did_doc_count(storage: &mut dyn Storage, count: u64) -> StdResult<()> {
    DID_COUNT.save(storage, &count)
}

pub fn has_did_doc(storage: &dyn Storage, did: &str) -> bool {
    LATEST_VERSION.has(storage, did)
}

pub fn has_did_doc_version(storage: &dyn Storage, did: &str, version_id: &str) -> bool {
    VERSIONS.has(storage, (did, version_id))
}

pub fn latest_version_id(storage: &dyn Storage, did: &str) -> Result<String, RegistryError> {
    LATEST_VERSION
        .may_load(storage, did)?
        .ok_or_else(|| RegistryError::DidDocNotFound(did.to_string()))
}

/// Points the DID at `version_id`, counting the DID if it is new
pub fn set_latest_version(storage: &mut dyn Storage, did: &str, version_id: &str) -> Result<(), RegistryError> {
    if !has_did_doc(storage, did) {
        let count = did_doc_count(storage)?;
        set_did_doc_count(storage, count + 1)?;
    }

    LATEST_VERSION.save(storage, did, &version_id.to_string())?;
    Ok(())
}

pub fn get_did_doc_version(
    storage: &dyn Storage,
    did: &str,
    version_id: &str,
) -> Result<DidDocWithMetadata, RegistryError> {
    VERSIONS
        .may_load(storage, (did, version_id))?
        .ok_or_else(|| RegistryError::VersionNotFound {
            did: did.to_string(),
            version_id: version_id.to_string(),
        })
}

pub fn get_latest_did_doc(storage: &dyn Storage, did: &str) -> Result<DidDocWithMetadata, RegistryError> {
    let version_id = latest_version_id(storage, did)?;
    get_did_doc_version(storage, did, &version_id)
}

/// Writes a snapshot under its own (did, version id) key
pub fn set_did_doc_version(
    storage: &mut dyn Storage,
    doc: &DidDocWithMetadata,
    mode: WriteMode,
) -> Result<(), RegistryError> {
    let key = (doc.id(), doc.version_id());

    if mode == WriteMode::Insert && VERSIONS.has(storage, key) {
        return Err(RegistryError::VersionExists {
            did: doc.id().to_string(),
            version_id: doc.version_id().to_string(),
        });
    }

    VERSIONS.save(storage, key, doc)?;
    Ok(())
}

/// Appends a version to the chain of its DID and makes it the latest one
///
/// Returns the snapshot as stored, with `previous_version_id` linked.
pub fn add_new_did_doc_version(
    storage: &mut dyn Storage,
    mut doc: DidDocWithMetadata,
) -> Result<DidDocWithMetadata, RegistryError> {
    let did = doc.id().to_string();
    let version_id = doc.version_id().to_string();

    if has_did_doc_version(storage, &did, &version_id) {
        return Err(RegistryError::VersionExists { did, version_id });
    }

    if has_did_doc(storage, &did) {
        let mut latest = get_latest_did_doc(storage, &did)?;
        latest.metadata.next_version_id = version_id.clone();
        doc.metadata.previous_version_id = latest.metadata.version_id.clone();

        set_did_doc_version(storage, &latest, WriteMode::Overwrite)?;
    }

    set_did_doc_version(storage, &doc, WriteMode::Insert)?;
    set_latest_version(storage, &did, &version_id)?;

    debug!(did = %did, version_id = %version_id, previous = %doc.metadata.previous_version_id, "added version");
    Ok(doc)
}

/// Lazily lists the metadata of every version of a DID in storage order
///
/// Storage order is the byte order of version ids, not creation order.
pub fn list_versions<'a>(
    storage: &'a dyn Storage,
    did: &str,
) -> impl Iterator<Item = Result<Metadata, RegistryError>> + 'a {
    VERSIONS
        .prefix(did)
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, doc)| doc.metadata).map_err(RegistryError::from))
}

/// Visits every version of a DID in storage order until `f` returns false
pub fn for_each_version<F>(storage: &dyn Storage, did: &str, mut f: F) -> Result<(), RegistryError>
where
    F: FnMut(DidDocWithMetadata) -> bool,
{
    for item in VERSIONS.prefix(did).range(storage, None, None, Order::Ascending) {
        let (_, doc) = item?;
        if !f(doc) {
            break;
        }
    }
    Ok(())
}

/// Lists every DID with at least one version
pub fn iterate_dids<'a>(storage: &'a dyn Storage) -> impl Iterator<Item = Result<String, RegistryError>> + 'a {
    LATEST_VERSION
        .keys(storage, None, None, Order::Ascending)
        .map(|item| item.map_err(RegistryError::from))
}

pub fn delete_did_doc_version(storage: &mut dyn Storage, did: &str, version_id: &str) {
    VERSIONS.remove(storage, (did, version_id));
}

/// Sets `deactivated` on every stored version of a DID
///
/// Returns the number of rewritten versions.
pub fn deactivate_all_versions(storage: &mut dyn Storage, did: &str) -> Result<usize, RegistryError> {
    let mut versions = Vec::new();
    for_each_version(storage, did, |doc| {
        versions.push(doc);
        true
    })?;

    let count = versions.len();
    for mut doc in versions {
        doc.metadata.deactivated = true;
        set_did_doc_version(storage, &doc, WriteMode::Overwrite)?;
        debug!(did = %did, version_id = %doc.metadata.version_id, "deactivated version");
    }

    Ok(count)
}

/// Optimistic lock: the version id a caller expects to be the latest one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedVersion<'a>(pub &'a str);

impl ExpectedVersion<'_> {
    pub fn ensure_matches(&self, latest: &Metadata) -> Result<(), RegistryError> {
        if self.0 != latest.version_id {
            return Err(RegistryError::UnexpectedVersion {
                got: self.0.to_string(),
                expected: latest.version_id.clone(),
            });
        }
        Ok(())
    }
}
