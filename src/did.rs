//! DID and DID URL parsing, validation and normalization.
//!
//! Identifiers follow `did:<method>[:<namespace>]:<id>`, where the unique id is
//! either 16 bytes of base58 or a hyphenated UUID. DID URLs append an optional
//! path, query and fragment. Normalization lower-cases UUID ids and leaves
//! base58 ids untouched; it never fails, so unparsable input passes through
//! unchanged and is rejected later by validation.

use std::fmt;
use std::sync::LazyLock;

use base58::FromBase58;
use regex::Regex;
use uuid::Uuid;

use crate::error::RegistryError;

/// The method handled by this registry
pub const DID_METHOD: &str = "cheqd";

/// Number of bytes a base58 unique id must decode to
const INDY_ID_LENGTH: usize = 16;

static SPLIT_DID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^did:([^:]+?)(:([^:]+?))?:([^:]+)$").unwrap());

static DID_NAMESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]*$").unwrap());

static SPLIT_DID_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^/?#]*)?([^?#]*)(\?([^#]*))?(#([^#]+$))?$").unwrap()
});

static DID_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[/a-zA-Z0-9\-._~!$&'()*+,;=:@]|%[0-9A-Fa-f]{2})*$").unwrap()
});

// Query and fragment additionally allow `?`.
static DID_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[/a-zA-Z0-9\-._~!$&'()*+,;=:@?]|%[0-9A-Fa-f]{2})*$").unwrap()
});

/// A DID split into its components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Did {
    /// The DID method, e.g. `cheqd`
    pub method: String,
    /// The network namespace; empty when the DID omits it
    pub namespace: String,
    /// The method-specific unique id
    pub id: String,
}

impl Did {
    /// Creates a new Did from its components
    pub fn new(method: impl Into<String>, namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            namespace: namespace.into(),
            id: id.into(),
        }
    }

    /// Splits a DID string without validating the unique id
    pub fn parse(did: &str) -> Result<Self, RegistryError> {
        let caps = SPLIT_DID
            .captures(did)
            .ok_or_else(|| RegistryError::malformed(did, "unable to split did into method, namespace and id"))?;

        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
        Ok(Self::new(group(1), group(3), group(4)))
    }

    /// Returns a copy with a normalized unique id
    pub fn normalized(&self) -> Self {
        Self::new(self.method.clone(), self.namespace.clone(), normalize_id(&self.id))
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:{}", self.method)?;
        if !self.namespace.is_empty() {
            write!(f, ":{}", self.namespace)?;
        }
        write!(f, ":{}", self.id)
    }
}

/// A DID URL split into DID, path, query and fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidUrl {
    pub did: String,
    /// Path including its leading `/`, or empty
    pub path: String,
    /// Query without the leading `?`, or empty
    pub query: String,
    /// Fragment without the leading `#`, or empty
    pub fragment: String,
}

impl DidUrl {
    /// Splits a DID URL without validating its parts
    pub fn parse(did_url: &str) -> Result<Self, RegistryError> {
        let caps = SPLIT_DID_URL.captures(did_url).ok_or_else(|| {
            RegistryError::malformed(did_url, "unable to split did url into did, path, query and fragment")
        })?;

        let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default();
        Ok(Self {
            did: group(1),
            path: group(2),
            query: group(4),
            fragment: group(6),
        })
    }
}

impl fmt::Display for DidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.did, self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}

/// Splits a DID into (method, namespace, id)
pub fn split_did(did: &str) -> Result<(String, String, String), RegistryError> {
    let Did { method, namespace, id } = Did::parse(did)?;
    Ok((method, namespace, id))
}

/// Joins DID components; the namespace segment is omitted when empty
pub fn join_did(method: &str, namespace: &str, id: &str) -> String {
    Did::new(method, namespace, id).to_string()
}

/// Splits a DID URL into (did, path, query, fragment)
pub fn split_did_url(did_url: &str) -> Result<(String, String, String, String), RegistryError> {
    let DidUrl { did, path, query, fragment } = DidUrl::parse(did_url)?;
    Ok((did, path, query, fragment))
}

pub fn join_did_url(did: &str, path: &str, query: &str, fragment: &str) -> String {
    DidUrl {
        did: did.to_string(),
        path: path.to_string(),
        query: query.to_string(),
        fragment: fragment.to_string(),
    }
    .to_string()
}

/// Returns true for a canonical hyphenated UUID in any letter case
pub fn is_valid_uuid(id: &str) -> bool {
    id.len() == 36 && Uuid::try_parse(id).is_ok()
}

/// Checks that a unique id is 16 bytes of base58 or a UUID
pub fn validate_id(id: &str) -> Result<(), RegistryError> {
    if is_valid_uuid(id) {
        return Ok(());
    }

    match id.from_base58() {
        Ok(bytes) if bytes.len() == INDY_ID_LENGTH => Ok(()),
        Ok(bytes) => Err(RegistryError::malformed(
            id,
            format!("unique id must be {} bytes of base58, got {}", INDY_ID_LENGTH, bytes.len()),
        )),
        Err(_) => Err(RegistryError::malformed(id, "unique id must be base58 or UUID")),
    }
}

/// Lower-cases UUID ids; any other id is returned unchanged
pub fn normalize_id(id: &str) -> String {
    if is_valid_uuid(id) {
        id.to_lowercase()
    } else {
        id.to_string()
    }
}

pub fn normalize_did(did: &str) -> String {
    match Did::parse(did) {
        Ok(parsed) => parsed.normalized().to_string(),
        Err(_) => did.to_string(),
    }
}

pub fn normalize_did_url(did_url: &str) -> String {
    match DidUrl::parse(did_url) {
        Ok(mut parsed) => {
            parsed.did = normalize_did(&parsed.did);
            parsed.to_string()
        }
        Err(_) => did_url.to_string(),
    }
}

pub fn normalize_did_list(dids: &[String]) -> Vec<String> {
    dids.iter().map(|did| normalize_did(did)).collect()
}

/// Validates a DID against the expected method and namespace allow-list
///
/// An empty `method` accepts any method and an empty allow-list accepts any namespace.
pub fn validate_did(did: &str, method: &str, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
    let parsed = Did::parse(did)?;

    if !method.is_empty() && method != parsed.method {
        return Err(RegistryError::malformed(did, format!("did method must be: {}", method)));
    }

    if !DID_NAMESPACE.is_match(&parsed.namespace) {
        return Err(RegistryError::malformed(did, "invalid did namespace"));
    }

    if !allowed_namespaces.is_empty() && !allowed_namespaces.contains(&parsed.namespace) {
        return Err(RegistryError::NamespaceNotAllowed {
            did: did.to_string(),
            reason: format!("did namespace must be one of: {}", allowed_namespaces.join(", ")),
        });
    }

    validate_id(&parsed.id).map_err(|_| RegistryError::malformed(did, "invalid unique id"))
}

pub fn is_valid_did(did: &str, method: &str, allowed_namespaces: &[String]) -> bool {
    validate_did(did, method, allowed_namespaces).is_ok()
}

/// Validates every part of a DID URL
pub fn validate_did_url(did_url: &str, method: &str, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
    let parsed = DidUrl::parse(did_url)?;

    validate_did(&parsed.did, method, allowed_namespaces)?;
    validate_path(&parsed.path)?;
    validate_query(&parsed.query)?;
    validate_fragment(&parsed.fragment)
}

pub fn is_valid_did_url(did_url: &str, method: &str, allowed_namespaces: &[String]) -> bool {
    validate_did_url(did_url, method, allowed_namespaces).is_ok()
}

pub fn validate_path(path: &str) -> Result<(), RegistryError> {
    if DID_PATH.is_match(path) {
        Ok(())
    } else {
        Err(RegistryError::malformed(path, "did url path contains forbidden characters"))
    }
}

pub fn validate_query(query: &str) -> Result<(), RegistryError> {
    if DID_QUERY.is_match(query) {
        Ok(())
    } else {
        Err(RegistryError::malformed(query, "did url query contains forbidden characters"))
    }
}

pub fn validate_fragment(fragment: &str) -> Result<(), RegistryError> {
    if DID_QUERY.is_match(fragment) {
        Ok(())
    } else {
        Err(RegistryError::malformed(fragment, "did url fragment contains forbidden characters"))
    }
}

/// Swaps the DID part of a DID URL when it equals `old_did`
///
/// Unparsable URLs are returned unchanged.
pub fn replace_did_in_did_url(did_url: &str, old_did: &str, new_did: &str) -> String {
    match DidUrl::parse(did_url) {
        Ok(mut parsed) => {
            if parsed.did == old_did {
                parsed.did = new_did.to_string();
            }
            parsed.to_string()
        }
        Err(_) => did_url.to_string(),
    }
}

/// Returns the sorted distinct values of a list
pub fn unique_sorted(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut values: Vec<String> = values.into_iter().collect();
    values.sort();
    values.dedup();
    values
}

pub fn is_unique(values: &[String]) -> bool {
    let mut seen = std::collections::BTreeSet::new();
    values.iter().all(|v| seen.insert(v))
}
