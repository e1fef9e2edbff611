use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DidDoc;

/// Metadata of a single stored version
///
/// `next_version_id` and `previous_version_id` link the versions of one DID into a
/// doubly linked list; an empty string terminates the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Block time of the first version of the DID
    pub created: DateTime<Utc>,

    /// Block time of this version, unset on the first one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    pub deactivated: bool,

    pub version_id: String,

    #[serde(default)]
    pub next_version_id: String,

    #[serde(default)]
    pub previous_version_id: String,
}

impl Metadata {
    /// Metadata for the first version of a DID
    pub fn new(created: DateTime<Utc>, version_id: impl Into<String>) -> Self {
        Self {
            created,
            updated: None,
            deactivated: false,
            version_id: version_id.into(),
            next_version_id: String::new(),
            previous_version_id: String::new(),
        }
    }

    /// Turns a copy of the latest metadata into the metadata of its successor
    ///
    /// The links are cleared; the version store sets them when the version is added.
    pub fn update(&mut self, time: DateTime<Utc>, version_id: impl Into<String>) {
        self.updated = Some(time);
        self.version_id = version_id.into();
        self.next_version_id.clear();
        self.previous_version_id.clear();
    }
}

/// A DID Document together with its version metadata; the unit of storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocWithMetadata {
    pub did_doc: DidDoc,
    pub metadata: Metadata,
}

impl DidDocWithMetadata {
    pub fn new(did_doc: DidDoc, metadata: Metadata) -> Self {
        Self { did_doc, metadata }
    }

    pub fn id(&self) -> &str {
        &self.did_doc.id
    }

    pub fn version_id(&self) -> &str {
        &self.metadata.version_id
    }
}
