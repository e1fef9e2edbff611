//! Signature-based authorization of DID Document mutations.
//!
//! Every mutation names a set of required signers. A signer is a [`ScopedIdentity`]:
//! a DID together with the epoch it is looked up in. During an update the committed
//! document of the subject ([`Epoch::Current`]) and its proposed replacement
//! ([`Epoch::Proposed`]) are distinct principals, so each side of a key rotation has
//! to sign on its own.
//!
//! Documents are resolved through a [`ResolutionContext`], which consults the
//! candidates of the running operation before the committed store.

use std::collections::{BTreeMap, BTreeSet};

use cosmwasm_std::Storage;
use tracing::debug;

use crate::error::RegistryError;
use crate::state;
use crate::types::{
    find_verification_method, verification_methods_by_fragment, DidDoc, DidDocWithMetadata, SignInfo, VerificationMethod,
};
use crate::verification;

/// Which state of a DID a signer refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Epoch {
    /// The committed latest version, or a candidate being created
    Current,
    /// The replacement proposed by a running update
    Proposed,
}

/// A DID in a given epoch
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopedIdentity {
    pub did: String,
    pub epoch: Epoch,
}

impl ScopedIdentity {
    pub fn current(did: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            epoch: Epoch::Current,
        }
    }

    pub fn proposed(did: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            epoch: Epoch::Proposed,
        }
    }

    /// `Proposed` when `did` is the subject under update, `Current` otherwise
    pub fn for_subject(did: &str, subject: Option<&str>) -> Self {
        if subject == Some(did) {
            Self::proposed(did)
        } else {
            Self::current(did)
        }
    }
}

/// A signature attributed to the identity it is checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedSignature {
    pub signer: ScopedIdentity,
    pub sign_info: SignInfo,
}

/// How many of a signer's signatures must verify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// Every signature supplied by every required signer
    AllValid,
    /// At least one signature per required signer
    AtLeastOneValid,
}

/// Resolves DID Documents for one operation: candidates first, then the store
pub struct ResolutionContext<'a> {
    storage: &'a dyn Storage,
    overlay: BTreeMap<ScopedIdentity, DidDocWithMetadata>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self {
            storage,
            overlay: BTreeMap::new(),
        }
    }

    /// Adds a document that is not committed yet
    pub fn with_candidate(mut self, identity: ScopedIdentity, doc: DidDocWithMetadata) -> Self {
        self.overlay.insert(identity, doc);
        self
    }

    /// Looks the identity up; `Proposed` identities only resolve to candidates
    pub fn find_did_doc(&self, identity: &ScopedIdentity) -> Result<Option<DidDocWithMetadata>, RegistryError> {
        if let Some(doc) = self.overlay.get(identity) {
            return Ok(Some(doc.clone()));
        }

        match identity.epoch {
            Epoch::Proposed => Ok(None),
            Epoch::Current if state::has_did_doc(self.storage, &identity.did) => {
                state::get_latest_did_doc(self.storage, &identity.did).map(Some)
            }
            Epoch::Current => Ok(None),
        }
    }

    pub fn must_find_did_doc(&self, identity: &ScopedIdentity) -> Result<DidDocWithMetadata, RegistryError> {
        self.find_did_doc(identity)?
            .ok_or_else(|| RegistryError::DidDocNotFound(self.label(identity)))
    }

    /// Fails with `ControllerNotFound` for the first identity that doesn't resolve
    pub fn ensure_controllers_exist(&self, controllers: &[ScopedIdentity]) -> Result<(), RegistryError> {
        for controller in controllers {
            if self.find_did_doc(controller)?.is_none() {
                return Err(RegistryError::ControllerNotFound(controller.did.clone()));
            }
        }
        Ok(())
    }

    /// Finds a verification method by its full id in the signer's document
    pub fn find_verification_method(
        &self,
        signer: &ScopedIdentity,
        verification_method_id: &str,
    ) -> Result<VerificationMethod, RegistryError> {
        let doc = self.must_find_did_doc(signer)?;

        find_verification_method(&doc.did_doc.verification_method, verification_method_id)
            .cloned()
            .ok_or_else(|| RegistryError::VerificationMethodNotFound(verification_method_id.to_string()))
    }

    /// Checks one signature against the key the signer holds under its method id
    pub fn verify_signature(
        &self,
        signer: &ScopedIdentity,
        message: &[u8],
        sign_info: &SignInfo,
    ) -> Result<(), RegistryError> {
        let vm = self.find_verification_method(signer, &sign_info.verification_method_id)?;

        verification::verify_signature(&vm, message, &sign_info.signature).map_err(|e| {
            RegistryError::invalid_signature(
                self.label(signer),
                format!("method id: {}: {}", sign_info.verification_method_id, e),
            )
        })
    }

    /// Human readable name of a signer
    ///
    /// While an update is being authorized, the subject reads as `did (old version)`
    /// and its replacement as `did (new version)`.
    pub fn label(&self, identity: &ScopedIdentity) -> String {
        match identity.epoch {
            Epoch::Proposed => format!("{} (new version)", identity.did),
            Epoch::Current if self.overlay.contains_key(&ScopedIdentity::proposed(identity.did.as_str())) => {
                format!("{} (old version)", identity.did)
            }
            Epoch::Current => identity.did.clone(),
        }
    }
}

/// Signers required to create a document, or to deactivate an existing one
///
/// The controllers (or the subject itself when none are declared) and every
/// verification method controller.
pub fn signers_for_creation(doc: &DidDoc) -> Vec<ScopedIdentity> {
    doc.controllers_or_subject()
        .into_iter()
        .chain(doc.verification_method_controllers())
        .map(ScopedIdentity::current)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Signers required to replace `existing` with `updated`
///
/// Verification methods are matched by fragment. An added method needs its new
/// controller, a changed one both its old and new controller, a removed one its old
/// controller.
pub fn signers_for_update(existing: &DidDoc, updated: &DidDoc) -> Vec<ScopedIdentity> {
    let subject = Some(existing.id.as_str());
    let mut signers = BTreeSet::new();

    signers.extend(existing.controllers_or_subject().into_iter().map(ScopedIdentity::current));
    signers.extend(
        updated
            .controllers_or_subject()
            .iter()
            .map(|did| ScopedIdentity::for_subject(did, subject)),
    );

    let old_vms = verification_methods_by_fragment(&existing.verification_method);
    let new_vms = verification_methods_by_fragment(&updated.verification_method);

    for (fragment, new_vm) in &new_vms {
        match old_vms.get(fragment) {
            None => {
                signers.insert(ScopedIdentity::for_subject(&new_vm.controller, subject));
            }
            Some(old_vm) if old_vm != new_vm => {
                signers.insert(ScopedIdentity::current(old_vm.controller.as_str()));
                signers.insert(ScopedIdentity::for_subject(&new_vm.controller, subject));
            }
            Some(_) => {}
        }
    }

    for (fragment, old_vm) in &old_vms {
        if !new_vms.contains_key(fragment) {
            signers.insert(ScopedIdentity::current(old_vm.controller.as_str()));
        }
    }

    signers.into_iter().collect()
}

/// Attributes each signature to the DID of its verification method
///
/// Signatures by `subject` are attributed to both its committed and its proposed
/// state, so one signature can satisfy either side when the method id is unchanged.
pub fn scope_signatures(signatures: &[SignInfo], subject: Option<&str>) -> Vec<ScopedSignature> {
    let mut scoped = Vec::with_capacity(signatures.len());

    for sign_info in signatures {
        let signer = sign_info.signer();
        if subject == Some(signer.as_str()) {
            scoped.push(ScopedSignature {
                signer: ScopedIdentity::proposed(signer.as_str()),
                sign_info: sign_info.clone(),
            });
        }
        scoped.push(ScopedSignature {
            signer: ScopedIdentity::current(signer),
            sign_info: sign_info.clone(),
        });
    }

    scoped
}

/// Checks that every required signer signed `message` as the policy demands
pub fn verify_signers(
    ctx: &ResolutionContext<'_>,
    message: &[u8],
    signers: &[ScopedIdentity],
    signatures: &[ScopedSignature],
    policy: SignaturePolicy,
) -> Result<(), RegistryError> {
    for signer in signers {
        let own: Vec<&SignInfo> = signatures
            .iter()
            .filter(|s| &s.signer == signer)
            .map(|s| &s.sign_info)
            .collect();

        if own.is_empty() {
            debug!(signer = %ctx.label(signer), "missing signature");
            return Err(RegistryError::SignatureNotFound(ctx.label(signer)));
        }

        match policy {
            SignaturePolicy::AllValid => {
                for sign_info in own {
                    ctx.verify_signature(signer, message, sign_info)?;
                }
            }
            SignaturePolicy::AtLeastOneValid => {
                let valid = own
                    .iter()
                    .any(|sign_info| ctx.verify_signature(signer, message, sign_info).is_ok());

                if !valid {
                    let label = ctx.label(signer);
                    debug!(signer = %label, "no valid signature");
                    return Err(RegistryError::invalid_signature(
                        label.as_str(),
                        format!("there should be at least one valid signature by {}", label),
                    ));
                }
            }
        }
    }

    Ok(())
}
