//! Core types for the DID registry.
//!
//! This module provides the DID Document model, the per-version metadata that links
//! versions into a chain, and the signed messages accepted by the registry handlers.

mod diddoc;
mod metadata;
mod msg;
mod service;
mod sign_info;
mod verification_method;

pub use diddoc::DidDoc;
pub use metadata::{DidDocWithMetadata, Metadata};
pub use msg::{
    MsgCreateDidDoc, MsgCreateDidDocPayload, MsgDeactivateDidDoc, MsgDeactivateDidDocPayload,
    MsgUpdateDidDoc, MsgUpdateDidDocPayload,
};
pub use service::Service;
pub use sign_info::SignInfo;
pub use verification_method::{
    find_verification_method, verification_methods_by_fragment, VerificationMethod, VerificationMethodType,
};

use std::fmt::Display;

use crate::did::{self, DidUrl, DID_METHOD};
use crate::error::RegistryError;

/// Wraps a failure of a single field into a structural validation error
pub(crate) fn field_error(field: &str, err: impl Display) -> RegistryError {
    RegistryError::Validation(format!("{}: {}", field, err))
}

/// Prefixes the message of a nested structural error with the enclosing field
pub(crate) fn nested_error(field: &str, err: RegistryError) -> RegistryError {
    match err {
        RegistryError::Validation(msg) => RegistryError::Validation(format!("{}.{}", field, msg)),
        rejected @ RegistryError::NamespaceNotAllowed { .. } => rejected,
        other => field_error(field, other),
    }
}

/// Wraps an identifier error of `field`, keeping namespace rejections as they are
pub(crate) fn did_field_error(field: &str, err: RegistryError) -> RegistryError {
    match err {
        rejected @ RegistryError::NamespaceNotAllowed { .. } => rejected,
        other => field_error(field, other),
    }
}

/// Validates a DID URL of the form `<did>#<fragment>` owned by `base_did`
///
/// Path and query must be empty; the fragment is required.
pub(crate) fn validate_owned_fragment_url(
    url: &str,
    base_did: &str,
    allowed_namespaces: &[String],
) -> Result<(), RegistryError> {
    did::validate_did_url(url, DID_METHOD, allowed_namespaces)?;

    let parsed = DidUrl::parse(url)?;
    if !parsed.path.is_empty() {
        return Err(RegistryError::malformed(url, "path must be empty"));
    }
    if !parsed.query.is_empty() {
        return Err(RegistryError::malformed(url, "query must be empty"));
    }
    if parsed.fragment.is_empty() {
        return Err(RegistryError::malformed(url, "fragment is required"));
    }
    if !url.starts_with(base_did) {
        return Err(RegistryError::malformed(url, format!("must have prefix: {}", base_did)));
    }

    Ok(())
}
