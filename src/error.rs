//! Error types for DID registry operations.
//!
//! Every failure a handler can report is a variant of [`RegistryError`]. Callers that
//! only care about the broad category use [`RegistryError::kind`].

use cosmwasm_std::StdError;
use thiserror::Error;

/// Broad classification of registry failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Malformed,
    NamespaceNotAllowed,
    AlreadyExists,
    NotFound,
    AlreadyDeactivated,
    UnexpectedVersion,
    SignatureNotFound,
    InvalidSignature,
    StructuralValidation,
    Internal,
}

/// Errors that can occur while validating, authorizing or storing DID Documents
#[derive(Error, Debug)]
pub enum RegistryError {
    /// An identifier does not follow the DID or DID URL grammar
    #[error("`{value}`: malformed: {reason}")]
    Malformed { value: String, reason: String },

    /// The DID namespace is not accepted by this registry
    #[error("`{did}`: namespace not allowed: {reason}")]
    NamespaceNotAllowed { did: String, reason: String },

    /// The message or document failed structural validation
    #[error("basic validation failed: {0}")]
    Validation(String),

    /// A DID Document with this id already exists
    #[error("`{0}`: DID Doc exists")]
    DidDocExists(String),

    /// A version with this id already exists for the DID
    #[error("`{did}`: version `{version_id}` already exists")]
    VersionExists { did: String, version_id: String },

    /// The DID Document is not stored
    #[error("`{0}`: DID Doc not found")]
    DidDocNotFound(String),

    /// The DID is stored but the requested version is not
    #[error("`{did}`: version `{version_id}` not found")]
    VersionNotFound { did: String, version_id: String },

    /// A signature references a verification method the signer does not have
    #[error("`{0}`: verification method not found")]
    VerificationMethodNotFound(String),

    /// A controller referenced by the document is not registered
    #[error("`{0}`: controller not found")]
    ControllerNotFound(String),

    /// The DID Document was already deactivated
    #[error("`{0}`: DID Doc already deactivated")]
    AlreadyDeactivated(String),

    /// The caller built its update against a stale version
    #[error("unexpected version: got `{got}`, expected `{expected}`")]
    UnexpectedVersion { got: String, expected: String },

    /// A required signer supplied no signature
    #[error("signer: `{0}`: signature is required but not found")]
    SignatureNotFound(String),

    /// A signature did not verify, or verification material was unusable
    #[error("signer: `{signer}`: invalid signature: {reason}")]
    InvalidSignature { signer: String, reason: String },

    /// An invariant of the registry itself was broken
    #[error("internal error: {0}")]
    Internal(String),

    /// Storage or codec failure
    #[error("{0}")]
    Std(#[from] StdError),
}

impl RegistryError {
    /// Returns the broad category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::NamespaceNotAllowed { .. } => ErrorKind::NamespaceNotAllowed,
            Self::Validation(_) => ErrorKind::StructuralValidation,
            Self::DidDocExists(_) | Self::VersionExists { .. } => ErrorKind::AlreadyExists,
            Self::DidDocNotFound(_)
            | Self::VersionNotFound { .. }
            | Self::VerificationMethodNotFound(_)
            | Self::ControllerNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyDeactivated(_) => ErrorKind::AlreadyDeactivated,
            Self::UnexpectedVersion { .. } => ErrorKind::UnexpectedVersion,
            Self::SignatureNotFound(_) => ErrorKind::SignatureNotFound,
            Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            Self::Internal(_) | Self::Std(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_signature(signer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            signer: signer.into(),
            reason: reason.into(),
        }
    }
}
