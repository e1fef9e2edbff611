//! A versioned DID Document registry for `did:cheqd` identifiers.
//!
//! The registry keeps every version of every DID Document as an immutable snapshot,
//! linked to its neighbours in a version chain. Each mutation is authorized by
//! signatures from the controllers of the document and runs as a single transaction
//! over a [`cosmwasm_std::Storage`].
//!
//! # Example
//! ```no_run
//! use cosmwasm_std::testing::{mock_env, MockStorage};
//! use did_registry::{MsgCreateDidDoc, Registry, RegistryError};
//!
//! fn register(msg: MsgCreateDidDoc) -> Result<(), RegistryError> {
//!     let registry = Registry::default();
//!     let mut storage = MockStorage::new();
//!
//!     let stored = registry.create_did_doc(&mut storage, &mock_env(), msg)?;
//!     println!("Created {} at version {}", stored.did_doc.id, stored.metadata.version_id);
//!     Ok(())
//! }
//! ```

pub mod authorization;
pub mod config;
pub mod did;
mod error;
pub mod migration;
mod registry;
pub mod state;
pub mod transaction;
pub mod types;
pub mod verification;

#[cfg(test)]
mod testing;

pub use config::RegistryConfig;
pub use error::{ErrorKind, RegistryError};
pub use registry::{block_time, next_version_id, Registry};
pub use types::{
    DidDoc, DidDocWithMetadata, Metadata, MsgCreateDidDoc, MsgCreateDidDocPayload, MsgDeactivateDidDoc,
    MsgDeactivateDidDocPayload, MsgUpdateDidDoc, MsgUpdateDidDocPayload, Service, SignInfo, VerificationMethod,
    VerificationMethodType,
};
