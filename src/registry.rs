//! Operation handlers of the DID registry.
//!
//! Each handler is one state transition of a DID: `NonExistent -> Active` on create,
//! `Active -> Active` on update and `Active -> Deactivated` on deactivate. Handlers
//! run inside [`transactional`], so a failing handler leaves the store untouched.

use chrono::{DateTime, Utc};
use cosmwasm_std::{Env, Storage};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::authorization::{
    scope_signatures, signers_for_creation, signers_for_update, verify_signers, ResolutionContext, ScopedIdentity,
    SignaturePolicy,
};
use crate::config::RegistryConfig;
use crate::did;
use crate::error::RegistryError;
use crate::state::{self, ExpectedVersion};
use crate::transaction::transactional;
use crate::types::{DidDocWithMetadata, Metadata, MsgCreateDidDoc, MsgDeactivateDidDoc, MsgUpdateDidDoc};

/// Converts the block time of the host into a UTC timestamp
pub fn block_time(env: &Env) -> Result<DateTime<Utc>, RegistryError> {
    let time = env.block.time;
    DateTime::from_timestamp(time.seconds() as i64, time.subsec_nanos() as u32)
        .ok_or_else(|| RegistryError::Internal(format!("block time out of range: {}", time)))
}

/// Derives the id of the version that follows `previous_version_id`
///
/// A name-based UUID over SHA-256(did || previous version id || sign bytes), so every
/// replica computes the same id for the same request.
pub fn next_version_id(did: &str, previous_version_id: &str, sign_bytes: &[u8]) -> String {
    let digest = Sha256::new()
        .chain_update(did.as_bytes())
        .chain_update(previous_version_id.as_bytes())
        .chain_update(sign_bytes)
        .finalize();

    Uuid::new_v5(&Uuid::nil(), &digest).to_string()
}

/// The DID registry: validates, authorizes and stores DID Document versions
#[derive(Debug, Clone, Default)]
pub struct Registry {
    config: RegistryConfig,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn allowed_namespaces(&self, storage: &dyn Storage) -> Result<Vec<String>, RegistryError> {
        Ok(vec![state::namespace(storage, &self.config.default_namespace)?])
    }

    fn check_payload_size(&self, sign_bytes: &[u8]) -> Result<(), RegistryError> {
        if sign_bytes.len() > self.config.max_payload_size {
            return Err(RegistryError::Validation(format!(
                "payload: {} bytes exceeds the limit of {} bytes",
                sign_bytes.len(),
                self.config.max_payload_size
            )));
        }
        Ok(())
    }

    /// Registers a new DID Document
    ///
    /// # Arguments
    /// * `storage` - The store of the registry
    /// * `env` - Host environment, supplying the block time
    /// * `msg` - The first version of the document and its signatures
    ///
    /// Every controller of the document, and every verification method controller,
    /// must sign the payload and every one of their signatures must verify.
    pub fn create_did_doc(
        &self,
        storage: &mut dyn Storage,
        env: &Env,
        mut msg: MsgCreateDidDoc,
    ) -> Result<DidDocWithMetadata, RegistryError> {
        transactional(storage, |store| {
            let namespaces = self.allowed_namespaces(store)?;
            msg.validate(&namespaces)?;

            // Signatures cover the payload as sent
            let sign_bytes = msg.payload.sign_bytes()?;
            self.check_payload_size(&sign_bytes)?;
            msg.normalize();

            let did = msg.payload.did_doc.id.clone();
            if state::has_did_doc(store, &did) {
                return Err(RegistryError::DidDocExists(did));
            }

            let candidate = DidDocWithMetadata::new(
                msg.payload.to_did_doc(),
                Metadata::new(block_time(env)?, msg.payload.version_id.as_str()),
            );

            {
                let ctx = ResolutionContext::new(store)
                    .with_candidate(ScopedIdentity::current(did.as_str()), candidate.clone());

                let controllers: Vec<ScopedIdentity> = candidate
                    .did_doc
                    .all_controller_dids()
                    .into_iter()
                    .map(ScopedIdentity::current)
                    .collect();
                ctx.ensure_controllers_exist(&controllers)?;

                let signers = signers_for_creation(&candidate.did_doc);
                let signatures = scope_signatures(&msg.signatures, None);
                verify_signers(&ctx, &sign_bytes, &signers, &signatures, SignaturePolicy::AllValid)?;
            }

            let stored = state::add_new_did_doc_version(store, candidate)?;
            info!(did = %did, version_id = %stored.metadata.version_id, "created DID Doc");
            Ok(stored)
        })
    }

    /// Appends a new version to an active DID Document
    ///
    /// `msg.payload.version_id` must be the latest version id; the id of the new
    /// version is derived with [`next_version_id`]. The committed and the proposed
    /// document each need at least one valid signature from every required signer.
    pub fn update_did_doc(
        &self,
        storage: &mut dyn Storage,
        env: &Env,
        mut msg: MsgUpdateDidDoc,
    ) -> Result<DidDocWithMetadata, RegistryError> {
        transactional(storage, |store| {
            let namespaces = self.allowed_namespaces(store)?;
            msg.validate(&namespaces)?;

            let sign_bytes = msg.payload.sign_bytes()?;
            self.check_payload_size(&sign_bytes)?;
            msg.normalize();

            let did = msg.payload.did_doc.id.clone();
            let existing = state::get_latest_did_doc(store, &did)?;
            if existing.metadata.deactivated {
                return Err(RegistryError::AlreadyDeactivated(did));
            }
            ExpectedVersion(&msg.payload.version_id).ensure_matches(&existing.metadata)?;

            let mut metadata = existing.metadata.clone();
            metadata.update(
                block_time(env)?,
                next_version_id(&did, &existing.metadata.version_id, &sign_bytes),
            );
            let candidate = DidDocWithMetadata::new(msg.payload.to_did_doc(), metadata);

            {
                let subject = Some(did.as_str());
                let ctx = ResolutionContext::new(store)
                    .with_candidate(ScopedIdentity::proposed(did.as_str()), candidate.clone());

                let controllers: Vec<ScopedIdentity> = candidate
                    .did_doc
                    .all_controller_dids()
                    .iter()
                    .map(|controller| ScopedIdentity::for_subject(controller, subject))
                    .collect();
                ctx.ensure_controllers_exist(&controllers)?;

                let signers = signers_for_update(&existing.did_doc, &candidate.did_doc);
                debug!(did = %did, signers = signers.len(), "authorizing update");

                let signatures = scope_signatures(&msg.signatures, subject);
                verify_signers(&ctx, &sign_bytes, &signers, &signatures, SignaturePolicy::AtLeastOneValid)?;
            }

            let stored = state::add_new_did_doc_version(store, candidate)?;
            info!(
                did = %did,
                version_id = %stored.metadata.version_id,
                previous = %stored.metadata.previous_version_id,
                "updated DID Doc"
            );
            Ok(stored)
        })
    }

    /// Deactivates a DID Document and every stored version of it
    ///
    /// Appends a terminal version with id `msg.payload.version_id`, then marks the
    /// whole history deactivated. The signers are those of the latest version.
    pub fn deactivate_did_doc(
        &self,
        storage: &mut dyn Storage,
        env: &Env,
        mut msg: MsgDeactivateDidDoc,
    ) -> Result<DidDocWithMetadata, RegistryError> {
        transactional(storage, |store| {
            let namespaces = self.allowed_namespaces(store)?;
            msg.validate(&namespaces)?;

            let sign_bytes = msg.payload.sign_bytes()?;
            self.check_payload_size(&sign_bytes)?;
            msg.normalize();

            let did = msg.payload.id.clone();
            let existing = state::get_latest_did_doc(store, &did)?;
            if existing.metadata.deactivated {
                return Err(RegistryError::AlreadyDeactivated(did));
            }

            {
                let ctx = ResolutionContext::new(store);
                let signers = signers_for_creation(&existing.did_doc);
                let signatures = scope_signatures(&msg.signatures, None);
                verify_signers(&ctx, &sign_bytes, &signers, &signatures, SignaturePolicy::AllValid)?;
            }

            let mut terminal = existing;
            terminal.metadata.update(block_time(env)?, msg.payload.version_id.as_str());
            terminal.metadata.deactivated = true;

            let stored = state::add_new_did_doc_version(store, terminal)?;
            let swept = state::deactivate_all_versions(store, &did)?;

            info!(did = %did, version_id = %stored.metadata.version_id, versions = swept, "deactivated DID Doc");
            Ok(stored)
        })
    }

    /// Returns the latest version of a DID Document
    pub fn get_latest_did_doc(&self, storage: &dyn Storage, id: &str) -> Result<DidDocWithMetadata, RegistryError> {
        state::get_latest_did_doc(storage, &did::normalize_did(id))
    }

    pub fn get_did_doc_version(
        &self,
        storage: &dyn Storage,
        id: &str,
        version_id: &str,
    ) -> Result<DidDocWithMetadata, RegistryError> {
        state::get_did_doc_version(storage, &did::normalize_did(id), &did::normalize_id(version_id))
    }

    /// Returns the metadata of every version in storage order
    pub fn get_all_versions_metadata(&self, storage: &dyn Storage, id: &str) -> Result<Vec<Metadata>, RegistryError> {
        let did = did::normalize_did(id);
        if !state::has_did_doc(storage, &did) {
            return Err(RegistryError::DidDocNotFound(did));
        }

        state::list_versions(storage, &did).collect()
    }

    /// Number of DIDs ever created
    pub fn did_doc_count(&self, storage: &dyn Storage) -> Result<u64, RegistryError> {
        Ok(state::did_doc_count(storage)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{ed25519_vm, self_controlled_doc, sign, test_did};
    use crate::types::{
        DidDoc, MsgCreateDidDocPayload, MsgDeactivateDidDocPayload, MsgUpdateDidDocPayload, SignInfo,
    };
    use cosmwasm_std::testing::{mock_env, MockStorage};

    /// (verification method id, key seed) pairs to sign with
    type Signers<'a> = &'a [(&'a str, u8)];

    fn signatures(bytes: &[u8], signers: Signers<'_>) -> Vec<SignInfo> {
        signers.iter().map(|(vm_id, seed)| sign(vm_id, *seed, bytes)).collect()
    }

    fn create_msg(doc: DidDoc, signers: Signers<'_>) -> MsgCreateDidDoc {
        let payload = MsgCreateDidDocPayload::new(doc, "v1");
        let bytes = payload.sign_bytes().unwrap();
        MsgCreateDidDoc::new(payload, signatures(&bytes, signers))
    }

    fn update_msg(doc: DidDoc, version_id: &str, signers: Signers<'_>) -> MsgUpdateDidDoc {
        let payload = MsgUpdateDidDocPayload::new(doc, version_id);
        let bytes = payload.sign_bytes().unwrap();
        MsgUpdateDidDoc::new(payload, signatures(&bytes, signers))
    }

    fn deactivate_msg(did: &str, version_id: &str, signers: Signers<'_>) -> MsgDeactivateDidDoc {
        let payload = MsgDeactivateDidDocPayload::new(did, version_id);
        let bytes = payload.sign_bytes().unwrap();
        MsgDeactivateDidDoc::new(payload, signatures(&bytes, signers))
    }

    /// Creates a self-controlled DID whose `#key-1` is derived from `seed`
    fn create_self_controlled(registry: &Registry, storage: &mut MockStorage, seed: u8) -> String {
        let did = test_did(seed);
        let key_id = format!("{}#key-1", did);
        registry
            .create_did_doc(storage, &mock_env(), create_msg(self_controlled_doc(&did, seed), &[(key_id.as_str(), seed)]))
            .unwrap();
        did
    }

    #[test]
    fn test_create_and_query() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let env = mock_env();
        let did = create_self_controlled(&registry, &mut storage, 1);

        let latest = registry.get_latest_did_doc(&storage, &did).unwrap();
        assert_eq!(latest.did_doc, self_controlled_doc(&did, 1));
        assert_eq!(latest.metadata.version_id, "v1");
        assert_eq!(latest.metadata.created, block_time(&env).unwrap());
        assert!(latest.metadata.updated.is_none());
        assert!(!latest.metadata.deactivated);

        assert_eq!(registry.get_did_doc_version(&storage, &did, "v1").unwrap(), latest);
        assert_eq!(registry.get_all_versions_metadata(&storage, &did).unwrap().len(), 1);
        assert_eq!(registry.did_doc_count(&storage).unwrap(), 1);
    }

    #[test]
    fn test_create_requires_signature() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = test_did(1);

        let result = registry.create_did_doc(&mut storage, &mock_env(), create_msg(self_controlled_doc(&did, 1), &[]));

        assert!(matches!(result, Err(RegistryError::SignatureNotFound(ref s)) if *s == did));
        assert!(matches!(
            registry.get_latest_did_doc(&storage, &did),
            Err(RegistryError::DidDocNotFound(_))
        ));
        assert_eq!(registry.did_doc_count(&storage).unwrap(), 0);
    }

    #[test]
    fn test_create_with_wrong_key() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = test_did(1);
        let key_id = format!("{}#key-1", did);

        let msg = create_msg(self_controlled_doc(&did, 1), &[(key_id.as_str(), 2)]);
        let result = registry.create_did_doc(&mut storage, &mock_env(), msg);

        assert!(matches!(result, Err(RegistryError::InvalidSignature { .. })));
    }

    #[test]
    fn test_create_existing_did() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = create_self_controlled(&registry, &mut storage, 1);
        let key_id = format!("{}#key-1", did);

        let result = registry.create_did_doc(
            &mut storage,
            &mock_env(),
            create_msg(self_controlled_doc(&did, 1), &[(key_id.as_str(), 1)]),
        );
        assert!(matches!(result, Err(RegistryError::DidDocExists(_))));
    }

    #[test]
    fn test_create_in_foreign_namespace() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = test_did(1).replace(":testnet:", ":mainnet:");
        let key_id = format!("{}#key-1", did);

        let result = registry.create_did_doc(
            &mut storage,
            &mock_env(),
            create_msg(self_controlled_doc(&did, 1), &[(key_id.as_str(), 1)]),
        );
        assert!(matches!(result, Err(RegistryError::NamespaceNotAllowed { .. })));

        state::set_namespace(&mut storage, "mainnet").unwrap();
        let result = registry.create_did_doc(
            &mut storage,
            &mock_env(),
            create_msg(self_controlled_doc(&did, 1), &[(key_id.as_str(), 1)]),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_create_payload_too_large() {
        let registry = Registry::new(RegistryConfig {
            max_payload_size: 64,
            ..RegistryConfig::default()
        });
        let mut storage = MockStorage::new();
        let did = test_did(1);
        let key_id = format!("{}#key-1", did);

        let result = registry.create_did_doc(
            &mut storage,
            &mock_env(),
            create_msg(self_controlled_doc(&did, 1), &[(key_id.as_str(), 1)]),
        );
        assert!(matches!(result, Err(ref e) if e.kind() == ErrorKind::StructuralValidation));
    }

    #[test]
    fn test_create_normalizes_uuid() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = "did:cheqd:testnet:3B9B8EEC-5B5D-4382-86D8-9185126FF130";
        let key_id = format!("{}#key-1", did);

        registry
            .create_did_doc(&mut storage, &mock_env(), create_msg(self_controlled_doc(did, 1), &[(key_id.as_str(), 1)]))
            .unwrap();

        let stored = registry.get_latest_did_doc(&storage, did).unwrap();
        assert_eq!(stored.did_doc.id, did.to_lowercase());
        assert_eq!(stored.did_doc.verification_method[0].controller, did.to_lowercase());
    }

    #[test]
    fn test_cross_controller_creation() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let a = create_self_controlled(&registry, &mut storage, 1);
        let a_key = format!("{}#key-1", a);

        let b = test_did(2);
        let b_key = format!("{}#key-1", b);
        let b_doc = DidDoc {
            controller: vec![a.clone()],
            verification_method: vec![ed25519_vm(&b, "key-1", &a, 2)],
            authentication: vec![b_key.clone()],
            ..DidDoc::new(b.as_str())
        };

        // B's own key is not enough
        let result = registry.create_did_doc(&mut storage, &mock_env(), create_msg(b_doc.clone(), &[(b_key.as_str(), 2)]));
        assert!(matches!(result, Err(RegistryError::SignatureNotFound(ref s)) if *s == a));

        registry
            .create_did_doc(&mut storage, &mock_env(), create_msg(b_doc, &[(a_key.as_str(), 1)]))
            .unwrap();
        assert_eq!(registry.get_latest_did_doc(&storage, &b).unwrap().did_doc.controller, vec![a]);
        assert_eq!(registry.did_doc_count(&storage).unwrap(), 2);
    }

    #[test]
    fn test_create_with_unknown_controller() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let missing = test_did(9);
        let did = test_did(1);
        let key_id = format!("{}#key-1", did);

        let mut doc = self_controlled_doc(&did, 1);
        doc.controller.push(missing.clone());

        let result = registry.create_did_doc(&mut storage, &mock_env(), create_msg(doc, &[(key_id.as_str(), 1)]));
        assert!(matches!(result, Err(RegistryError::ControllerNotFound(ref d)) if *d == missing));
    }

    #[test]
    fn test_controller_in_foreign_namespace() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let a = create_self_controlled(&registry, &mut storage, 1);
        let a_key = format!("{}#key-1", a);
        state::set_namespace(&mut storage, "mainnet").unwrap();

        let b = test_did(2).replace(":testnet:", ":mainnet:");
        let b_doc = DidDoc {
            controller: vec![a.clone()],
            verification_method: vec![ed25519_vm(&b, "key-1", &b, 2)],
            authentication: vec![format!("{}#key-1", b)],
            ..DidDoc::new(b.as_str())
        };
        let result = registry.create_did_doc(&mut storage, &mock_env(), create_msg(b_doc, &[(a_key.as_str(), 1)]));
        assert!(matches!(result, Err(RegistryError::NamespaceNotAllowed { ref did, .. }) if *did == a));
        assert!(!state::has_did_doc(&storage, &b));

        let c = test_did(3).replace(":testnet:", ":mainnet:");
        let c_key = format!("{}#key-1", c);
        registry
            .create_did_doc(&mut storage, &mock_env(), create_msg(self_controlled_doc(&c, 3), &[(c_key.as_str(), 3)]))
            .unwrap();

        let mut c_doc = self_controlled_doc(&c, 3);
        c_doc.controller.push(a.clone());
        let result = registry.update_did_doc(
            &mut storage,
            &mock_env(),
            update_msg(c_doc, "v1", &[(c_key.as_str(), 3), (a_key.as_str(), 1)]),
        );
        assert!(matches!(result, Err(RegistryError::NamespaceNotAllowed { ref did, .. }) if *did == a));
        assert_eq!(registry.get_all_versions_metadata(&storage, &c).unwrap().len(), 1);
    }

    #[test]
    fn test_update_chain_integrity() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = create_self_controlled(&registry, &mut storage, 1);
        let key_id = format!("{}#key-1", did);

        let mut version_ids = vec!["v1".to_string()];
        for i in 0..3 {
            let mut doc = self_controlled_doc(&did, 1);
            doc.also_known_as = vec![format!("https://example.com/{}", i)];

            let latest = version_ids.last().unwrap().clone();
            let stored = registry
                .update_did_doc(&mut storage, &mock_env(), update_msg(doc, &latest, &[(key_id.as_str(), 1)]))
                .unwrap();

            assert_eq!(stored.metadata.previous_version_id, latest);
            assert!(stored.metadata.updated.is_some());
            version_ids.push(stored.metadata.version_id);
        }

        for pair in version_ids.windows(2) {
            let version = registry.get_did_doc_version(&storage, &did, &pair[0]).unwrap();
            assert_eq!(version.metadata.next_version_id, pair[1]);
        }

        let mut current = registry.get_latest_did_doc(&storage, &did).unwrap();
        let mut steps = 0;
        while !current.metadata.previous_version_id.is_empty() {
            current = registry
                .get_did_doc_version(&storage, &did, &current.metadata.previous_version_id)
                .unwrap();
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(current.metadata.version_id, "v1");
        assert_eq!(registry.did_doc_count(&storage).unwrap(), 1);
    }

    #[test]
    fn test_update_with_stale_version() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = create_self_controlled(&registry, &mut storage, 1);
        let key_id = format!("{}#key-1", did);

        let result = registry.update_did_doc(
            &mut storage,
            &mock_env(),
            update_msg(self_controlled_doc(&did, 1), "stale", &[(key_id.as_str(), 1)]),
        );
        assert!(matches!(result, Err(RegistryError::UnexpectedVersion { ref expected, .. }) if expected == "v1"));
    }

    #[test]
    fn test_update_unknown_did() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = test_did(1);
        let key_id = format!("{}#key-1", did);

        let result = registry.update_did_doc(
            &mut storage,
            &mock_env(),
            update_msg(self_controlled_doc(&did, 1), "v1", &[(key_id.as_str(), 1)]),
        );
        assert!(matches!(result, Err(RegistryError::DidDocNotFound(_))));
    }

    #[test]
    fn test_update_with_foreign_key() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let a = create_self_controlled(&registry, &mut storage, 1);
        let b = create_self_controlled(&registry, &mut storage, 2);
        let a_key = format!("{}#key-1", a);
        let b_key = format!("{}#key-1", b);

        // Adding a key controlled by B needs B's signature
        let mut with_key = self_controlled_doc(&a, 1);
        with_key.verification_method.push(ed25519_vm(&a, "key-2", &b, 3));

        let result = registry.update_did_doc(
            &mut storage,
            &mock_env(),
            update_msg(with_key.clone(), "v1", &[(a_key.as_str(), 1)]),
        );
        assert!(matches!(result, Err(RegistryError::SignatureNotFound(ref s)) if *s == b));

        let added = registry
            .update_did_doc(
                &mut storage,
                &mock_env(),
                update_msg(with_key, "v1", &[(a_key.as_str(), 1), (b_key.as_str(), 2)]),
            )
            .unwrap();
        assert_eq!(added.did_doc.verification_method.len(), 2);

        // So does removing it
        let without_key = self_controlled_doc(&a, 1);
        let result = registry.update_did_doc(
            &mut storage,
            &mock_env(),
            update_msg(without_key.clone(), &added.metadata.version_id, &[(a_key.as_str(), 1)]),
        );
        assert!(matches!(result, Err(RegistryError::SignatureNotFound(ref s)) if *s == b));

        let removed = registry
            .update_did_doc(
                &mut storage,
                &mock_env(),
                update_msg(without_key.clone(), &added.metadata.version_id, &[(a_key.as_str(), 1), (b_key.as_str(), 2)]),
            )
            .unwrap();
        assert_eq!(removed.did_doc, without_key);
        assert_eq!(registry.get_all_versions_metadata(&storage, &a).unwrap().len(), 3);
    }

    #[test]
    fn test_update_with_unknown_controller() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = create_self_controlled(&registry, &mut storage, 1);
        let key_id = format!("{}#key-1", did);
        let missing = test_did(9);

        let mut doc = self_controlled_doc(&did, 1);
        doc.controller.push(missing.clone());

        let result = registry.update_did_doc(&mut storage, &mock_env(), update_msg(doc, "v1", &[(key_id.as_str(), 1)]));
        assert!(matches!(result, Err(RegistryError::ControllerNotFound(ref d)) if *d == missing));
        assert_eq!(registry.get_latest_did_doc(&storage, &did).unwrap().metadata.version_id, "v1");
    }

    #[test]
    fn test_key_rotation_requires_both_signatures() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = create_self_controlled(&registry, &mut storage, 1);
        let key_id = format!("{}#key-1", did);
        let rotated = self_controlled_doc(&did, 2);

        let result = registry.update_did_doc(
            &mut storage,
            &mock_env(),
            update_msg(rotated.clone(), "v1", &[(key_id.as_str(), 1)]),
        );
        assert!(matches!(
            result,
            Err(RegistryError::InvalidSignature { ref signer, .. }) if *signer == format!("{} (new version)", did)
        ));

        let result = registry.update_did_doc(
            &mut storage,
            &mock_env(),
            update_msg(rotated.clone(), "v1", &[(key_id.as_str(), 2)]),
        );
        assert!(matches!(
            result,
            Err(RegistryError::InvalidSignature { ref signer, .. }) if *signer == format!("{} (old version)", did)
        ));

        let stored = registry
            .update_did_doc(&mut storage, &mock_env(), update_msg(rotated.clone(), "v1", &[(key_id.as_str(), 1), (key_id.as_str(), 2)]))
            .unwrap();
        assert_eq!(stored.did_doc, rotated);
        assert_eq!(registry.get_all_versions_metadata(&storage, &did).unwrap().len(), 2);
    }

    #[test]
    fn test_deactivation_propagates() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = create_self_controlled(&registry, &mut storage, 1);
        let key_id = format!("{}#key-1", did);

        let mut latest = "v1".to_string();
        for i in 0..2 {
            let mut doc = self_controlled_doc(&did, 1);
            doc.also_known_as = vec![format!("https://example.com/{}", i)];
            latest = registry
                .update_did_doc(&mut storage, &mock_env(), update_msg(doc, &latest, &[(key_id.as_str(), 1)]))
                .unwrap()
                .metadata
                .version_id;
        }

        let stored = registry
            .deactivate_did_doc(&mut storage, &mock_env(), deactivate_msg(&did, "final", &[(key_id.as_str(), 1)]))
            .unwrap();
        assert!(stored.metadata.deactivated);
        assert_eq!(stored.metadata.previous_version_id, latest);

        let versions = registry.get_all_versions_metadata(&storage, &did).unwrap();
        assert_eq!(versions.len(), 4);
        assert!(versions.iter().all(|m| m.deactivated));

        let result = registry.update_did_doc(
            &mut storage,
            &mock_env(),
            update_msg(self_controlled_doc(&did, 1), "final", &[(key_id.as_str(), 1)]),
        );
        assert!(matches!(result, Err(RegistryError::AlreadyDeactivated(_))));

        let result = registry.deactivate_did_doc(&mut storage, &mock_env(), deactivate_msg(&did, "again", &[(key_id.as_str(), 1)]));
        assert!(matches!(result, Err(RegistryError::AlreadyDeactivated(_))));
    }

    #[test]
    fn test_deactivate_requires_signature() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = create_self_controlled(&registry, &mut storage, 1);

        let result = registry.deactivate_did_doc(&mut storage, &mock_env(), deactivate_msg(&did, "final", &[]));
        assert!(matches!(result, Err(RegistryError::SignatureNotFound(_))));
        assert!(!registry.get_latest_did_doc(&storage, &did).unwrap().metadata.deactivated);
    }

    #[test]
    fn test_failed_deactivation_rolls_back() {
        let registry = Registry::default();
        let mut storage = MockStorage::new();
        let did = create_self_controlled(&registry, &mut storage, 1);
        let key_id = format!("{}#key-1", did);

        // An unreadable version makes the sweep fail after the terminal version is written
        let key = state::VERSIONS.key((did.as_str(), "zzz"));
        storage.set(&key, b"not json");

        let result = registry.deactivate_did_doc(&mut storage, &mock_env(), deactivate_msg(&did, "final", &[(key_id.as_str(), 1)]));
        assert!(matches!(result, Err(RegistryError::Std(_))));

        let latest = registry.get_latest_did_doc(&storage, &did).unwrap();
        assert_eq!(latest.metadata.version_id, "v1");
        assert!(latest.metadata.next_version_id.is_empty());
        assert!(!latest.metadata.deactivated);
        assert!(!state::has_did_doc_version(&storage, &did, "final"));
    }

    #[test]
    fn test_next_version_id_is_deterministic() {
        let first = next_version_id("did:cheqd:testnet:abc", "v1", b"payload");
        assert_eq!(first, next_version_id("did:cheqd:testnet:abc", "v1", b"payload"));
        assert_ne!(first, next_version_id("did:cheqd:testnet:abc", "v2", b"payload"));
        assert!(did::is_valid_uuid(&first));
    }
}
