use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::did::{self, DID_METHOD};
use crate::error::RegistryError;
use crate::types::{
    did_field_error, field_error, nested_error, validate_owned_fragment_url, Service, VerificationMethod,
    VerificationMethodType,
};
use crate::verification::VerificationMaterial;

/// A DID Document as stored by the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDoc {
    /// The context of the DID Document
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,

    /// The DID itself
    pub id: String,

    /// DIDs allowed to change this document; empty means the subject controls itself
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controller: Vec<String>,

    #[serde(rename = "verificationMethod", default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,

    #[serde(rename = "assertionMethod", default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<String>,

    #[serde(rename = "capabilityInvocation", default, skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<String>,

    #[serde(rename = "capabilityDelegation", default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<String>,

    #[serde(rename = "keyAgreement", default, skip_serializing_if = "Vec::is_empty")]
    pub key_agreement: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,

    #[serde(rename = "alsoKnownAs", default, skip_serializing_if = "Vec::is_empty")]
    pub also_known_as: Vec<String>,
}

/// A verification method embedded in a relationship list as a JSON object
#[derive(Debug, Deserialize)]
struct InlineVerificationMethod {
    id: String,
    #[serde(rename = "type")]
    verification_method_type: VerificationMethodType,
    controller: String,
    #[serde(rename = "verificationMaterial", default)]
    verification_material: Option<String>,
}

fn is_inline_verification_method(entry: &str) -> bool {
    entry.trim_start().starts_with('{')
}

impl DidDoc {
    /// Creates an empty document for `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Performs structural validation of the whole document
    ///
    /// An empty `allowed_namespaces` accepts any namespace. Every failure is reported
    /// as [`RegistryError::Validation`] naming the offending field.
    pub fn validate(&self, allowed_namespaces: &[String]) -> Result<(), RegistryError> {
        did::validate_did(&self.id, DID_METHOD, allowed_namespaces).map_err(|e| did_field_error("id", e))?;

        if !did::is_unique(&self.controller) {
            return Err(field_error("controller", "there are controller duplicates"));
        }
        for controller in &self.controller {
            did::validate_did(controller, DID_METHOD, allowed_namespaces)
                .map_err(|e| did_field_error("controller", e))?;
        }

        let vm_ids: Vec<String> = self.verification_method.iter().map(|vm| vm.id.clone()).collect();
        if !did::is_unique(&vm_ids) {
            return Err(field_error("verificationMethod", "there are verification method duplicates"));
        }
        for vm in &self.verification_method {
            vm.validate(&self.id, allowed_namespaces)
                .map_err(|e| nested_error("verificationMethod", e))?;
        }

        let known_vms: BTreeSet<&str> = vm_ids.iter().map(String::as_str).collect();
        for (name, entries) in self.relationships() {
            self.validate_relationship(name, entries, &known_vms, allowed_namespaces)?;
        }

        let service_ids: Vec<String> = self.service.iter().map(|s| s.id.clone()).collect();
        if !did::is_unique(&service_ids) {
            return Err(field_error("service", "there are service duplicates"));
        }
        for service in &self.service {
            service
                .validate(&self.id, allowed_namespaces)
                .map_err(|e| nested_error("service", e))?;
        }

        if !did::is_unique(&self.also_known_as) {
            return Err(field_error("alsoKnownAs", "there are duplicates"));
        }
        for aka in &self.also_known_as {
            Url::parse(aka).map_err(|e| field_error("alsoKnownAs", format!("`{}`: {}", aka, e)))?;
        }

        Ok(())
    }

    fn validate_relationship(
        &self,
        name: &str,
        entries: &[String],
        known_vms: &BTreeSet<&str>,
        allowed_namespaces: &[String],
    ) -> Result<(), RegistryError> {
        if !did::is_unique(entries) {
            return Err(field_error(name, "there are duplicates"));
        }

        for entry in entries {
            if is_inline_verification_method(entry) {
                let inline: InlineVerificationMethod = serde_json::from_str(entry)
                    .map_err(|e| field_error(name, format!("invalid inline verification method: {}", e)))?;

                validate_owned_fragment_url(&inline.id, &self.id, allowed_namespaces)
                    .map_err(|e| did_field_error(name, e))?;
                did::validate_did(&inline.controller, DID_METHOD, allowed_namespaces)
                    .map_err(|e| did_field_error(name, e))?;
                if let Some(material) = &inline.verification_material {
                    VerificationMaterial::decode(inline.verification_method_type, material)
                        .map_err(|e| field_error(name, e))?;
                }
                continue;
            }

            validate_owned_fragment_url(entry, &self.id, allowed_namespaces).map_err(|e| did_field_error(name, e))?;
            if !known_vms.contains(entry.as_str()) {
                return Err(field_error(name, format!("`{}`: verification method not found in document", entry)));
            }
        }

        Ok(())
    }

    /// The verification relationship lists with their JSON field names
    pub fn relationships(&self) -> [(&'static str, &[String]); 5] {
        [
            ("authentication", self.authentication.as_slice()),
            ("assertionMethod", self.assertion_method.as_slice()),
            ("capabilityInvocation", self.capability_invocation.as_slice()),
            ("capabilityDelegation", self.capability_delegation.as_slice()),
            ("keyAgreement", self.key_agreement.as_slice()),
        ]
    }

    fn relationships_mut(&mut self) -> [&mut Vec<String>; 5] {
        [
            &mut self.authentication,
            &mut self.assertion_method,
            &mut self.capability_invocation,
            &mut self.capability_delegation,
            &mut self.key_agreement,
        ]
    }

    /// Substitutes `old` with `new` in the id, the controllers and every verification method
    pub fn replace_dids(&mut self, old: &str, new: &str) {
        for controller in self.controller.iter_mut().filter(|c| c.as_str() == old) {
            *controller = new.to_string();
        }

        if self.id == old {
            self.id = new.to_string();
        }

        for vm in &mut self.verification_method {
            vm.replace_dids(old, new);
        }
    }

    /// Like [`DidDoc::replace_dids`], also covering relationship references and services
    pub fn replace_dids_everywhere(&mut self, old: &str, new: &str) {
        self.replace_dids(old, new);

        for list in self.relationships_mut() {
            for entry in list.iter_mut().filter(|e| !is_inline_verification_method(e)) {
                *entry = did::replace_did_in_did_url(entry, old, new);
            }
        }

        for service in &mut self.service {
            service.replace_dids(old, new);
        }
    }

    /// Lower-cases UUID identifiers in every DID-bearing field
    pub fn normalize(&mut self) {
        self.id = did::normalize_did(&self.id);
        self.controller = did::normalize_did_list(&self.controller);

        for vm in &mut self.verification_method {
            vm.normalize();
        }
        for service in &mut self.service {
            service.normalize();
        }
        for list in self.relationships_mut() {
            for entry in list.iter_mut().filter(|e| !is_inline_verification_method(e)) {
                *entry = did::normalize_did_url(entry);
            }
        }
    }

    /// Explicit controllers, or the subject itself when none are declared
    pub fn controllers_or_subject(&self) -> Vec<String> {
        if self.controller.is_empty() {
            vec![self.id.clone()]
        } else {
            self.controller.clone()
        }
    }

    pub fn verification_method_controllers(&self) -> Vec<String> {
        self.verification_method.iter().map(|vm| vm.controller.clone()).collect()
    }

    /// Explicit controllers and verification method controllers, sorted and deduplicated
    pub fn all_controller_dids(&self) -> Vec<String> {
        did::unique_sorted(
            self.controller
                .iter()
                .cloned()
                .chain(self.verification_method_controllers()),
        )
    }
}
