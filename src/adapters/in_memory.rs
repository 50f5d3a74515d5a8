//! In-process store adapters, modeled on the teacher's `SoftwareHsm`
//! (`Arc<RwLock<HashMap<...>>>` guarding everything). Good enough for
//! the crate's own test suite; a real deployment points `AliasIndex`,
//! `PolicyStore`, and `WrappedKeyStore` at SQL tables and `HsmVault` at
//! an actual HSM driver instead.

use crate::domain::{CertificateChain, KeyAlias, KeyPolicy, WrappedKey};
use crate::error::{CoreError, ErrorKind, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryAliasIndex {
    rows: RwLock<Vec<KeyAlias>>,
}

impl InMemoryAliasIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl crate::traits::AliasIndex for InMemoryAliasIndex {
    async fn list_by_scope(&self, application_id: &str, reference_id: Option<&str>) -> Result<Vec<KeyAlias>> {
        let rows = self.rows.read().expect("alias index lock poisoned");
        let mut matching: Vec<KeyAlias> = rows
            .iter()
            .filter(|a| a.application_id == application_id && a.reference_id.as_deref() == reference_id)
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.key_generation_time);
        Ok(matching)
    }

    async fn insert(&self, alias: KeyAlias) -> Result<()> {
        self.rows.write().expect("alias index lock poisoned").push(alias);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPolicyStore {
    policies: RwLock<HashMap<String, KeyPolicy>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/bootstrap helper: registers a policy for `application_id`
    /// without requiring a caller to construct a `KeyPolicy` by hand.
    pub async fn seed(&self, application_id: &str, validity_days: u32) {
        let policy = KeyPolicy {
            application_id: application_id.to_string(),
            validity_days,
            audit: crate::domain::AuditStamp::stamp("system", Utc::now()),
        };
        self.policies
            .write()
            .expect("policy store lock poisoned")
            .insert(application_id.to_string(), policy);
    }
}

#[async_trait]
impl crate::traits::PolicyStore for InMemoryPolicyStore {
    async fn get(&self, application_id: &str) -> Result<KeyPolicy> {
        self.policies
            .read()
            .expect("policy store lock poisoned")
            .get(application_id)
            .cloned()
            .ok_or_else(|| {
                CoreError::new(
                    ErrorKind::InvalidApplication,
                    format!("no policy registered for application {application_id}"),
                    "in_memory_policy_store",
                    application_id,
                )
            })
    }
}

#[derive(Default)]
pub struct InMemoryWrappedKeyStore {
    rows: RwLock<HashMap<Uuid, WrappedKey>>,
}

impl InMemoryWrappedKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl crate::traits::WrappedKeyStore for InMemoryWrappedKeyStore {
    async fn get(&self, alias: Uuid) -> Result<WrappedKey> {
        self.rows
            .read()
            .expect("wrapped key store lock poisoned")
            .get(&alias)
            .cloned()
            .ok_or_else(|| {
                CoreError::new(
                    ErrorKind::NoUniqueAlias,
                    format!("no wrapped key entry for alias {alias}"),
                    "in_memory_wrapped_key_store",
                    alias.to_string(),
                )
            })
    }

    async fn insert(&self, key: WrappedKey) -> Result<()> {
        self.rows
            .write()
            .expect("wrapped key store lock poisoned")
            .insert(key.alias, key);
        Ok(())
    }
}

struct KeypairEntry {
    public_key: Vec<u8>,
    private_key: Vec<u8>,
    certificate_chain: Option<CertificateChain>,
}

/// Software stand-in for the HSM. Never persists to disk; an actual
/// deployment's `HsmVault` talks to a PKCS#11 token or a cloud KMS and
/// never returns unwrapped private key bytes to this process at all —
/// this in-memory version exists so the crate is runnable without one.
#[derive(Default)]
pub struct InMemoryHsmVault {
    entries: RwLock<HashMap<Uuid, KeypairEntry>>,
}

impl InMemoryHsmVault {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl crate::traits::HsmVault for InMemoryHsmVault {
    async fn store_keypair(
        &self,
        alias: Uuid,
        public_key: Vec<u8>,
        private_key: Vec<u8>,
        _generation_time: DateTime<Utc>,
        _expiry_time: DateTime<Utc>,
    ) -> Result<()> {
        self.entries.write().expect("hsm vault lock poisoned").insert(
            alias,
            KeypairEntry {
                public_key,
                private_key,
                certificate_chain: None,
            },
        );
        Ok(())
    }

    async fn store_certificate(&self, alias: Uuid, chain: CertificateChain, private_key: Vec<u8>) -> Result<()> {
        let public_key = crate::adapters::certificate::public_key_der(
            chain.first().ok_or_else(|| {
                CoreError::new(ErrorKind::CertInvalid, "certificate chain is empty", "in_memory_hsm_vault", alias.to_string())
            })?,
        )?;
        self.entries.write().expect("hsm vault lock poisoned").insert(
            alias,
            KeypairEntry {
                public_key,
                private_key,
                certificate_chain: Some(chain),
            },
        );
        Ok(())
    }

    async fn get_public_key(&self, alias: Uuid) -> Result<Vec<u8>> {
        self.entries
            .read()
            .expect("hsm vault lock poisoned")
            .get(&alias)
            .map(|e| e.public_key.clone())
            .ok_or_else(|| not_found(alias))
    }

    async fn get_private_key(&self, alias: Uuid) -> Result<Vec<u8>> {
        self.entries
            .read()
            .expect("hsm vault lock poisoned")
            .get(&alias)
            .map(|e| e.private_key.clone())
            .ok_or_else(|| not_found(alias))
    }

    async fn get_keypair_entry(&self, alias: Uuid) -> Result<(CertificateChain, Vec<u8>)> {
        let entries = self.entries.read().expect("hsm vault lock poisoned");
        let entry = entries.get(&alias).ok_or_else(|| not_found(alias))?;
        let chain = entry.certificate_chain.clone().ok_or_else(|| {
            CoreError::new(
                ErrorKind::CertInvalid,
                format!("alias {alias} has no certificate chain"),
                "in_memory_hsm_vault",
                alias.to_string(),
            )
        })?;
        Ok((chain, entry.private_key.clone()))
    }
}

fn not_found(alias: Uuid) -> CoreError {
    CoreError::new(
        ErrorKind::NoUniqueAlias,
        format!("no hsm entry for alias {alias}"),
        "in_memory_hsm_vault",
        alias.to_string(),
    )
}
