//! Core data model: the selection index row, policy row, wrapped-key row,
//! and the scope type that keys selection and locking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `created_by`/`created_at`/`updated_by`/`updated_at`, stamped on every
/// write. This core never mutates a row after insert, so `updated_*`
/// mirrors `created_*` at construction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditStamp {
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl AuditStamp {
    pub fn stamp(actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        let actor = actor.into();
        Self {
            created_by: actor.clone(),
            created_at: at,
            updated_by: actor,
            updated_at: at,
        }
    }
}

/// `(applicationId, referenceId-or-absent)` — the unit of selection and
/// per-scope locking. An empty or whitespace-only reference id is
/// coerced to absent at construction so every call site sees the same
/// scope regardless of how the caller spelled "no reference."
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub application_id: String,
    pub reference_id: Option<String>,
}

impl Scope {
    pub fn new(application_id: impl Into<String>, reference_id: Option<impl Into<String>>) -> Self {
        let reference_id = reference_id
            .map(Into::into)
            .filter(|r| !r.trim().is_empty());
        Self {
            application_id: application_id.into(),
            reference_id,
        }
    }

    pub fn master(&self) -> Scope {
        Scope {
            application_id: self.application_id.clone(),
            reference_id: None,
        }
    }

    pub fn is_master(&self) -> bool {
        self.reference_id.is_none()
    }

    pub fn location(&self) -> KeyLocation {
        if self.is_master() {
            KeyLocation::Hsm
        } else {
            KeyLocation::Database
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reference_id {
            Some(r) => write!(f, "{}/{}", self.application_id, r),
            None => write!(f, "{}/-", self.application_id),
        }
    }
}

/// Where a scope's key material physically lives. Discriminated once at
/// resolve time from `Scope::reference_id`; nothing downstream re-checks
/// `is_none()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLocation {
    Hsm,
    Database,
}

/// The selection index row. At most one `KeyAlias` per scope may cover
/// any given instant (I1); windows for a scope never overlap (I2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyAlias {
    pub alias: Uuid,
    pub application_id: String,
    pub reference_id: Option<String>,
    pub key_generation_time: DateTime<Utc>,
    pub key_expiry_time: DateTime<Utc>,
    pub audit: AuditStamp,
}

impl KeyAlias {
    pub fn scope(&self) -> Scope {
        Scope {
            application_id: self.application_id.clone(),
            reference_id: self.reference_id.clone(),
        }
    }

    /// Closed-interval containment: `ts` in `[gen, expiry]`.
    pub fn covers(&self, ts: DateTime<Utc>) -> bool {
        self.key_generation_time <= ts && ts <= self.key_expiry_time
    }

    /// Closed-interval overlap against another window.
    pub fn overlaps(&self, gen: DateTime<Utc>, expiry: DateTime<Utc>) -> bool {
        self.key_generation_time <= expiry && gen <= self.key_expiry_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyPolicy {
    pub application_id: String,
    pub validity_days: u32,
    pub audit: AuditStamp,
}

/// Only reference-scoped keys get a row here; master keys live entirely
/// in the HSM vault.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WrappedKey {
    pub alias: Uuid,
    pub master_alias: Uuid,
    /// DER-encoded SubjectPublicKeyInfo.
    pub public_key: Vec<u8>,
    /// DER-encoded PKCS#8, wrapped under `master_alias`'s RSA public key.
    pub private_key: Vec<u8>,
    pub audit: AuditStamp,
}

/// A DER-encoded X.509 certificate chain, leaf first.
pub type CertificateChain = Vec<Vec<u8>>;

/// The response shape for `CryptoFacade::get_public_key`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKeyMaterial {
    /// DER-encoded SubjectPublicKeyInfo. Callers that need a text-safe
    /// wire encoding Base64-encode this themselves; the core deals only
    /// in raw bytes.
    pub public_key: Vec<u8>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Which kind of minting a resolve is allowed to perform, and what the
/// `ExpiryPlanner`'s candidate window should be seeded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintPolicy {
    /// Mint is forbidden; a miss fails `NoCurrentKey`.
    Forbidden,
    /// Mint an HSM- or DB-resident keypair, expiry from `PolicyStore`.
    KeyPair,
    /// Mint a certificate-bound keypair, expiry from the certificate's
    /// `notAfter`.
    Certificate,
}
