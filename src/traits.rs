//! External collaborators this core consumes. Production callers supply
//! their own implementations (a real HSM driver, a real SQL pool, a real
//! certificate loader); this crate ships working in-memory/software
//! implementations in [`crate::adapters`] so it is runnable and testable
//! standalone.

use crate::domain::{CertificateChain, KeyAlias, KeyPolicy, WrappedKey};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistent index of `(applicationId, referenceId) -> [KeyAlias]`. The
/// single source of truth for selection; see `KeyResolver` for the
/// concurrency contract around `insert`.
#[async_trait]
pub trait AliasIndex: Send + Sync {
    /// All rows matching the exact `(app, ref)` pair, ordered by
    /// generation time ascending.
    async fn list_by_scope(&self, application_id: &str, reference_id: Option<&str>) -> Result<Vec<KeyAlias>>;

    /// Durable append. No uniqueness constraint beyond the primary key —
    /// callers serialize via the scope lock to uphold I1/I2.
    async fn insert(&self, alias: KeyAlias) -> Result<()>;
}

/// Persistent map `applicationId -> validityDays`. Immutable during a
/// process lifetime from this core's perspective.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get(&self, application_id: &str) -> Result<KeyPolicy>;
}

/// Persistent map `alias -> (masterAlias, publicKey, wrappedPrivateKey)`.
/// Reference-scoped keys only; no updates.
#[async_trait]
pub trait WrappedKeyStore: Send + Sync {
    async fn get(&self, alias: Uuid) -> Result<WrappedKey>;
    async fn insert(&self, key: WrappedKey) -> Result<()>;
}

/// Opaque store for asymmetric key entries and certificate chains,
/// addressed by alias. Authoritative for master keys and
/// certificate-bound keys; tolerates concurrent readers but serializes
/// writes per alias.
#[async_trait]
pub trait HsmVault: Send + Sync {
    /// Persist an unwrapped RSA keypair at `alias`. `public_key`/
    /// `private_key` are DER (SubjectPublicKeyInfo / PKCS#8).
    async fn store_keypair(
        &self,
        alias: Uuid,
        public_key: Vec<u8>,
        private_key: Vec<u8>,
        generation_time: DateTime<Utc>,
        expiry_time: DateTime<Utc>,
    ) -> Result<()>;

    async fn store_certificate(
        &self,
        alias: Uuid,
        chain: CertificateChain,
        private_key: Vec<u8>,
    ) -> Result<()>;

    async fn get_public_key(&self, alias: Uuid) -> Result<Vec<u8>>;
    async fn get_private_key(&self, alias: Uuid) -> Result<Vec<u8>>;
    async fn get_keypair_entry(&self, alias: Uuid) -> Result<(CertificateChain, Vec<u8>)>;
}

/// RSA encrypt/decrypt/sign primitives. Kept synchronous: these are
/// CPU-bound math, not I/O, and the core never needs to suspend on them.
/// All key material crosses this boundary DER-encoded (SPKI for public
/// keys, PKCS#8 for private keys) so the core never depends on a
/// concrete crypto crate's key types.
pub trait AsymmetricCrypto: Send + Sync {
    fn public_encrypt(&self, public_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>>;
    fn public_decrypt(&self, public_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>>;
    fn private_encrypt(&self, private_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>>;
    fn private_decrypt(&self, private_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>>;
}

/// Generates fresh RSA keypairs on mint.
pub trait KeypairGenerator: Send + Sync {
    /// Returns `(public_key_der, private_key_der)`: SPKI / PKCS#8.
    fn generate_rsa(&self) -> Result<(Vec<u8>, Vec<u8>)>;
}

/// Loads a certificate chain and its private key from wherever they are
/// configured to live (file, secrets manager, ...) for a given scope.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    async fn load(&self, application_id: &str, reference_id: Option<&str>) -> Result<(CertificateChain, Vec<u8>)>;
}

/// Injectable wall clock so invariant checks are deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
