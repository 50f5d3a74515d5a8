//! `CryptoFacade` — the only entry point external callers use. Each
//! public method resolves a scope, fetches the right private key
//! (unwrapping through the master key when the scope is DB-resident),
//! and hands off to `AsymmetricCrypto`.
//!
//! Every method logs exactly one boundary event — success or the error
//! kind — and never the key material itself (ambient logging concern;
//! see the crate's `observability` module).

use crate::domain::{KeyLocation, MintPolicy, PublicKeyMaterial, Scope};
use crate::error::{CoreError, ErrorKind, Result};
use crate::resolver::KeyResolver;
use crate::traits::{AsymmetricCrypto, Clock, HsmVault, WrappedKeyStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct CryptoFacade {
    resolver: KeyResolver,
    hsm_vault: Arc<dyn HsmVault>,
    wrapped_key_store: Arc<dyn WrappedKeyStore>,
    asymmetric_crypto: Arc<dyn AsymmetricCrypto>,
    clock: Arc<dyn Clock>,
    /// Upper bound on how long a single public operation may take before
    /// it fails `Timeout`. `None` disables the bound.
    pub deadline: Option<std::time::Duration>,
}

impl CryptoFacade {
    pub fn new(
        resolver: KeyResolver,
        hsm_vault: Arc<dyn HsmVault>,
        wrapped_key_store: Arc<dyn WrappedKeyStore>,
        asymmetric_crypto: Arc<dyn AsymmetricCrypto>,
        clock: Arc<dyn Clock>,
        deadline: Option<std::time::Duration>,
    ) -> Self {
        Self {
            resolver,
            hsm_vault,
            wrapped_key_store,
            asymmetric_crypto,
            clock,
            deadline,
        }
    }

    /// Fetch the current public key for a scope, minting on first use.
    pub async fn get_public_key(
        &self,
        application_id: &str,
        reference_id: Option<&str>,
        ts: DateTime<Utc>,
    ) -> Result<PublicKeyMaterial> {
        let scope = Scope::new(application_id, reference_id);
        self.run("get_public_key", &scope, async {
            let alias = self.resolver.resolve(&scope, ts, MintPolicy::KeyPair).await?;
            let public_key = match scope.location() {
                KeyLocation::Hsm => self.hsm_vault.get_public_key(alias.alias).await?,
                KeyLocation::Database => self.wrapped_key_store.get(alias.alias).await?.public_key,
            };
            if let Ok(fp) = crate::adapters::rsa_crypto::fingerprint(&public_key) {
                tracing::debug!(%scope, fingerprint = %fp, "resolved public key");
            }
            Ok(PublicKeyMaterial {
                public_key,
                issued_at: alias.key_generation_time,
                expires_at: alias.key_expiry_time,
            })
        })
        .await
    }

    /// Unwrap a caller-supplied wrapped symmetric key. Never mints: the
    /// caller already encrypted against some specific public key, and
    /// minting here would decrypt with the wrong one.
    pub async fn decrypt_symmetric_key(
        &self,
        application_id: &str,
        reference_id: Option<&str>,
        ts: DateTime<Utc>,
        wrapped_symmetric_key: &[u8],
    ) -> Result<Vec<u8>> {
        let scope = Scope::new(application_id, reference_id);
        self.run("decrypt_symmetric_key", &scope, async {
            let alias = self.resolver.resolve(&scope, ts, MintPolicy::Forbidden).await?;
            let private_key = self.private_key_for(&scope, alias.alias).await?;
            self.asymmetric_crypto
                .private_decrypt(&private_key, wrapped_symmetric_key)
                .map_err(|e| with_scope(e, "decrypt_symmetric_key", &scope))
        })
        .await
    }

    /// Encrypt `data` under the scope's private key, minting first if
    /// needed. Note: this applies the *private* key to the data — that
    /// is signing semantics, not confidentiality. Preserved verbatim
    /// from the system this core generalizes; do not use this operation
    /// expecting a third party to be unable to read `data` back out with
    /// the (published) public key.
    pub async fn encrypt(
        &self,
        application_id: &str,
        reference_id: Option<&str>,
        ts: DateTime<Utc>,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        let scope = Scope::new(application_id, reference_id);
        self.run("encrypt", &scope, async {
            // Mint via the public-key path first so a fresh mint and
            // this call observe the same alias.
            self.get_public_key(application_id, reference_id, ts).await?;
            let alias = self.resolver.resolve(&scope, ts, MintPolicy::KeyPair).await?;
            let private_key = self.private_key_for(&scope, alias.alias).await?;
            self.asymmetric_crypto
                .private_encrypt(&private_key, data)
                .map_err(|e| with_scope(e, "encrypt", &scope))
        })
        .await
    }

    /// Sign `data` with a certificate-bound key, minting a fresh
    /// certificate entry on first use. The certificate is validated
    /// (not-before <= now <= not-after, chain non-empty) before signing.
    pub async fn sign(
        &self,
        application_id: &str,
        reference_id: Option<&str>,
        ts: DateTime<Utc>,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        let scope = Scope::new(application_id, reference_id);
        self.run("sign", &scope, async {
            let alias = self.resolver.resolve(&scope, ts, MintPolicy::Certificate).await?;
            let (chain, private_key) = self.hsm_vault.get_keypair_entry(alias.alias).await?;
            self.validate_certificate(&chain)?;
            self.asymmetric_crypto
                .private_encrypt(&private_key, data)
                .map_err(|e| with_scope(e, "sign", &scope))
        })
        .await
    }

    /// Verify `signature` against the same certificate-bound entry used
    /// by `sign`. Note: like `sign`, this mints on miss — minting during
    /// verification yields a fresh key that cannot verify a signature
    /// produced against a previous one. Preserved from the system this
    /// core generalizes; callers should ensure the scope was already
    /// resolved (e.g. via a prior `sign`) before relying on `verify`.
    pub async fn verify(
        &self,
        application_id: &str,
        reference_id: Option<&str>,
        ts: DateTime<Utc>,
        signature: &[u8],
    ) -> Result<Vec<u8>> {
        let scope = Scope::new(application_id, reference_id);
        self.run("verify", &scope, async {
            let alias = self.resolver.resolve(&scope, ts, MintPolicy::Certificate).await?;
            let (chain, _private_key) = self.hsm_vault.get_keypair_entry(alias.alias).await?;
            self.validate_certificate(&chain)?;
            let leaf = chain.first().expect("validate_certificate rejects empty chains");
            let public_key = crate::adapters::certificate::public_key_der(leaf)?;
            self.asymmetric_crypto
                .public_decrypt(&public_key, signature)
                .map_err(|e| with_scope(e, "verify", &scope))
        })
        .await
    }

    async fn private_key_for(&self, scope: &Scope, alias: Uuid) -> Result<Vec<u8>> {
        match scope.location() {
            KeyLocation::Hsm => self.hsm_vault.get_private_key(alias).await,
            KeyLocation::Database => {
                let wrapped = self.wrapped_key_store.get(alias).await?;
                let master_private_key = self.hsm_vault.get_private_key(wrapped.master_alias).await?;
                self.asymmetric_crypto
                    .private_decrypt(&master_private_key, &wrapped.private_key)
                    .map_err(|e| with_scope(e, "unwrap_private_key", scope))
            }
        }
    }

    fn validate_certificate(&self, chain: &crate::domain::CertificateChain) -> Result<()> {
        let leaf = chain.first().ok_or_else(|| {
            CoreError::new(ErrorKind::CertInvalid, "certificate chain is empty", "crypto_facade", "-")
        })?;
        let (not_before, not_after) = crate::adapters::certificate::validity(leaf)?;
        let now = self.clock.now();
        if now < not_before || now > not_after {
            return Err(CoreError::new(
                ErrorKind::CertInvalid,
                format!("certificate not valid at {now} (window {not_before}..={not_after})"),
                "crypto_facade",
                "-",
            ));
        }
        Ok(())
    }

    /// Wraps `body` with the operation boundary span/log and, when
    /// configured, a deadline.
    async fn run<T, F>(&self, operation: &str, scope: &Scope, body: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let span = tracing::info_span!("crypto_facade_operation", operation, scope = %scope);
        let _enter = span.enter();

        let outcome = match self.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, body).await {
                Ok(result) => result,
                Err(_) => Err(CoreError::new(
                    ErrorKind::Timeout,
                    format!("{operation} exceeded its deadline"),
                    "crypto_facade",
                    scope.to_string(),
                )),
            },
            None => body.await,
        };

        match &outcome {
            Ok(_) => info!(operation, %scope, "operation succeeded"),
            Err(e) => match e.severity {
                crate::error::ErrorSeverity::Critical | crate::error::ErrorSeverity::High => {
                    warn!(operation, %scope, kind = %e.kind, "operation failed")
                }
                _ => info!(operation, %scope, kind = %e.kind, "operation failed"),
            },
        }

        outcome
    }
}

fn with_scope(mut err: CoreError, component: &str, scope: &Scope) -> CoreError {
    err.component = component.to_string();
    err.scope = scope.to_string();
    err
}
