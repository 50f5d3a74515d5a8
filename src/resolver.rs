//! `KeyResolver` — the state machine that, given a scope and an instant,
//! returns the alias that is current for it, minting fresh material on
//! first use. This is the component that actually upholds invariants
//! I1/I2; every other component is a leaf it calls into.

use crate::domain::{KeyAlias, MintPolicy, Scope};
use crate::error::{CoreError, ErrorKind, Result};
use crate::lock_table::LockTable;
use crate::planner::{CandidateSource, ExpiryPlanner};
use crate::traits::{AliasIndex, AsymmetricCrypto, CertificateSource, Clock, HsmVault, KeypairGenerator, PolicyStore, WrappedKeyStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub struct KeyResolver {
    alias_index: Arc<dyn AliasIndex>,
    policy_store: Arc<dyn PolicyStore>,
    wrapped_key_store: Arc<dyn WrappedKeyStore>,
    hsm_vault: Arc<dyn HsmVault>,
    keypair_generator: Arc<dyn KeypairGenerator>,
    certificate_source: Arc<dyn CertificateSource>,
    asymmetric_crypto: Arc<dyn AsymmetricCrypto>,
    clock: Arc<dyn Clock>,
    locks: LockTable,
}

impl KeyResolver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        alias_index: Arc<dyn AliasIndex>,
        policy_store: Arc<dyn PolicyStore>,
        wrapped_key_store: Arc<dyn WrappedKeyStore>,
        hsm_vault: Arc<dyn HsmVault>,
        keypair_generator: Arc<dyn KeypairGenerator>,
        certificate_source: Arc<dyn CertificateSource>,
        asymmetric_crypto: Arc<dyn AsymmetricCrypto>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            alias_index,
            policy_store,
            wrapped_key_store,
            hsm_vault,
            keypair_generator,
            certificate_source,
            asymmetric_crypto,
            clock,
            locks: LockTable::new(),
        }
    }

    /// Finds the alias current for `scope` at `ts`, minting one under
    /// the scope lock when none exists and `mint` permits it.
    pub async fn resolve(&self, scope: &Scope, ts: DateTime<Utc>, mint: MintPolicy) -> Result<KeyAlias> {
        if let Some(current) = self.current_alias(scope, ts).await? {
            return Ok(current);
        }

        if matches!(mint, MintPolicy::Forbidden) {
            return Err(CoreError::new(
                ErrorKind::NoCurrentKey,
                "no alias covers the requested instant and minting is forbidden for this operation",
                "key_resolver",
                scope.to_string(),
            ));
        }

        let _guard = self.locks.acquire(scope).await;

        // Re-check: a waiter that lost the race to a concurrent minter
        // observes that minter's insert here instead of minting again.
        if let Some(current) = self.current_alias(scope, ts).await? {
            return Ok(current);
        }

        self.mint(scope, ts, mint).await
    }

    async fn current_alias(&self, scope: &Scope, ts: DateTime<Utc>) -> Result<Option<KeyAlias>> {
        let all = self
            .alias_index
            .list_by_scope(&scope.application_id, scope.reference_id.as_deref())
            .await?;

        let mut covering = all.into_iter().filter(|a| a.covers(ts));
        let first = covering.next();
        if covering.next().is_some() {
            return Err(CoreError::new(
                ErrorKind::NoUniqueAlias,
                "more than one alias covers the requested instant",
                "key_resolver",
                scope.to_string(),
            ));
        }
        Ok(first)
    }

    async fn mint(&self, scope: &Scope, ts: DateTime<Utc>, mint: MintPolicy) -> Result<KeyAlias> {
        let all = self
            .alias_index
            .list_by_scope(&scope.application_id, scope.reference_id.as_deref())
            .await?;

        let alias_id = Uuid::new_v4();

        let expiry = match mint {
            MintPolicy::Certificate => {
                let (chain, cert_priv) = self
                    .certificate_source
                    .load(&scope.application_id, scope.reference_id.as_deref())
                    .await?;
                let not_after = certificate_not_after(&chain)?;
                let planner = ExpiryPlanner::new(self.policy_store.as_ref());
                let expiry = planner
                    .plan(&scope.application_id, ts, &all, CandidateSource::Certificate { not_after })
                    .await?;
                self.hsm_vault.store_certificate(alias_id, chain, cert_priv).await?;
                expiry
            }
            MintPolicy::KeyPair => {
                let planner = ExpiryPlanner::new(self.policy_store.as_ref());
                let expiry = planner
                    .plan(&scope.application_id, ts, &all, CandidateSource::Policy)
                    .await?;

                match scope.location() {
                    crate::domain::KeyLocation::Hsm => {
                        let (public_key, private_key) = self.keypair_generator.generate_rsa()?;
                        self.hsm_vault
                            .store_keypair(alias_id, public_key, private_key, ts, expiry)
                            .await?;
                    }
                    crate::domain::KeyLocation::Database => {
                        // `resolve`'s `ScopeGuard` for this (reference) scope
                        // already holds the master scope's lock, so minting
                        // the master here must not go back through `resolve`
                        // (it would try to acquire that same lock again and
                        // deadlock). Check-then-mint directly instead.
                        let master_scope = scope.master();
                        let master = match self.current_alias(&master_scope, ts).await? {
                            Some(current) => current,
                            None => self.mint(&master_scope, ts, MintPolicy::KeyPair).await?,
                        };
                        let master_public_key = self.hsm_vault.get_public_key(master.alias).await?;

                        let (public_key, private_key) = self.keypair_generator.generate_rsa()?;
                        let wrapped_private_key = self
                            .asymmetric_crypto
                            .public_encrypt(&master_public_key, &private_key)?;

                        self.wrapped_key_store
                            .insert(crate::domain::WrappedKey {
                                alias: alias_id,
                                master_alias: master.alias,
                                public_key,
                                private_key: wrapped_private_key,
                                audit: crate::domain::AuditStamp::stamp("key_resolver", self.clock.now()),
                            })
                            .await?;
                    }
                }
                expiry
            }
            MintPolicy::Forbidden => unreachable!("checked by caller before acquiring the scope lock"),
        };

        let alias = KeyAlias {
            alias: alias_id,
            application_id: scope.application_id.clone(),
            reference_id: scope.reference_id.clone(),
            key_generation_time: ts,
            key_expiry_time: expiry,
            audit: crate::domain::AuditStamp::stamp("key_resolver", self.clock.now()),
        };
        self.alias_index.insert(alias.clone()).await?;
        Ok(alias)
    }
}

fn certificate_not_after(chain: &crate::domain::CertificateChain) -> Result<DateTime<Utc>> {
    let leaf = chain.first().ok_or_else(|| {
        CoreError::new(ErrorKind::CertInvalid, "certificate chain is empty", "key_resolver", "-")
    })?;
    crate::adapters::certificate::not_after(leaf)
}
