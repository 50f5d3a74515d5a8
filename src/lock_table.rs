//! Per-scope serialization. The source relied on database transactions
//! to keep concurrent first-use mints from racing; this replaces that
//! with an explicit scope-keyed mutex map plus the read-after-acquire
//! re-check in `KeyResolver::resolve`.

use crate::domain::Scope;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock};

/// `Arc<Mutex<()>>` entries, reference-counted so an idle scope's lock
/// can be dropped from the table once nobody holds it — the table only
/// keeps a `Weak` handle and upgrades it on each lookup.
#[derive(Default)]
pub struct LockTable {
    locks: RwLock<HashMap<Scope, Weak<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a strong handle to the mutex guarding `scope`, creating
    /// one if this is the first caller to touch the scope (or the
    /// previous handle has already been evicted).
    pub async fn get(&self, scope: &Scope) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.read().await.get(scope).and_then(Weak::upgrade) {
            return existing;
        }

        let mut table = self.locks.write().await;
        if let Some(existing) = table.get(scope).and_then(Weak::upgrade) {
            return existing;
        }

        let fresh = Arc::new(Mutex::new(()));
        table.insert(scope.clone(), Arc::downgrade(&fresh));
        fresh
    }
}

/// Acquires the master scope's lock before the reference scope's lock,
/// honoring the spec's `(app, absent) < (app, ref)` lexical ordering so
/// a DB mint that recurses into a master mint can never deadlock
/// against a concurrent direct master resolve.
pub struct ScopeGuard {
    _reference_guard: Option<tokio::sync::OwnedMutexGuard<()>>,
    _master_guard: tokio::sync::OwnedMutexGuard<()>,
}

impl LockTable {
    pub async fn acquire(&self, scope: &Scope) -> ScopeGuard {
        if scope.is_master() {
            let master_guard = self.get(scope).await.lock_owned().await;
            return ScopeGuard {
                _reference_guard: None,
                _master_guard: master_guard,
            };
        }

        let master_scope = scope.master();
        let master_guard = self.get(&master_scope).await.lock_owned().await;
        let reference_guard = self.get(scope).await.lock_owned().await;
        ScopeGuard {
            _reference_guard: Some(reference_guard),
            _master_guard: master_guard,
        }
    }
}
