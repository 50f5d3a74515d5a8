//! Computes a new key's expiry, truncating against whatever windows
//! already exist for the scope so invariant I2 (no overlap) never
//! breaks.

use crate::domain::KeyAlias;
use crate::error::{CoreError, ErrorKind, Result};
use crate::traits::PolicyStore;
use chrono::{DateTime, Duration, Utc};

/// Seeds the planner's initial candidate expiry. Policy-driven mints and
/// certificate-bound mints share one planner instead of two
/// near-duplicates; only the seed differs.
#[derive(Debug, Clone, Copy)]
pub enum CandidateSource {
    Policy,
    Certificate { not_after: DateTime<Utc> },
}

pub struct ExpiryPlanner<'a> {
    policy_store: &'a dyn PolicyStore,
}

impl<'a> ExpiryPlanner<'a> {
    pub fn new(policy_store: &'a dyn PolicyStore) -> Self {
        Self { policy_store }
    }

    /// `existing_aliases` must already be sorted ascending by generation
    /// time (as `AliasIndex::list_by_scope` guarantees).
    pub async fn plan(
        &self,
        application_id: &str,
        generation_time: DateTime<Utc>,
        existing_aliases: &[KeyAlias],
        source: CandidateSource,
    ) -> Result<DateTime<Utc>> {
        let mut candidate = match source {
            CandidateSource::Policy => {
                let policy = self.policy_store.get(application_id).await?;
                generation_time + Duration::days(policy.validity_days as i64)
            }
            CandidateSource::Certificate { not_after } => not_after,
        };

        for existing in existing_aliases {
            if existing.overlaps(generation_time, candidate) {
                candidate = existing.key_generation_time - Duration::seconds(1);
                break;
            }
        }

        if candidate <= generation_time {
            return Err(CoreError::new(
                ErrorKind::PolicyConflict,
                format!(
                    "truncated expiry {} does not leave a positive-length window after generation {}",
                    candidate, generation_time
                ),
                "expiry_planner",
                application_id,
            ));
        }

        Ok(candidate)
    }
}
