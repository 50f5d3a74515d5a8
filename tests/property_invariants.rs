//! Property-based checks for the two window invariants (I1: at most one
//! alias covers any instant; I2: a scope's windows never overlap) and
//! the `ExpiryPlanner` truncation law that is supposed to uphold them.
//!
//! Generated-input style, grounded in the pack's certificate property
//! tests rather than the teacher (which has no proptest usage).

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use tenant_keyvault::adapters::in_memory::InMemoryPolicyStore;
use tenant_keyvault::domain::AuditStamp;
use tenant_keyvault::domain::KeyAlias;
use tenant_keyvault::planner::{CandidateSource, ExpiryPlanner};
use uuid::Uuid;

fn base_time() -> DateTime<Utc> {
    "2025-01-01T00:00:00Z".parse().unwrap()
}

fn alias_window(gen_offset_secs: i64, length_secs: i64) -> KeyAlias {
    let gen = base_time() + Duration::seconds(gen_offset_secs);
    let exp = gen + Duration::seconds(length_secs.max(1));
    KeyAlias {
        alias: Uuid::new_v4(),
        application_id: "KERNEL".into(),
        reference_id: None,
        key_generation_time: gen,
        key_expiry_time: exp,
        audit: AuditStamp::stamp("system", gen),
    }
}

fn arb_offset() -> impl Strategy<Value = i64> {
    -10_000i64..10_000
}

fn arb_length() -> impl Strategy<Value = i64> {
    1i64..20_000
}

proptest! {
    /// `covers` agrees with the closed-interval definition it documents,
    /// for any window and any probe instant.
    #[test]
    fn covers_matches_closed_interval_definition(
        gen_offset in arb_offset(),
        length in arb_length(),
        probe_offset in arb_offset(),
    ) {
        let alias = alias_window(gen_offset, length);
        let probe = base_time() + Duration::seconds(probe_offset);
        let expected = alias.key_generation_time <= probe && probe <= alias.key_expiry_time;
        prop_assert_eq!(alias.covers(probe), expected);
    }

    /// `overlaps` is symmetric: whether window A overlaps window B does
    /// not depend on which one is "self" and which is the argument pair.
    #[test]
    fn overlaps_is_symmetric(
        a_offset in arb_offset(), a_length in arb_length(),
        b_offset in arb_offset(), b_length in arb_length(),
    ) {
        let a = alias_window(a_offset, a_length);
        let b = alias_window(b_offset, b_length);
        prop_assert_eq!(
            a.overlaps(b.key_generation_time, b.key_expiry_time),
            b.overlaps(a.key_generation_time, a.key_expiry_time),
        );
    }

    /// Whatever expiry the planner hands back for a fresh mint, it never
    /// leaves the new window overlapping the existing one it was
    /// truncated against (I2), and never yields a non-positive window
    /// without failing outright.
    #[test]
    fn planned_expiry_never_overlaps_the_existing_window(
        existing_offset in arb_offset(),
        existing_length in arb_length(),
        new_gen_offset in -5_000i64..5_000,
        validity_days in 1u32..400,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let outcome: Result<(), TestCaseError> = rt.block_on(async {
            let existing = alias_window(existing_offset, existing_length);
            let store = InMemoryPolicyStore::new();
            store.seed("KERNEL", validity_days).await;
            let planner = ExpiryPlanner::new(&store);

            let new_gen = base_time() + Duration::seconds(new_gen_offset);
            let result = planner
                .plan("KERNEL", new_gen, std::slice::from_ref(&existing), CandidateSource::Policy)
                .await;

            if let Ok(expiry) = result {
                prop_assert!(expiry > new_gen);
                prop_assert!(!existing.overlaps(new_gen, expiry));
            }
            Ok(())
        });
        outcome?;
    }
}
