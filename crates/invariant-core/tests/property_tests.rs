//! # Property-Based Tests
//!
//! Determinism and accounting invariants checked with proptest.

use invariant_core::{
    EdgeId, Kernel, OverlayGraph, Origin, ProvenanceKind, Reactor, Relation, Ring, Tank, encode,
    get_token_hash, tank_from_bytes, tank_to_bytes, token_hash_lossy,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn ring_strategy() -> impl Strategy<Value = Ring> {
    prop_oneof![
        Just(Ring::Axiom),
        Just(Ring::Observed),
        Just(Ring::Derived),
        Just(Ring::Hypothesis),
    ]
}

/// Small token alphabet so chains actually form.
fn fact_strategy() -> impl Strategy<Value = (u8, u8, f64, Ring)> {
    (0u8..8, 0u8..8, 0.0f64..10.0, ring_strategy())
}

fn build(facts: &[(u8, u8, f64, Ring)]) -> Tank {
    let mut tank = Tank::new();
    for &(s, t, w, ring) in facts {
        tank.absorb(
            &format!("n{s}"),
            &format!("n{t}"),
            "IMP",
            w,
            ring,
            Origin::observation("prop"),
        );
    }
    tank
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The structural tree and the fast fold agree on every string.
    #[test]
    fn structural_and_fast_hash_agree(token in ".{0,24}") {
        prop_assert_eq!(encode(&token).digest(), get_token_hash(&token));
    }

    /// Kernel caching never changes a digest.
    #[test]
    fn kernel_cache_is_transparent(tokens in vec("[a-z]{0,6}", 1..30), cap in 0usize..4) {
        let mut kernel = Kernel::with_config(&invariant_core::KernelConfig {
            cache_capacity: Some(cap),
        });
        for token in &tokens {
            prop_assert_eq!(kernel.token_hash(token), get_token_hash(token));
        }
        prop_assert!(kernel.cache().len() <= cap);
    }

    /// Valid UTF-8 hashes the same through the lossy path.
    #[test]
    fn lossy_matches_for_valid_utf8(token in ".{0,16}") {
        prop_assert_eq!(token_hash_lossy(token.as_bytes()), get_token_hash(&token));
    }

    /// Re-absorbing never duplicates, sums weight and never weakens the ring.
    #[test]
    fn merge_on_conflict(contributions in vec((0.0f64..5.0, ring_strategy()), 1..10)) {
        let mut tank = Tank::new();
        let mut strongest = Ring::Hypothesis;
        let mut total = 0.0;
        let mut id = None;
        for (w, ring) in &contributions {
            id = Some(tank.absorb("A", "B", "IMP", *w, *ring, Origin::observation("p")));
            strongest = strongest.stronger(*ring);
            total += *w;
        }
        let edge = tank.get(&id.expect("absorbed")).expect("edge");
        prop_assert_eq!(tank.len(), 1);
        prop_assert_eq!(edge.ring(), strongest);
        prop_assert!((edge.weight() - total).abs() < 1e-9);
        prop_assert_eq!(edge.provenance().len(), contributions.len());
    }

    /// The same facts in any order give the same closure.
    #[test]
    fn closure_is_order_independent(facts in vec(fact_strategy(), 1..20)) {
        let mut forward = build(&facts);
        let mut reversed_facts = facts.clone();
        reversed_facts.reverse();
        let mut backward = build(&reversed_facts);

        Reactor::default().run_to_fixed_point(&mut forward);
        Reactor::default().run_to_fixed_point(&mut backward);

        let ids = |t: &Tank| t.edges().map(|e| (e.id(), e.ring())).collect::<Vec<_>>();
        prop_assert_eq!(ids(&forward), ids(&backward));
    }

    /// After reaching a fixed point, another pass adds nothing and no
    /// self-loop was derived.
    #[test]
    fn closure_reaches_fixed_point(facts in vec(fact_strategy(), 1..20)) {
        let mut tank = build(&facts);
        let mut reactor = Reactor::default();
        let report = reactor.run_to_fixed_point(&mut tank);
        prop_assert!(report.reached_fixed_point);
        prop_assert_eq!(reactor.cycle_lambda(&mut tank).added, 0);

        for edge in tank.edges() {
            let derived = edge
                .provenance()
                .iter()
                .any(|p| p.origin.kind == ProvenanceKind::ClosureDerived);
            if derived {
                prop_assert_ne!(edge.source(), edge.target());
            }
        }
    }

    /// Compaction never raises active weight nor lowers storage weight.
    #[test]
    fn compaction_is_monotone(facts in vec(fact_strategy(), 1..20), pick in vec(any::<bool>(), 20)) {
        let mut tank = build(&facts);
        let all: Vec<EdgeId> = tank.edges().map(|e| e.id()).collect();
        let chosen: Vec<EdgeId> = all
            .iter()
            .zip(pick.iter())
            .filter(|(_, p)| **p)
            .map(|(id, _)| *id)
            .collect();
        let rule = tank.absorb("rule", "n0", "IMP", 1.0, Ring::Axiom, Origin::axiom("r"));

        let report = Reactor::default().compact(&mut tank, &chosen, rule);
        prop_assert!(report.active_after <= report.active_before);
        prop_assert!(report.storage_after >= report.storage_before);
        prop_assert!(report.superseded <= chosen.len());
    }

    /// Snapshots round-trip bit-exactly.
    #[test]
    fn snapshot_roundtrip(facts in vec(fact_strategy(), 0..20)) {
        let tank = build(&facts);
        let bytes = tank_to_bytes(&tank).expect("serialize");
        let restored = tank_from_bytes(&bytes).expect("deserialize");
        prop_assert_eq!(tank_to_bytes(&restored).expect("reserialize"), bytes);
    }

    /// Overlays survive a write/parse cycle.
    #[test]
    fn overlay_text_roundtrip(
        edges in vec(("[0-9a-f]{16}", "[0-9a-f]{16}", 0.0f64..100.0), 0..10),
        labels in vec(("[0-9a-f]{16}", "[A-Za-z ]{1,12}"), 0..5),
    ) {
        let mut overlay = OverlayGraph::new();
        for (s, t, w) in &edges {
            overlay.add_edge(s, t, *w, None);
        }
        for (node, label) in &labels {
            overlay.define_label(node, label);
        }
        let text = overlay.to_jsonl().expect("render");
        prop_assert_eq!(OverlayGraph::from_jsonl(&text), overlay);
    }

    /// Relation text round-trips through the enum unchanged.
    #[test]
    fn relation_text_roundtrip(label in "[A-Za-z_]{1,10}") {
        let relation = Relation::from(label.as_str());
        prop_assert_eq!(relation.as_str(), label.as_str());
        prop_assert_eq!(String::from(relation), label);
    }
}
