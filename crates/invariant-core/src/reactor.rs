//! # Reactor
//!
//! Forward-chaining closure and compaction over a [`Tank`].
//!
//! ## Closure
//!
//! One pass of [`Reactor::cycle_lambda`] reads the current ACTIVE
//! implication edges and, for every chain `A→B`, `B→C` with no `A→C` in the
//! Tank, absorbs `A→C` at ring DERIVED with weight
//! `min(w(A→B), w(B→C)) * decay`. All candidates are collected before the
//! Tank is touched, so a pass only composes facts that existed when it
//! started. Chains longer than two hops need further passes;
//! [`Reactor::run_to_fixed_point`] drives passes until one adds nothing.
//!
//! When several intermediates yield the same `A→C` in one pass, the
//! heaviest wins and ties go to the smallest intermediate digest.
//!
//! ## Similarity hypotheses
//!
//! [`Reactor::cycle_mendeleev`] compares the outgoing structure of nodes.
//! Each node's signature is the set of `(relation, target)` pairs on its
//! ACTIVE edges at ring DERIVED or stronger. When two signatures have a
//! Jaccard similarity at or above the threshold, each node is proposed the
//! edges only the other has, at ring HYPOTHESIS. Existing edges are never
//! touched, so a hypothesis cannot upgrade or reweight a crystal fact.
//!
//! ## Compaction
//!
//! [`Reactor::compact`] marks facts as superseded by a rule edge and reports
//! the weight accounting before and after.

use crate::config::ReactorConfig;
use crate::kernel::get_token_hash;
use crate::primitives::{HYPOTHESIS_SIMILARITY_SCALE, MAX_HYPOTHESES_PER_CYCLE};
use crate::{EdgeId, EdgeStatus, Origin, Relation, Ring, Tank, TokenHash};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Note attached to every closure-derived provenance record.
const CLOSURE_NOTE: &str = "closure:transitive";

/// Note attached to every similarity hypothesis.
const SIMILARITY_NOTE: &str = "similarity:jaccard";

// =============================================================================
// REPORTS
// =============================================================================

/// Outcome of one closure pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// 1-based pass number over the Reactor's lifetime.
    pub pass: usize,
    /// Distinct `(A, C)` pairs that survived filtering.
    pub candidates: usize,
    /// Edges absorbed by this pass.
    pub added: usize,
    /// Ids of the absorbed edges, in commit order.
    pub derived: Vec<EdgeId>,
}

/// Outcome of [`Reactor::run_to_fixed_point`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureReport {
    pub passes: usize,
    pub added: usize,
    /// False when the pass limit stopped the run first.
    pub reached_fixed_point: bool,
}

/// Outcome of one similarity pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisReport {
    /// Nodes whose signature was large enough to compare.
    pub candidates: usize,
    /// Node pairs at or above the similarity threshold.
    pub similar_pairs: usize,
    /// Edges absorbed by this pass.
    pub added: usize,
    /// Ids of the absorbed hypotheses, in commit order.
    pub hypotheses: Vec<EdgeId>,
}

/// Weight accounting around one compaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionReport {
    pub rule: Option<EdgeId>,
    pub requested: usize,
    pub superseded: usize,
    pub active_before: usize,
    pub active_after: usize,
    pub storage_before: usize,
    pub storage_after: usize,
}

impl CompactionReport {
    /// Active footprint removed by the compaction.
    #[must_use]
    pub fn saved(&self) -> usize {
        self.active_before.saturating_sub(self.active_after)
    }
}

/// Human-readable account of how an edge came to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub edge: EdgeId,
    pub source: String,
    pub target: String,
    pub relation: Relation,
    pub ring: Ring,
    pub weight: f64,
    pub status: EdgeStatus,
    pub superseded_by: Option<EdgeId>,
    /// One line per provenance record, in absorption order.
    pub lines: Vec<String>,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} --{}--> {} [{}] weight={:.2}",
            self.source, self.relation, self.target, self.ring, self.weight
        )?;
        if let Some(rule) = self.superseded_by {
            writeln!(f, "  superseded by {rule}")?;
        }
        for line in &self.lines {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

// =============================================================================
// REACTOR
// =============================================================================

/// The closure engine. Holds configuration and lifetime counters only; the
/// Tank is passed in per call.
#[derive(Debug, Clone, Default)]
pub struct Reactor {
    config: ReactorConfig,
    passes: usize,
    derived_total: usize,
    hypotheses_total: usize,
}

/// A derivation waiting to be committed.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    via: TokenHash,
    weight: f64,
}

/// A similarity hypothesis waiting to be committed.
#[derive(Debug, Clone)]
struct Proposal {
    source: TokenHash,
    target: TokenHash,
    relation: Relation,
    template: TokenHash,
    weight: f64,
}

type Signature = BTreeSet<(Relation, TokenHash)>;

impl Reactor {
    #[must_use]
    pub fn new(config: ReactorConfig) -> Self {
        Self {
            config,
            passes: 0,
            derived_total: 0,
            hypotheses_total: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    /// Passes run so far.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Edges derived so far.
    #[must_use]
    pub fn derived_total(&self) -> usize {
        self.derived_total
    }

    /// Similarity hypotheses absorbed so far.
    #[must_use]
    pub fn hypotheses_total(&self) -> usize {
        self.hypotheses_total
    }

    /// Run a single closure pass.
    pub fn cycle_lambda(&mut self, tank: &mut Tank) -> CycleReport {
        self.passes += 1;
        let candidates = self.collect_candidates(tank);

        let mut report = CycleReport {
            pass: self.passes,
            candidates: candidates.len(),
            ..CycleReport::default()
        };

        for ((a, c), candidate) in candidates {
            tracing::debug!(
                source = %tank.display_label(&a),
                target = %tank.display_label(&c),
                via = %tank.display_label(&candidate.via),
                weight = candidate.weight,
                "derived"
            );
            let id = tank.absorb_hash(
                a,
                c,
                Relation::Implication,
                candidate.weight,
                Ring::Derived,
                Origin::derived(CLOSURE_NOTE, vec![a, candidate.via, c]),
            );
            report.derived.push(id);
        }

        report.added = report.derived.len();
        self.derived_total += report.added;
        tracing::info!(
            pass = report.pass,
            candidates = report.candidates,
            added = report.added,
            "closure pass"
        );
        report
    }

    /// Repeat passes until one adds nothing or `max_passes` is reached.
    pub fn run_to_fixed_point(&mut self, tank: &mut Tank) -> ClosureReport {
        let mut report = ClosureReport::default();
        while report.passes < self.config.max_passes {
            let cycle = self.cycle_lambda(tank);
            report.passes += 1;
            report.added += cycle.added;
            if cycle.added == 0 {
                report.reached_fixed_point = true;
                break;
            }
        }
        if !report.reached_fixed_point {
            tracing::warn!(
                passes = report.passes,
                added = report.added,
                "closure stopped at pass limit"
            );
        }
        report
    }

    /// Run a single similarity pass.
    ///
    /// Nodes with fewer than `min_neighbors` signature entries are not
    /// compared. A proposal is `similarity * 0.5` heavy and only absorbed if
    /// no edge with its id exists in any status. Self-loops are skipped and
    /// at most [`MAX_HYPOTHESES_PER_CYCLE`] edges are added per pass.
    pub fn cycle_mendeleev(
        &mut self,
        tank: &mut Tank,
        sim_threshold: f64,
        min_neighbors: usize,
    ) -> HypothesisReport {
        let signatures: Vec<(TokenHash, Signature)> = tank
            .nodes()
            .map(|node| (*node, signature(tank, node)))
            .filter(|(_, sig)| !sig.is_empty() && sig.len() >= min_neighbors)
            .collect();

        let mut report = HypothesisReport {
            candidates: signatures.len(),
            ..HypothesisReport::default()
        };

        let mut proposals = Vec::new();
        for (i, (a, a_sig)) in signatures.iter().enumerate() {
            for (b, b_sig) in signatures.iter().skip(i + 1) {
                let shared = a_sig.intersection(b_sig).count();
                let union = a_sig.union(b_sig).count();
                if union == 0 {
                    continue;
                }
                let similarity = shared as f64 / union as f64;
                if similarity < sim_threshold {
                    continue;
                }
                report.similar_pairs += 1;
                let weight = similarity * HYPOTHESIS_SIMILARITY_SCALE;
                propose(&mut proposals, *b, *a, a_sig.difference(b_sig), weight);
                propose(&mut proposals, *a, *b, b_sig.difference(a_sig), weight);
            }
        }

        for proposal in proposals {
            if report.added >= MAX_HYPOTHESES_PER_CYCLE {
                break;
            }
            if proposal.source == proposal.target
                || tank
                    .find(&proposal.source, &proposal.target, &proposal.relation)
                    .is_some()
            {
                continue;
            }
            tracing::debug!(
                source = %tank.display_label(&proposal.source),
                target = %tank.display_label(&proposal.target),
                template = %tank.display_label(&proposal.template),
                weight = proposal.weight,
                "hypothesis"
            );
            let path = vec![proposal.source, proposal.template, proposal.target];
            let id = tank.absorb_hash(
                proposal.source,
                proposal.target,
                proposal.relation,
                proposal.weight,
                Ring::Hypothesis,
                Origin::similarity(SIMILARITY_NOTE, path),
            );
            report.hypotheses.push(id);
            report.added += 1;
        }

        self.hypotheses_total += report.added;
        tracing::info!(
            candidates = report.candidates,
            similar_pairs = report.similar_pairs,
            added = report.added,
            "similarity pass"
        );
        report
    }

    /// Supersede `fact_ids` by `rule_id` and account for the change.
    pub fn compact(&self, tank: &mut Tank, fact_ids: &[EdgeId], rule_id: EdgeId) -> CompactionReport {
        let active_before = tank.active_weight();
        let storage_before = tank.storage_weight();
        let superseded = tank.supersede(fact_ids, rule_id);
        CompactionReport {
            rule: Some(rule_id),
            requested: fact_ids.len(),
            superseded,
            active_before,
            active_after: tank.active_weight(),
            storage_before,
            storage_after: tank.storage_weight(),
        }
    }

    /// Explain the edge `source -relation-> target`, if present.
    #[must_use]
    pub fn explain(
        &self,
        tank: &Tank,
        source: &TokenHash,
        target: &TokenHash,
        relation: &Relation,
    ) -> Option<Explanation> {
        let edge = tank.find(source, target, relation)?;
        let lines = edge
            .provenance()
            .iter()
            .map(|p| {
                let head = format!("[{}] {} {}", p.ring, p.origin.kind.as_str(), p.origin.note);
                if p.origin.path.is_empty() {
                    format!("{head} (+{:.2})", p.weight)
                } else {
                    let path: Vec<String> =
                        p.origin.path.iter().map(|h| tank.display_label(h)).collect();
                    format!("{head}: {} (+{:.2})", path.join(" -> "), p.weight)
                }
            })
            .collect();

        Some(Explanation {
            edge: edge.id(),
            source: tank.display_label(source),
            target: tank.display_label(target),
            relation: edge.relation().clone(),
            ring: edge.ring(),
            weight: edge.weight(),
            status: edge.status(),
            superseded_by: edge.superseded_by(),
            lines,
        })
    }

    /// [`explain`](Self::explain) addressed by token text.
    #[must_use]
    pub fn explain_tokens(
        &self,
        tank: &Tank,
        source: &str,
        target: &str,
        relation: &Relation,
    ) -> Option<Explanation> {
        self.explain(tank, &get_token_hash(source), &get_token_hash(target), relation)
    }

    /// Gather every derivable `(A, C)` without mutating the Tank.
    fn collect_candidates(&self, tank: &Tank) -> BTreeMap<(TokenHash, TokenHash), Candidate> {
        let mut premises: BTreeMap<TokenHash, Vec<(TokenHash, f64)>> = BTreeMap::new();
        for edge in tank.active_edges() {
            if edge.relation().composes() && edge.ring().is_at_least(self.config.max_ring) {
                premises
                    .entry(edge.source())
                    .or_default()
                    .push((edge.target(), edge.weight()));
            }
        }

        let mut candidates: BTreeMap<(TokenHash, TokenHash), Candidate> = BTreeMap::new();
        for (a, firsts) in &premises {
            for (b, w1) in firsts {
                let Some(seconds) = premises.get(b) else {
                    continue;
                };
                for (c, w2) in seconds {
                    if a == c {
                        continue;
                    }
                    if tank.find(a, c, &Relation::Implication).is_some() {
                        continue;
                    }
                    let weight = w1.min(*w2) * self.config.decay;
                    if weight < self.config.min_weight {
                        continue;
                    }
                    let better = |current: &Candidate| {
                        weight > current.weight || (weight == current.weight && *b < current.via)
                    };
                    candidates
                        .entry((*a, *c))
                        .and_modify(|current| {
                            if better(current) {
                                *current = Candidate { via: *b, weight };
                            }
                        })
                        .or_insert(Candidate { via: *b, weight });
                }
            }
        }
        candidates
    }
}

/// `(relation, target)` pairs on `node`'s ACTIVE edges at DERIVED or stronger.
fn signature(tank: &Tank, node: &TokenHash) -> Signature {
    tank.neighbors(node, Ring::Derived)
        .into_iter()
        .map(|e| (e.relation().clone(), e.target()))
        .collect()
}

/// Queue every pair `template` has and `source` lacks as a proposal.
fn propose<'a>(
    out: &mut Vec<Proposal>,
    source: TokenHash,
    template: TokenHash,
    missing: impl Iterator<Item = &'a (Relation, TokenHash)>,
    weight: f64,
) {
    for (relation, target) in missing {
        out.push(Proposal {
            source,
            target: *target,
            relation: relation.clone(),
            template,
            weight,
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProvenanceKind;

    fn imp(tank: &mut Tank, s: &str, t: &str, w: f64) -> EdgeId {
        tank.absorb(s, t, "IMP", w, Ring::Observed, Origin::observation("test"))
    }

    #[test]
    fn single_pass_derives_transitive_edge() {
        let mut tank = Tank::new();
        imp(&mut tank, "cat", "animal", 1.0);
        imp(&mut tank, "animal", "living", 1.0);

        let mut reactor = Reactor::default();
        let report = reactor.cycle_lambda(&mut tank);

        assert_eq!(report.added, 1);
        assert_eq!(tank.len(), 3);
        let edge = tank
            .find(&get_token_hash("cat"), &get_token_hash("living"), &Relation::Implication)
            .expect("derived edge");
        assert_eq!(edge.ring(), Ring::Derived);
        assert!((edge.weight() - 0.9).abs() < 1e-12);

        let prov = &edge.provenance()[0];
        assert_eq!(prov.origin.kind, ProvenanceKind::ClosureDerived);
        assert_eq!(
            prov.origin.path,
            vec![
                get_token_hash("cat"),
                get_token_hash("animal"),
                get_token_hash("living")
            ]
        );
    }

    #[test]
    fn second_pass_is_idempotent() {
        let mut tank = Tank::new();
        imp(&mut tank, "cat", "animal", 1.0);
        imp(&mut tank, "animal", "living", 1.0);

        let mut reactor = Reactor::default();
        reactor.cycle_lambda(&mut tank);
        let second = reactor.cycle_lambda(&mut tank);
        assert_eq!(second.added, 0);
        assert_eq!(tank.len(), 3);
        assert_eq!(reactor.passes(), 2);
        assert_eq!(reactor.derived_total(), 1);
    }

    #[test]
    fn long_chain_needs_several_passes() {
        let mut tank = Tank::new();
        imp(&mut tank, "a", "b", 1.0);
        imp(&mut tank, "b", "c", 1.0);
        imp(&mut tank, "c", "d", 1.0);
        imp(&mut tank, "d", "e", 1.0);

        let mut reactor = Reactor::default();
        let first = reactor.cycle_lambda(&mut tank);
        assert_eq!(first.added, 3);

        let report = reactor.run_to_fixed_point(&mut tank);
        assert!(report.reached_fixed_point);
        // 4 + 3 + 2 + 1 edges in the full closure of a 5-node chain.
        assert_eq!(tank.len(), 10);
    }

    #[test]
    fn only_implication_composes() {
        let mut tank = Tank::new();
        tank.absorb("a", "b", "EQUALS", 1.0, Ring::Observed, Origin::observation("d"));
        tank.absorb("b", "c", "EQUALS", 1.0, Ring::Observed, Origin::observation("d"));
        tank.absorb("a", "b", "IS_A", 1.0, Ring::Observed, Origin::observation("d"));
        tank.absorb("b", "c", "IS_A", 1.0, Ring::Observed, Origin::observation("d"));

        let report = Reactor::default().cycle_lambda(&mut tank);
        assert_eq!(report.added, 0);
    }

    #[test]
    fn no_self_loops() {
        let mut tank = Tank::new();
        imp(&mut tank, "a", "b", 1.0);
        imp(&mut tank, "b", "a", 1.0);

        let report = Reactor::default().run_to_fixed_point(&mut tank);
        assert_eq!(report.added, 0);
        assert_eq!(tank.len(), 2);
    }

    #[test]
    fn heaviest_intermediate_wins() {
        let mut tank = Tank::new();
        imp(&mut tank, "a", "light", 1.0);
        imp(&mut tank, "light", "c", 1.0);
        imp(&mut tank, "a", "heavy", 4.0);
        imp(&mut tank, "heavy", "c", 2.0);

        let report = Reactor::default().cycle_lambda(&mut tank);
        assert_eq!(report.added, 1);
        let edge = tank
            .find(&get_token_hash("a"), &get_token_hash("c"), &Relation::Implication)
            .expect("derived");
        assert!((edge.weight() - 1.8).abs() < 1e-12);
        assert_eq!(edge.provenance()[0].origin.path[1], get_token_hash("heavy"));
    }

    #[test]
    fn superseded_premises_do_not_compose() {
        let mut tank = Tank::new();
        let ab = imp(&mut tank, "a", "b", 1.0);
        imp(&mut tank, "b", "c", 1.0);
        tank.supersede(&[ab], EdgeId::from_bytes([3; 8]));

        assert_eq!(Reactor::default().cycle_lambda(&mut tank).added, 0);
    }

    #[test]
    fn superseded_conclusion_is_not_resurrected() {
        let mut tank = Tank::new();
        imp(&mut tank, "a", "b", 1.0);
        imp(&mut tank, "b", "c", 1.0);
        let mut reactor = Reactor::default();
        let first = reactor.cycle_lambda(&mut tank);
        tank.supersede(&first.derived, EdgeId::from_bytes([4; 8]));

        assert_eq!(reactor.cycle_lambda(&mut tank).added, 0);
    }

    #[test]
    fn max_ring_keeps_hypotheses_out() {
        let mut tank = Tank::new();
        imp(&mut tank, "a", "b", 1.0);
        tank.absorb("b", "c", "IMP", 1.0, Ring::Hypothesis, Origin::crystal("vec"));

        let strict = ReactorConfig {
            max_ring: Ring::Derived,
            ..ReactorConfig::default()
        };
        assert_eq!(Reactor::new(strict).cycle_lambda(&mut tank).added, 0);
        assert_eq!(Reactor::default().cycle_lambda(&mut tank).added, 1);
    }

    #[test]
    fn min_weight_drops_light_candidates() {
        let mut tank = Tank::new();
        imp(&mut tank, "a", "b", 0.1);
        imp(&mut tank, "b", "c", 1.0);

        let config = ReactorConfig {
            min_weight: 0.1,
            ..ReactorConfig::default()
        };
        assert_eq!(Reactor::new(config).cycle_lambda(&mut tank).added, 0);
    }

    #[test]
    fn pass_limit_is_reported() {
        let mut tank = Tank::new();
        for (s, t) in [("a", "b"), ("b", "c"), ("c", "d"), ("d", "e"), ("e", "f")] {
            imp(&mut tank, s, t, 1.0);
        }
        let config = ReactorConfig {
            max_passes: 1,
            ..ReactorConfig::default()
        };
        let report = Reactor::new(config).run_to_fixed_point(&mut tank);
        assert_eq!(report.passes, 1);
        assert!(!report.reached_fixed_point);
    }

    #[test]
    fn compact_reports_accounting() {
        let mut tank = Tank::new();
        let facts: Vec<EdgeId> = ["Socrates", "Plato", "Aristotle"]
            .iter()
            .map(|who| imp(&mut tank, who, "Mortal", 1.0))
            .collect();
        let rule = tank.absorb("Man", "Mortal", "IMP", 1.0, Ring::Axiom, Origin::axiom("rule"));

        let report = Reactor::default().compact(&mut tank, &facts, rule);
        assert_eq!(report.superseded, 3);
        assert_eq!(report.storage_before, report.storage_after);
        assert!(report.active_after < report.active_before);
        assert_eq!(report.saved(), report.active_before - report.active_after);
    }

    #[test]
    fn explain_renders_paths() {
        let mut tank = Tank::new();
        imp(&mut tank, "cat", "animal", 1.0);
        imp(&mut tank, "animal", "living", 1.0);
        let reactor = {
            let mut r = Reactor::default();
            r.cycle_lambda(&mut tank);
            r
        };

        let explanation = reactor
            .explain_tokens(&tank, "cat", "living", &Relation::Implication)
            .expect("explanation");
        assert_eq!(explanation.ring, Ring::Derived);
        assert_eq!(explanation.lines.len(), 1);
        assert!(explanation.lines[0].contains("cat -> animal -> living"));
        assert!(explanation.to_string().starts_with("cat --IMP--> living [DERIVED]"));

        assert!(
            reactor
                .explain_tokens(&tank, "living", "cat", &Relation::Implication)
                .is_none()
        );
    }

    fn similar_pair(tank: &mut Tank) {
        imp(tank, "cat", "animal", 1.0);
        imp(tank, "cat", "pet", 1.0);
        imp(tank, "cat", "furry", 1.0);
        imp(tank, "dog", "animal", 1.0);
        imp(tank, "dog", "pet", 1.0);
    }

    #[test]
    fn similarity_proposes_missing_edges_as_hypotheses() {
        let mut tank = Tank::new();
        similar_pair(&mut tank);

        let mut reactor = Reactor::default();
        let report = reactor.cycle_mendeleev(&mut tank, 0.4, 2);

        assert_eq!(report.candidates, 2);
        assert_eq!(report.similar_pairs, 1);
        assert_eq!(report.added, 1);
        assert_eq!(reactor.hypotheses_total(), 1);

        let (dog, cat, furry) = (get_token_hash("dog"), get_token_hash("cat"), get_token_hash("furry"));
        let edge = tank
            .find(&dog, &furry, &Relation::Implication)
            .expect("hypothesis");
        assert_eq!(edge.ring(), Ring::Hypothesis);
        assert!((edge.weight() - (2.0 / 3.0) * 0.5).abs() < 1e-12);
        let prov = &edge.provenance()[0];
        assert_eq!(prov.origin.kind, ProvenanceKind::SimilarityHypothesis);
        assert_eq!(prov.origin.path, vec![dog, cat, furry]);

        assert!(
            tank.neighbors(&dog, Ring::Observed)
                .iter()
                .all(|e| e.target() != furry)
        );
        assert_eq!(reactor.cycle_mendeleev(&mut tank, 0.4, 2).added, 0);
    }

    #[test]
    fn similarity_never_touches_existing_edges() {
        let mut tank = Tank::new();
        similar_pair(&mut tank);
        let old = tank.absorb("dog", "furry", "IMP", 0.7, Ring::Hypothesis, Origin::crystal("vec"));

        let report = Reactor::default().cycle_mendeleev(&mut tank, 0.4, 2);
        assert_eq!(report.added, 0);
        let edge = tank.get(&old).expect("edge");
        assert_eq!(edge.provenance().len(), 1);
        assert_eq!(edge.weight(), 0.7);
        assert_eq!(edge.ring(), Ring::Hypothesis);

        let mut tank = Tank::new();
        similar_pair(&mut tank);
        let retired = imp(&mut tank, "dog", "furry", 1.0);
        tank.supersede(&[retired], EdgeId::from_bytes([1; 8]));

        let report = Reactor::default().cycle_mendeleev(&mut tank, 0.4, 2);
        assert_eq!(report.added, 0);
        let edge = tank.get(&retired).expect("edge");
        assert_eq!(edge.status(), EdgeStatus::Superseded);
        assert_eq!(edge.ring(), Ring::Observed);
        assert_eq!(edge.provenance().len(), 1);
    }

    #[test]
    fn similarity_respects_thresholds() {
        let mut tank = Tank::new();
        similar_pair(&mut tank);

        let report = Reactor::default().cycle_mendeleev(&mut tank, 0.4, 3);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.added, 0);

        let report = Reactor::default().cycle_mendeleev(&mut tank, 0.9, 2);
        assert_eq!(report.similar_pairs, 0);
        assert_eq!(report.added, 0);
        assert_eq!(tank.len(), 5);
    }

    #[test]
    fn similarity_pass_is_capped() {
        let mut tank = Tank::new();
        imp(&mut tank, "small", "shared", 1.0);
        imp(&mut tank, "big", "shared", 1.0);
        for i in 0..25 {
            imp(&mut tank, "big", &format!("x{i}"), 1.0);
        }

        let report = Reactor::default().cycle_mendeleev(&mut tank, 0.0, 1);
        assert_eq!(report.added, MAX_HYPOTHESES_PER_CYCLE);
        assert_eq!(tank.stats().count(Ring::Hypothesis), MAX_HYPOTHESES_PER_CYCLE);
    }
}
