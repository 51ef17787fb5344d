//! # Tank
//!
//! The fact store. Maps edge ids to [`Edge`] records and owns all
//! ring, weight, status and provenance accounting.
//!
//! There is no node table: a digest exists as a node as soon as it appears
//! as the endpoint of any edge. All data structures use `BTreeMap` for
//! deterministic ordering.

use crate::config::KernelConfig;
use crate::kernel::{Kernel, edge_id};
use crate::types::saturating_sum;
use crate::{Edge, EdgeId, EdgeStatus, InvariantError, Origin, Provenance, Relation, Ring, TokenHash};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// STATISTICS
// =============================================================================

/// Snapshot of Tank counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TankStats {
    /// Distinct digests touched by any edge.
    pub nodes: usize,
    pub edges: usize,
    pub active_edges: usize,
    pub superseded_edges: usize,
    /// Edge counts indexed by ring ordinal (AXIOM first).
    pub by_ring: [usize; 4],
    /// Total weight ever absorbed.
    pub mass: f64,
    /// Digests with a known text label.
    pub labels: usize,
}

impl TankStats {
    /// Number of edges currently at `ring`.
    #[must_use]
    pub fn count(&self, ring: Ring) -> usize {
        self.by_ring
            .get(ring.ordinal() as usize)
            .copied()
            .unwrap_or(0)
    }
}

// =============================================================================
// TANK
// =============================================================================

/// Fact store keyed by edge id.
#[derive(Debug, Clone, Default)]
pub struct Tank {
    /// Edge storage: EdgeId -> Edge
    edges: BTreeMap<EdgeId, Edge>,

    /// Outgoing index: source -> edge ids, any status
    outgoing: BTreeMap<TokenHash, BTreeSet<EdgeId>>,

    /// Reverse lookup: digest -> raw text, for text-addressed absorbs
    labels: BTreeMap<TokenHash, String>,

    /// Accumulated weight per endpoint
    node_energy: BTreeMap<TokenHash, f64>,

    /// Total weight absorbed
    mass: f64,

    kernel: Kernel,
}

impl Tank {
    /// Create an empty Tank with the default kernel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty Tank whose kernel follows `config`.
    #[must_use]
    pub fn with_config(config: &KernelConfig) -> Self {
        Self::with_kernel(Kernel::with_config(config))
    }

    /// Create an empty Tank around an existing kernel.
    #[must_use]
    pub fn with_kernel(kernel: Kernel) -> Self {
        Self {
            kernel,
            ..Self::default()
        }
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    /// Absorb a fact between two text tokens.
    ///
    /// Both tokens are hashed through the kernel and remembered as labels.
    /// Returns the id of the created or merged edge.
    pub fn absorb(
        &mut self,
        source: &str,
        target: &str,
        relation: impl Into<Relation>,
        weight: f64,
        ring: Ring,
        origin: Origin,
    ) -> EdgeId {
        let s = self.kernel.token_hash(source);
        let t = self.kernel.token_hash(target);
        self.labels.entry(s).or_insert_with(|| source.to_string());
        self.labels.entry(t).or_insert_with(|| target.to_string());
        self.absorb_hash(s, t, relation, weight, ring, origin)
    }

    /// Absorb a fact between two digests.
    ///
    /// A new id creates an ACTIVE edge. A known id merges: provenance
    /// appends, the ring can only strengthen, weight sums. Status is left
    /// untouched, so re-absorbing a superseded fact does not revive it.
    pub fn absorb_hash(
        &mut self,
        source: TokenHash,
        target: TokenHash,
        relation: impl Into<Relation>,
        weight: f64,
        ring: Ring,
        origin: Origin,
    ) -> EdgeId {
        let relation = relation.into();
        let weight = sanitize_weight(weight);
        let id = edge_id(&source, &target, &relation);
        let contribution = Provenance::new(ring, weight, origin);

        match self.edges.get_mut(&id) {
            Some(edge) => edge.merge(contribution),
            None => {
                self.edges
                    .insert(id, Edge::new(id, source, target, relation, contribution));
                self.outgoing.entry(source).or_default().insert(id);
            }
        }

        self.mass = saturating_sum(self.mass, weight);
        for node in [source, target] {
            let energy = self.node_energy.entry(node).or_insert(0.0);
            *energy = saturating_sum(*energy, weight);
        }
        id
    }

    /// Hash a token with this Tank's kernel.
    pub fn token_hash(&mut self, token: &str) -> TokenHash {
        self.kernel.token_hash(token)
    }

    /// Attach a display label to a digest if it has none yet.
    pub fn set_label(&mut self, hash: TokenHash, label: impl Into<String>) {
        self.labels.entry(hash).or_insert_with(|| label.into());
    }

    // -------------------------------------------------------------------------
    // Compaction
    // -------------------------------------------------------------------------

    /// Mark facts as subsumed by `rule_id`.
    ///
    /// Unknown ids and already superseded edges are skipped. Only status and
    /// `superseded_by` change. Returns the number of edges transitioned.
    pub fn supersede(&mut self, fact_ids: &[EdgeId], rule_id: EdgeId) -> usize {
        let mut changed = 0usize;
        for id in fact_ids {
            if let Some(edge) = self.edges.get_mut(id) {
                if edge.supersede(rule_id) {
                    changed += 1;
                }
            }
        }
        tracing::debug!(
            requested = fact_ids.len(),
            superseded = changed,
            rule = %rule_id,
            "compaction"
        );
        changed
    }

    // -------------------------------------------------------------------------
    // Accounting
    // -------------------------------------------------------------------------

    /// Distinct nodes touched by ACTIVE edges plus the number of ACTIVE edges.
    #[must_use]
    pub fn active_weight(&self) -> usize {
        footprint(self.edges.values().filter(|e| e.is_active()))
    }

    /// Same measure over edges of any status.
    #[must_use]
    pub fn storage_weight(&self) -> usize {
        footprint(self.edges.values())
    }

    /// Total weight absorbed so far.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Weight credited to `node` as either endpoint.
    #[must_use]
    pub fn node_energy(&self, node: &TokenHash) -> f64 {
        self.node_energy.get(node).copied().unwrap_or(0.0)
    }

    /// Share of the total mass carried by `node`: `energy / mass`, or 0 on
    /// an empty Tank.
    #[must_use]
    pub fn node_probability(&self, node: &TokenHash) -> f64 {
        if self.mass <= 0.0 {
            return 0.0;
        }
        self.node_energy(node) / self.mass
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn get(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &EdgeId) -> bool {
        self.edges.contains_key(id)
    }

    /// The edge `source -relation-> target`, whatever its status.
    #[must_use]
    pub fn find(&self, source: &TokenHash, target: &TokenHash, relation: &Relation) -> Option<&Edge> {
        self.edges.get(&edge_id(source, target, relation))
    }

    /// All edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// ACTIVE edges in id order.
    pub fn active_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(|e| e.is_active())
    }

    /// Every edge leaving `source`, any status.
    pub fn outgoing(&self, source: &TokenHash) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(source)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
    }

    /// ACTIVE edges leaving `source` whose ring is at least as strong as
    /// `max_ring`.
    #[must_use]
    pub fn neighbors(&self, source: &TokenHash, max_ring: Ring) -> Vec<&Edge> {
        self.outgoing(source)
            .filter(|e| e.is_active() && e.ring().is_at_least(max_ring))
            .collect()
    }

    /// Every edge at least as strong as `ring`, any status.
    #[must_use]
    pub fn edges_at_least(&self, ring: Ring) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|e| e.ring().is_at_least(ring))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Distinct digests touched by any edge.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_energy.len()
    }

    /// Every endpoint digest, in digest order.
    pub fn nodes(&self) -> impl Iterator<Item = &TokenHash> {
        self.node_energy.keys()
    }

    // -------------------------------------------------------------------------
    // Labels
    // -------------------------------------------------------------------------

    /// Raw text the digest was absorbed from, if known.
    #[must_use]
    pub fn label(&self, hash: &TokenHash) -> Option<&str> {
        self.labels.get(hash).map(String::as_str)
    }

    /// Label, or the first 8 hex characters of the digest when the text is
    /// unknown.
    #[must_use]
    pub fn display_label(&self, hash: &TokenHash) -> String {
        self.label(hash)
            .map(str::to_string)
            .unwrap_or_else(|| hash.short_hex())
    }

    #[must_use]
    pub fn stats(&self) -> TankStats {
        let mut stats = TankStats {
            nodes: self.node_count(),
            edges: self.edges.len(),
            mass: self.mass,
            labels: self.labels.len(),
            ..TankStats::default()
        };
        for edge in self.edges.values() {
            match edge.status() {
                EdgeStatus::Active => stats.active_edges += 1,
                EdgeStatus::Superseded => stats.superseded_edges += 1,
            }
            if let Some(slot) = stats.by_ring.get_mut(edge.ring().ordinal() as usize) {
                *slot += 1;
            }
        }
        stats
    }
}

/// Distinct endpoints plus edge count.
fn footprint<'a>(edges: impl Iterator<Item = &'a Edge>) -> usize {
    let mut nodes = BTreeSet::new();
    let mut count = 0usize;
    for edge in edges {
        nodes.insert(edge.source());
        nodes.insert(edge.target());
        count += 1;
    }
    nodes.len() + count
}

/// Weights are non-negative and finite.
fn sanitize_weight(weight: f64) -> f64 {
    if !weight.is_finite() {
        tracing::warn!(weight, "non-finite weight replaced with 0");
        0.0
    } else if weight < 0.0 {
        tracing::warn!(weight, "negative weight replaced with its magnitude");
        weight.abs()
    } else {
        weight
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of a Tank.
///
/// The kernel cache and the outgoing index are derived state and are rebuilt
/// on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableTank {
    pub edges: Vec<Edge>,
    pub labels: Vec<(TokenHash, String)>,
    pub node_energy: Vec<(TokenHash, f64)>,
    pub mass: f64,
}

impl SerializableTank {
    /// Check that every stored id is the id its endpoints and relation hash
    /// to, and that no id appears twice.
    pub fn verify(&self) -> Result<(), InvariantError> {
        let mut seen = BTreeSet::new();
        for edge in &self.edges {
            let expected = edge_id(&edge.source(), &edge.target(), edge.relation());
            if edge.id() != expected {
                return Err(InvariantError::Deserialization(format!(
                    "Edge id {} does not match its content (expected {expected})",
                    edge.id()
                )));
            }
            if !seen.insert(edge.id()) {
                return Err(InvariantError::Deserialization(format!(
                    "Duplicate edge id {}",
                    edge.id()
                )));
            }
        }
        Ok(())
    }
}

impl From<&Tank> for SerializableTank {
    fn from(tank: &Tank) -> Self {
        Self {
            edges: tank.edges.values().cloned().collect(),
            labels: tank
                .labels
                .iter()
                .map(|(h, l)| (*h, l.clone()))
                .collect(),
            node_energy: tank.node_energy.iter().map(|(h, e)| (*h, *e)).collect(),
            mass: tank.mass,
        }
    }
}

impl From<SerializableTank> for Tank {
    fn from(st: SerializableTank) -> Self {
        let mut tank = Tank::new();
        for edge in st.edges {
            tank.outgoing
                .entry(edge.source())
                .or_default()
                .insert(edge.id());
            tank.edges.insert(edge.id(), edge);
        }
        tank.labels = st.labels.into_iter().collect();
        tank.node_energy = st.node_energy.into_iter().collect();
        tank.mass = st.mass;
        tank
    }
}

// =============================================================================
// TESTS
// =============================================================================
