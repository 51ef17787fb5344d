//! # Core Type Definitions
//!
//! This module contains all core types for the invariant knowledge graph:
//! - Identifiers (`TokenHash`, `EdgeId`)
//! - Truth levels and lifecycle (`Ring`, `EdgeStatus`)
//! - Relation vocabulary (`Relation`)
//! - Provenance (`ProvenanceKind`, `Origin`, `Provenance`)
//! - The fact record (`Edge`)
//! - Error types (`InvariantError`)
//!
//! ## Determinism Guarantees
//!
//! All identifier types implement `Ord` for deterministic ordering in
//! `BTreeMap`/`BTreeSet`. `Ring` is ordered by authority, never by name.

use crate::primitives::{
    EDGE_ID_LEN, REL_CONTRADICTION, REL_GATE, REL_IDENTITY, REL_IMPLICATION, REL_UNCLASSIFIED,
    TOKEN_HASH_LEN, TOKEN_HASH8_LEN, TOKEN_HASH16_LEN,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Full 256-bit Merkle digest of a token.
///
/// This is the only graph-visible identity of a token; raw text is never
/// used as a node key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenHash(pub [u8; TOKEN_HASH_LEN]);

impl TokenHash {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; TOKEN_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TOKEN_HASH_LEN] {
        &self.0
    }

    /// 64-character lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 16 bytes, the 128-bit compact address.
    #[must_use]
    pub fn prefix16(&self) -> [u8; TOKEN_HASH16_LEN] {
        let mut out = [0u8; TOKEN_HASH16_LEN];
        out.copy_from_slice(&self.0[..TOKEN_HASH16_LEN]);
        out
    }

    /// First 8 bytes, the 64-bit compact address.
    #[must_use]
    pub fn prefix8(&self) -> [u8; TOKEN_HASH8_LEN] {
        let mut out = [0u8; TOKEN_HASH8_LEN];
        out.copy_from_slice(&self.0[..TOKEN_HASH8_LEN]);
        out
    }

    /// 32-character hex form of [`prefix16`](Self::prefix16).
    #[must_use]
    pub fn hex16(&self) -> String {
        hex::encode(self.prefix16())
    }

    /// 16-character hex form of [`prefix8`](Self::prefix8).
    ///
    /// Overlay files address nodes with this form.
    #[must_use]
    pub fn hex8(&self) -> String {
        hex::encode(self.prefix8())
    }

    /// First 8 hex characters, used when a digest has no text label.
    #[must_use]
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

        /// The 8-byte prefix read as a little-endian `u64`.
    ///
    /// Probabilistically unique only; callers must tolerate collisions.
    #[must_use]
    pub fn address(&self) -> u64 {
        u64::from_le_bytes(self.prefix8())
    }

    /// Parse a 64-character hex digest.
    pub fn from_hex(s: &str) -> Result<Self, InvariantError> {
        let mut out = [0u8; TOKEN_HASH_LEN];
        hex::decode_to_slice(s, &mut out)
            .map_err(|e| InvariantError::InvalidDigest(format!("{s:?}: {e}")))?;
        Ok(Self(out))
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenHash({})", self.hex8())
    }
}

impl FromStr for TokenHash {
    type Err = InvariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Identity of an edge: the first 8 bytes of `SHA256("u:relation:v")`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub [u8; EDGE_ID_LEN]);

impl EdgeId {
    /// Wrap raw id bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; EDGE_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// 16-character lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 16-character hex id.
    pub fn from_hex(s: &str) -> Result<Self, InvariantError> {
        let mut out = [0u8; EDGE_ID_LEN];
        hex::decode_to_slice(s, &mut out)
            .map_err(|e| InvariantError::InvalidDigest(format!("{s:?}: {e}")))?;
        Ok(Self(out))
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.to_hex())
    }
}

impl FromStr for EdgeId {
    type Err = InvariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// =============================================================================
// RING (TRUTH LEVEL)
// =============================================================================

/// Truth/authority level of an edge.
///
/// Ordered by authority: `Axiom > Observed > Derived > Hypothesis`.
/// The explicit ordinal runs the other way (0 is strongest) and is what
/// every comparison goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Ring {
    /// Asserted rule or user override.
    Axiom = 0,
    /// Observed in source material.
    Observed = 1,
    /// Produced by closure.
    Derived = 2,
    /// Crystallized from the liquid layer; never authoritative.
    Hypothesis = 3,
}

impl Ring {
    /// All rings, strongest first.
    pub const ALL: [Ring; 4] = [Ring::Axiom, Ring::Observed, Ring::Derived, Ring::Hypothesis];

    /// Explicit ordinal, 0 = strongest.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// The stronger of two rings.
    #[must_use]
    pub const fn stronger(self, other: Ring) -> Ring {
        if self.ordinal() <= other.ordinal() {
            self
        } else {
            other
        }
    }

    /// True if this ring is at least as strong as `threshold`.
    ///
    /// `Ring::Hypothesis.is_at_least(Ring::Observed)` is false.
    #[must_use]
    pub const fn is_at_least(self, threshold: Ring) -> bool {
        self.ordinal() <= threshold.ordinal()
    }

    /// Crystal rings are everything except `Hypothesis`.
    #[must_use]
    pub const fn is_crystal(self) -> bool {
        !matches!(self, Ring::Hypothesis)
    }

    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Ring::Axiom => "AXIOM",
            Ring::Observed => "OBSERVED",
            Ring::Derived => "DERIVED",
            Ring::Hypothesis => "HYPOTHESIS",
        }
    }
}

impl PartialOrd for Ring {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ring {
    /// Greater means stronger.
    fn cmp(&self, other: &Self) -> Ordering {
        other.ordinal().cmp(&self.ordinal())
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// EDGE STATUS
// =============================================================================

/// Lifecycle status of an edge. Edges are never physically deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EdgeStatus {
    /// Live fact, counted in the active footprint.
    Active,
    /// Subsumed by a rule; retained for audit.
    Superseded,
}

// =============================================================================
// RELATION
// =============================================================================

/// Relation label of an edge.
///
/// Five labels are reserved. Any other string is carried verbatim as
/// `Other` and is opaque to closure. Parsing is exact: `"imp"` is `Other`,
/// because the label text feeds the edge id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Relation {
    /// `IMP`
    Implication,
    /// `NOT`
    Contradiction,
    /// `EQUALS`
    Identity,
    /// `GATE`
    Gate,
    /// `OMEGA`
    Unclassified,
    /// Any non-reserved label.
    Other(String),
}

impl Relation {
    /// The label text hashed into edge ids.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Relation::Implication => REL_IMPLICATION,
            Relation::Contradiction => REL_CONTRADICTION,
            Relation::Identity => REL_IDENTITY,
            Relation::Gate => REL_GATE,
            Relation::Unclassified => REL_UNCLASSIFIED,
            Relation::Other(s) => s,
        }
    }

    /// Only implication composes under closure.
    #[must_use]
    pub fn composes(&self) -> bool {
        matches!(self, Relation::Implication)
    }

    /// True for the five reserved labels.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        !matches!(self, Relation::Other(_))
    }
}

impl From<&str> for Relation {
    fn from(s: &str) -> Self {
        match s {
            REL_IMPLICATION => Relation::Implication,
            REL_CONTRADICTION => Relation::Contradiction,
            REL_IDENTITY => Relation::Identity,
            REL_GATE => Relation::Gate,
            REL_UNCLASSIFIED => Relation::Unclassified,
            other => Relation::Other(other.to_string()),
        }
    }
}

impl From<String> for Relation {
    fn from(s: String) -> Self {
        match Relation::from(s.as_str()) {
            Relation::Other(_) => Relation::Other(s),
            reserved => reserved,
        }
    }
}

impl From<Relation> for String {
    fn from(r: Relation) -> Self {
        match r {
            Relation::Other(s) => s,
            reserved => reserved.as_str().to_string(),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PROVENANCE
// =============================================================================

/// Machine-checkable category of a contribution.
///
/// Downstream logic branches on this tag, never on the free-text note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProvenanceKind {
    /// Observed in a source document.
    Observation,
    /// Asserted rule.
    Axiom,
    /// Produced by the closure engine.
    ClosureDerived,
    /// Crystallized from vector similarity in the liquid layer.
    CrystalVector,
    /// Backward reference resolved through a named symbol.
    SymbolBackref,
    /// Guessed from nodes with similar outgoing structure.
    SimilarityHypothesis,
}

impl ProvenanceKind {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ProvenanceKind::Observation => "observation",
            ProvenanceKind::Axiom => "axiom",
            ProvenanceKind::ClosureDerived => "closure",
            ProvenanceKind::CrystalVector => "crystal",
            ProvenanceKind::SymbolBackref => "symbol",
            ProvenanceKind::SimilarityHypothesis => "similarity",
        }
    }
}

/// Where a contribution came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Structured category.
    pub kind: ProvenanceKind,
    /// Free text for humans (document name, rule name). Never parsed.
    pub note: String,
    /// Digest path `[A, B, C]` for closure-derived records, or
    /// `[source, template, target]` for similarity hypotheses; empty otherwise.
    #[serde(default)]
    pub path: Vec<TokenHash>,
}

impl Origin {
    /// Create an origin with no derivation path.
    #[must_use]
    pub fn new(kind: ProvenanceKind, note: impl Into<String>) -> Self {
        Self {
            kind,
            note: note.into(),
            path: Vec::new(),
        }
    }

    /// Observation origin.
    #[must_use]
    pub fn observation(note: impl Into<String>) -> Self {
        Self::new(ProvenanceKind::Observation, note)
    }

    /// Axiom origin.
    #[must_use]
    pub fn axiom(note: impl Into<String>) -> Self {
        Self::new(ProvenanceKind::Axiom, note)
    }

    /// Vector-crystallization origin.
    #[must_use]
    pub fn crystal(note: impl Into<String>) -> Self {
        Self::new(ProvenanceKind::CrystalVector, note)
    }

    /// Symbol backward-reference origin.
    #[must_use]
    pub fn symbol_backref(note: impl Into<String>) -> Self {
        Self::new(ProvenanceKind::SymbolBackref, note)
    }

    /// Closure origin carrying the `[A, B, C]` path it was derived through.
    #[must_use]
    pub fn derived(note: impl Into<String>, path: Vec<TokenHash>) -> Self {
        Self {
            kind: ProvenanceKind::ClosureDerived,
            note: note.into(),
            path,
        }
    }

    /// Similarity origin carrying `[source, template, target]`.
    #[must_use]
    pub fn similarity(note: impl Into<String>, path: Vec<TokenHash>) -> Self {
        Self {
            kind: ProvenanceKind::SimilarityHypothesis,
            note: note.into(),
            path,
        }
    }
}

/// One contribution to an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Ring of this contribution, not of the edge.
    pub ring: Ring,
    /// Weight this contribution added.
    pub weight: f64,
    /// Origin of the contribution.
    pub origin: Origin,
}

impl Provenance {
    /// Create a provenance record.
    #[must_use]
    pub fn new(ring: Ring, weight: f64, origin: Origin) -> Self {
        Self {
            ring,
            weight,
            origin,
        }
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// A directed, typed fact between two token digests.
///
/// Owned exclusively by the Tank. Readers go through the accessors and must
/// not hold references across further `absorb` calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    id: EdgeId,
    source: TokenHash,
    target: TokenHash,
    relation: Relation,
    ring: Ring,
    weight: f64,
    status: EdgeStatus,
    superseded_by: Option<EdgeId>,
    provenance: Vec<Provenance>,
}

impl Edge {
    /// A fresh ACTIVE edge carrying its first contribution.
    pub(crate) fn new(
        id: EdgeId,
        source: TokenHash,
        target: TokenHash,
        relation: Relation,
        first: Provenance,
    ) -> Self {
        Self {
            id,
            source,
            target,
            relation,
            ring: first.ring,
            weight: first.weight,
            status: EdgeStatus::Active,
            superseded_by: None,
            provenance: vec![first],
        }
    }

    /// Fold a further contribution into this edge.
    ///
    /// Weight sums (saturating at `f64::MAX`), the ring only ever
    /// strengthens, provenance appends.
    pub(crate) fn merge(&mut self, contribution: Provenance) {
        self.weight = saturating_sum(self.weight, contribution.weight);
        self.ring = self.ring.stronger(contribution.ring);
        self.provenance.push(contribution);
    }

    /// Mark superseded by `rule`. Returns false if already superseded.
    pub(crate) fn supersede(&mut self, rule: EdgeId) -> bool {
        if self.status != EdgeStatus::Active {
            return false;
        }
        self.status = EdgeStatus::Superseded;
        self.superseded_by = Some(rule);
        true
    }

    #[must_use]
    pub fn id(&self) -> EdgeId {
        self.id
    }

    #[must_use]
    pub fn source(&self) -> TokenHash {
        self.source
    }

    #[must_use]
    pub fn target(&self) -> TokenHash {
        self.target
    }

    #[must_use]
    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    #[must_use]
    pub fn ring(&self) -> Ring {
        self.ring
    }

    /// Accumulated weight across all contributions.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn status(&self) -> EdgeStatus {
        self.status
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == EdgeStatus::Active
    }

    /// Rule edge that subsumed this fact, if any.
    #[must_use]
    pub fn superseded_by(&self) -> Option<EdgeId> {
        self.superseded_by
    }

    /// Every contribution, in absorption order.
    #[must_use]
    pub fn provenance(&self) -> &[Provenance] {
        &self.provenance
    }
}

/// Sum of two non-negative weights, clamped to `f64::MAX`.
pub(crate) fn saturating_sum(a: f64, b: f64) -> f64 {
    (a + b).min(f64::MAX)
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the invariant core.
///
/// The graph operations themselves are total; these cover I/O, snapshot
/// decoding, configuration and digest parsing.
#[derive(Debug, Error)]
pub enum InvariantError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// A hex digest or edge id could not be parsed.
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    /// A configuration document was rejected.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for InvariantError {
    fn from(e: std::io::Error) -> Self {
        InvariantError::Io(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
