//! # Innate Primitives
//!
//! Hardcoded runtime constants for the invariant CORE.
//!
//! These values are part of the identity contract: changing any of the
//! hashing constants changes every token digest and edge id ever produced.

// =============================================================================
// IDENTITY
// =============================================================================

/// Domain byte hashed alone to produce the Origin (leaf) digest.
pub const ORIGIN_TAG: u8 = 0x00;

/// Domain byte prefixed to `left || right` when hashing a Dyad.
pub const DYAD_TAG: u8 = 0x01;

/// Length in bytes of a full token digest.
pub const TOKEN_HASH_LEN: usize = 32;

/// Length in bytes of the 16-byte compact address (32 hex chars).
pub const TOKEN_HASH16_LEN: usize = 16;

/// Length in bytes of the 8-byte compact address (16 hex chars).
pub const TOKEN_HASH8_LEN: usize = 8;

/// Length in bytes of an edge id (16 hex chars).
///
/// Truncation trades collision resistance for compact addresses; widening it
/// would orphan every previously computed id.
pub const EDGE_ID_LEN: usize = 8;

/// Default number of token digests the kernel cache keeps.
pub const DEFAULT_TOKEN_CACHE_CAPACITY: usize = 65_536;

// =============================================================================
// RELATION VOCABULARY
// =============================================================================

/// Implication. The only relation that composes under closure.
pub const REL_IMPLICATION: &str = "IMP";

/// Contradiction.
pub const REL_CONTRADICTION: &str = "NOT";

/// Identity.
pub const REL_IDENTITY: &str = "EQUALS";

/// Conditional gate.
pub const REL_GATE: &str = "GATE";

/// Pending classification.
pub const REL_UNCLASSIFIED: &str = "OMEGA";

// =============================================================================
// CLOSURE
// =============================================================================

/// Multiplier applied to the weaker antecedent weight of a derived edge.
///
/// `w(A→C) = min(w(A→B), w(B→C)) * DERIVATION_DECAY`
pub const DERIVATION_DECAY: f64 = 0.9;

/// Default upper bound on passes for `Reactor::run_to_fixed_point`.
pub const DEFAULT_MAX_PASSES: usize = 64;

// =============================================================================
// SIMILARITY HYPOTHESES
// =============================================================================

/// Hypothesis weight is the Jaccard similarity times this factor.
pub const HYPOTHESIS_SIMILARITY_SCALE: f64 = 0.5;

/// Most hypotheses a single `Reactor::cycle_mendeleev` pass may add.
pub const MAX_HYPOTHESES_PER_CYCLE: usize = 20;

/// Suggested Jaccard threshold for `Reactor::cycle_mendeleev`.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.4;

/// Suggested minimum signature size for `Reactor::cycle_mendeleev`.
pub const DEFAULT_MIN_NEIGHBORS: usize = 2;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Magic bytes for the Tank snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"INVT";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// OVERLAY
// =============================================================================

/// Weight assigned to overlay `add` records that omit `w`.
pub const DEFAULT_OVERLAY_WEIGHT: f64 = 1.0;

/// Directory holding overlay files, under the home or a project root.
pub const OVERLAY_DIR: &str = ".invariant";

/// User-wide overlay file name inside [`OVERLAY_DIR`].
pub const GLOBAL_OVERLAY_FILE: &str = "global.overlay.jsonl";

/// Project overlay file name inside [`OVERLAY_DIR`].
pub const PROJECT_OVERLAY_FILE: &str = "overlay.jsonl";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_id_is_sixteen_hex_chars() {
        assert_eq!(EDGE_ID_LEN * 2, 16);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"INVT");
    }

    #[test]
    fn reserved_relations_are_distinct() {
        let all = [
            REL_IMPLICATION,
            REL_CONTRADICTION,
            REL_IDENTITY,
            REL_GATE,
            REL_UNCLASSIFIED,
        ];
        let unique: std::collections::BTreeSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }
}
