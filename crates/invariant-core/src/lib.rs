//! # invariant-core
//!
//! Content-addressed, truth-maintaining knowledge graph engine.
//!
//! Facts are typed, directed edges between token digests. Every edge has a
//! deterministic identity, a truth level ([`Ring`]), an accumulated weight,
//! a lifecycle status and a complete provenance trail.
//!
//! ## Components
//!
//! - [`kernel`]: Merkle identity for tokens and edges
//! - [`Tank`]: the fact store
//! - [`Reactor`]: transitive closure, similarity hypotheses and compaction over a Tank
//! - [`OverlayGraph`]: local, mergeable facts kept apart from the Tank
//! - [`LayeredView`]: overlay-first reads across both
//!
//! ## Architectural Constraints
//!
//! - Synchronous and in-memory; only overlay load/save and config loading
//!   touch the filesystem
//! - Deterministic: `BTreeMap`/`BTreeSet` only, no randomness
//! - Edges are never deleted; compaction only changes status
//! - The Tank is mutated through `&mut`; callers sharing one across threads
//!   wrap it in a `Mutex`
//!
//! ## Example
//!
//! ```
//! use invariant_core::{Origin, Reactor, Relation, Ring, Tank};
//!
//! let mut tank = Tank::new();
//! tank.absorb("cat", "animal", "IMP", 1.0, Ring::Observed, Origin::observation("zoo.txt"));
//! tank.absorb("animal", "living", "IMP", 1.0, Ring::Observed, Origin::observation("bio.txt"));
//!
//! let mut reactor = Reactor::default();
//! let report = reactor.run_to_fixed_point(&mut tank);
//! assert_eq!(report.added, 1);
//!
//! let why = reactor
//!     .explain_tokens(&tank, "cat", "living", &Relation::Implication)
//!     .expect("derived");
//! assert_eq!(why.ring, Ring::Derived);
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod blocks;
pub mod config;
pub mod formats;
pub mod kernel;
pub mod overlay;
pub mod primitives;
pub mod reactor;
pub mod tank;
pub mod types;
pub mod view;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Edge, EdgeId, EdgeStatus, InvariantError, Origin, Provenance, ProvenanceKind, Relation, Ring,
    TokenHash,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use blocks::{Block, BlockSource, MemoryBlockSource};
pub use config::{InvariantConfig, KernelConfig, ReactorConfig};
pub use kernel::{
    Kernel, MerkleNode, TokenCache, bond_id, edge_id, encode, get_token_hash, get_token_hash_hex,
    get_token_hash8, get_token_hash8_hex, get_token_hash16, get_token_hash16_hex,
    token_hash_lossy,
};
pub use overlay::{LoadSummary, OverlayEdge, OverlayGraph, find_overlays};
pub use reactor::{
    ClosureReport, CompactionReport, CycleReport, Explanation, HypothesisReport, Reactor,
};
pub use tank::{SerializableTank, Tank, TankStats};
pub use view::{Layer, LayeredEdge, LayeredView};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{SnapshotHeader, tank_from_bytes, tank_to_bytes};
