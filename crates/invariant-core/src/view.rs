//! # Layered View
//!
//! Read-only query layer over an [`OverlayGraph`] and a [`Tank`].
//!
//! Reads consult the overlay first: its local edges come back before any
//! Tank edge, and its suppressions hide matching Tank edges. Tank digests
//! are addressed by their 16-hex compact form, the overlay's address space.
//! Neither side is ever mutated.

use crate::{OverlayGraph, Relation, Ring, Tank, TokenHash};
use std::collections::BTreeMap;

/// Which layer answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Overlay,
    Tank,
}

/// One neighbor as seen through the view.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredEdge {
    pub layer: Layer,
    /// 16-hex address of the target.
    pub target: String,
    pub weight: f64,
    /// Tank edges only; overlay edges carry no relation.
    pub relation: Option<Relation>,
    /// Tank edges only.
    pub ring: Option<Ring>,
    /// Overlay edges only.
    pub doc: Option<String>,
}

/// Overlay-first view over both layers.
#[derive(Debug)]
pub struct LayeredView<'a> {
    overlay: &'a OverlayGraph,
    tank: &'a Tank,
    /// 16-hex address -> digest. On a prefix collision the smallest digest wins.
    addresses: BTreeMap<String, TokenHash>,
}

impl<'a> LayeredView<'a> {
    #[must_use]
    pub fn new(overlay: &'a OverlayGraph, tank: &'a Tank) -> Self {
        let mut addresses = BTreeMap::new();
        for node in tank.nodes() {
            addresses.entry(node.hex8()).or_insert(*node);
        }
        Self {
            overlay,
            tank,
            addresses,
        }
    }

    /// Resolve a 16-hex address to a Tank digest.
    #[must_use]
    pub fn resolve(&self, address: &str) -> Option<TokenHash> {
        self.addresses.get(address).copied()
    }

    /// All neighbors of `address`, whatever the ring.
    #[must_use]
    pub fn neighbors(&self, address: &str) -> Vec<LayeredEdge> {
        self.neighbors_at_least(address, Ring::Hypothesis)
    }

    /// Overlay edges, then unsuppressed ACTIVE Tank edges at least as strong
    /// as `max_ring`.
    #[must_use]
    pub fn neighbors_at_least(&self, address: &str, max_ring: Ring) -> Vec<LayeredEdge> {
        let mut out: Vec<LayeredEdge> = self
            .overlay
            .get_neighbors(address)
            .iter()
            .map(|e| LayeredEdge {
                layer: Layer::Overlay,
                target: e.target.clone(),
                weight: e.weight,
                relation: None,
                ring: None,
                doc: e.doc.clone(),
            })
            .collect();

        if let Some(source) = self.resolve(address) {
            for edge in self.tank.neighbors(&source, max_ring) {
                let target = edge.target().hex8();
                if self.overlay.is_suppressed(address, &target) {
                    continue;
                }
                out.push(LayeredEdge {
                    layer: Layer::Tank,
                    target,
                    weight: edge.weight(),
                    relation: Some(edge.relation().clone()),
                    ring: Some(edge.ring()),
                    doc: None,
                });
            }
        }
        out
    }

    /// [`neighbors`](Self::neighbors) addressed by digest.
    #[must_use]
    pub fn neighbors_of(&self, node: &TokenHash) -> Vec<LayeredEdge> {
        self.neighbors(&node.hex8())
    }

    /// Overlay label, then Tank label.
    #[must_use]
    pub fn label(&self, address: &str) -> Option<&'a str> {
        self.overlay.get_label(address).or_else(|| {
            self.resolve(address)
                .and_then(|hash| self.tank.label(&hash))
        })
    }

    /// Label or the address itself.
    #[must_use]
    pub fn display_label(&self, address: &str) -> String {
        self.label(address)
            .map(str::to_string)
            .unwrap_or_else(|| address.to_string())
    }
}
