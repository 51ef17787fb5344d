//! # Merkle Identity Kernel
//!
//! Deterministic identity for tokens and edges.
//!
//! ## Token identity
//!
//! A token's UTF-8 bytes are encoded as a binary tree built from two
//! primitives, the Origin leaf and the Dyad combinator:
//!
//! ```text
//! byte  := fold over bits 0..8 (LSB first): chain = Dyad(bit, chain), chain₀ = Origin
//!          where bit 0 = Origin, bit 1 = Dyad(Origin, Origin)
//! token := fold over bytes in reverse:       chain = Dyad(byte, chain), chain₀ = Origin
//! ```
//!
//! and hashed bottom-up:
//!
//! ```text
//! H(Origin)     = SHA256(0x00)
//! H(Dyad(l, r)) = SHA256(0x01 || H(l) || H(r))
//! ```
//!
//! ## Edge identity
//!
//! `bond_id(u, v, rel)` is the first 8 bytes of `SHA256("u:rel:v")`, hashed
//! directly over the composed string. When `u` and `v` are token digests
//! they enter as 64-char lowercase hex.
//!
//! Both paths are bit-exact contracts: identifiers produced elsewhere must
//! keep resolving to the same facts.

use crate::config::KernelConfig;
use crate::primitives::{DYAD_TAG, EDGE_ID_LEN, ORIGIN_TAG, TOKEN_HASH_LEN};
use crate::{EdgeId, Relation, TokenHash};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, OnceLock};

// =============================================================================
// HASH PRIMITIVES
// =============================================================================

/// `SHA256(0x00)`.
#[must_use]
pub fn origin_digest() -> TokenHash {
    let mut hasher = Sha256::new();
    hasher.update([ORIGIN_TAG]);
    TokenHash(hasher.finalize().into())
}

/// `SHA256(0x01 || left || right)`.
#[must_use]
pub fn dyad_digest(left: &TokenHash, right: &TokenHash) -> TokenHash {
    let mut hasher = Sha256::new();
    hasher.update([DYAD_TAG]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    TokenHash(hasher.finalize().into())
}

/// Digest of a single byte's 8-level bit chain.
fn byte_digest(byte: u8, origin: &TokenHash, one: &TokenHash) -> TokenHash {
    let mut chain = *origin;
    for i in 0..8 {
        let bit = if (byte >> i) & 1 == 0 { origin } else { one };
        chain = dyad_digest(bit, &chain);
    }
    chain
}

// =============================================================================
// STRUCTURAL TREE
// =============================================================================

/// A node of the structural token tree.
///
/// Dyads memoize their digest on first computation. Nodes are shared through
/// `Arc`, so the per-node cache survives across every tree that reuses them.
#[derive(Debug)]
pub enum MerkleNode {
    /// The zero-information leaf.
    Origin,
    /// Binary combinator.
    Dyad {
        left: Arc<MerkleNode>,
        right: Arc<MerkleNode>,
        digest: OnceLock<TokenHash>,
    },
}

impl MerkleNode {
    /// A fresh Origin leaf.
    #[must_use]
    pub fn origin() -> Arc<Self> {
        Arc::new(MerkleNode::Origin)
    }

    /// Combine two nodes.
    #[must_use]
    pub fn dyad(left: Arc<MerkleNode>, right: Arc<MerkleNode>) -> Arc<Self> {
        Arc::new(MerkleNode::Dyad {
            left,
            right,
            digest: OnceLock::new(),
        })
    }

    #[must_use]
    pub fn is_origin(&self) -> bool {
        matches!(self, MerkleNode::Origin)
    }

    /// Merkle digest of this subtree.
    ///
    /// Iterative post-order walk; token trees are as deep as the token is
    /// long, so recursion is not an option.
    #[must_use]
    pub fn digest(&self) -> TokenHash {
        let origin = origin_digest();
        let mut stack: Vec<(&MerkleNode, bool)> = vec![(self, false)];
        let mut values: Vec<TokenHash> = Vec::new();

        while let Some((node, expanded)) = stack.pop() {
            match node {
                MerkleNode::Origin => values.push(origin),
                MerkleNode::Dyad {
                    left,
                    right,
                    digest,
                } => {
                    if let Some(cached) = digest.get() {
                        values.push(*cached);
                    } else if expanded {
                        let (Some(r), Some(l)) = (values.pop(), values.pop()) else {
                            break;
                        };
                        let computed = *digest.get_or_init(|| dyad_digest(&l, &r));
                        values.push(computed);
                    } else {
                        stack.push((node, true));
                        stack.push((right, false));
                        stack.push((left, false));
                    }
                }
            }
        }

        values.pop().unwrap_or(origin)
    }
}

impl Drop for MerkleNode {
    /// Tears the tree down with an explicit work list; the derived drop
    /// would recurse once per byte of the token.
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(child) = pending.pop() {
            if let Some(mut node) = Arc::into_inner(child) {
                detach_children(&mut node, &mut pending);
            }
        }
    }
}

/// Move a Dyad's non-leaf children onto `pending`, leaving shared leaves.
fn detach_children(node: &mut MerkleNode, pending: &mut Vec<Arc<MerkleNode>>) {
    if let MerkleNode::Dyad { left, right, .. } = node {
        for child in [left, right] {
            if !child.is_origin() {
                pending.push(std::mem::replace(child, shared_leaf()));
            }
        }
    }
}

fn shared_leaf() -> Arc<MerkleNode> {
    static LEAF: OnceLock<Arc<MerkleNode>> = OnceLock::new();
    Arc::clone(LEAF.get_or_init(MerkleNode::origin))
}

/// Build the structural tree for `token`.
///
/// Hashing through [`MerkleNode::digest`] equals [`get_token_hash`]; the
/// tree form exists for inspection and memoized re-hashing.
#[must_use]
pub fn encode(token: &str) -> Arc<MerkleNode> {
    encode_bytes(token.as_bytes())
}

/// Build the structural tree for raw bytes.
#[must_use]
pub fn encode_bytes(bytes: &[u8]) -> Arc<MerkleNode> {
    let origin = MerkleNode::origin();
    let one = MerkleNode::dyad(Arc::clone(&origin), Arc::clone(&origin));
    let mut byte_trees: BTreeMap<u8, Arc<MerkleNode>> = BTreeMap::new();

    let mut chain = Arc::clone(&origin);
    for &b in bytes.iter().rev() {
        let tree = byte_trees
            .entry(b)
            .or_insert_with(|| {
                let mut c = Arc::clone(&origin);
                for i in 0..8 {
                    let bit = if (b >> i) & 1 == 0 {
                        Arc::clone(&origin)
                    } else {
                        Arc::clone(&one)
                    };
                    c = MerkleNode::dyad(bit, c);
                }
                c
            })
            .clone();
        chain = MerkleNode::dyad(tree, chain);
    }
    chain
}

// =============================================================================
// STATELESS IDENTITY FUNCTIONS
// =============================================================================

fn fold_bytes(bytes: &[u8], byte_digest_of: impl Fn(u8) -> TokenHash) -> TokenHash {
    let mut chain = origin_digest();
    for &b in bytes.iter().rev() {
        chain = dyad_digest(&byte_digest_of(b), &chain);
    }
    chain
}

/// Canonical 32-byte identity of a token.
#[must_use]
pub fn get_token_hash(token: &str) -> TokenHash {
    let origin = origin_digest();
    let one = dyad_digest(&origin, &origin);
    fold_bytes(token.as_bytes(), |b| byte_digest(b, &origin, &one))
}

/// Identity of arbitrary bytes; invalid UTF-8 is replaced with U+FFFD first.
#[must_use]
pub fn token_hash_lossy(bytes: &[u8]) -> TokenHash {
    get_token_hash(&String::from_utf8_lossy(bytes))
}

/// 64-character hex identity.
#[must_use]
pub fn get_token_hash_hex(token: &str) -> String {
    get_token_hash(token).to_hex()
}

/// 16-byte compact address.
#[must_use]
pub fn get_token_hash16(token: &str) -> [u8; 16] {
    get_token_hash(token).prefix16()
}

/// 32-character hex compact address.
#[must_use]
pub fn get_token_hash16_hex(token: &str) -> String {
    get_token_hash(token).hex16()
}

/// 8-byte compact address.
#[must_use]
pub fn get_token_hash8(token: &str) -> [u8; 8] {
    get_token_hash(token).prefix8()
}

/// 16-character hex compact address.
#[must_use]
pub fn get_token_hash8_hex(token: &str) -> String {
    get_token_hash(token).hex8()
}

/// Edge identity over raw strings: first 8 bytes of `SHA256("u:rel:v")`.
#[must_use]
pub fn bond_id_bytes(u: &str, v: &str, relation: &str) -> EdgeId {
    let mut hasher = Sha256::new();
    hasher.update(u.as_bytes());
    hasher.update(b":");
    hasher.update(relation.as_bytes());
    hasher.update(b":");
    hasher.update(v.as_bytes());
    let full: [u8; TOKEN_HASH_LEN] = hasher.finalize().into();
    let mut id = [0u8; EDGE_ID_LEN];
    id.copy_from_slice(&full[..EDGE_ID_LEN]);
    EdgeId(id)
}

/// Edge identity as 16 hex chars.
#[must_use]
pub fn bond_id(u: &str, v: &str, relation: &str) -> String {
    bond_id_bytes(u, v, relation).to_hex()
}

/// Edge identity between two token digests.
#[must_use]
pub fn edge_id(source: &TokenHash, target: &TokenHash, relation: &Relation) -> EdgeId {
    bond_id_bytes(&source.to_hex(), &target.to_hex(), relation.as_str())
}

// =============================================================================
// TOKEN CACHE
// =============================================================================

/// Explicit token → digest cache.
///
/// Bounded caches evict in insertion order. A capacity of `None` never
/// evicts; `Some(0)` never stores.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    capacity: Option<usize>,
    entries: BTreeMap<String, TokenHash>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl TokenCache {
    /// Create a cache holding at most `capacity` tokens.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Create a cache that never evicts.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Look up a token, counting the hit or miss.
    pub fn get(&mut self, token: &str) -> Option<TokenHash> {
        let found = self.entries.get(token).copied();
        if found.is_some() {
            self.hits = self.hits.saturating_add(1);
        } else {
            self.misses = self.misses.saturating_add(1);
        }
        found
    }

    /// Store a digest, evicting the oldest entry when full.
    pub fn insert(&mut self, token: &str, hash: TokenHash) {
        if self.capacity == Some(0) || self.entries.contains_key(token) {
            return;
        }
        if let Some(cap) = self.capacity {
            while self.entries.len() >= cap {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(token.to_string(), hash);
        self.order.push_back(token.to_string());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// `(hits, misses)` since creation or the last `clear`.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

// =============================================================================
// KERNEL
// =============================================================================

/// Identity kernel with a precomputed byte table and an owned token cache.
///
/// Produces exactly the digests of the stateless functions above; the
/// cache only saves work.
#[derive(Clone)]
pub struct Kernel {
    byte_table: Vec<TokenHash>,
    cache: TokenCache,
}

impl Kernel {
    /// Kernel with the default bounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&KernelConfig::default())
    }

    /// Kernel configured from `config`.
    #[must_use]
    pub fn with_config(config: &KernelConfig) -> Self {
        let cache = match config.cache_capacity {
            Some(cap) => TokenCache::bounded(cap),
            None => TokenCache::unbounded(),
        };
        Self::with_cache(cache)
    }

    /// Kernel using a caller-supplied cache.
    #[must_use]
    pub fn with_cache(cache: TokenCache) -> Self {
        let origin = origin_digest();
        let one = dyad_digest(&origin, &origin);
        let byte_table = (0..=u8::MAX)
            .map(|b| byte_digest(b, &origin, &one))
            .collect();
        Self { byte_table, cache }
    }

    /// Canonical identity of `token`, served from the cache when possible.
    pub fn token_hash(&mut self, token: &str) -> TokenHash {
        if let Some(hit) = self.cache.get(token) {
            return hit;
        }
        let table = &self.byte_table;
        let hash = fold_bytes(token.as_bytes(), |b| {
            table.get(b as usize).copied().unwrap_or_else(origin_digest)
        });
        self.cache.insert(token, hash);
        hash
    }

    /// Identity of raw bytes with U+FFFD replacement.
    pub fn token_hash_lossy(&mut self, bytes: &[u8]) -> TokenHash {
        let token = String::from_utf8_lossy(bytes);
        self.token_hash(&token)
    }

    /// Edge identity between two digests.
    #[must_use]
    pub fn edge_id(&self, source: &TokenHash, target: &TokenHash, relation: &Relation) -> EdgeId {
        edge_id(source, target, relation)
    }

    #[must_use]
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("cache_len", &self.cache.len())
            .field("cache_capacity", &self.cache.capacity())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_origin() {
        assert_eq!(get_token_hash(""), origin_digest());
        assert_eq!(
            get_token_hash_hex(""),
            "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d"
        );
    }

    #[test]
    fn known_token_vectors() {
        assert_eq!(
            get_token_hash_hex("a"),
            "174da782660acc5b57d55f9701cb24fc61c3ebec92258ee51c7408f13be1a7de"
        );
        assert_eq!(
            get_token_hash_hex("cat"),
            "65c6195c11392d7928f3c7360ede46015e628ecf1f2d28b233c09492e349abb6"
        );
        assert_eq!(
            get_token_hash_hex("intelligence"),
            "f81ca00946d52a4dda4bb795aabb39d7141abe4eafa8939a508b5e5940f42526"
        );
        assert_eq!(
            get_token_hash_hex("héllo"),
            "8b56138f541bb629e764f5cc4f0c0541d8484b109b1a87ece50b4da93676c6a7"
        );
    }

    #[test]
    fn known_bond_vectors() {
        assert_eq!(bond_id("A", "B", "IMP"), "f409703cb721fa44");
        assert_eq!(bond_id("B", "A", "IMP"), "642a8f0a45967890");

        let cat = get_token_hash("cat");
        let animal = get_token_hash("animal");
        assert_eq!(
            edge_id(&cat, &animal, &Relation::Implication).to_hex(),
            "fdd3988f19af1945"
        );
    }

    #[test]
    fn prefix_variants_agree() {
        let full = get_token_hash_hex("intelligence");
        assert_eq!(get_token_hash16_hex("intelligence"), full[..32]);
        assert_eq!(get_token_hash8_hex("intelligence"), full[..16]);
        assert_eq!(
            get_token_hash16("intelligence")[..8],
            get_token_hash8("intelligence")
        );
    }

    #[test]
    fn lossy_bytes_use_replacement_character() {
        let replaced = token_hash_lossy(&[0xff]);
        assert_eq!(replaced, get_token_hash("\u{FFFD}"));
        assert_eq!(
            replaced.to_hex(),
            "d9324298ddaf47bfeed37108e53e9f8a05858d2b83bf1800bbba8982701e105e"
        );
        assert_eq!(token_hash_lossy(b"cat"), get_token_hash("cat"));
    }

    #[test]
    fn structural_tree_matches_fast_path() {
        for token in ["", "a", "cat", "héllo", "machine_learning"] {
            let tree = encode(token);
            assert_eq!(tree.digest(), get_token_hash(token), "token {token:?}");
        }
    }

    #[test]
    fn structural_digest_is_memoized() {
        let tree = encode("memo");
        let first = tree.digest();
        if let MerkleNode::Dyad { digest, .. } = tree.as_ref() {
            assert_eq!(digest.get(), Some(&first));
        }
        assert_eq!(tree.digest(), first);
        assert!(encode("").is_origin());
    }

    #[test]
    fn long_token_tree_builds_hashes_and_drops() {
        let token = "x".repeat(1 << 20);
        let tree = encode(&token);
        assert_eq!(tree.digest(), get_token_hash(&token));
        drop(tree);

        let shared = encode("shared");
        let alias = Arc::clone(&shared);
        drop(shared);
        assert_eq!(alias.digest(), get_token_hash("shared"));
    }

    #[test]
    fn kernel_matches_stateless_functions() {
        let mut kernel = Kernel::new();
        for token in ["", "x", "Socrates", "Mortal", "ünïcödé"] {
            assert_eq!(kernel.token_hash(token), get_token_hash(token));
        }
        assert_eq!(kernel.token_hash_lossy(&[0xff]), token_hash_lossy(&[0xff]));
    }

    #[test]
    fn kernel_cache_hits_on_repeat() {
        let mut kernel = Kernel::with_cache(TokenCache::unbounded());
        let first = kernel.token_hash("cat");
        let second = kernel.token_hash("cat");
        assert_eq!(first, second);
        assert_eq!(kernel.cache().stats(), (1, 1));
        assert_eq!(kernel.cache().len(), 1);
    }

    #[test]
    fn bounded_cache_evicts_oldest() {
        let mut cache = TokenCache::bounded(2);
        cache.insert("a", get_token_hash("a"));
        cache.insert("b", get_token_hash("b"));
        cache.insert("c", get_token_hash("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn zero_capacity_cache_never_stores() {
        let mut kernel = Kernel::with_cache(TokenCache::bounded(0));
        let _ = kernel.token_hash("cat");
        assert!(kernel.cache().is_empty());
        assert_eq!(kernel.token_hash("cat"), get_token_hash("cat"));
    }
}
