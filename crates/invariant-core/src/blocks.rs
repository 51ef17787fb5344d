//! # Block Source
//!
//! Read contract for the external store of raw document blocks that facts
//! are extracted from. The core never writes blocks; ingestion does.
//!
//! All methods return `Result<T, InvariantError>` so in-memory and
//! persistent backends implement the trait uniformly.

use crate::InvariantError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored block of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    /// Text as shown to readers.
    pub text: String,
    /// Normalized content fed to extraction.
    pub content: String,
    /// Document the block belongs to.
    pub source: String,
    /// Position inside `source`.
    pub position: u64,
    #[serde(default)]
    pub timestamp: String,
}

/// Read access to a block store.
pub trait BlockSource {
    /// Whether a block with this id is stored.
    fn exists(&self, id: &str) -> Result<bool, InvariantError>;

    /// Fetch one block.
    fn get(&self, id: &str) -> Result<Option<Block>, InvariantError>;

    /// Every block, ordered by source then position.
    fn get_all(&self) -> Result<Vec<Block>, InvariantError>;

    /// Blocks of one document, ordered by position.
    fn get_by_source(&self, source: &str) -> Result<Vec<Block>, InvariantError>;
}

/// In-memory block store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockSource {
    blocks: BTreeMap<String, Block>,
}

impl MemoryBlockSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a block by id.
    pub fn insert(&mut self, block: Block) {
        self.blocks.insert(block.id.clone(), block);
    }

    /// Drop every block of `source`, returning how many were removed.
    pub fn remove_by_source(&mut self, source: &str) -> usize {
        let before = self.blocks.len();
        self.blocks.retain(|_, b| b.source != source);
        before - self.blocks.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockSource for MemoryBlockSource {
    fn exists(&self, id: &str) -> Result<bool, InvariantError> {
        Ok(self.blocks.contains_key(id))
    }

    fn get(&self, id: &str) -> Result<Option<Block>, InvariantError> {
        Ok(self.blocks.get(id).cloned())
    }

    fn get_all(&self) -> Result<Vec<Block>, InvariantError> {
        let mut all: Vec<Block> = self.blocks.values().cloned().collect();
        all.sort_by(|a, b| (&a.source, a.position, &a.id).cmp(&(&b.source, b.position, &b.id)));
        Ok(all)
    }

    fn get_by_source(&self, source: &str) -> Result<Vec<Block>, InvariantError> {
        let mut matching: Vec<Block> = self
            .blocks
            .values()
            .filter(|b| b.source == source)
            .cloned()
            .collect();
        matching.sort_by(|a, b| (a.position, &a.id).cmp(&(b.position, &b.id)));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, source: &str, position: u64) -> Block {
        Block {
            id: id.to_string(),
            text: format!("text {id}"),
            content: format!("content {id}"),
            source: source.to_string(),
            position,
            timestamp: String::new(),
        }
    }

    fn store() -> MemoryBlockSource {
        let mut store = MemoryBlockSource::new();
        store.insert(block("z1", "b.md", 0));
        store.insert(block("a2", "a.md", 1));
        store.insert(block("a1", "a.md", 0));
        store
    }

    #[test]
    fn exists_and_get() {
        let store = store();
        assert!(store.exists("a1").expect("exists"));
        assert!(!store.exists("nope").expect("exists"));
        assert_eq!(store.get("z1").expect("get").expect("block").source, "b.md");
        assert!(store.get("nope").expect("get").is_none());
    }

    #[test]
    fn get_all_orders_by_source_then_position() {
        let ids: Vec<String> = store()
            .get_all()
            .expect("all")
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec!["a1", "a2", "z1"]);
    }

    #[test]
    fn get_by_source_filters() {
        let store = store();
        let a = store.get_by_source("a.md").expect("by source");
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].position, 0);
        assert!(store.get_by_source("c.md").expect("by source").is_empty());
    }

    #[test]
    fn insert_replaces_and_remove_by_source() {
        let mut store = store();
        let mut replacement = block("a1", "a.md", 5);
        replacement.text = "edited".to_string();
        store.insert(replacement);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get("a1").expect("get").expect("block").text, "edited");

        assert_eq!(store.remove_by_source("a.md"), 2);
        assert_eq!(store.len(), 1);
    }
}
