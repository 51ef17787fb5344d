//! # Overlay
//!
//! A local, mergeable fact layer kept apart from the Tank.
//!
//! Overlays are newline-delimited JSON, one record per line:
//!
//! ```text
//! {"op":"add","src":"<addr>","tgt":"<addr>","w":1.0,"doc":"notes.md"}
//! {"op":"sub","src":"<addr>","tgt":"<addr>"}
//! {"op":"def","node":"<addr>","label":"MyTerm"}
//! ```
//!
//! Addresses are opaque strings, normally the 16-hex compact form of a token
//! digest. Loading is tolerant: blank lines, `#` comments, malformed JSON,
//! unknown ops and records with empty fields are skipped. A record without
//! `op` is an `add`.
//!
//! Nothing here reads or writes a [`Tank`](crate::Tank).

use crate::InvariantError;
use crate::primitives::{
    DEFAULT_OVERLAY_WEIGHT, GLOBAL_OVERLAY_FILE, OVERLAY_DIR, PROJECT_OVERLAY_FILE,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

// =============================================================================
// RECORDS
// =============================================================================

/// One overlay-local edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayEdge {
    pub target: String,
    pub weight: f64,
    /// Document the edge was taken from.
    pub doc: Option<String>,
}

/// Wire form of a record, used for writing.
#[derive(Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Record<'a> {
    Add {
        src: &'a str,
        tgt: &'a str,
        w: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        doc: Option<&'a str>,
    },
    Sub {
        src: &'a str,
        tgt: &'a str,
    },
    Def {
        node: &'a str,
        label: &'a str,
    },
}

/// Counts gathered while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub applied: usize,
    pub skipped: usize,
}

// =============================================================================
// OVERLAY GRAPH
// =============================================================================

/// In-memory overlay.
///
/// Equality compares edges, suppressions and labels. `sources` records
/// which files contributed and is not part of the file format.
#[derive(Debug, Clone, Default)]
pub struct OverlayGraph {
    /// source -> edges, in insertion order
    edges: BTreeMap<String, Vec<OverlayEdge>>,
    /// Hidden (source, target) pairs
    suppressed: BTreeSet<(String, String)>,
    /// address -> label
    labels: BTreeMap<String, String>,
    /// Files merged into this overlay
    sources: BTreeSet<String>,
}

impl PartialEq for OverlayGraph {
    fn eq(&self, other: &Self) -> bool {
        self.edges == other.edges
            && self.suppressed == other.suppressed
            && self.labels == other.labels
    }
}

impl OverlayGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Load an overlay file.
    ///
    /// A missing file yields an empty overlay with no recorded source. Other
    /// I/O failures propagate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InvariantError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "overlay not found, using empty overlay");
                return Ok(Self::new());
            }
            Err(e) => return Err(InvariantError::Io(format!("{}: {e}", path.display()))),
        };

        let mut graph = Self::new();
        let summary = graph.read_from(BufReader::new(file))?;
        graph.sources.insert(path.display().to_string());
        tracing::info!(
            path = %path.display(),
            applied = summary.applied,
            skipped = summary.skipped,
            "overlay loaded"
        );
        Ok(graph)
    }

    /// Load several overlays in priority order; later files win on labels.
    ///
    /// Missing files are skipped.
    pub fn load_cascade<P: AsRef<Path>>(paths: &[P]) -> Result<Self, InvariantError> {
        let mut graph = Self::new();
        for path in paths {
            if path.as_ref().exists() {
                graph.merge(Self::load(path)?);
            }
        }
        Ok(graph)
    }

    /// Parse overlay text.
    #[must_use]
    pub fn from_jsonl(content: &str) -> Self {
        let mut graph = Self::new();
        for line in content.lines() {
            graph.apply_line(line);
        }
        graph
    }

    /// Apply every record from `reader`. Lines that are not UTF-8 are
    /// skipped like any other malformed line.
    pub fn read_from(&mut self, reader: impl BufRead) -> Result<LoadSummary, InvariantError> {
        let mut summary = LoadSummary::default();
        for line in reader.split(b'\n') {
            let bytes = line?;
            let applied = match std::str::from_utf8(&bytes) {
                Ok(text) => self.apply_line(text),
                Err(_) => Some(false),
            };
            match applied {
                Some(true) => summary.applied += 1,
                Some(false) => summary.skipped += 1,
                None => {}
            }
        }
        Ok(summary)
    }

    /// Apply one line. `None` for blank and comment lines, otherwise whether
    /// the record changed anything.
    fn apply_line(&mut self, line: &str) -> Option<bool> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let applied = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(entry)) => self.apply_entry(&entry),
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed overlay line");
                false
            }
        };
        Some(applied)
    }

    fn apply_entry(&mut self, entry: &serde_json::Map<String, Value>) -> bool {
        let text = |key: &str| entry.get(key).and_then(Value::as_str).unwrap_or("");
        let op = match entry.get("op") {
            None => "add",
            Some(Value::String(op)) => op.as_str(),
            Some(_) => return false,
        };

        match op {
            "add" => {
                let (src, tgt) = (text("src"), text("tgt"));
                let Some(weight) = parse_weight(entry.get("w")) else {
                    tracing::debug!(src, tgt, "skipping overlay edge with invalid weight");
                    return false;
                };
                if src.is_empty() || tgt.is_empty() {
                    return false;
                }
                let doc = entry.get("doc").and_then(Value::as_str);
                self.add_edge(src, tgt, weight, doc)
            }
            "sub" => {
                let (src, tgt) = (text("src"), text("tgt"));
                if src.is_empty() || tgt.is_empty() {
                    return false;
                }
                self.suppress_edge(src, tgt);
                true
            }
            "def" => {
                let (node, label) = (text("node"), text("label"));
                if node.is_empty() || label.is_empty() {
                    return false;
                }
                self.define_label(node, label);
                true
            }
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Saving
    // -------------------------------------------------------------------------

    /// Write every `add`, then `sub`, then `def` record. Parent directories
    /// are created as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), InvariantError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        tracing::info!(
            path = %path.display(),
            edges = self.edge_count(),
            suppressed = self.suppressed.len(),
            labels = self.labels.len(),
            "overlay saved"
        );
        Ok(())
    }

    /// Serialize to any writer in file order.
    pub fn write_to(&self, mut writer: impl Write) -> Result<(), InvariantError> {
        let mut emit = |record: &Record<'_>| -> Result<(), InvariantError> {
            serde_json::to_writer(&mut writer, record)
                .map_err(|e| InvariantError::Serialization(e.to_string()))?;
            writer.write_all(b"\n")?;
            Ok(())
        };

        for (src, edge) in self.edges() {
            emit(&Record::Add {
                src,
                tgt: &edge.target,
                w: edge.weight,
                doc: edge.doc.as_deref(),
            })?;
        }
        for (src, tgt) in &self.suppressed {
            emit(&Record::Sub { src, tgt })?;
        }
        for (node, label) in &self.labels {
            emit(&Record::Def { node, label })?;
        }
        Ok(())
    }

    /// Render to a string in file order.
    pub fn to_jsonl(&self) -> Result<String, InvariantError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| InvariantError::Serialization(e.to_string()))
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Fold `other` in: edges concatenate, suppressions and sources union,
    /// labels from `other` overwrite.
    pub fn merge(&mut self, other: OverlayGraph) {
        for (src, list) in other.edges {
            self.edges.entry(src).or_default().extend(list);
        }
        self.suppressed.extend(other.suppressed);
        self.labels.extend(other.labels);
        self.sources.extend(other.sources);
    }

    /// Add a local edge. Empty `doc` is stored as none.
    ///
    /// Non-finite weights have no JSON form and are refused; returns whether
    /// the edge was added.
    pub fn add_edge(&mut self, src: &str, tgt: &str, weight: f64, doc: Option<&str>) -> bool {
        if !weight.is_finite() {
            tracing::debug!(src, tgt, weight, "refusing overlay edge with non-finite weight");
            return false;
        }
        self.edges.entry(src.to_string()).or_default().push(OverlayEdge {
            target: tgt.to_string(),
            weight,
            doc: doc.filter(|d| !d.is_empty()).map(str::to_string),
        });
        true
    }

    /// Hide `src → tgt` from layered reads.
    pub fn suppress_edge(&mut self, src: &str, tgt: &str) {
        self.suppressed.insert((src.to_string(), tgt.to_string()));
    }

    pub fn define_label(&mut self, node: &str, label: &str) {
        self.labels.insert(node.to_string(), label.to_string());
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Overlay-local edges from `src`.
    #[must_use]
    pub fn get_neighbors(&self, src: &str) -> &[OverlayEdge] {
        self.edges.get(src).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn get_label(&self, node: &str) -> Option<&str> {
        self.labels.get(node).map(String::as_str)
    }

    /// Advisory; the overlay itself never hides its own edges.
    #[must_use]
    pub fn is_suppressed(&self, src: &str, tgt: &str) -> bool {
        self.suppressed
            .contains(&(src.to_string(), tgt.to_string()))
    }

    /// Sources with at least one local edge.
    pub fn all_sources(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Every `(source, edge)` pair in file order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &OverlayEdge)> {
        self.edges
            .iter()
            .flat_map(|(src, list)| list.iter().map(move |e| (src.as_str(), e)))
    }

    pub fn suppressions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.suppressed
            .iter()
            .map(|(s, t)| (s.as_str(), t.as_str()))
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(n, l)| (n.as_str(), l.as_str()))
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Distinct sources and targets of local edges.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut nodes: BTreeSet<&str> = self.edges.keys().map(String::as_str).collect();
        for list in self.edges.values() {
            nodes.extend(list.iter().map(|e| e.target.as_str()));
        }
        nodes.len()
    }

    #[must_use]
    pub fn sources(&self) -> &BTreeSet<String> {
        &self.sources
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.suppressed.is_empty() && self.labels.is_empty()
    }
}

/// `w` defaults to 1.0; numbers and numeric strings are accepted.
fn parse_weight(value: Option<&Value>) -> Option<f64> {
    let weight = match value {
        None | Some(Value::Null) => DEFAULT_OVERLAY_WEIGHT,
        Some(Value::Number(n)) => n.as_f64()?,
        Some(Value::String(s)) => s.trim().parse::<f64>().ok()?,
        Some(_) => return None,
    };
    weight.is_finite().then_some(weight)
}

// =============================================================================
// DISCOVERY
// =============================================================================

/// Standard overlay locations, lowest priority first.
///
/// The user-wide file under `home` comes first, then the nearest project
/// overlay found walking up from `start_dir`. Only existing files are
/// returned, ready for [`OverlayGraph::load_cascade`].
#[must_use]
pub fn find_overlays(start_dir: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = home {
        let global = home.join(OVERLAY_DIR).join(GLOBAL_OVERLAY_FILE);
        if global.is_file() {
            paths.push(global);
        }
    }

    let start = start_dir
        .canonicalize()
        .unwrap_or_else(|_| start_dir.to_path_buf());
    for dir in start.ancestors() {
        let local = dir.join(OVERLAY_DIR).join(PROJECT_OVERLAY_FILE);
        if local.is_file() {
            paths.push(local);
            break;
        }
    }
    paths
}

// =============================================================================
// TESTS
// =============================================================================
