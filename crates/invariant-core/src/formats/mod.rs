//! # Formats Module
//!
//! Binary snapshot format for the Tank. File I/O belongs to the caller;
//! everything here is a pure bytes transformation.

mod persistence;

pub use persistence::*;
