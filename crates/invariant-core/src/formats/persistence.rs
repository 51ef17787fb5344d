//! # Snapshot Format
//!
//! Binary serialization for Tanks.
//!
//! Format: Header (5 bytes) + postcard-serialized Tank data.
//! - 4 bytes: Magic ("INVT")
//! - 1 byte: Version
//!
//! The size limit and the header are checked before the payload is decoded.
//! Kernel caches and adjacency indexes are not stored; they are rebuilt on
//! load, so a restored Tank answers exactly like the one it was taken from.

use crate::{InvariantError, SerializableTank, Tank, primitives};

// =============================================================================
// LIMITS
// =============================================================================

/// Largest snapshot accepted by [`tank_from_bytes`].
pub const MAX_SNAPSHOT_SIZE: usize = 500 * 1024 * 1024;

/// Header length in bytes.
pub const HEADER_LEN: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The snapshot header precedes all Tank data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), InvariantError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(InvariantError::Deserialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(InvariantError::Deserialization(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvariantError> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(InvariantError::Deserialization(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SNAPSHOT FUNCTIONS
// =============================================================================

/// Serialize a Tank to bytes (header + payload).
pub fn tank_to_bytes(tank: &Tank) -> Result<Vec<u8>, InvariantError> {
    let payload = postcard::to_stdvec(&SerializableTank::from(tank))
        .map_err(|e| InvariantError::Serialization(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&SnapshotHeader::new().to_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Deserialize a Tank from bytes.
///
/// Checks, in order: minimum length, maximum length, magic and version.
/// Only then is the payload decoded, and every edge id is recomputed from
/// its endpoints and relation before the Tank is rebuilt.
pub fn tank_from_bytes(bytes: &[u8]) -> Result<Tank, InvariantError> {
    if bytes.len() < HEADER_LEN {
        return Err(InvariantError::Deserialization(format!(
            "Data too short: minimum {HEADER_LEN} bytes required"
        )));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(InvariantError::Deserialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    SnapshotHeader::from_bytes(bytes)?.validate()?;

    let snapshot: SerializableTank = postcard::from_bytes(&bytes[HEADER_LEN..])
        .map_err(|e| InvariantError::Deserialization(format!("Failed to decode tank: {e}")))?;
    snapshot.verify()?;
    Ok(Tank::from(snapshot))
}

// =============================================================================
// TESTS
// =============================================================================
