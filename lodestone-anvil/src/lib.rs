//! Anvil (`.mca`) region files.
//!
//! A region file stores up to 32x32 chunks as compressed blobs:
//! - 8 KiB header: location table + timestamp table
//! - 4 KiB sectors holding `[length:4][compression:1][data:N]` payloads
//!
//! This crate only moves bytes. What the bytes mean (chunk NBT, entity NBT)
//! is up to the caller.

mod compression;
mod header;
mod region;

pub use compression::{compress, decompress, CompressionScheme};
pub use header::{Header, Location};
pub use region::{RegionFile, RegionPos, CHUNKS_PER_REGION, HEADER_BYTES, MAX_CHUNK_SECTORS, SECTOR_BYTES};

/// Errors from region file access.
#[derive(Debug, thiserror::Error)]
pub enum AnvilError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but its header or a chunk payload is malformed.
    #[error("corrupt region data: {0}")]
    Corrupt(String),

    #[error("chunk payload of {0} bytes exceeds the region sector limit")]
    ChunkTooLarge(usize),
}

impl AnvilError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, AnvilError::Corrupt(_))
    }
}

pub type Result<T> = std::result::Result<T, AnvilError>;
