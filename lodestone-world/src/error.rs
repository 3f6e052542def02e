use std::fmt;

use crate::pos::ChunkPos;

/// Which chunk-scoped value an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Chunk,
    Entities,
    BlockEntities,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataKind::Chunk => "chunk",
            DataKind::Entities => "entities",
            DataKind::BlockEntities => "block entities",
        })
    }
}

/// Failure of a fallible provider operation.
///
/// Absence is never an error: a chunk that was never saved loads as
/// `Ok(None)`, an entity set as `Ok(vec![])`.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data existed but could not be reconstructed.
    #[error("corrupt {kind} data at {pos}: {reason}")]
    Corrupt {
        pos: ChunkPos,
        kind: DataKind,
        reason: String,
    },

    #[error("failed to encode {kind} at {pos}: {reason}")]
    Encode {
        pos: ChunkPos,
        kind: DataKind,
        reason: String,
    },

    /// A storage backend (database, remote store) rejected the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl ProviderError {
    pub fn corrupt(pos: ChunkPos, kind: DataKind, reason: impl fmt::Display) -> Self {
        ProviderError::Corrupt { pos, kind, reason: reason.to_string() }
    }

    pub fn encode(pos: ChunkPos, kind: DataKind, reason: impl fmt::Display) -> Self {
        ProviderError::Encode { pos, kind, reason: reason.to_string() }
    }

    /// True if stored data exists but is unreadable, as opposed to a failing medium.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, ProviderError::Corrupt { .. })
    }
}

pub type Result<T, E = ProviderError> = std::result::Result<T, E>;
