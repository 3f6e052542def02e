//! The persistence boundary between a running world and its storage.
//!
//! The world engine talks to storage only through [`Provider`]. Backends
//! (region files, a database, nothing at all) implement it; the engine holds
//! one `Arc<dyn Provider>` for the lifetime of a world session.
//!
//! This crate owns:
//! - The [`Provider`] contract itself
//! - The values that cross it ([`Chunk`], [`Entity`], [`Compound`], positions, settings)
//! - [`NoIoProvider`], the provider for worlds that should not outlive the process

mod chunk;
mod entity;
mod error;
mod noio;
mod pos;
mod provider;
mod settings;

pub use chunk::{data_version, Biomes, BlockState, BlockStates, Chunk, Section, DEFAULT_DATA_VERSION};
pub use entity::{Compound, Entity};
pub use error::{DataKind, ProviderError, Result};
pub use noio::NoIoProvider;
pub use pos::{BlockPos, ChunkPos};
pub use provider::Provider;
pub use settings::{Difficulty, GameMode, UnknownSetting, WorldSettings};
