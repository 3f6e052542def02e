//! Storage backends implementing [`lodestone_world::Provider`].
//!
//! - [`RegionProvider`] - a world directory of Anvil region files + level.dat
//! - [`MemoryProvider`] - in-process maps
//! - [`PostgresProvider`] - PostgreSQL (feature `postgres`)
//!
//! All of them store the same NBT layouts, see [`format`].

mod disk;
pub mod format;
pub mod level;
mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod region;

#[cfg(test)]
mod conformance;

pub use disk::{RegionOptions, RegionProvider};
pub use lodestone_anvil::CompressionScheme;
pub use memory::MemoryProvider;
#[cfg(feature = "postgres")]
pub use postgres::PostgresProvider;
pub use region::RegionStore;
