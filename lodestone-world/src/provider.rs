use std::collections::HashMap;
use std::sync::Arc;

use crate::chunk::Chunk;
use crate::entity::{Compound, Entity};
use crate::error::Result;
use crate::pos::{BlockPos, ChunkPos};
use crate::settings::{Difficulty, GameMode};

/// Abstract storage interface for world data.
///
/// Implementations can keep world data in various backends:
/// - `NoIoProvider` - nothing at all (ephemeral and test worlds)
/// - `MemoryProvider` - in-process maps (lodestone-storage)
/// - `RegionProvider` - Anvil region files on disk (lodestone-storage)
/// - `PostgresProvider` - PostgreSQL (lodestone-storage)
///
/// Every method takes `&self`: the engine shares one provider between
/// autosave and chunk loading. Calls on different chunk positions must not
/// interfere, and concurrent calls on the same position must each see one
/// complete value. `close` is only called once no other call is in flight.
///
/// Only chunk, entity and block entity operations can fail. World-scalar
/// getters and setters always succeed; a backend that cannot persist them
/// keeps the value in memory and logs.
pub trait Provider: Send + Sync {
    /// Name of the world. When a world is opened with this provider, it takes this name.
    fn world_name(&self) -> String;

    fn set_world_name(&self, name: &str);

    /// Spawn position of the world. Every new player spawns here.
    fn world_spawn(&self) -> BlockPos;

    fn set_world_spawn(&self, pos: BlockPos);

    /// Load the chunk saved at `pos`.
    ///
    /// - `Ok(Some(chunk))`: the chunk was stored and decoded.
    /// - `Ok(None)`: nothing was ever saved here; the caller generates the chunk.
    /// - `Err(_)`: data was stored but could not be read. The caller must not
    ///   treat this as absence.
    fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>>;

    /// Save a chunk, replacing whatever was stored at `pos`.
    fn save_chunk(&self, pos: ChunkPos, chunk: &Chunk) -> Result<()>;

    /// Load the entities saved at `pos`. Returns an empty list if none were saved.
    fn load_entities(&self, pos: ChunkPos) -> Result<Vec<Entity>>;

    /// Replace the full entity set stored at `pos`.
    fn save_entities(&self, pos: ChunkPos, entities: &[Entity]) -> Result<()>;

    /// Load the block entities saved at `pos`, in no meaningful order.
    /// Returns an empty list if none were saved.
    fn load_block_nbt(&self, pos: ChunkPos) -> Result<Vec<Compound>>;

    /// Replace the block entities stored at `pos`, keyed by block position.
    fn save_block_nbt(&self, pos: ChunkPos, data: &HashMap<[i32; 3], Compound>) -> Result<()>;

    fn load_time(&self) -> i64;

    fn save_time(&self, time: i64);

    /// Whether the day/night cycle is running.
    fn load_time_cycle(&self) -> bool;

    fn save_time_cycle(&self, running: bool);

    fn load_default_game_mode(&self) -> GameMode;

    fn save_default_game_mode(&self, mode: GameMode);

    fn load_difficulty(&self) -> Difficulty;

    fn save_difficulty(&self, difficulty: Difficulty);

    /// Flush and release resources. No other method is called afterwards.
    fn close(&self) -> Result<()>;
}

impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn world_name(&self) -> String {
        (**self).world_name()
    }

    fn set_world_name(&self, name: &str) {
        (**self).set_world_name(name)
    }

    fn world_spawn(&self) -> BlockPos {
        (**self).world_spawn()
    }

    fn set_world_spawn(&self, pos: BlockPos) {
        (**self).set_world_spawn(pos)
    }

    fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>> {
        (**self).load_chunk(pos)
    }

    fn save_chunk(&self, pos: ChunkPos, chunk: &Chunk) -> Result<()> {
        (**self).save_chunk(pos, chunk)
    }

    fn load_entities(&self, pos: ChunkPos) -> Result<Vec<Entity>> {
        (**self).load_entities(pos)
    }

    fn save_entities(&self, pos: ChunkPos, entities: &[Entity]) -> Result<()> {
        (**self).save_entities(pos, entities)
    }

    fn load_block_nbt(&self, pos: ChunkPos) -> Result<Vec<Compound>> {
        (**self).load_block_nbt(pos)
    }

    fn save_block_nbt(&self, pos: ChunkPos, data: &HashMap<[i32; 3], Compound>) -> Result<()> {
        (**self).save_block_nbt(pos, data)
    }

    fn load_time(&self) -> i64 {
        (**self).load_time()
    }

    fn save_time(&self, time: i64) {
        (**self).save_time(time)
    }

    fn load_time_cycle(&self) -> bool {
        (**self).load_time_cycle()
    }

    fn save_time_cycle(&self, running: bool) {
        (**self).save_time_cycle(running)
    }

    fn load_default_game_mode(&self) -> GameMode {
        (**self).load_default_game_mode()
    }

    fn save_default_game_mode(&self, mode: GameMode) {
        (**self).save_default_game_mode(mode)
    }

    fn load_difficulty(&self) -> Difficulty {
        (**self).load_difficulty()
    }

    fn save_difficulty(&self, difficulty: Difficulty) {
        (**self).save_difficulty(difficulty)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}
