use std::collections::HashMap;

use crate::chunk::Chunk;
use crate::entity::{Compound, Entity};
use crate::error::Result;
use crate::pos::{BlockPos, ChunkPos};
use crate::provider::Provider;
use crate::settings::{Difficulty, GameMode, WorldSettings};

/// Provider that performs no I/O.
///
/// Every load reports "never saved" and every save is dropped, so a world
/// using it regenerates chunks each time they are loaded. Holds no state, so
/// any number of threads can share it without locking.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIoProvider;

impl Provider for NoIoProvider {
    fn world_name(&self) -> String {
        String::new()
    }

    fn set_world_name(&self, _name: &str) {}

    fn world_spawn(&self) -> BlockPos {
        WorldSettings::DEFAULT_SPAWN
    }

    fn set_world_spawn(&self, _pos: BlockPos) {}

    fn load_chunk(&self, _pos: ChunkPos) -> Result<Option<Chunk>> {
        Ok(None)
    }

    fn save_chunk(&self, _pos: ChunkPos, _chunk: &Chunk) -> Result<()> {
        Ok(())
    }

    fn load_entities(&self, _pos: ChunkPos) -> Result<Vec<Entity>> {
        Ok(Vec::new())
    }

    fn save_entities(&self, _pos: ChunkPos, _entities: &[Entity]) -> Result<()> {
        Ok(())
    }

    fn load_block_nbt(&self, _pos: ChunkPos) -> Result<Vec<Compound>> {
        Ok(Vec::new())
    }

    fn save_block_nbt(&self, _pos: ChunkPos, _data: &HashMap<[i32; 3], Compound>) -> Result<()> {
        Ok(())
    }

    fn load_time(&self) -> i64 {
        0
    }

    fn save_time(&self, _time: i64) {}

    fn load_time_cycle(&self) -> bool {
        true
    }

    fn save_time_cycle(&self, _running: bool) {}

    fn load_default_game_mode(&self) -> GameMode {
        GameMode::Adventure
    }

    fn save_default_game_mode(&self, _mode: GameMode) {}

    fn load_difficulty(&self) -> Difficulty {
        Difficulty::Normal
    }

    fn save_difficulty(&self, _difficulty: Difficulty) {}

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
