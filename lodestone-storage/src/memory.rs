use std::collections::HashMap;

use parking_lot::RwLock;

use lodestone_world::{
    BlockPos, Chunk, ChunkPos, Compound, Difficulty, Entity, GameMode, Provider, Result, WorldSettings,
};

use crate::format::positioned_records;

/// In-memory provider (for testing/development).
///
/// Unlike `NoIoProvider`, saved data comes back on the next load, for as long
/// as the value lives. Each kind of data sits behind its own lock.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    chunks: RwLock<HashMap<ChunkPos, Chunk>>,
    entities: RwLock<HashMap<ChunkPos, Vec<Entity>>>,
    blocks: RwLock<HashMap<ChunkPos, Vec<Compound>>>,
    settings: RwLock<WorldSettings>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: WorldSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            ..Self::default()
        }
    }

    pub fn settings(&self) -> WorldSettings {
        self.settings.read().clone()
    }

    /// Positions with a stored chunk.
    pub fn chunk_positions(&self) -> Vec<ChunkPos> {
        self.chunks.read().keys().copied().collect()
    }
}

impl Provider for MemoryProvider {
    fn world_name(&self) -> String {
        self.settings.read().name.clone()
    }

    fn set_world_name(&self, name: &str) {
        self.settings.write().name = name.to_string();
    }

    fn world_spawn(&self) -> BlockPos {
        self.settings.read().spawn
    }

    fn set_world_spawn(&self, pos: BlockPos) {
        self.settings.write().spawn = pos;
    }

    fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>> {
        Ok(self.chunks.read().get(&pos).cloned())
    }

    fn save_chunk(&self, pos: ChunkPos, chunk: &Chunk) -> Result<()> {
        self.chunks.write().insert(pos, chunk.clone());
        Ok(())
    }

    fn load_entities(&self, pos: ChunkPos) -> Result<Vec<Entity>> {
        Ok(self.entities.read().get(&pos).cloned().unwrap_or_default())
    }

    fn save_entities(&self, pos: ChunkPos, entities: &[Entity]) -> Result<()> {
        let mut stored = self.entities.write();
        if entities.is_empty() {
            stored.remove(&pos);
        } else {
            stored.insert(pos, entities.to_vec());
        }
        Ok(())
    }

    fn load_block_nbt(&self, pos: ChunkPos) -> Result<Vec<Compound>> {
        Ok(self.blocks.read().get(&pos).cloned().unwrap_or_default())
    }

    fn save_block_nbt(&self, pos: ChunkPos, data: &HashMap<[i32; 3], Compound>) -> Result<()> {
        let mut stored = self.blocks.write();
        if data.is_empty() {
            stored.remove(&pos);
        } else {
            stored.insert(pos, positioned_records(data));
        }
        Ok(())
    }

    fn load_time(&self) -> i64 {
        self.settings.read().time
    }

    fn save_time(&self, time: i64) {
        self.settings.write().time = time;
    }

    fn load_time_cycle(&self) -> bool {
        self.settings.read().time_cycle
    }

    fn save_time_cycle(&self, running: bool) {
        self.settings.write().time_cycle = running;
    }

    fn load_default_game_mode(&self) -> GameMode {
        self.settings.read().game_mode
    }

    fn save_default_game_mode(&self, mode: GameMode) {
        self.settings.write().game_mode = mode;
    }

    fn load_difficulty(&self) -> Difficulty {
        self.settings.read().difficulty
    }

    fn save_difficulty(&self, difficulty: Difficulty) {
        self.settings.write().difficulty = difficulty;
    }

    /// Drops all stored data.
    fn close(&self) -> Result<()> {
        self.chunks.write().clear();
        self.entities.write().clear();
        self.blocks.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance;
    use std::sync::Arc;

    #[test]
    fn test_contract() {
        let provider = MemoryProvider::new();
        conformance::run_all(&provider);
        conformance::concurrent_positions(Arc::new(provider));
    }

    #[test]
    fn test_same_position_contention() {
        conformance::same_position_contention(Arc::new(MemoryProvider::new()));
    }

    #[test]
    fn test_with_settings() {
        let settings = WorldSettings {
            name: "Lobby".to_string(),
            difficulty: Difficulty::Peaceful,
            ..WorldSettings::default()
        };
        let provider = MemoryProvider::with_settings(settings.clone());
        assert_eq!(provider.settings(), settings);
        assert_eq!(provider.load_difficulty(), Difficulty::Peaceful);
    }

    #[test]
    fn test_close_clears_data() {
        let provider = MemoryProvider::new();
        let pos = ChunkPos::new(0, 0);
        provider.save_chunk(pos, &Chunk::default()).unwrap();
        assert_eq!(provider.chunk_positions(), vec![pos]);

        provider.close().unwrap();
        assert!(provider.load_chunk(pos).unwrap().is_none());
        assert!(provider.close().is_ok());
    }
}
