use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use lodestone_anvil::CompressionScheme;
use parking_lot::RwLock;

use lodestone_world::{
    BlockPos, Chunk, ChunkPos, Compound, DataKind, Difficulty, Entity, GameMode, Provider, ProviderError, Result,
    WorldSettings,
};

use crate::format;
use crate::level;
use crate::region::RegionStore;

/// Tuning for [`RegionProvider`].
#[derive(Debug, Clone)]
pub struct RegionOptions {
    /// Open region files kept per data kind.
    pub cache_capacity: usize,
    /// Scheme for new writes. Existing payloads are read whatever their scheme.
    pub compression: CompressionScheme,
    /// Level (0-9) for gzip and zlib payloads.
    pub compression_level: u32,
    /// Name given to a world that has no level.dat yet.
    pub world_name: Option<String>,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            cache_capacity: 64,
            compression: CompressionScheme::Zlib,
            compression_level: 6,
            world_name: None,
        }
    }
}

/// Provider backed by a world directory of Anvil region files.
///
/// ```text
/// <world>/level.dat           settings (gzip NBT)
/// <world>/region/r.X.Z.mca    chunks
/// <world>/entities/r.X.Z.mca  entity sets
/// <world>/blocks/r.X.Z.mca    block entities
/// ```
///
/// Settings live in memory and reach `level.dat` on [`flush`](Self::flush)
/// or `close`. Chunk-keyed data is written immediately. Opening a missing
/// directory and only reading from it leaves the disk untouched.
pub struct RegionProvider {
    root: PathBuf,
    chunks: RegionStore,
    entities: RegionStore,
    blocks: RegionStore,
    settings: RwLock<WorldSettings>,
    dirty: AtomicBool,
    /// No level.dat on disk yet: the first save of any kind writes one.
    fresh: AtomicBool,
    closed: AtomicBool,
}

impl RegionProvider {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(root, RegionOptions::default())
    }

    pub fn open_with(root: impl AsRef<Path>, options: RegionOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let store = |dir: &str, kind| {
            RegionStore::new(
                root.join(dir),
                kind,
                options.cache_capacity,
                options.compression,
                options.compression_level,
            )
        };
        let chunks = store("region", DataKind::Chunk)?;
        let entities = store("entities", DataKind::Entities)?;
        let blocks = store("blocks", DataKind::BlockEntities)?;

        let (settings, fresh) = match level::read(&root.join("level.dat")) {
            Ok(Some(settings)) => (settings, false),
            Ok(None) => {
                let mut settings = WorldSettings::default();
                if let Some(name) = options.world_name {
                    settings.name = name;
                }
                (settings, true)
            }
            Err(e) => {
                // Keep the broken file until something is saved over it
                log::warn!("Could not read {}/level.dat, using defaults: {}", root.display(), e);
                (WorldSettings::default(), false)
            }
        };
        log::info!("Opened world '{}' at {}", settings.name, root.display());

        Ok(Self {
            root,
            chunks,
            entities,
            blocks,
            settings: RwLock::new(settings),
            dirty: AtomicBool::new(false),
            fresh: AtomicBool::new(fresh),
            closed: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy of the current settings.
    pub fn settings(&self) -> WorldSettings {
        self.settings.read().clone()
    }

    /// Positions with a stored chunk.
    pub fn chunk_positions(&self) -> Result<Vec<ChunkPos>> {
        self.chunks.positions()
    }

    /// Write pending settings to level.dat and sync open region files.
    pub fn flush(&self) -> Result<()> {
        if self.dirty.swap(false, Ordering::AcqRel) {
            let settings = self.settings();
            if let Err(e) = level::write(&self.root.join("level.dat"), &settings) {
                self.dirty.store(true, Ordering::Release);
                return Err(match e {
                    level::LevelError::Io(e) => e.into(),
                    other => ProviderError::Backend(other.to_string()),
                });
            }
            self.fresh.store(false, Ordering::Release);
        }
        self.chunks.flush()?;
        self.entities.flush()?;
        self.blocks.flush()
    }

    fn update(&self, f: impl FnOnce(&mut WorldSettings)) {
        f(&mut *self.settings.write());
        self.dirty.store(true, Ordering::Release);
    }

    /// Chunk-keyed data was saved: a new world needs its level.dat too.
    fn touch(&self) {
        if self.fresh.load(Ordering::Acquire) {
            self.dirty.store(true, Ordering::Release);
        }
    }
}

impl Provider for RegionProvider {
    fn world_name(&self) -> String {
        self.settings.read().name.clone()
    }

    fn set_world_name(&self, name: &str) {
        self.update(|s| s.name = name.to_string());
    }

    fn world_spawn(&self) -> BlockPos {
        self.settings.read().spawn
    }

    fn set_world_spawn(&self, pos: BlockPos) {
        self.update(|s| s.spawn = pos);
    }

    fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>> {
        match self.chunks.read(pos)? {
            Some(bytes) => format::decode_chunk(pos, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save_chunk(&self, pos: ChunkPos, chunk: &Chunk) -> Result<()> {
        let bytes = format::encode_chunk(pos, chunk)?;
        self.touch();
        self.chunks.write(pos, &bytes)
    }

    fn load_entities(&self, pos: ChunkPos) -> Result<Vec<Entity>> {
        match self.entities.read(pos)? {
            Some(bytes) => format::decode_entities(pos, &bytes),
            None => Ok(Vec::new()),
        }
    }

    fn save_entities(&self, pos: ChunkPos, entities: &[Entity]) -> Result<()> {
        if entities.is_empty() {
            return self.entities.remove(pos);
        }
        let bytes = format::encode_entities(pos, entities)?;
        self.touch();
        self.entities.write(pos, &bytes)
    }

    fn load_block_nbt(&self, pos: ChunkPos) -> Result<Vec<Compound>> {
        match self.blocks.read(pos)? {
            Some(bytes) => format::decode_block_entities(pos, &bytes),
            None => Ok(Vec::new()),
        }
    }

    fn save_block_nbt(&self, pos: ChunkPos, data: &HashMap<[i32; 3], Compound>) -> Result<()> {
        if data.is_empty() {
            return self.blocks.remove(pos);
        }
        let bytes = format::encode_block_entities(pos, data)?;
        self.touch();
        self.blocks.write(pos, &bytes)
    }

    fn load_time(&self) -> i64 {
        self.settings.read().time
    }

    fn save_time(&self, time: i64) {
        self.update(|s| s.time = time);
    }

    fn load_time_cycle(&self) -> bool {
        self.settings.read().time_cycle
    }

    fn save_time_cycle(&self, running: bool) {
        self.update(|s| s.time_cycle = running);
    }

    fn load_default_game_mode(&self) -> GameMode {
        self.settings.read().game_mode
    }

    fn save_default_game_mode(&self, mode: GameMode) {
        self.update(|s| s.game_mode = mode);
    }

    fn load_difficulty(&self) -> Difficulty {
        self.settings.read().difficulty
    }

    fn save_difficulty(&self, difficulty: Difficulty) {
        self.update(|s| s.difficulty = difficulty);
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let flushed = self.flush();
        self.chunks.close();
        self.entities.close();
        self.blocks.close();
        log::info!("Closed world at {}", self.root.display());
        flushed
    }
}
