use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lodestone_world::{
    BlockPos, Chunk, ChunkPos, Compound, Difficulty, Entity, GameMode, Provider, Result,
};

#[derive(Debug, Default)]
pub struct ProviderMetrics {
    // Chunk loads, split by outcome
    pub chunks_loaded: AtomicUsize,
    pub chunks_absent: AtomicUsize,
    pub chunk_load_errors: AtomicUsize,
    pub total_chunk_load_us: AtomicU64,
    pub max_chunk_load_us: AtomicU64,

    pub chunks_saved: AtomicUsize,
    pub chunk_save_errors: AtomicUsize,
    pub total_chunk_save_us: AtomicU64,
    pub max_chunk_save_us: AtomicU64,

    // Entities + block entities
    pub entity_loads: AtomicUsize,
    pub entity_saves: AtomicUsize,
    pub block_nbt_loads: AtomicUsize,
    pub block_nbt_saves: AtomicUsize,
    pub other_errors: AtomicUsize,

    // Session
    pub start_time: Option<Instant>,
    pub config_summary: String,
}

impl ProviderMetrics {
    pub fn new(config_summary: String) -> Self {
        Self {
            start_time: Some(Instant::now()),
            config_summary,
            ..Default::default()
        }
    }

    pub fn record_chunk_load(&self, duration: Duration, outcome: &Result<Option<Chunk>>) {
        match outcome {
            Ok(Some(_)) => self.chunks_loaded.fetch_add(1, Ordering::Relaxed),
            Ok(None) => self.chunks_absent.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.chunk_load_errors.fetch_add(1, Ordering::Relaxed),
        };
        let us = duration.as_micros() as u64;
        self.total_chunk_load_us.fetch_add(us, Ordering::Relaxed);
        self.max_chunk_load_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_chunk_save(&self, duration: Duration, ok: bool) {
        if ok {
            self.chunks_saved.fetch_add(1, Ordering::Relaxed);
        } else {
            self.chunk_save_errors.fetch_add(1, Ordering::Relaxed);
        }
        let us = duration.as_micros() as u64;
        self.total_chunk_save_us.fetch_add(us, Ordering::Relaxed);
        self.max_chunk_save_us.fetch_max(us, Ordering::Relaxed);
    }

    fn record(&self, counter: &AtomicUsize, ok: bool) {
        counter.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.other_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.unwrap_or_else(Instant::now).elapsed();

        let loaded = self.chunks_loaded.load(Ordering::Relaxed);
        let absent = self.chunks_absent.load(Ordering::Relaxed);
        let load_errors = self.chunk_load_errors.load(Ordering::Relaxed);
        let loads = loaded + absent + load_errors;
        let load_time = self.total_chunk_load_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let load_avg = if loads > 0 { load_time / loads as f64 } else { 0.0 };
        let load_max = self.max_chunk_load_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let hit_rate = if loads > 0 { (loaded as f64 / loads as f64) * 100.0 } else { 0.0 };

        let saved = self.chunks_saved.load(Ordering::Relaxed);
        let save_errors = self.chunk_save_errors.load(Ordering::Relaxed);
        let saves = saved + save_errors;
        let save_time = self.total_chunk_save_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let save_avg = if saves > 0 { save_time / saves as f64 } else { 0.0 };
        let save_max = self.max_chunk_save_us.load(Ordering::Relaxed) as f64 / 1000.0;

        format!(
            "Lodestone Provider Report\n\
             =========================\n\
             Configuration: {}\n\
             Session Duration: {:.2?}\n\n\
             [Chunk Load]\n\
             Loaded: {}\n\
             Absent: {}\n\
             Errors: {}\n\
             Stored Hit Rate: {:.1}%\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n\n\
             [Chunk Save]\n\
             Saved: {}\n\
             Errors: {}\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n\n\
             [Entities / Block Entities]\n\
             Entity Loads: {}\n\
             Entity Saves: {}\n\
             Block NBT Loads: {}\n\
             Block NBT Saves: {}\n\
             Errors: {}\n",
            self.config_summary,
            uptime,
            loaded, absent, load_errors, hit_rate, load_avg, load_max,
            saved, save_errors, save_avg, save_max,
            self.entity_loads.load(Ordering::Relaxed),
            self.entity_saves.load(Ordering::Relaxed),
            self.block_nbt_loads.load(Ordering::Relaxed),
            self.block_nbt_saves.load(Ordering::Relaxed),
            self.other_errors.load(Ordering::Relaxed),
        )
    }
}

/// Provider wrapper that records every chunk-scoped call into [`ProviderMetrics`].
/// Results pass through untouched.
pub struct Instrumented<P> {
    inner: P,
    metrics: Arc<ProviderMetrics>,
}

impl<P: Provider> Instrumented<P> {
    pub fn new(inner: P, metrics: Arc<ProviderMetrics>) -> Self {
        Self { inner, metrics }
    }

    pub fn metrics(&self) -> &Arc<ProviderMetrics> {
        &self.metrics
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Provider> Provider for Instrumented<P> {
    fn world_name(&self) -> String {
        self.inner.world_name()
    }

    fn set_world_name(&self, name: &str) {
        self.inner.set_world_name(name)
    }

    fn world_spawn(&self) -> BlockPos {
        self.inner.world_spawn()
    }

    fn set_world_spawn(&self, pos: BlockPos) {
        self.inner.set_world_spawn(pos)
    }

    fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>> {
        let start = Instant::now();
        let result = self.inner.load_chunk(pos);
        self.metrics.record_chunk_load(start.elapsed(), &result);
        if let Err(e) = &result {
            log::debug!("Chunk load at {} failed: {}", pos, e);
        }
        result
    }

    fn save_chunk(&self, pos: ChunkPos, chunk: &Chunk) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.save_chunk(pos, chunk);
        self.metrics.record_chunk_save(start.elapsed(), result.is_ok());
        result
    }

    fn load_entities(&self, pos: ChunkPos) -> Result<Vec<Entity>> {
        let result = self.inner.load_entities(pos);
        self.metrics.record(&self.metrics.entity_loads, result.is_ok());
        result
    }

    fn save_entities(&self, pos: ChunkPos, entities: &[Entity]) -> Result<()> {
        let result = self.inner.save_entities(pos, entities);
        self.metrics.record(&self.metrics.entity_saves, result.is_ok());
        result
    }

    fn load_block_nbt(&self, pos: ChunkPos) -> Result<Vec<Compound>> {
        let result = self.inner.load_block_nbt(pos);
        self.metrics.record(&self.metrics.block_nbt_loads, result.is_ok());
        result
    }

    fn save_block_nbt(&self, pos: ChunkPos, data: &HashMap<[i32; 3], Compound>) -> Result<()> {
        let result = self.inner.save_block_nbt(pos, data);
        self.metrics.record(&self.metrics.block_nbt_saves, result.is_ok());
        result
    }

    fn load_time(&self) -> i64 {
        self.inner.load_time()
    }

    fn save_time(&self, time: i64) {
        self.inner.save_time(time)
    }

    fn load_time_cycle(&self) -> bool {
        self.inner.load_time_cycle()
    }

    fn save_time_cycle(&self, running: bool) {
        self.inner.save_time_cycle(running)
    }

    fn load_default_game_mode(&self) -> GameMode {
        self.inner.load_default_game_mode()
    }

    fn save_default_game_mode(&self, mode: GameMode) {
        self.inner.save_default_game_mode(mode)
    }

    fn load_difficulty(&self) -> Difficulty {
        self.inner.load_difficulty()
    }

    fn save_difficulty(&self, difficulty: Difficulty) {
        self.inner.save_difficulty(difficulty)
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestone_world::{DataKind, NoIoProvider, ProviderError};

    /// Fails every chunk operation as corrupt.
    struct Broken;

    impl Provider for Broken {
        fn world_name(&self) -> String {
            String::new()
        }

        fn set_world_name(&self, _: &str) {}

        fn world_spawn(&self) -> BlockPos {
            BlockPos::new(0, 0, 0)
        }

        fn set_world_spawn(&self, _: BlockPos) {}

        fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>> {
            Err(ProviderError::corrupt(pos, DataKind::Chunk, "bad"))
        }

        fn save_chunk(&self, pos: ChunkPos, _: &Chunk) -> Result<()> {
            Err(ProviderError::encode(pos, DataKind::Chunk, "bad"))
        }

        fn load_entities(&self, pos: ChunkPos) -> Result<Vec<Entity>> {
            Err(ProviderError::corrupt(pos, DataKind::Entities, "bad"))
        }

        fn save_entities(&self, _: ChunkPos, _: &[Entity]) -> Result<()> {
            Ok(())
        }

        fn load_block_nbt(&self, _: ChunkPos) -> Result<Vec<Compound>> {
            Ok(Vec::new())
        }

        fn save_block_nbt(&self, _: ChunkPos, _: &HashMap<[i32; 3], Compound>) -> Result<()> {
            Ok(())
        }

        fn load_time(&self) -> i64 {
            0
        }

        fn save_time(&self, _: i64) {}

        fn load_time_cycle(&self) -> bool {
            true
        }

        fn save_time_cycle(&self, _: bool) {}

        fn load_default_game_mode(&self) -> GameMode {
            GameMode::Survival
        }

        fn save_default_game_mode(&self, _: GameMode) {}

        fn load_difficulty(&self) -> Difficulty {
            Difficulty::Easy
        }

        fn save_difficulty(&self, _: Difficulty) {}

        fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_counts_absent_loads() {
        let metrics = Arc::new(ProviderMetrics::new("noio".to_string()));
        let provider = Instrumented::new(NoIoProvider, Arc::clone(&metrics));

        for x in 0..3 {
            assert!(provider.load_chunk(ChunkPos::new(x, 0)).unwrap().is_none());
        }
        provider.save_chunk(ChunkPos::new(0, 0), &Chunk::default()).unwrap();

        assert_eq!(metrics.chunks_absent.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.chunks_loaded.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.chunks_saved.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_errors_pass_through() {
        let metrics = Arc::new(ProviderMetrics::new("broken".to_string()));
        let provider = Instrumented::new(Broken, Arc::clone(&metrics));

        assert!(provider.load_chunk(ChunkPos::new(0, 0)).unwrap_err().is_corrupt());
        assert!(provider.save_chunk(ChunkPos::new(0, 0), &Chunk::default()).is_err());
        assert!(provider.load_entities(ChunkPos::new(0, 0)).is_err());

        assert_eq!(metrics.chunk_load_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.chunk_save_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.entity_loads.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.other_errors.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_settings_forwarded() {
        let provider = Instrumented::new(Broken, Arc::new(ProviderMetrics::default()));
        assert_eq!(provider.load_difficulty(), Difficulty::Easy);
        assert_eq!(provider.load_default_game_mode(), GameMode::Survival);
    }

    #[test]
    fn test_report_mentions_counts() {
        let metrics = Arc::new(ProviderMetrics::new("region ./world".to_string()));
        let provider = Instrumented::new(NoIoProvider, Arc::clone(&metrics));
        provider.load_chunk(ChunkPos::new(1, 1)).unwrap();

        let report = metrics.generate_report();
        assert!(report.contains("Configuration: region ./world"));
        assert!(report.contains("Absent: 1"));
        assert!(report.contains("Stored Hit Rate: 0.0%"));
    }
}
