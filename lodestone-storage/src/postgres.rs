use std::collections::HashMap;
use std::future::Future;

use deadpool_postgres::{Config, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio_postgres::NoTls;

use lodestone_world::{
    BlockPos, Chunk, ChunkPos, Compound, Difficulty, Entity, GameMode, Provider, ProviderError, Result,
    WorldSettings,
};

use crate::format;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS chunks (
        x INT,
        z INT,
        data BYTEA NOT NULL,
        updated_at TIMESTAMP DEFAULT NOW(),
        PRIMARY KEY (x, z)
    );
    CREATE TABLE IF NOT EXISTS entities (
        x INT,
        z INT,
        data BYTEA NOT NULL,
        updated_at TIMESTAMP DEFAULT NOW(),
        PRIMARY KEY (x, z)
    );
    CREATE TABLE IF NOT EXISTS block_entities (
        x INT,
        z INT,
        data BYTEA NOT NULL,
        updated_at TIMESTAMP DEFAULT NOW(),
        PRIMARY KEY (x, z)
    );
    CREATE TABLE IF NOT EXISTS world_settings (
        id SMALLINT PRIMARY KEY CHECK (id = 1),
        data JSONB NOT NULL
    );
";

/// Tables holding chunk-keyed NBT blobs.
#[derive(Debug, Clone, Copy)]
enum Table {
    Chunks,
    Entities,
    BlockEntities,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Chunks => "chunks",
            Table::Entities => "entities",
            Table::BlockEntities => "block_entities",
        }
    }
}

/// Provider storing world data in PostgreSQL.
///
/// The database client is async; the provider blocks on the given runtime
/// handle so the engine can call it from its own threads. It must not be
/// called from inside that runtime's async tasks.
pub struct PostgresProvider {
    pool: Pool,
    handle: Handle,
    settings: SettingsCell,
}

/// In-memory settings plus the order in which snapshots reach storage.
struct SettingsCell {
    current: RwLock<WorldSettings>,
    /// Held from taking a snapshot until it is stored.
    persist: Mutex<()>,
}

impl SettingsCell {
    fn new(settings: WorldSettings) -> Self {
        Self {
            current: RwLock::new(settings),
            persist: Mutex::new(()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&WorldSettings) -> T) -> T {
        f(&self.current.read())
    }

    fn replace(&self, settings: WorldSettings) {
        *self.current.write() = settings;
    }

    /// Apply a change, then hand a snapshot to `store`. Stores run in the
    /// order their snapshots were taken, so the last one stored is always
    /// the latest state.
    fn update<E>(
        &self,
        f: impl FnOnce(&mut WorldSettings),
        store: impl FnOnce(&WorldSettings) -> Result<(), E>,
    ) -> Result<(), E> {
        let _persist = self.persist.lock();
        let snapshot = {
            let mut current = self.current.write();
            f(&mut *current);
            current.clone()
        };
        store(&snapshot)
    }
}

impl PostgresProvider {
    pub fn connect(connection_string: &str, handle: Handle) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.url = Some(connection_string.to_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| backend("failed to create Postgres pool", e))?;

        let provider = Self {
            pool,
            handle,
            settings: SettingsCell::new(WorldSettings::default()),
        };
        // Ensure connections work and schema exists
        provider.block_on(provider.init_schema())?;
        provider.settings.replace(provider.block_on(provider.read_settings()));
        Ok(provider)
    }

    async fn client(&self) -> Result<Object> {
        self.pool.get().await.map_err(|e| backend("failed to get DB connection", e))
    }

    async fn init_schema(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .batch_execute(SCHEMA)
            .await
            .map_err(|e| backend("failed to init schema", e))
    }

    /// Stored settings, or defaults if there are none or they cannot be read.
    async fn read_settings(&self) -> WorldSettings {
        let row = match self.client().await {
            Ok(client) => client
                .query_opt("SELECT data FROM world_settings WHERE id = 1", &[])
                .await
                .map_err(|e| backend("failed to read world settings", e)),
            Err(e) => Err(e),
        };
        match row {
            Ok(Some(row)) => {
                let value: serde_json::Value = row.get(0);
                serde_json::from_value(value).unwrap_or_else(|e| {
                    log::warn!("Stored world settings are invalid, using defaults: {}", e);
                    WorldSettings::default()
                })
            }
            Ok(None) => WorldSettings::default(),
            Err(e) => {
                log::warn!("{}, using default world settings", e);
                WorldSettings::default()
            }
        }
    }

    async fn write_settings(&self, settings: &WorldSettings) -> Result<()> {
        let value = serde_json::to_value(settings).map_err(|e| backend("failed to encode world settings", e))?;
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO world_settings (id, data) VALUES (1, $1)
                 ON CONFLICT (id) DO UPDATE SET data = $1",
                &[&value],
            )
            .await
            .map_err(|e| backend("failed to write world settings", e))?;
        Ok(())
    }

    async fn load(&self, table: Table, pos: ChunkPos) -> Result<Option<Vec<u8>>> {
        let client = self.client().await?;
        let sql = format!("SELECT data FROM {} WHERE x = $1 AND z = $2", table.name());
        let row = client
            .query_opt(sql.as_str(), &[&pos.x, &pos.z])
            .await
            .map_err(|e| backend("failed to load row", e))?;
        Ok(row.map(|row| row.get::<_, Vec<u8>>(0)))
    }

    async fn store(&self, table: Table, pos: ChunkPos, data: &[u8]) -> Result<()> {
        let client = self.client().await?;
        // Upsert logic
        let sql = format!(
            "INSERT INTO {} (x, z, data, updated_at) VALUES ($1, $2, $3, NOW())
             ON CONFLICT (x, z) DO UPDATE SET data = $3, updated_at = NOW()",
            table.name()
        );
        client
            .execute(sql.as_str(), &[&pos.x, &pos.z, &data])
            .await
            .map_err(|e| backend("failed to store row", e))?;
        Ok(())
    }

    async fn delete(&self, table: Table, pos: ChunkPos) -> Result<()> {
        let client = self.client().await?;
        let sql = format!("DELETE FROM {} WHERE x = $1 AND z = $2", table.name());
        client
            .execute(sql.as_str(), &[&pos.x, &pos.z])
            .await
            .map_err(|e| backend("failed to delete row", e))?;
        Ok(())
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    /// Apply a settings change in memory, then write it through. A failed
    /// write keeps the in-memory value.
    /// Apply a settings change in memory, then write it through. A failed
    /// write keeps the in-memory value.
    fn update(&self, f: impl FnOnce(&mut WorldSettings)) {
        let stored = self.settings.update(f, |settings| self.block_on(self.write_settings(settings)));
        if let Err(e) = stored {
            log::warn!("World settings kept in memory only: {}", e);
        }
    }
}

fn backend(context: &str, e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Backend(format!("{context}: {e}"))
}

impl Provider for PostgresProvider {
    fn world_name(&self) -> String {
        self.settings.read(|s| s.name.clone())
    }

    fn set_world_name(&self, name: &str) {
        self.update(|s| s.name = name.to_string());
    }

    fn world_spawn(&self) -> BlockPos {
        self.settings.read(|s| s.spawn)
    }

    fn set_world_spawn(&self, pos: BlockPos) {
        self.update(|s| s.spawn = pos);
    }

    fn load_chunk(&self, pos: ChunkPos) -> Result<Option<Chunk>> {
        match self.block_on(self.load(Table::Chunks, pos))? {
            Some(bytes) => format::decode_chunk(pos, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save_chunk(&self, pos: ChunkPos, chunk: &Chunk) -> Result<()> {
        let bytes = format::encode_chunk(pos, chunk)?;
        self.block_on(self.store(Table::Chunks, pos, &bytes))
    }

    fn load_entities(&self, pos: ChunkPos) -> Result<Vec<Entity>> {
        match self.block_on(self.load(Table::Entities, pos))? {
            Some(bytes) => format::decode_entities(pos, &bytes),
            None => Ok(Vec::new()),
        }
    }

    fn save_entities(&self, pos: ChunkPos, entities: &[Entity]) -> Result<()> {
        if entities.is_empty() {
            return self.block_on(self.delete(Table::Entities, pos));
        }
        let bytes = format::encode_entities(pos, entities)?;
        self.block_on(self.store(Table::Entities, pos, &bytes))
    }

    fn load_block_nbt(&self, pos: ChunkPos) -> Result<Vec<Compound>> {
        match self.block_on(self.load(Table::BlockEntities, pos))? {
            Some(bytes) => format::decode_block_entities(pos, &bytes),
            None => Ok(Vec::new()),
        }
    }

    fn save_block_nbt(&self, pos: ChunkPos, data: &HashMap<[i32; 3], Compound>) -> Result<()> {
        if data.is_empty() {
            return self.block_on(self.delete(Table::BlockEntities, pos));
        }
        let bytes = format::encode_block_entities(pos, data)?;
        self.block_on(self.store(Table::BlockEntities, pos, &bytes))
    }

    fn load_time(&self) -> i64 {
        self.settings.read(|s| s.time)
    }

    fn save_time(&self, time: i64) {
        self.update(|s| s.time = time);
    }

    fn load_time_cycle(&self) -> bool {
        self.settings.read(|s| s.time_cycle)
    }

    fn save_time_cycle(&self, running: bool) {
        self.update(|s| s.time_cycle = running);
    }

    fn load_default_game_mode(&self) -> GameMode {
        self.settings.read(|s| s.game_mode)
    }

    fn save_default_game_mode(&self, mode: GameMode) {
        self.update(|s| s.game_mode = mode);
    }

    fn load_difficulty(&self) -> Difficulty {
        self.settings.read(|s| s.difficulty)
    }

    fn save_difficulty(&self, difficulty: Difficulty) {
        self.update(|s| s.difficulty = difficulty);
    }

    fn close(&self) -> Result<()> {
        self.pool.close();
        Ok(())
    }
}
