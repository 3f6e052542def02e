use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use lodestone_anvil::{AnvilError, CompressionScheme, RegionFile, RegionPos};
use lodestone_world::{ChunkPos, DataKind, ProviderError, Result};

/// One directory of region files holding one kind of chunk-keyed data.
///
/// Open region files are cached, each behind its own lock: operations on the
/// same region are serialized, operations on different regions run in
/// parallel. A region is only evicted from the cache while no operation holds
/// it, so a file is never open twice.
pub struct RegionStore {
    dir: PathBuf,
    kind: DataKind,
    capacity: usize,
    scheme: CompressionScheme,
    level: u32,
    open: Mutex<LruCache<RegionPos, Arc<Mutex<RegionFile>>>>,
}

impl RegionStore {
    /// The directory is created with the first write.
    pub fn new(dir: PathBuf, kind: DataKind, capacity: usize, scheme: CompressionScheme, level: u32) -> Result<Self> {
        Ok(Self {
            dir,
            kind,
            capacity: capacity.max(1),
            scheme,
            level,
            open: Mutex::new(LruCache::unbounded()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn read(&self, pos: ChunkPos) -> Result<Option<Vec<u8>>> {
        let Some(region) = self.region(pos, false)? else {
            return Ok(None);
        };
        let mut region = region.lock();
        region
            .read(RegionPos::local_index(pos.x, pos.z))
            .map_err(|e| self.error(pos, e))
    }

    pub fn write(&self, pos: ChunkPos, data: &[u8]) -> Result<()> {
        let Some(region) = self.region(pos, true)? else {
            return Ok(());
        };
        let mut region = region.lock();
        region
            .write(RegionPos::local_index(pos.x, pos.z), data)
            .map_err(|e| self.error(pos, e))
    }

    pub fn remove(&self, pos: ChunkPos) -> Result<()> {
        let Some(region) = self.region(pos, false)? else {
            return Ok(());
        };
        let mut region = region.lock();
        region
            .remove(RegionPos::local_index(pos.x, pos.z))
            .map_err(|e| self.error(pos, e))
    }

    /// Every position holding data, across all region files in the directory.
    pub fn positions(&self) -> Result<Vec<ChunkPos>> {
        let mut positions = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(positions),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let Some(region_pos) = entry.file_name().to_str().and_then(parse_file_name) else {
                continue;
            };
            let origin = ChunkPos::new(region_pos.x * 32, region_pos.z * 32);
            let region = self.region(origin, false)?;
            if let Some(region) = region {
                let region = region.lock();
                positions.extend(region.occupied().into_iter().map(|i| {
                    let (x, z) = region_pos.chunk_at(i);
                    ChunkPos::new(x, z)
                }));
            }
        }
        Ok(positions)
    }

    /// Sync every open region file to disk.
    pub fn flush(&self) -> Result<()> {
        let regions: Vec<_> = self.open.lock().iter().map(|(_, r)| Arc::clone(r)).collect();
        for region in regions {
            region.lock().sync().map_err(|e| match e {
                AnvilError::Io(e) => ProviderError::Io(e),
                other => ProviderError::Backend(other.to_string()),
            })?;
        }
        Ok(())
    }

    /// Drop all cached file handles.
    pub fn close(&self) {
        self.open.lock().clear();
    }

    fn region(&self, pos: ChunkPos, create: bool) -> Result<Option<Arc<Mutex<RegionFile>>>> {
        let region_pos = RegionPos::containing(pos.x, pos.z);
        let mut open = self.open.lock();
        if let Some(region) = open.get(&region_pos) {
            return Ok(Some(Arc::clone(region)));
        }

        let path = self.dir.join(region_pos.file_name());
        if !create && !path.exists() {
            return Ok(None);
        }
        if create {
            fs::create_dir_all(&self.dir)?;
        }
        let mut file = RegionFile::open(&path).map_err(|e| self.error(pos, e))?;
        file.set_compression(self.scheme, self.level);
        log::debug!("Opened {} region {}", self.kind, path.display());

        let region = Arc::new(Mutex::new(file));
        open.put(region_pos, Arc::clone(&region));
        evict_idle(&mut open, self.capacity);
        Ok(Some(region))
    }

    fn error(&self, pos: ChunkPos, e: AnvilError) -> ProviderError {
        match e {
            AnvilError::Io(e) => ProviderError::Io(e),
            AnvilError::Corrupt(reason) => ProviderError::corrupt(pos, self.kind, reason),
            e @ AnvilError::ChunkTooLarge(_) => ProviderError::encode(pos, self.kind, e),
        }
    }
}

/// Evict least recently used regions that no caller is holding.
fn evict_idle(open: &mut LruCache<RegionPos, Arc<Mutex<RegionFile>>>, capacity: usize) {
    while open.len() > capacity {
        let idle = open
            .iter()
            .rev()
            .find(|(_, region)| Arc::strong_count(region) == 1)
            .map(|(pos, _)| *pos);
        match idle {
            Some(pos) => {
                open.pop(&pos);
            }
            None => break,
        }
    }
}

/// `r.X.Z.mca` -> region coordinates.
fn parse_file_name(name: &str) -> Option<RegionPos> {
    let mut parts = name.strip_prefix("r.")?.strip_suffix(".mca")?.split('.');
    let x = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(RegionPos { x, z })
}
