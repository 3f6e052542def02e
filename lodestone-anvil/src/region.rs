use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::compression::{compress, decompress, CompressionScheme};
use crate::header::{Header, Location};
use crate::{AnvilError, Result};

pub const SECTOR_BYTES: u64 = 4096; // minecraft uses 4096 bytes per sector
pub const HEADER_BYTES: u64 = 8192; // header is 8192 bytes (2 sectors 8kb)
pub const CHUNKS_PER_REGION: usize = 1024; // 32x32 chunks

/// The sector count is a single byte in the location table.
pub const MAX_CHUNK_SECTORS: usize = 255;

const HEADER_SECTORS: usize = (HEADER_BYTES / SECTOR_BYTES) as usize;

/// Coordinates of a region (32x32 chunks).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    /// Region containing the given chunk.
    pub fn containing(chunk_x: i32, chunk_z: i32) -> Self {
        Self { x: chunk_x >> 5, z: chunk_z >> 5 }
    }

    /// Slot of a chunk inside its region: index from 0 to 1023.
    pub fn local_index(chunk_x: i32, chunk_z: i32) -> usize {
        // Formula: x + z * 32
        ((chunk_x & 31) + (chunk_z & 31) * 32) as usize
    }

    pub fn file_name(&self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }

    /// Absolute chunk coordinates of a slot in this region.
    pub fn chunk_at(&self, index: usize) -> (i32, i32) {
        // Reverse math: x = index % 32, z = index / 32
        let rel_x = (index % 32) as i32;
        let rel_z = (index / 32) as i32;
        (self.x * 32 + rel_x, self.z * 32 + rel_z)
    }
}

/// An open region file.
///
/// Keeps the header and a map of used sectors in memory. A rewrite goes to
/// free sectors and lands before the header entry pointing to it, so an
/// interrupted write leaves the previous version of the chunk readable.
pub struct RegionFile {
    file: File,
    header: Header,
    used: Vec<bool>,
    scheme: CompressionScheme,
    level: u32,
}

impl RegionFile {
    /// Open a region file, creating it with an empty header if missing.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path)?;
        let len = file.metadata()?.len();

        let header = if len == 0 {
            let header = Header::default();
            file.write_all(&header.to_bytes())?;
            header
        } else if len < HEADER_BYTES {
            return Err(AnvilError::Corrupt(format!(
                "{}: truncated header ({len} bytes)",
                path.display()
            )));
        } else {
            let mut raw = [0u8; HEADER_BYTES as usize];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut raw)?;
            Header::parse(&raw)
        };

        let file_sectors = len.max(HEADER_BYTES).div_ceil(SECTOR_BYTES) as usize;
        let mut used = vec![false; file_sectors];
        used[..HEADER_SECTORS].fill(true);
        for loc in header.locations.iter().filter(|l| !l.is_empty()) {
            let start = loc.offset as usize;
            let end = start + loc.sectors as usize;
            // Entries pointing outside the file are reported when read
            if start >= HEADER_SECTORS && end <= file_sectors {
                used[start..end].fill(true);
            }
        }

        Ok(Self {
            file,
            header,
            used,
            scheme: CompressionScheme::Zlib,
            level: 6,
        })
    }

    /// Compression used for new writes. Reads accept every scheme.
    pub fn set_compression(&mut self, scheme: CompressionScheme, level: u32) {
        self.scheme = scheme;
        self.level = level;
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Read and decompress the chunk payload in `index`.
    /// Returns None if nothing was ever written there.
    pub fn read(&mut self, index: usize) -> Result<Option<Vec<u8>>> {
        let loc = self.header.locations[index];
        if loc.is_empty() {
            return Ok(None);
        }
        if (loc.offset as usize) < HEADER_SECTORS || loc.sectors == 0 {
            return Err(AnvilError::Corrupt(format!("slot {index}: invalid location {loc:?}")));
        }

        let file_len = self.file.metadata()?.len();
        let start = loc.byte_offset();
        if start + 5 > file_len {
            return Err(AnvilError::Corrupt(format!(
                "slot {index}: location {loc:?} is past the end of the file ({file_len} bytes)"
            )));
        }

        let mut prefix = [0u8; 5];
        self.file.seek(SeekFrom::Start(start))?;
        self.file.read_exact(&mut prefix)?;
        let length = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as u64;
        if length == 0 {
            return Err(AnvilError::Corrupt(format!("slot {index}: zero length payload")));
        }
        if length + 4 > loc.sectors as u64 * SECTOR_BYTES || start + 4 + length > file_len {
            return Err(AnvilError::Corrupt(format!(
                "slot {index}: payload of {length} bytes does not fit {} sectors",
                loc.sectors
            )));
        }
        let scheme = CompressionScheme::from_id(prefix[4]).ok_or_else(|| {
            AnvilError::Corrupt(format!("slot {index}: unsupported compression type {}", prefix[4]))
        })?;

        let mut data = vec![0u8; (length - 1) as usize];
        self.file.read_exact(&mut data)?;
        decompress(&data, scheme).map(Some)
    }

    /// Compress and write a chunk payload into `index`, replacing the old one.
    pub fn write(&mut self, index: usize, data: &[u8]) -> Result<()> {
        let compressed = compress(data, self.scheme, self.level)?;

        // [length:4][compression:1][data:N], padded to whole sectors
        let payload_len = compressed.len() + 1;
        let sectors = (payload_len + 4).div_ceil(SECTOR_BYTES as usize);
        if sectors > MAX_CHUNK_SECTORS {
            return Err(AnvilError::ChunkTooLarge(payload_len + 4));
        }

        let mut blob = Vec::with_capacity(sectors * SECTOR_BYTES as usize);
        blob.extend_from_slice(&(payload_len as u32).to_be_bytes());
        blob.push(self.scheme.id());
        blob.extend_from_slice(&compressed);
        blob.resize(sectors * SECTOR_BYTES as usize, 0);

        // Old sectors stay claimed until the header points elsewhere
        let old = self.header.locations[index];
        let old_timestamp = self.header.timestamps[index];
        let new = Location::new(self.allocate(sectors) as u32, sectors as u8);

        let written = self
            .file
            .seek(SeekFrom::Start(new.byte_offset()))
            .and_then(|_| self.file.write_all(&blob));
        if let Err(e) = written {
            self.release(new);
            return Err(e.into());
        }

        self.header.locations[index] = new;
        self.header.timestamps[index] = now();
        if let Err(e) = self.write_header_entry(index) {
            self.header.locations[index] = old;
            self.header.timestamps[index] = old_timestamp;
            self.release(new);
            return Err(e);
        }
        self.release(old);
        // An old entry that was never valid may overlap the new run
        self.mark(new, true);
        Ok(())
    }

    /// Drop the chunk in `index`. Its sectors become free for later writes.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        let old = self.header.locations[index];
        if old.is_empty() {
            return Ok(());
        }
        self.release(old);
        self.header.locations[index] = Location::EMPTY;
        self.header.timestamps[index] = 0;
        self.write_header_entry(index)
    }

    /// Slots that currently hold a chunk.
    pub fn occupied(&self) -> Vec<usize> {
        (0..CHUNKS_PER_REGION)
            .filter(|&i| !self.header.locations[i].is_empty())
            .collect()
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn write_header_entry(&mut self, index: usize) -> Result<()> {
        for (pos, bytes) in [self.header.location_entry(index), self.header.timestamp_entry(index)] {
            self.file.seek(SeekFrom::Start(pos))?;
            self.file.write_all(&bytes)?;
        }
        Ok(())
    }

    /// First free run of `count` sectors, or the end of the file.
    fn allocate(&mut self, count: usize) -> usize {
        let mut run = 0;
        for i in HEADER_SECTORS..self.used.len() {
            if self.used[i] {
                run = 0;
                continue;
            }
            run += 1;
            if run == count {
                let start = i + 1 - count;
                self.used[start..=i].fill(true);
                return start;
            }
        }
        // Extend, reusing a free tail if there is one
        let start = self.used.len() - run;
        self.used.resize(start + count, true);
        self.used[start..].fill(true);
        start
    }

    fn release(&mut self, loc: Location) {
        self.mark(loc, false);
    }

    fn mark(&mut self, loc: Location, value: bool) {
        if loc.is_empty() {
            return;
        }
        let start = loc.offset as usize;
        let end = (start + loc.sectors as usize).min(self.used.len());
        if start >= HEADER_SECTORS && start < end {
            self.used[start..end].fill(value);
        }
    }
}

fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap incompressible bytes (xorshift).
    fn noise(len: usize, mut seed: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                seed as u8
            })
            .collect()
    }

    fn open_temp() -> (tempfile::TempDir, std::path::PathBuf, RegionFile) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        let region = RegionFile::open(&path).unwrap();
        (dir, path, region)
    }

    #[test]
    fn test_local_index() {
        // 0,0 -> Index 0; 31,0 -> Index 31; 0,1 -> Index 32
        assert_eq!(RegionPos::local_index(0, 0), 0);
        assert_eq!(RegionPos::local_index(31, 0), 31);
        assert_eq!(RegionPos::local_index(0, 1), 32);
        // Negative chunks wrap into their own region
        assert_eq!(RegionPos::local_index(-1, -1), 1023);
    }

    #[test]
    fn test_region_of_chunk() {
        assert_eq!(RegionPos::containing(31, 31), RegionPos { x: 0, z: 0 });
        assert_eq!(RegionPos::containing(32, -1), RegionPos { x: 1, z: -1 });
        assert_eq!(RegionPos::containing(-33, 0), RegionPos { x: -2, z: 0 });
        assert_eq!(RegionPos { x: -1, z: 2 }.file_name(), "r.-1.2.mca");
    }

    #[test]
    fn test_chunk_at_round_trip() {
        // Test all possible chunks in a region (32x32)
        let region = RegionPos { x: -1, z: 1 };
        for z in 32..64 {
            for x in -32..0 {
                let index = RegionPos::local_index(x, z);
                assert_eq!(region.chunk_at(index), (x, z), "Mismatch at {x},{z}");
            }
        }
    }

    #[test]
    fn test_new_file_has_header() {
        let (_dir, path, region) = open_temp();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_BYTES);
        assert!(region.occupied().is_empty());
    }

    #[test]
    fn test_empty_slot_reads_none() {
        let (_dir, _path, mut region) = open_temp();
        assert!(region.read(5).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, _path, mut region) = open_temp();
        region.write(33, b"hello region").unwrap();
        assert_eq!(region.read(33).unwrap().unwrap(), b"hello region");
        assert_eq!(region.occupied(), vec![33]);
        assert_eq!(region.header().locations[33], Location::new(2, 1));
        assert!(region.header().timestamps[33] > 0);
    }

    #[test]
    fn test_reopen_preserves_chunks() {
        let (_dir, path, mut region) = open_temp();
        region.write(0, b"first").unwrap();
        region.write(1023, b"last").unwrap();
        drop(region);

        let mut region = RegionFile::open(&path).unwrap();
        assert_eq!(region.read(0).unwrap().unwrap(), b"first");
        assert_eq!(region.read(1023).unwrap().unwrap(), b"last");
    }

    #[test]
    fn test_growing_chunk_moves() {
        let (_dir, _path, mut region) = open_temp();
        region.write(0, b"small").unwrap();
        region.write(1, b"neighbour").unwrap();

        // Too big for its single sector: must not overwrite slot 1
        let big = noise(3 * SECTOR_BYTES as usize, 7);
        region.write(0, &big).unwrap();

        assert_eq!(region.read(0).unwrap().unwrap(), big);
        assert_eq!(region.read(1).unwrap().unwrap(), b"neighbour");
        assert_eq!(region.header().locations[0].offset, 4);
    }

    #[test]
    fn test_rewrite_lands_beside_old_payload() {
        let (_dir, path, mut region) = open_temp();
        region.write(0, b"version one").unwrap();
        let before = region.header().locations[0];

        region.write(0, b"version two").unwrap();
        let after = region.header().locations[0];
        assert_ne!(before.offset, after.offset);
        assert_eq!(region.read(0).unwrap().unwrap(), b"version two");

        // Point the header back at the old run: it still decodes
        drop(region);
        let mut bytes = std::fs::read(&path).unwrap();
        assert_eq!(before, Location::new(2, 1));
        bytes[0..4].copy_from_slice(&[0, 0, 2, 1]);
        std::fs::write(&path, &bytes).unwrap();
        let mut region = RegionFile::open(&path).unwrap();
        assert_eq!(region.read(0).unwrap().unwrap(), b"version one");
    }

    #[test]
    fn test_rewrite_frees_old_sectors() {
        let (_dir, _path, mut region) = open_temp();
        region.write(0, b"v1").unwrap();
        region.write(0, b"v2").unwrap();
        // Sector 2 was released once slot 0 moved to sector 3
        region.write(1, b"other").unwrap();
        assert_eq!(region.header().locations[1].offset, 2);
    }

    #[test]
    fn test_freed_sectors_are_reused() {
        let (_dir, path, mut region) = open_temp();
        region.write(0, b"a").unwrap();
        region.write(1, b"b").unwrap();
        region.remove(0).unwrap();
        assert!(region.read(0).unwrap().is_none());

        region.write(2, b"c").unwrap();
        assert_eq!(region.header().locations[2].offset, 2);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_BYTES + 2 * SECTOR_BYTES);
    }

    #[test]
    fn test_too_large_chunk_rejected() {
        let (_dir, _path, mut region) = open_temp();
        region.set_compression(CompressionScheme::None, 0);
        let huge = vec![1u8; MAX_CHUNK_SECTORS * SECTOR_BYTES as usize];
        assert!(matches!(region.write(0, &huge), Err(AnvilError::ChunkTooLarge(_))));
        assert!(region.read(0).unwrap().is_none());
    }

    #[test]
    fn test_gzip_written_chunk_is_readable() {
        let (_dir, path, mut region) = open_temp();
        region.set_compression(CompressionScheme::Gzip, 6);
        region.write(7, b"gzip payload").unwrap();
        drop(region);

        let mut region = RegionFile::open(&path).unwrap();
        assert_eq!(region.read(7).unwrap().unwrap(), b"gzip payload");
    }

    #[test]
    fn test_lz4_written_chunk_is_readable() {
        let (_dir, path, mut region) = open_temp();
        region.set_compression(CompressionScheme::Lz4, 0);
        let payload = b"lz4 payload lz4 payload lz4 payload".repeat(50);
        region.write(12, &payload).unwrap();
        drop(region);

        let mut region = RegionFile::open(&path).unwrap();
        assert_eq!(region.read(12).unwrap().unwrap(), payload);
    }

    #[test]
    fn test_unknown_compression_is_corrupt() {
        let (_dir, path, mut region) = open_temp();
        region.write(0, b"data").unwrap();
        drop(region);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[HEADER_BYTES as usize + 4] = 99;
        std::fs::write(&path, &bytes).unwrap();

        let mut region = RegionFile::open(&path).unwrap();
        assert!(region.read(0).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_location_past_eof_is_corrupt() {
        let (_dir, path, region) = open_temp();
        drop(region);

        let mut bytes = std::fs::read(&path).unwrap();
        // Slot 0 -> sector 500
        bytes[0..4].copy_from_slice(&[0, 1, 0xF4, 1]);
        std::fs::write(&path, &bytes).unwrap();

        let mut region = RegionFile::open(&path).unwrap();
        assert!(region.read(0).unwrap_err().is_corrupt());
        // Other slots stay usable
        region.write(1, b"ok").unwrap();
        assert_eq!(region.read(1).unwrap().unwrap(), b"ok");
    }

    #[test]
    fn test_truncated_header_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        std::fs::write(&path, [0u8; 100]).unwrap();
        assert!(RegionFile::open(&path).err().unwrap().is_corrupt());
    }
}
