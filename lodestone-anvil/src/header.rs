//! Region file header.
//!
//! The header consists of two tables:
//! - Location table: where each chunk is stored
//! - Timestamp table: when each chunk was last saved

use crate::region::{CHUNKS_PER_REGION, HEADER_BYTES, SECTOR_BYTES};

/// Location table entry: 3 bytes sector offset + 1 byte sector count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub offset: u32,
    pub sectors: u8,
}

impl Location {
    pub const EMPTY: Location = Location { offset: 0, sectors: 0 };

    pub fn new(offset: u32, sectors: u8) -> Self {
        Self { offset, sectors }
    }

    /// No chunk was ever written to this slot.
    pub fn is_empty(&self) -> bool {
        self.offset == 0 && self.sectors == 0
    }

    pub fn byte_offset(&self) -> u64 {
        self.offset as u64 * SECTOR_BYTES
    }

    fn to_bytes(self) -> [u8; 4] {
        [
            ((self.offset >> 16) & 0xFF) as u8,
            ((self.offset >> 8) & 0xFF) as u8,
            (self.offset & 0xFF) as u8,
            self.sectors,
        ]
    }

    fn from_bytes(b: [u8; 4]) -> Self {
        Self {
            offset: (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32,
            sectors: b[3],
        }
    }
}

/// Parsed 8 KiB region header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub locations: Vec<Location>,
    pub timestamps: Vec<u32>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            locations: vec![Location::EMPTY; CHUNKS_PER_REGION],
            timestamps: vec![0; CHUNKS_PER_REGION],
        }
    }
}

impl Header {
    /// Parse a header from its 8192 raw bytes.
    pub fn parse(bytes: &[u8; HEADER_BYTES as usize]) -> Self {
        let mut header = Self::default();
        for i in 0..CHUNKS_PER_REGION {
            let loc = i * 4;
            header.locations[i] =
                Location::from_bytes([bytes[loc], bytes[loc + 1], bytes[loc + 2], bytes[loc + 3]]);
            let ts = SECTOR_BYTES as usize + i * 4;
            header.timestamps[i] = u32::from_be_bytes([bytes[ts], bytes[ts + 1], bytes[ts + 2], bytes[ts + 3]]);
        }
        header
    }

    /// Encode the complete header (8192 bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_BYTES as usize];
        for i in 0..CHUNKS_PER_REGION {
            out[i * 4..i * 4 + 4].copy_from_slice(&self.locations[i].to_bytes());
            let ts = SECTOR_BYTES as usize + i * 4;
            out[ts..ts + 4].copy_from_slice(&self.timestamps[i].to_be_bytes());
        }
        out
    }

    /// Encoded location entry for one slot, and its byte offset in the file.
    pub(crate) fn location_entry(&self, index: usize) -> (u64, [u8; 4]) {
        ((index * 4) as u64, self.locations[index].to_bytes())
    }

    /// Encoded timestamp entry for one slot, and its byte offset in the file.
    pub(crate) fn timestamp_entry(&self, index: usize) -> (u64, [u8; 4]) {
        (SECTOR_BYTES + (index * 4) as u64, self.timestamps[index].to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        let header = Header::default();
        assert_eq!(header.to_bytes().len(), 8192);
    }

    #[test]
    fn test_location_encoding() {
        let mut header = Header::default();
        header.locations[0] = Location::new(2, 1);
        let bytes = header.to_bytes();
        // First chunk (index 0) at sector 2, one sector long
        assert_eq!(bytes[0], 0); // high byte
        assert_eq!(bytes[1], 0); // mid byte
        assert_eq!(bytes[2], 2); // low byte = sector 2
        assert_eq!(bytes[3], 1); // size = 1 sector
    }

    #[test]
    fn test_parse_restores_tables() {
        let mut header = Header::default();
        header.locations[31] = Location::new(0x01_02_03, 7);
        header.timestamps[31] = 1_700_000_000;
        header.locations[1023] = Location::new(2, 255);

        let bytes: [u8; 8192] = header.to_bytes().try_into().unwrap();
        assert_eq!(Header::parse(&bytes), header);
    }

    #[test]
    fn test_entry_offsets() {
        let header = Header::default();
        assert_eq!(header.location_entry(32).0, 128);
        assert_eq!(header.timestamp_entry(0).0, 4096);
        assert_eq!(header.timestamp_entry(1023).0, 4096 + 4092);
    }

    #[test]
    fn test_empty_location() {
        assert!(Location::EMPTY.is_empty());
        assert!(!Location::new(2, 1).is_empty());
        assert_eq!(Location::new(3, 1).byte_offset(), 12288);
    }
}
