use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use lz4_java_wrc::{Lz4BlockInput, Lz4BlockOutput};

use crate::{AnvilError, Result};

/// Compression type byte stored in front of every chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionScheme {
    Gzip,
    Zlib,
    None,
    /// LZ4 in the Java block-stream framing.
    Lz4,
}

impl CompressionScheme {
    pub fn id(self) -> u8 {
        match self {
            CompressionScheme::Gzip => 1,
            CompressionScheme::Zlib => 2,
            CompressionScheme::None => 3,
            CompressionScheme::Lz4 => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(CompressionScheme::Gzip),
            2 => Some(CompressionScheme::Zlib),
            3 => Some(CompressionScheme::None),
            4 => Some(CompressionScheme::Lz4),
            _ => None,
        }
    }
}

pub fn compress(data: &[u8], scheme: CompressionScheme, level: u32) -> Result<Vec<u8>> {
    let level = Compression::new(level.min(9));
    match scheme {
        CompressionScheme::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), level);
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        CompressionScheme::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        CompressionScheme::None => Ok(data.to_vec()),
        CompressionScheme::Lz4 => {
            // Level does not apply
            let mut out = Vec::new();
            let mut encoder = Lz4BlockOutput::new(&mut out);
            encoder.write_all(data)?;
            encoder.flush()?;
            drop(encoder);
            Ok(out)
        }
    }
}

/// Decompress a payload. A stream that fails to inflate is corrupt data,
/// not an I/O failure.
pub fn decompress(data: &[u8], scheme: CompressionScheme) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let inflated = match scheme {
        CompressionScheme::Gzip => GzDecoder::new(data).read_to_end(&mut out),
        CompressionScheme::Zlib => ZlibDecoder::new(data).read_to_end(&mut out),
        CompressionScheme::Lz4 => Lz4BlockInput::new(data).read_to_end(&mut out),
        CompressionScheme::None => return Ok(data.to_vec()),
    };
    inflated.map_err(|e| AnvilError::Corrupt(format!("{scheme:?} stream: {e}")))?;
    Ok(out)
}
