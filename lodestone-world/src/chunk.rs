//! Chunk terrain data as it crosses the provider boundary.
//!
//! Mirrors the section layout of Minecraft chunks (1.18+): a column of
//! 16x16x16 sections, each with a block palette and a biome palette. The
//! provider stores and returns these values; it never interprets them beyond
//! what its own encoding needs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Minecraft data version for 1.21.11 (default).
pub const DEFAULT_DATA_VERSION: i32 = 4671;

/// Data version written into stored records.
/// Can be overridden by the LODESTONE_DATA_VERSION env var.
pub fn data_version() -> i32 {
    std::env::var("LODESTONE_DATA_VERSION")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_DATA_VERSION)
}

/// Block and biome data of one chunk column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    // Vertical slices of the chunk (16 blocks high each)
    pub sections: Vec<Section>,
}

impl Chunk {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Section at vertical index `y`, if the chunk has one.
    pub fn section(&self, y: i8) -> Option<&Section> {
        self.sections.iter().find(|s| s.y == y)
    }

    /// Lowest section index, used as the chunk's `yPos` when stored.
    pub fn min_section(&self) -> Option<i8> {
        self.sections.iter().map(|s| s.y).min()
    }
}

// --- Section (16x16x16 Cube) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    // Vertical index of this section (e.g., -4 for the bottom, up to 19)
    #[serde(rename = "Y")]
    pub y: i8,

    // Optional because empty sections might omit this.
    #[serde(rename = "block_states", alias = "BlockStates", default, skip_serializing_if = "Option::is_none")]
    pub block_states: Option<BlockStates>,

    #[serde(rename = "biomes", alias = "Biomes", default, skip_serializing_if = "Option::is_none")]
    pub biomes: Option<Biomes>,
}

impl Section {
    /// A section made of a single block and a single biome.
    pub fn filled(y: i8, block: &str, biome: &str) -> Self {
        Self {
            y,
            block_states: Some(BlockStates {
                palette: vec![BlockState::new(block)],
                data: None,
            }),
            biomes: Some(Biomes {
                palette: vec![biome.to_string()],
                data: None,
            }),
        }
    }
}

// --- Block Palette ---
// Instead of storing 4096 block IDs, a section stores the unique blocks
// (palette) plus packed indices into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStates {
    pub palette: Vec<BlockState>,
    // Indices into the palette. Required if palette length > 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<fastnbt::LongArray>,
}

// --- Biome Palette ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biomes {
    pub palette: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<fastnbt::LongArray>,
}

// --- Single Block ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockState {
    #[serde(rename = "Name")]
    pub name: String,
    // waterlogged, facing, ...
    #[serde(rename = "Properties", default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
}

impl BlockState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: None,
        }
    }
}
