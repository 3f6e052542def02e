//! NBT layouts the backends store, and the conversions to and from the
//! values that cross the provider boundary.
//!
//! Every backend in this crate stores the same uncompressed NBT blobs; only
//! the container differs (region file slot, database row).

use std::collections::HashMap;

use fastnbt::{IntArray, Value};
use serde::{Deserialize, Serialize};

use lodestone_world::{data_version, Chunk, ChunkPos, Compound, DataKind, Entity, ProviderError, Result, Section};

// --- Chunk (region/r.X.Z.mca) ---
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkData {
    #[serde(rename = "DataVersion")]
    pub data_version: i32,

    // Chunk coordinates (absolute, not relative to region)
    #[serde(rename = "xPos")]
    pub x_pos: i32,
    #[serde(rename = "zPos")]
    pub z_pos: i32,
    #[serde(rename = "yPos", default)]
    pub y_pos: i32,

    // "minecraft:full" tells the server the chunk is fully generated.
    #[serde(rename = "Status", default)]
    pub status: String,

    #[serde(rename = "LastUpdate", default)]
    pub last_update: i64,

    #[serde(default)]
    pub sections: Vec<Section>,
}

// --- Entity set (entities/r.X.Z.mca) ---
#[derive(Debug, Serialize, Deserialize)]
pub struct EntityData {
    #[serde(rename = "DataVersion")]
    pub data_version: i32,
    // [x, z] of the owning chunk
    #[serde(rename = "Position")]
    pub position: IntArray,
    #[serde(rename = "Entities", default)]
    pub entities: Vec<Entity>,
}

// --- Block entities (blocks/r.X.Z.mca) ---
#[derive(Debug, Serialize, Deserialize)]
pub struct BlockEntityData {
    #[serde(rename = "DataVersion")]
    pub data_version: i32,
    #[serde(rename = "xPos")]
    pub x_pos: i32,
    #[serde(rename = "zPos")]
    pub z_pos: i32,
    #[serde(default)]
    pub block_entities: Vec<Compound>,
}

pub fn encode_chunk(pos: ChunkPos, chunk: &Chunk) -> Result<Vec<u8>> {
    let data = ChunkData {
        data_version: data_version(),
        x_pos: pos.x,
        z_pos: pos.z,
        y_pos: chunk.min_section().map_or(-4, i32::from),
        status: "minecraft:full".to_string(),
        last_update: 0,
        sections: chunk.sections.clone(),
    };
    fastnbt::to_bytes(&data).map_err(|e| ProviderError::encode(pos, DataKind::Chunk, e))
}

/// Decode a stored chunk. A chunk recorded under other coordinates is
/// treated as corrupt rather than handed to the wrong column.
pub fn decode_chunk(pos: ChunkPos, bytes: &[u8]) -> Result<Chunk> {
    let data: ChunkData =
        fastnbt::from_bytes(bytes).map_err(|e| ProviderError::corrupt(pos, DataKind::Chunk, e))?;
    if (data.x_pos, data.z_pos) != (pos.x, pos.z) {
        return Err(ProviderError::corrupt(
            pos,
            DataKind::Chunk,
            format!("data belongs to chunk ({}, {})", data.x_pos, data.z_pos),
        ));
    }
    Ok(Chunk::new(data.sections))
}

pub fn encode_entities(pos: ChunkPos, entities: &[Entity]) -> Result<Vec<u8>> {
    let data = EntityData {
        data_version: data_version(),
        position: IntArray::new(vec![pos.x, pos.z]),
        entities: entities.to_vec(),
    };
    fastnbt::to_bytes(&data).map_err(|e| ProviderError::encode(pos, DataKind::Entities, e))
}

pub fn decode_entities(pos: ChunkPos, bytes: &[u8]) -> Result<Vec<Entity>> {
    let data: EntityData =
        fastnbt::from_bytes(bytes).map_err(|e| ProviderError::corrupt(pos, DataKind::Entities, e))?;
    if data.position[..] != [pos.x, pos.z] {
        return Err(ProviderError::corrupt(
            pos,
            DataKind::Entities,
            format!("data belongs to chunk {:?}", &data.position[..]),
        ));
    }
    Ok(data.entities)
}

/// Flatten keyed block entities into records carrying their own `x`, `y`,
/// `z`. The key wins over any coordinates already in the record. Records
/// come out sorted by position so identical input encodes identically.
pub fn positioned_records(data: &HashMap<[i32; 3], Compound>) -> Vec<Compound> {
    let mut keys: Vec<_> = data.keys().copied().collect();
    keys.sort_unstable();
    keys.into_iter()
        .map(|key| {
            let mut record = data[&key].clone();
            for (name, v) in ["x", "y", "z"].into_iter().zip(key) {
                record.insert(name.to_string(), Value::Int(v));
            }
            record
        })
        .collect()
}

pub fn encode_block_entities(pos: ChunkPos, data: &HashMap<[i32; 3], Compound>) -> Result<Vec<u8>> {
    let data = BlockEntityData {
        data_version: data_version(),
        x_pos: pos.x,
        z_pos: pos.z,
        block_entities: positioned_records(data),
    };
    fastnbt::to_bytes(&data).map_err(|e| ProviderError::encode(pos, DataKind::BlockEntities, e))
}

pub fn decode_block_entities(pos: ChunkPos, bytes: &[u8]) -> Result<Vec<Compound>> {
    let data: BlockEntityData = fastnbt::from_bytes(bytes)
        .map_err(|e| ProviderError::corrupt(pos, DataKind::BlockEntities, e))?;
    if (data.x_pos, data.z_pos) != (pos.x, pos.z) {
        return Err(ProviderError::corrupt(
            pos,
            DataKind::BlockEntities,
            format!("data belongs to chunk ({}, {})", data.x_pos, data.z_pos),
        ));
    }
    Ok(data.block_entities)
}
