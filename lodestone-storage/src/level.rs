//! `level.dat`: world-scalar settings as gzip-compressed NBT.
//!
//! Only the tags below are interpreted. Writing merges them into the
//! existing file, so other tags (seed, world border, other game rules) are
//! kept as they were.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use fastnbt::Value;
use serde::Deserialize;

use lodestone_world::{data_version, BlockPos, Compound, Difficulty, GameMode, WorldSettings};

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid level.dat: {0}")]
    Nbt(#[from] fastnbt::error::Error),
}

#[derive(Debug, Deserialize)]
struct LevelDat {
    #[serde(rename = "Data")]
    data: LevelData,
}

#[derive(Debug, Deserialize)]
struct LevelData {
    #[serde(rename = "DataVersion", default)]
    data_version: i32,
    #[serde(rename = "LevelName", default)]
    level_name: String,
    #[serde(rename = "SpawnX", default)]
    spawn_x: i32,
    #[serde(rename = "SpawnY", default)]
    spawn_y: i32,
    #[serde(rename = "SpawnZ", default)]
    spawn_z: i32,
    #[serde(rename = "Time", default)]
    time: i64,
    #[serde(rename = "GameType", default)]
    game_type: i32,
    #[serde(rename = "Difficulty", default)]
    difficulty: i8,
    // Game rules are strings, e.g. doDaylightCycle = "true"
    #[serde(rename = "GameRules", default)]
    game_rules: HashMap<String, String>,
}

const DAYLIGHT_CYCLE: &str = "doDaylightCycle";

impl LevelData {
    /// Values that do not map to a known setting fall back to the default.
    fn into_settings(self) -> WorldSettings {
        let defaults = WorldSettings::default();
        WorldSettings {
            name: self.level_name,
            spawn: BlockPos::new(self.spawn_x, self.spawn_y, self.spawn_z),
            time: self.time,
            time_cycle: self
                .game_rules
                .get(DAYLIGHT_CYCLE)
                .map_or(defaults.time_cycle, |v| v != "false"),
            game_mode: GameMode::try_from(self.game_type).unwrap_or_else(|e| {
                log::warn!("level.dat: {e}, using {}", defaults.game_mode);
                defaults.game_mode
            }),
            difficulty: Difficulty::try_from(self.difficulty).unwrap_or_else(|e| {
                log::warn!("level.dat: {e}, using {}", defaults.difficulty);
                defaults.difficulty
            }),
        }
    }
}

/// Overwrite the interpreted tags of a `Data` compound with `settings`.
fn merge_settings(data: &mut Compound, settings: &WorldSettings) {
    let tags = [
        ("DataVersion", Value::Int(data_version())),
        ("LevelName", Value::String(settings.name.clone())),
        ("SpawnX", Value::Int(settings.spawn.x)),
        ("SpawnY", Value::Int(settings.spawn.y)),
        ("SpawnZ", Value::Int(settings.spawn.z)),
        ("Time", Value::Long(settings.time)),
        ("GameType", Value::Int(settings.game_mode.id())),
        ("Difficulty", Value::Byte(settings.difficulty.id())),
    ];
    for (key, value) in tags {
        data.insert(key.to_string(), value);
    }

    let rules = data
        .entry("GameRules".to_string())
        .or_insert_with(|| Value::Compound(Compound::new()));
    if !matches!(rules, Value::Compound(_)) {
        *rules = Value::Compound(Compound::new());
    }
    if let Value::Compound(rules) = rules {
        rules.insert(DAYLIGHT_CYCLE.to_string(), Value::String(settings.time_cycle.to_string()));
    }
}

fn read_nbt(path: &Path) -> Result<Option<Vec<u8>>, LevelError> {
    let compressed = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut nbt = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut nbt)?;
    Ok(Some(nbt))
}

/// Read settings from `path`. Returns None if the file does not exist.
pub fn read(path: &Path) -> Result<Option<WorldSettings>, LevelError> {
    let Some(nbt) = read_nbt(path)? else {
        return Ok(None);
    };
    let level: LevelDat = fastnbt::from_bytes(&nbt)?;
    Ok(Some(level.data.into_settings()))
}

/// Write settings to `path` through a temporary file, so a crash leaves
/// either the old or the new file in place. An unreadable existing file is
/// replaced by one holding only the interpreted tags.
pub fn write(path: &Path, settings: &WorldSettings) -> Result<(), LevelError> {
    let mut root: Compound = match read_nbt(path) {
        Ok(Some(nbt)) => fastnbt::from_bytes(&nbt).unwrap_or_else(|e| {
            log::warn!("Replacing unreadable {}: {}", path.display(), e);
            Compound::new()
        }),
        Ok(None) => Compound::new(),
        Err(e) => {
            log::warn!("Replacing unreadable {}: {}", path.display(), e);
            Compound::new()
        }
    };
    let data = root
        .entry("Data".to_string())
        .or_insert_with(|| Value::Compound(Compound::new()));
    if !matches!(data, Value::Compound(_)) {
        *data = Value::Compound(Compound::new());
    }
    if let Value::Compound(data) = data {
        merge_settings(data, settings);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let nbt = fastnbt::to_bytes(&root)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&nbt)?;
    let compressed = encoder.finish()?;

    let tmp = path.with_extension("dat_tmp");
    fs::write(&tmp, compressed)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
