use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pos::BlockPos;

/// A numeric id or name that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownSetting {
    pub kind: &'static str,
    pub value: String,
}

/// Default game mode for players joining the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl GameMode {
    /// Numeric id as stored in `level.dat` (`GameType`).
    pub fn id(self) -> i32 {
        match self {
            GameMode::Survival => 0,
            GameMode::Creative => 1,
            GameMode::Adventure => 2,
            GameMode::Spectator => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GameMode::Survival => "survival",
            GameMode::Creative => "creative",
            GameMode::Adventure => "adventure",
            GameMode::Spectator => "spectator",
        }
    }
}

impl TryFrom<i32> for GameMode {
    type Error = UnknownSetting;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(GameMode::Survival),
            1 => Ok(GameMode::Creative),
            2 => Ok(GameMode::Adventure),
            3 => Ok(GameMode::Spectator),
            _ => Err(UnknownSetting { kind: "game mode", value: id.to_string() }),
        }
    }
}

impl FromStr for GameMode {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "survival" | "0" => Ok(GameMode::Survival),
            "creative" | "1" => Ok(GameMode::Creative),
            "adventure" | "2" => Ok(GameMode::Adventure),
            "spectator" | "3" => Ok(GameMode::Spectator),
            _ => Err(UnknownSetting { kind: "game mode", value: s.to_string() }),
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Peaceful,
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    /// Numeric id as stored in `level.dat` (`Difficulty`, a byte).
    pub fn id(self) -> i8 {
        match self {
            Difficulty::Peaceful => 0,
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Peaceful => "peaceful",
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

impl TryFrom<i8> for Difficulty {
    type Error = UnknownSetting;

    fn try_from(id: i8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Difficulty::Peaceful),
            1 => Ok(Difficulty::Easy),
            2 => Ok(Difficulty::Normal),
            3 => Ok(Difficulty::Hard),
            _ => Err(UnknownSetting { kind: "difficulty", value: id.to_string() }),
        }
    }
}

impl FromStr for Difficulty {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "peaceful" | "0" => Ok(Difficulty::Peaceful),
            "easy" | "1" => Ok(Difficulty::Easy),
            "normal" | "2" => Ok(Difficulty::Normal),
            "hard" | "3" => Ok(Difficulty::Hard),
            _ => Err(UnknownSetting { kind: "difficulty", value: s.to_string() }),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The world-scalar settings every provider keeps.
///
/// `Default` is what a provider reports for a world that was never written:
/// no name, spawn at (0, 30, 0), time 0 with the cycle running, adventure
/// mode, normal difficulty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSettings {
    pub name: String,
    pub spawn: BlockPos,
    pub time: i64,
    pub time_cycle: bool,
    pub game_mode: GameMode,
    pub difficulty: Difficulty,
}

impl WorldSettings {
    pub const DEFAULT_SPAWN: BlockPos = BlockPos { x: 0, y: 30, z: 0 };
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            spawn: Self::DEFAULT_SPAWN,
            time: 0,
            time_cycle: true,
            game_mode: GameMode::Adventure,
            difficulty: Difficulty::Normal,
        }
    }
}
