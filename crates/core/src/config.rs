//! Tunable constants of the monster AI, loadable from TOML.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// `1 in n` gates for the ranged/skill action chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionChances {
    pub spell: u32,
    pub scroll: u32,
    pub range: u32,
    pub skill: u32,
    pub bow: u32,
}

impl Default for ActionChances {
    fn default() -> Self {
        Self { spell: 3, scroll: 3, range: 3, skill: 3, bow: 2 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Floor for every perception radius.
    pub min_radius: i32,
    /// Ceiling for the detection radius.
    pub max_detect_radius: i32,
    /// Cells the path search may explore before giving up.
    pub path_budget: usize,
    pub bow_range: i32,
    /// Half-width of the box searched for light sources.
    pub light_search_radius: i32,
    pub actions: ActionChances,
    /// `1 in n` chance per tick for fear to wear off.
    pub fear_recovery: u32,
    pub random_move_tries: u32,
    pub line_of_fire_detour: i32,
    pub line_of_fire_steps: i32,
    /// Creatures slower than this never act and are kept when orphaned.
    pub min_active_speed: f32,
    /// Turns one monster may take in a single scheduler tick.
    pub max_turns_per_tick: u32,
    pub call_help_radius: i32,
    pub carry_limit_base: i32,
    pub carry_limit_per_str: i32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            min_radius: 3,
            max_detect_radius: 13,
            path_budget: 5000,
            bow_range: 100,
            light_search_radius: 4,
            actions: ActionChances::default(),
            fear_recovery: 20,
            random_move_tries: 15,
            line_of_fire_detour: 2,
            line_of_fire_steps: 50,
            min_active_speed: 0.00001,
            max_turns_per_tick: 8,
            call_help_radius: 3,
            carry_limit_base: 50_000,
            carry_limit_per_str: 10_000,
        }
    }
}

impl AiConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AiConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_radius < 1 {
            return Err(invalid("min_radius", "must be at least 1"));
        }
        if self.max_detect_radius < self.min_radius {
            return Err(invalid("max_detect_radius", "must not be below min_radius"));
        }
        if self.path_budget == 0 {
            return Err(invalid("path_budget", "must be positive"));
        }
        let a = self.actions;
        if [a.spell, a.scroll, a.range, a.skill, a.bow].contains(&0) {
            return Err(invalid("actions", "every chance denominator must be positive"));
        }
        if self.fear_recovery == 0 {
            return Err(invalid("fear_recovery", "must be positive"));
        }
        if self.max_turns_per_tick == 0 {
            return Err(invalid("max_turns_per_tick", "must be positive"));
        }
        Ok(())
    }

    pub fn weight_limit(&self, strength: i32) -> i32 {
        self.carry_limit_base + self.carry_limit_per_str * strength.max(0)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.to_string() }
}
