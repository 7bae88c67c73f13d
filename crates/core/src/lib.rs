pub mod ai;
pub mod config;
pub mod hash;
pub mod rng;
pub mod scenario;
pub mod services;
pub mod state;
pub mod types;

pub use ai::{
    Engine, PatternSense, RangeVector, Scheduler, TickReport, combat_direction, monster_move, range_vector, stand_in_light,
};
pub use config::{AiConfig, ConfigError};
pub use hash::snapshot_hash;
pub use rng::{RandomSource, ScriptedRandom, SeededRandom};
pub use scenario::{Built, Scenario, ScenarioError};
pub use services::{ApplyMode, GameServices, NullServices, SpellCost};
pub use state::{Map, Object, World, WorldError};
pub use types::*;
