//! Per-tick monster decision engine.
//! This file wires the focused engine submodules together and exposes the
//! `monster_move` entry point used by the scheduler and by embedders.

use tracing::{debug, trace, warn};

use crate::config::AiConfig;
use crate::rng::RandomSource;
use crate::services::{ApplyMode, GameServices};
use crate::state::{Object, PatternOwner, World};
use crate::types::*;

mod actions;
mod enemy;
mod equipment;
mod living;
mod movement;
mod pathing;
mod patterns;
mod schedule;
mod spatial;
mod tick;
mod wake;

#[cfg(test)]
mod test_support;

pub use patterns::{PatternSense, combat_direction};
pub use schedule::{Scheduler, TickReport};
pub use spatial::{RangeVector, range_vector, stand_in_light};

/// Borrowed context for one monster decision. The world, the randomness
/// source and the game services are threaded through every helper so no
/// decision reaches for global state.
pub struct Engine<'a> {
    pub world: &'a mut World,
    pub rng: &'a mut dyn RandomSource,
    pub services: &'a mut dyn GameServices,
    pub config: &'a AiConfig,
}

impl<'a> Engine<'a> {
    pub fn new(
        world: &'a mut World,
        rng: &'a mut dyn RandomSource,
        services: &'a mut dyn GameServices,
        config: &'a AiConfig,
    ) -> Self {
        Self { world, rng, services, config }
    }

    fn flags(&self, id: ObjectId) -> ObjectFlags {
        self.world.get(id).map_or(ObjectFlags::empty(), |o| o.flags)
    }

    fn set_flag(&mut self, id: ObjectId, flag: ObjectFlags, on: bool) {
        if let Some(ob) = self.world.get_mut(id) {
            ob.set(flag, on);
        }
    }

    fn set_enemy(&mut self, id: ObjectId, enemy: Option<ObjectId>) {
        if let Some(ob) = self.world.get_mut(id) {
            ob.enemy = enemy;
        }
    }

    fn name(&self, id: ObjectId) -> String {
        self.world.get(id).map_or_else(String::new, |o| o.name.clone())
    }

    /// Turns `dir` by a random amount in `-2..=2`, weighted toward no turn.
    fn randomized_dir(&mut self, dir: Dir) -> Dir {
        let turn = self.rng.next_int(3) as i32 + self.rng.next_int(3) as i32 - 2;
        dir.rotated(turn)
    }

    fn random_dir(&mut self) -> Dir {
        Dir::wrap(self.rng.next_int(8) as i32 + 1)
    }
}

/// Runs one decision for the monster `id`. The caller must not use `id`
/// again when this returns [`TickOutcome::Destroyed`].
pub fn monster_move(
    world: &mut World,
    rng: &mut dyn RandomSource,
    services: &mut dyn GameServices,
    config: &AiConfig,
    id: ObjectId,
) -> TickOutcome {
    Engine::new(world, rng, services, config).monster_move(id)
}
