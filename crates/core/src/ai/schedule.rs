//! Tick scheduler: hands out speed-based turns to every active monster.

use serde::Serialize;

use super::*;

/// What happened during one scheduler tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    /// `monster_move` calls made.
    pub acted: usize,
    /// Monsters that reported [`TickOutcome::Destroyed`].
    pub destroyed: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    tick: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Gives every active monster its turns for one tick. The set of
    /// monsters is fixed when the tick starts, in arena slot order, so a
    /// creature spawned mid-tick first acts on the next one.
    pub fn run_tick(
        &mut self,
        world: &mut World,
        rng: &mut dyn RandomSource,
        services: &mut dyn GameServices,
        config: &AiConfig,
    ) -> TickReport {
        self.tick += 1;
        let mut report = TickReport { tick: self.tick, ..TickReport::default() };
        let active: Vec<ObjectId> = world
            .objects
            .iter()
            .filter(|(_, o)| o.head.is_none() && o.is_alive() && o.map.is_some() && o.has(ObjectFlags::MONSTER))
            .map(|(id, _)| id)
            .collect();

        for id in active {
            let Some(ob) = world.get_mut(id) else { continue };
            let speed = ob.speed.abs();
            if speed < config.min_active_speed {
                continue;
            }
            ob.speed_left += speed;
            let mut turns = 0;
            loop {
                let Some(ob) = world.get_mut(id) else { break };
                if ob.speed_left < 1.0 {
                    break;
                }
                if turns == config.max_turns_per_tick {
                    // Turns beyond the cap are lost, not banked.
                    ob.speed_left = ob.speed_left.fract();
                    break;
                }
                turns += 1;
                ob.speed_left -= 1.0;
                report.acted += 1;
                let outcome = Engine::new(world, rng, services, config).monster_move(id);
                if outcome == TickOutcome::Destroyed {
                    trace!(tick = self.tick, "monster destroyed during its turn");
                    report.destroyed += 1;
                    break;
                }
            }
        }
        debug!(tick = report.tick, acted = report.acted, destroyed = report.destroyed, "tick finished");
        report
    }
}
