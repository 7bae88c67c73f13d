use super::*;

const HEAL_DIVISOR: i32 = 32;
const MANA_DIVISOR: i32 = 128;

/// Adds `8 * stat / speed` to `acc` and returns the whole points it now holds.
fn accumulate(acc: &mut i32, stat: i32, speed: f32, divisor: i32) -> i32 {
    *acc = acc.saturating_add((8.0 * stat as f32 / speed) as i32);
    let gained = *acc / divisor;
    *acc %= divisor;
    gained
}

impl Engine<'_> {
    /// Per-tick regeneration and fear recovery. Slow creatures fill their
    /// accumulators faster per call, so every creature regains the same
    /// amount per unit of game time.
    pub fn do_living(&mut self, op: ObjectId) {
        let min_speed = self.config.min_active_speed;
        let Some(ob) = self.world.get_mut(op) else { return };
        let speed = ob.speed.abs().max(min_speed);

        let stats = &mut ob.stats;
        if stats.constitution > 0 && stats.hp < stats.max_hp {
            let gained = accumulate(&mut ob.last_heal, stats.constitution, speed, HEAL_DIVISOR);
            stats.hp = stats.hp.saturating_add(gained).min(stats.max_hp);
            let threshold = (ob.run_away as f32 / 100.0 * stats.max_hp as f32) as i32;
            if ob.flags.contains(ObjectFlags::RUN_AWAY) && stats.hp >= threshold {
                ob.flags.remove(ObjectFlags::RUN_AWAY);
            }
        }
        if stats.power > 0 && stats.sp < stats.max_sp {
            let gained = accumulate(&mut ob.last_sp, stats.power, speed, MANA_DIVISOR);
            stats.sp = stats.sp.saturating_add(gained).min(stats.max_sp);
        }

        let scared = ob.has(ObjectFlags::SCARED);
        if scared && self.rng.one_in(self.config.fear_recovery) {
            self.set_flag(op, ObjectFlags::SCARED, false);
        }
    }
}
