use super::spatial::is_unseen;
use super::*;

impl Engine<'_> {
    /// Decides whether `op` stays dormant this tick. A sleeping creature
    /// wakes when its enemy comes closer than a Wis-based radius; blindness
    /// and darkness shrink the radius, a stealthy enemy halves it.
    pub fn check_wakeup(&mut self, op: ObjectId, target: Option<(ObjectId, RangeVector)>) -> bool {
        let Some((enemy, rv)) = target else { return false };
        let Some(ob) = self.world.get(op) else { return false };
        let min = self.config.min_radius;
        let mut radius = ob.stats.wisdom.max(min);
        let flags = ob.flags;
        let darkness = self.map_darkness(op);

        let enemy_unseen = self.world.get(enemy).is_none_or(is_unseen);
        let dark_vision = flags.contains(ObjectFlags::SEE_IN_DARK | ObjectFlags::SEE_INVISIBLE);
        if flags.contains(ObjectFlags::BLIND) {
            radius = min;
        } else if darkness > 0 && !enemy_unseen && !dark_vision && !self.in_light(enemy) {
            let dark = radius / darkness;
            radius = if dark > min { dark + 1 } else { min };
        } else if !flags.contains(ObjectFlags::SLEEP) {
            return true;
        }

        if self.flags(enemy).contains(ObjectFlags::STEALTH) {
            radius = radius / 2 + 1;
        }
        if rv.distance < radius {
            self.set_flag(op, ObjectFlags::SLEEP, false);
            return true;
        }
        false
    }
}
