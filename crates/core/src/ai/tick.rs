//! One decision for one monster: the per-tick driver.

use super::spatial::range_vector;
use super::*;

impl Engine<'_> {
    /// Runs the full decision for `op`: enemy selection, regeneration, the
    /// wake gate, housekeeping, then either idle movement or a ranged
    /// action, a step or a swing against the enemy.
    pub fn monster_move(&mut self, op: ObjectId) -> TickOutcome {
        let Some(ob) = self.world.get(op) else { return TickOutcome::Continue };
        if ob.map.is_none() {
            return TickOutcome::Continue;
        }

        let target = if ob.has(ObjectFlags::NO_ATTACK) {
            self.set_enemy(op, None);
            None
        } else {
            let found = self.find_enemy(op);
            if let Some((enemy, _)) = found
                && let Some(enemy_ob) = self.world.get_mut(enemy)
            {
                enemy_ob.attacked_by = Some(op);
            }
            found
        };

        self.do_living(op);

        let flags = self.flags(op);
        let blind_in_dark = self.map_darkness(op) > 0 && !flags.intersects(ObjectFlags::SEE_IN_DARK | ObjectFlags::SEE_INVISIBLE);
        if (flags.intersects(ObjectFlags::SLEEP | ObjectFlags::BLIND) || blind_in_dark) && !self.check_wakeup(op, target) {
            return TickOutcome::Continue;
        }

        if flags.contains(ObjectFlags::HIDDEN) {
            self.services.hidden_move(self.world, op);
        }
        let Some(ob) = self.world.get(op) else { return TickOutcome::Destroyed };
        let (pick_up, will_apply) = (ob.pick_up, ob.will_apply);
        if !pick_up.is_empty() {
            self.check_pickup(op);
        }
        if !will_apply.is_empty() {
            self.apply_below(op);
        }

        let Some((enemy, _)) = target else { return self.move_no_enemy(op) };

        if let Some(outcome) = self.keep_up_with_owner(op) {
            return outcome;
        }

        let Some(rv) = range_vector(self.world, op, enemy, false) else { return TickOutcome::Continue };
        if let Some(ob) = self.world.get_mut(op)
            && ob.direction != rv.direction
        {
            ob.direction = rv.direction;
            ob.facing = rv.direction;
            self.services.facing_changed(self.world, op);
        }

        if !self.flags(op).contains(ObjectFlags::SCARED) && self.ranged_attack(op, enemy, &rv) {
            return TickOutcome::Continue;
        }
        self.engage(op, enemy, rv)
    }

    fn move_no_enemy(&mut self, op: ObjectId) -> TickOutcome {
        let Some(ob) = self.world.get(op) else { return TickOutcome::Destroyed };
        if ob.has(ObjectFlags::ONLY_ATTACK) {
            trace!(monster = %ob.name, "one-shot attacker has nothing left to hit");
            self.world.free_drop_inventory(op);
            return TickOutcome::Destroyed;
        }
        if ob.has(ObjectFlags::STAND_STILL) {
            return TickOutcome::Continue;
        }
        if let Some(pattern) = IdlePattern::from_attack_movement(ob.attack_movement) {
            self.idle_move(op, pattern);
        } else if ob.has(ObjectFlags::RANDOM_MOVE) {
            self.move_randomly(op);
        }
        TickOutcome::Continue
    }

    /// A pet whose owner left for another map tries to follow. A pet that
    /// could not follow is dropped unless it is anchored in place.
    fn keep_up_with_owner(&mut self, op: ObjectId) -> Option<TickOutcome> {
        if !self.world.get(op).is_some_and(Object::is_pet) {
            return None;
        }
        let owner = self.live_owner(op)?;
        if self.world.on_same_map(op, owner) {
            return None;
        }
        self.services.pet_follow_owner(self.world, op);
        let Some(ob) = self.world.get(op) else { return Some(TickOutcome::Destroyed) };
        if self.world.is_removed(op) && ob.speed.abs() > self.config.min_active_speed {
            debug!(pet = %ob.name, "pet lost its owner");
            self.world.free_drop_inventory(op);
            return Some(TickOutcome::Destroyed);
        }
        Some(TickOutcome::Continue)
    }
}
