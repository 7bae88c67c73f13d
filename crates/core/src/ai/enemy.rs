//! Enemy validation and selection.

use super::spatial::range_vector;
use super::*;

impl Engine<'_> {
    pub(super) fn live_owner(&self, id: ObjectId) -> Option<ObjectId> {
        self.world.get(id)?.owner.filter(|&o| self.world.exists(o))
    }

    fn is_pet(&self, id: ObjectId) -> bool {
        self.world.get(id).is_some_and(Object::is_pet)
    }

    /// Whether `npc` may go on fighting `enemy`. Stale, removed, off-map,
    /// self and neutral targets are never legal; friendlies fight only
    /// hostile monsters, hostiles only friendlies and players.
    pub fn is_legal_enemy(&self, npc: ObjectId, enemy: ObjectId) -> bool {
        let world = &*self.world;
        if world.is_removed(enemy) || world.head_of(npc) == world.head_of(enemy) {
            return false;
        }
        if !world.on_same_map(npc, enemy) {
            return false;
        }
        let (Some(me), Some(them)) = (world.get(npc), world.get(enemy)) else { return false };
        let owner = self.live_owner(npc);
        let allowed = match (me.alignment(), them.alignment()) {
            (Alignment::Neutral, _) | (_, Alignment::Neutral) => false,
            (Alignment::Friendly, theirs) => {
                theirs != Alignment::Friendly && !them.is_player() && owner != Some(enemy)
            }
            (Alignment::Hostile, theirs) => theirs == Alignment::Friendly || them.is_player(),
        };
        allowed && them.is_combatant()
    }

    /// Alignment filter for a creature that just hit `npc`.
    fn may_strike_back(&self, npc: ObjectId, attacker: ObjectId) -> bool {
        let (Some(me), Some(them)) = (self.world.get(npc), self.world.get(attacker)) else {
            return false;
        };
        match (me.alignment(), them.alignment()) {
            (Alignment::Neutral, _) | (_, Alignment::Neutral) => false,
            (Alignment::Friendly, theirs) => theirs != Alignment::Friendly,
            (Alignment::Hostile, theirs) => theirs == Alignment::Friendly || them.is_player(),
        }
    }

    /// Revalidates the current enemy and returns it if it can still be detected.
    /// A pet with no enemy borrows its owner's; an orphaned pet drops its enemy.
    pub fn check_enemy(&mut self, npc: ObjectId) -> Option<(ObjectId, RangeVector)> {
        if self.is_pet(npc) {
            match self.live_owner(npc) {
                None => self.set_enemy(npc, None),
                Some(owner) => {
                    if self.world.get(npc)?.enemy.is_none() {
                        let inherited = self.world.get(owner)?.enemy;
                        self.set_enemy(npc, inherited);
                    }
                }
            }
        }
        let enemy = self.world.get(npc)?.enemy?;
        if !self.is_legal_enemy(npc, enemy) {
            trace!(npc = %self.name(npc), "dropping illegal enemy");
            self.set_enemy(npc, None);
            return None;
        }
        self.can_detect_enemy(npc, enemy).map(|rv| (enemy, rv))
    }

    /// Picks the enemy `npc` acts against this tick, in priority order: a
    /// fresh attacker, anything nearby when berserk, the pet target, the
    /// current enemy, then the nearest player for aggressive creatures.
    /// `attacked_by` is consumed by the call.
    pub fn find_enemy(&mut self, npc: ObjectId) -> Option<(ObjectId, RangeVector)> {
        let attacker = self.world.get_mut(npc)?.attacked_by.take();
        if let Some(attacker) = attacker.filter(|&a| self.world.exists(a)) {
            self.set_flag(npc, ObjectFlags::SLEEP, false);
            if self.may_strike_back(npc, attacker) && self.world.on_same_map(npc, attacker) {
                self.set_enemy(npc, Some(attacker));
                if let Some(rv) = self.can_detect_enemy(npc, attacker) {
                    return Some((attacker, rv));
                }
            }
        }

        let disposition = Disposition::of(self.flags(npc));
        if disposition.berserk {
            let target = self.find_nearest_living_creature(npc)?;
            let rv = range_vector(self.world, npc, target, true)?;
            self.set_enemy(npc, Some(target));
            return Some((target, rv));
        }

        if self.is_pet(npc) {
            let target = self.services.pet_select_enemy(self.world, npc)?;
            self.set_enemy(npc, Some(target));
            return self.can_detect_enemy(npc, target).map(|rv| (target, rv));
        }

        if let Some(found) = self.check_enemy(npc) {
            return Some(found);
        }

        if disposition.is_aggressive() {
            let candidate = self.nearest_player(npc);
            self.set_enemy(npc, candidate);
            if candidate.is_some() {
                return self.check_enemy(npc);
            }
        }
        None
    }
}
