//! Movement pattern library.
//! Combat patterns bend the direction toward the enemy; idle patterns move
//! a creature that has nothing to fight. Every pattern keeps its progress in
//! the object's pattern counter, which restarts when another pattern takes over.

use super::*;

/// What a combat pattern may look at when it picks a direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternSense {
    /// Melee reach to the enemy this tick.
    pub in_range: bool,
    pub distance: i32,
    pub hp: i32,
    pub max_hp: i32,
    /// Flee threshold in percent of max hp.
    pub run_away: i32,
}

/// Applies `pattern` to the base direction `dir`. [`Dir::NONE`] means hold.
pub fn combat_direction(pattern: CombatPattern, dir: Dir, counter: &mut i32, sense: &PatternSense) -> Dir {
    match pattern {
        CombatPattern::DistAtt => keep_distance(dir, sense),
        CombatPattern::RunAtt => {
            if *counter < 20 {
                *counter += 1;
                dir
            } else {
                *counter = 0;
                dir.reversed()
            }
        }
        CombatPattern::HitRun => {
            let before = *counter;
            *counter += 1;
            if before < 25 {
                dir
            } else if *counter < 50 {
                dir.reversed()
            } else {
                *counter = 0;
                dir.reversed()
            }
        }
        CombatPattern::WaitAtt => {
            if *counter != 0 || sense.in_range {
                *counter += 1;
            }
            match *counter {
                0 => Dir::NONE,
                1..10 => dir,
                10..15 => dir.reversed(),
                _ => {
                    *counter = 0;
                    Dir::NONE
                }
            }
        }
        CombatPattern::Rush | CombatPattern::AllRun => dir,
        CombatPattern::DistHit => {
            // Some maps carry creatures with zero max hp.
            if sense.max_hp != 0 && i64::from(sense.hp) * 100 / i64::from(sense.max_hp) < i64::from(sense.run_away) {
                dir.reversed()
            } else {
                keep_distance(dir, sense)
            }
        }
        CombatPattern::Wait2 => {
            if sense.distance < 9 {
                dir.reversed()
            } else {
                Dir::NONE
            }
        }
    }
}

fn keep_distance(dir: Dir, sense: &PatternSense) -> Dir {
    if sense.in_range {
        dir
    } else if sense.distance < 10 {
        dir.reversed()
    } else if sense.distance > 18 {
        dir
    } else {
        Dir::NONE
    }
}

const CIRCLE_SMALL: [u8; 12] = [3, 3, 4, 5, 5, 6, 7, 7, 8, 1, 1, 2];
const CIRCLE_LARGE: [u8; 20] = [3, 3, 3, 4, 4, 5, 5, 5, 6, 6, 7, 7, 7, 8, 8, 1, 1, 1, 2, 2];

impl Engine<'_> {
    fn idle_counter(&mut self, op: ObjectId, pattern: IdlePattern) -> Option<&mut i32> {
        Some(self.world.get_mut(op)?.pattern_counter(PatternOwner::Idle(pattern)))
    }

    pub(super) fn idle_move(&mut self, op: ObjectId, pattern: IdlePattern) {
        match pattern {
            IdlePattern::PetMove => self.services.pet_idle_move(self.world, op),
            IdlePattern::Circle1 => self.circle_move(op, pattern, &CIRCLE_SMALL),
            IdlePattern::Circle2 => self.circle_move(op, pattern, &CIRCLE_LARGE),
            IdlePattern::PaceH => self.pace_move(op, pattern, Dir::EAST),
            IdlePattern::PaceV => self.pace_move(op, pattern, Dir::SOUTH),
            IdlePattern::PaceH2 => self.long_pace_move(op, pattern, Dir::EAST),
            IdlePattern::PaceV2 => self.long_pace_move(op, pattern, Dir::SOUTH),
            IdlePattern::Rando => self.wander_move(op, pattern),
            IdlePattern::Rando2 => {
                self.move_randomly(op);
            }
        }
    }

    fn circle_move(&mut self, op: ObjectId, pattern: IdlePattern, table: &[u8]) {
        let Some(index) = self.idle_counter(op, pattern).map(|c| {
            *c += 1;
            if *c as usize >= table.len() {
                *c = 0;
            }
            *c as usize
        }) else {
            return;
        };
        if !self.step(op, Dir::wrap(i32::from(table[index]))) {
            let dir = self.random_dir();
            self.step(op, dir);
        }
    }

    /// Three steps `out`, then four back.
    fn pace_move(&mut self, op: ObjectId, pattern: IdlePattern, out: Dir) {
        let Some(phase) = self.idle_counter(op, pattern).map(|c| {
            *c = if *c > 6 { 0 } else { *c + 1 };
            *c
        }) else {
            return;
        };
        let dir = if phase < 4 { out } else { out.reversed() };
        self.step(op, dir);
    }

    /// Five steps `out`, a pause, five steps back, another pause.
    fn long_pace_move(&mut self, op: ObjectId, pattern: IdlePattern, out: Dir) {
        let Some(phase) = self.idle_counter(op, pattern).map(|c| {
            *c = if *c > 16 { 0 } else { *c + 1 };
            *c
        }) else {
            return;
        };
        match phase {
            0..6 => {
                self.step(op, out);
            }
            8..13 => {
                self.step(op, out.reversed());
            }
            _ => {}
        }
    }

    /// Keeps a heading while it works, picking a new one when blocked or on a
    /// one in nine whim.
    fn wander_move(&mut self, op: ObjectId, pattern: IdlePattern) {
        let Some(heading) = self.idle_counter(op, pattern).map(|c| *c) else { return };
        if (1..=8).contains(&heading) && !self.rng.one_in(9) && self.step(op, Dir::wrap(heading)) {
            return;
        }
        for _ in 0..5 {
            let dir = self.random_dir();
            if let Some(c) = self.idle_counter(op, pattern) {
                *c = i32::from(dir.index());
            }
            if self.step(op, dir) {
                return;
            }
        }
    }
}
