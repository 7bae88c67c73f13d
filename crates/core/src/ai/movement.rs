//! Movement resolver: turns the vector toward an enemy into a step, a
//! detour, a random shuffle or a melee swing.

use super::*;

/// To-hit bonus for a fleeing creature that is cornered and fights back.
const CORNERED_WC_BONUS: i32 = 10;

impl Engine<'_> {
    /// Moves `op` one step. When the way is blocked, a creature that is
    /// willing to clears it by hitting an earthwall or door in the way.
    pub(super) fn step(&mut self, op: ObjectId, dir: Dir) -> bool {
        if dir.is_none() {
            return false;
        }
        let head = self.world.head_of(op);
        if self.world.move_object(head, dir) {
            return true;
        }
        let will_apply = self.world.get(head).map_or(WillApply::empty(), |o| o.will_apply);
        let breaks = [(WillApply::EARTHWALL, ObjectKind::EarthWall), (WillApply::DOOR, ObjectKind::Door)];
        for (mask, kind) in breaks {
            if will_apply.contains(mask) {
                self.hit_obstacle(head, dir, kind);
            }
        }
        false
    }

    /// Attacks the first `kind` object on the tiles the body would enter.
    fn hit_obstacle(&mut self, head: ObjectId, dir: Dir, kind: ObjectKind) {
        for part in self.world.parts(head) {
            let Some(ob) = self.world.get(part) else { continue };
            let Some(map) = ob.map else { continue };
            let Some((m, p)) = self.world.normalize(map, ob.pos.step(dir)) else { continue };
            let obstacle = self
                .world
                .objects_at(m, p)
                .iter()
                .copied()
                .find(|&o| self.world.get(o).is_some_and(|x| x.kind == kind));
            if let Some(obstacle) = obstacle {
                trace!(monster = %self.name(head), ?kind, "breaking through");
                self.services.skill_attack(self.world, obstacle, head);
                return;
            }
        }
    }

    /// Direction after the creature's combat pattern has had its say.
    fn apply_combat_pattern(&mut self, op: ObjectId, enemy: ObjectId, part: ObjectId, rv: &RangeVector, dir: Dir) -> Dir {
        let raw = self.world.get(op).map_or(0, |o| o.attack_movement);
        let pattern = match CombatPattern::from_attack_movement(raw) {
            Ok(Some(pattern)) => pattern,
            Ok(None) => return dir,
            Err(low) => {
                debug!(monster = %self.name(op), low, "illegal low mon-move");
                return dir;
            }
        };
        let needs_reach = matches!(pattern, CombatPattern::DistAtt | CombatPattern::WaitAtt | CombatPattern::DistHit);
        let in_range = needs_reach && self.monster_can_hit(part, enemy, rv);
        let Some(ob) = self.world.get_mut(op) else { return dir };
        let sense = PatternSense {
            in_range,
            distance: rv.distance,
            hp: ob.stats.hp,
            max_hp: ob.stats.max_hp,
            run_away: ob.run_away,
        };
        combat_direction(pattern, dir, ob.pattern_counter(PatternOwner::Combat(pattern)), &sense)
    }

    /// Closes in on, flees from, or strikes `enemy`. Returns
    /// [`TickOutcome::Destroyed`] when the acting body part did not survive
    /// the exchange or the creature was a one-shot attacker.
    pub(super) fn engage(&mut self, op: ObjectId, enemy: ObjectId, rv: RangeVector) -> TickOutcome {
        let part = rv.part.unwrap_or(op);
        let disposition = Disposition::of(self.flags(op));
        let scared = disposition.is_scared();
        let fleeing = disposition.morale.is_fleeing();

        let mut dir = rv.direction;
        if fleeing {
            dir = dir.reversed();
        } else if !self.monster_can_hit(part, enemy, &rv) {
            dir = self.compute_path(op, enemy, rv.direction);
        }
        if disposition.confused {
            dir = self.randomized_dir(dir);
        }
        if !scared {
            dir = self.apply_combat_pattern(op, enemy, part, &rv, dir);
        }
        if dir.is_none() {
            return TickOutcome::Continue;
        }

        if !disposition.stand_still {
            if self.step(op, dir) {
                return TickOutcome::Continue;
            }
            if scared || disposition.is_running_away() || !self.monster_can_hit(part, enemy, &rv) {
                let max_diff = if disposition.only_attack || self.rng.coin() { 1 } else { 2 };
                for diff in 1..=max_diff {
                    let side = if self.rng.coin() { 1 } else { -1 };
                    if self.step(op, dir.rotated(diff * side)) || self.step(op, dir.rotated(-diff * side)) {
                        return TickOutcome::Continue;
                    }
                }
            }
        }

        if !disposition.only_attack && fleeing && self.move_randomly(op) {
            return TickOutcome::Continue;
        }

        // Stuck on an enemy it cannot reach: take the nearest player instead.
        let mut enemy = enemy;
        let current = self.world.get(op).and_then(|o| o.enemy);
        if disposition.alignment != Alignment::Friendly
            && current == Some(enemy)
            && let Some(nearest) = self.nearest_player(op)
            && nearest != enemy
            && !self.monster_can_hit(part, enemy, &rv)
        {
            trace!(monster = %self.name(op), "switching to a reachable target");
            self.set_enemy(op, None);
            enemy = nearest;
        }

        if !scared && self.monster_can_hit(part, enemy, &rv) {
            let bonus = if disposition.is_running_away() { CORNERED_WC_BONUS } else { 0 };
            if let Some(p) = self.world.get_mut(part) {
                p.stats.wc += bonus;
            }
            self.services.skill_attack(self.world, enemy, part);
            if let Some(p) = self.world.get_mut(part) {
                p.stats.wc -= bonus;
            }
        }

        if !self.world.exists(part) {
            return TickOutcome::Destroyed;
        }
        if self.flags(op).contains(ObjectFlags::ONLY_ATTACK) {
            self.world.free_drop_inventory(op);
            return TickOutcome::Destroyed;
        }
        TickOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::super::spatial::range_vector;
    use super::super::test_support::*;
    use super::*;

    fn engage(fx: &mut Fixture, services: &mut RecordingServices, rng: &mut dyn RandomSource, op: ObjectId, enemy: ObjectId) -> TickOutcome {
        let rv = range_vector(&fx.world, op, enemy, true).expect("same map");
        fx.engine_with(rng, services).engage(op, enemy, rv)
    }

    #[test]
    fn adjacent_enemy_is_struck() {
        let mut fx = Fixture::open(8, 8);
        let orc = fx.monster("orc", 2, 2);
        let hero = fx.player("hero", 3, 3);
        fx.world.objects[orc].enemy = Some(hero);
        let mut services = RecordingServices::default();
        let mut rng = ScriptedRandom::zeros();

        // Blocked by the hero itself, so the step fails and the swing lands.
        assert_eq!(engage(&mut fx, &mut services, &mut rng, orc, hero), TickOutcome::Continue);
        assert_eq!(services.attacks, vec![(hero, orc)]);
        assert_eq!(fx.world.objects[orc].pos, Pos { y: 2, x: 2 });
    }

    #[test]
    fn distant_enemy_is_approached() {
        let mut fx = Fixture::open(10, 5);
        let orc = fx.monster("orc", 1, 2);
        let hero = fx.player("hero", 7, 2);
        let mut services = RecordingServices::default();
        let mut rng = SeededRandom::new(1);

        engage(&mut fx, &mut services, &mut rng, orc, hero);
        assert!(services.attacks.is_empty());
        assert_eq!(fx.world.objects[orc].pos.x, 2);
    }

    #[test]
    fn scared_creature_runs_and_never_swings() {
        let mut fx = Fixture::open(10, 5);
        let rat = fx.monster("rat", 5, 2);
        fx.world.objects[rat].set(ObjectFlags::SCARED, true);
        let hero = fx.player("hero", 6, 2);
        let mut services = RecordingServices::default();
        let mut rng = ScriptedRandom::zeros();

        engage(&mut fx, &mut services, &mut rng, rat, hero);
        assert_eq!(fx.world.objects[rat].pos, Pos { y: 2, x: 4 });
        assert!(services.attacks.is_empty());
    }

    #[test]
    fn cornered_runner_gets_a_temporary_bonus() {
        let mut fx = Fixture::open(3, 3);
        for pos in [Pos { y: 0, x: 0 }, Pos { y: 1, x: 0 }, Pos { y: 2, x: 0 }, Pos { y: 0, x: 1 }, Pos { y: 2, x: 1 }] {
            fx.world.maps[fx.map].set_wall(pos);
        }
        let orc = fx.monster("orc", 1, 1);
        let hero = fx.player("hero", 2, 1);
        {
            let ob = &mut fx.world.objects[orc];
            ob.set(ObjectFlags::RUN_AWAY, true);
            ob.stats.wc = 5;
        }
        let mut services = RecordingServices::default();
        let mut rng = ScriptedRandom::zeros();

        engage(&mut fx, &mut services, &mut rng, orc, hero);
        assert_eq!(services.attack_wc, vec![15]);
        assert_eq!(fx.world.objects[orc].stats.wc, 5);
    }

    #[test]
    fn one_shot_attacker_is_freed_after_its_swing() {
        let mut fx = Fixture::open(8, 8);
        let wisp = fx.monster("wisp", 2, 2);
        let hero = fx.player("hero", 3, 2);
        let spark = fx.item(wisp, "spark", ObjectKind::Misc);
        fx.world.objects[wisp].set(ObjectFlags::ONLY_ATTACK, true);
        let mut services = RecordingServices::default();
        let mut rng = ScriptedRandom::zeros();

        assert_eq!(engage(&mut fx, &mut services, &mut rng, wisp, hero), TickOutcome::Destroyed);
        assert_eq!(services.attacks.len(), 1);
        assert!(fx.world.get(wisp).is_none());
        assert_eq!(fx.world.objects[spark].pos, Pos { y: 2, x: 2 });
    }

    #[test]
    fn illegal_pattern_leaves_the_direction_alone() {
        let mut fx = Fixture::open(10, 5);
        let orc = fx.monster("orc", 1, 2);
        fx.world.objects[orc].attack_movement = 0x0c;
        let hero = fx.player("hero", 5, 2);
        let mut services = RecordingServices::default();
        let mut rng = SeededRandom::new(2);

        engage(&mut fx, &mut services, &mut rng, orc, hero);
        assert_eq!(fx.world.objects[orc].pos.x, 2);
    }

    #[test]
    fn waiting_pattern_holds_position() {
        let mut fx = Fixture::open(20, 5);
        let archer = fx.monster("archer", 1, 2);
        fx.world.objects[archer].attack_movement = 0x07;
        let hero = fx.player("hero", 14, 2);
        let mut services = RecordingServices::default();
        let mut rng = SeededRandom::new(4);

        assert_eq!(engage(&mut fx, &mut services, &mut rng, archer, hero), TickOutcome::Continue);
        assert_eq!(fx.world.objects[archer].pos, Pos { y: 2, x: 1 });
    }

    #[test]
    fn door_in_the_way_is_hit() {
        let mut fx = Fixture::open(8, 5);
        let ogre = fx.monster("ogre", 2, 2);
        fx.world.objects[ogre].will_apply = WillApply::DOOR;
        let door = fx.world.spawn(Object::new("door", ObjectKind::Door));
        fx.world.place(door, fx.map, Pos { y: 2, x: 3 }).expect("place door");
        fx.world.maps[fx.map].set_wall(Pos { y: 2, x: 3 });
        let mut services = RecordingServices::default();
        let mut rng = ScriptedRandom::zeros();

        assert!(!fx.engine_with(&mut rng, &mut services).step(ogre, Dir::EAST));
        assert_eq!(services.attacks, vec![(door, ogre)]);
    }
}
