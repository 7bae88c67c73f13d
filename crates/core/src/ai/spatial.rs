//! Perception and geometry: range vectors, sight, light and detection.
//! This module exists so every "can A find B" question has one answer.
//! It never moves anything; the only mutations are reveals of hidden targets.

use std::array;

use super::*;

/// For each search offset beyond the first ring, the up to three offsets
/// one step closer to the centre that sight must pass through. `-1` marks
/// an unused slot.
const SIGHT_REDUCTION: [[i8; 3]; 49] = [
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [8, 1, 2],
    [1, 2, -1],
    [2, 10, 12],
    [2, 3, -1],
    [2, 3, 4],
    [3, 4, -1],
    [4, 14, 16],
    [5, 4, -1],
    [4, 5, 6],
    [6, 5, -1],
    [6, 20, 18],
    [7, 6, -1],
    [6, 7, 8],
    [7, 8, -1],
    [8, 22, 24],
    [8, 1, -1],
    [24, 9, 10],
    [9, 10, -1],
    [10, 11, -1],
    [27, 11, 29],
    [11, 12, -1],
    [12, 13, -1],
    [12, 13, 14],
    [13, 14, -1],
    [14, 15, -1],
    [33, 15, 35],
    [16, 15, -1],
    [17, 16, -1],
    [18, 17, 16],
    [18, 17, -1],
    [18, 19, -1],
    [41, 19, 39],
    [19, 20, -1],
    [20, 21, -1],
    [20, 21, 22],
    [21, 22, -1],
    [23, 22, -1],
    [45, 47, 23],
    [23, 24, -1],
    [24, 9, -1],
];

/// Direction and distance from one object (or point) to another, tile-map aware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeVector {
    pub distance: i32,
    pub dx: i32,
    pub dy: i32,
    pub direction: Dir,
    /// Body part of the origin closest to the target; `None` for a point origin.
    pub part: Option<ObjectId>,
}

impl RangeVector {
    fn new(dx: i32, dy: i32, part: Option<ObjectId>) -> Self {
        let squared = i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy);
        Self { distance: isqrt(squared), dx, dy, direction: Dir::toward(dx, dy), part }
    }

    /// Within melee reach on both axes.
    pub fn is_adjacent(&self) -> bool {
        self.dx.abs() < 2 && self.dy.abs() < 2
    }
}

pub(crate) fn isqrt(n: i64) -> i32 {
    if n <= 0 {
        return 0;
    }
    let mut root = (n as f64).sqrt() as i64;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root as i32
}

/// Vector from `from` to `to`. With `closest_part`, the origin is the part of
/// `from`'s body nearest to `to`. `None` when the maps are not connected.
pub fn range_vector(world: &World, from: ObjectId, to: ObjectId, closest_part: bool) -> Option<RangeVector> {
    let origin = world.get(from)?;
    let target = world.get(to)?;
    let (ox, oy) = world.map_offset(origin.map?, target.map?)?;
    let mut dx = ox + target.pos.x - origin.pos.x;
    let mut dy = oy + target.pos.y - origin.pos.y;
    let mut best = from;
    if closest_part && origin.more.is_some() {
        let mut best_distance = dx * dx + dy * dy;
        let (bx, by) = (dx, dy);
        for part in world.parts(from) {
            let Some(p) = world.get(part) else { continue };
            let tx = bx - (p.offset.0 - origin.offset.0);
            let ty = by - (p.offset.1 - origin.offset.1);
            if tx * tx + ty * ty < best_distance {
                best_distance = tx * tx + ty * ty;
                best = part;
                dx = tx;
                dy = ty;
            }
        }
    }
    Some(RangeVector::new(dx, dy, Some(best)))
}

pub(crate) fn range_vector_from_point(world: &World, map: MapId, pos: Pos, to: ObjectId) -> Option<RangeVector> {
    let target = world.get(to)?;
    let (ox, oy) = world.map_offset(map, target.map?)?;
    Some(RangeVector::new(ox + target.pos.x - pos.x, oy + target.pos.y - pos.y, None))
}

/// Indices into [`SEARCH_OFFSETS`] with each ring shuffled on its own, so
/// nearer rings are still searched first but no compass side is favoured.
pub(crate) fn search_order(rng: &mut dyn RandomSource) -> [usize; 49] {
    let mut order: [usize; 49] = array::from_fn(|i| i);
    for (begin, end) in SEARCH_RINGS {
        let len = (end - begin) as u32;
        for i in begin..end {
            let j = begin + rng.next_int(len) as usize;
            order.swap(i, j);
        }
    }
    order
}

/// Whether the offset `index` around `origin` is visible from `origin`.
pub(crate) fn can_see_offset(world: &World, map: MapId, origin: Pos, index: i8) -> bool {
    let Ok(index) = usize::try_from(index) else { return false };
    let Some(&(dx, dy)) = SEARCH_OFFSETS.get(index) else { return false };
    let Some((m, p)) = world.normalize(map, origin.offset(dx, dy)) else { return false };
    if world.maps.get(m).is_none_or(|tile_map| tile_map.blocks_view(p)) {
        return false;
    }
    if index < 9 {
        return true;
    }
    SIGHT_REDUCTION[index].iter().any(|&closer| can_see_offset(world, map, origin, closer))
}

pub fn stand_in_light(world: &World, id: ObjectId, search_radius: i32) -> bool {
    let Some(ob) = world.get(id) else { return false };
    if ob.glow_radius > 0 {
        return true;
    }
    let Some(map) = ob.map else { return false };
    for dy in -search_radius..=search_radius {
        for dx in -search_radius..=search_radius {
            let Some((m, p)) = world.normalize(map, ob.pos.offset(dx, dy)) else { continue };
            let light = world.maps.get(m).map_or(0, |tile_map| tile_map.light(p));
            if isqrt(i64::from(dx * dx + dy * dy)) < light {
                return true;
            }
        }
    }
    false
}

pub(crate) fn has_carried_lights(world: &World, id: ObjectId) -> bool {
    let Some(ob) = world.get(id) else { return false };
    ob.glow_radius > 0
        || ob.inventory.iter().any(|&item| world.get(item).is_some_and(|i| i.glow_radius > 0))
}

pub(super) fn is_unseen(ob: &Object) -> bool {
    ob.flags.intersects(ObjectFlags::INVISIBLE | ObjectFlags::HIDDEN)
}

impl Engine<'_> {
    pub(super) fn in_light(&self, id: ObjectId) -> bool {
        stand_in_light(self.world, id, self.config.light_search_radius)
    }

    pub(super) fn map_darkness(&self, id: ObjectId) -> i32 {
        self.world
            .get(id)
            .and_then(|o| o.map)
            .and_then(|m| self.world.maps.get(m))
            .map_or(0, |m| m.darkness)
    }

    pub(super) fn make_visible(&mut self, id: ObjectId) {
        if let Some(ob) = self.world.get_mut(id) {
            ob.set(ObjectFlags::INVISIBLE | ObjectFlags::HIDDEN, false);
        }
    }

    fn tell_player(&mut self, id: ObjectId, message: &str) {
        if self.world.get(id).is_some_and(Object::is_player) {
            self.services.notify(self.world, id, message);
        }
    }

    /// First living creature found around `npc`, searching the three rings
    /// in shuffled order and skipping tiles it has no line of sight to.
    pub fn find_nearest_living_creature(&mut self, npc: ObjectId) -> Option<ObjectId> {
        let (map, pos) = {
            let ob = self.world.get(npc)?;
            (ob.map?, ob.pos)
        };
        let own = self.world.head_of(npc);
        for index in search_order(self.rng) {
            let (dx, dy) = SEARCH_OFFSETS[index];
            let Some((m, p)) = self.world.normalize(map, pos.offset(dx, dy)) else { continue };
            let world = &*self.world;
            let mut others = world
                .objects_at(m, p)
                .iter()
                .map(|&o| world.head_of(o))
                .filter(|&head| head != own && world.get(head).is_some_and(Object::is_alive))
                .peekable();
            if others.peek().is_none() {
                continue;
            }
            let creature = others.find(|&head| {
                world.get(head).is_some_and(|o| {
                    o.flags.intersects(ObjectFlags::MONSTER | ObjectFlags::GENERATOR) || o.is_player()
                })
            });
            match creature {
                None => debug!(x = p.x, y = p.y, "tile has a living object but no creature"),
                Some(found) => {
                    if can_see_offset(world, map, pos, index as i8) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    /// Line-of-sight-free check of whether `op` could see `enemy` at all.
    /// A hidden enemy carrying a light is revealed for good.
    pub fn can_see_enemy(&mut self, op: ObjectId, enemy: ObjectId) -> bool {
        let looker = self.world.head_of(op);
        let Some(looker_ob) = self.world.get(looker) else { return false };
        if !looker_ob.is_alive() {
            return false;
        }
        let looker_flags = looker_ob.flags;
        if looker_flags.contains(ObjectFlags::BLIND) && !looker_flags.contains(ObjectFlags::XRAYS) {
            return false;
        }
        let Some(target) = self.world.get(enemy) else { return false };
        if is_unseen(target) {
            let hidden = target.has(ObjectFlags::HIDDEN);
            if has_carried_lights(self.world, enemy) {
                if hidden {
                    self.make_visible(enemy);
                    self.tell_player(enemy, "Your light reveals your hiding spot!");
                }
                return true;
            }
            if hidden || !looker_flags.contains(ObjectFlags::SEE_INVISIBLE) {
                return false;
            }
        }
        // Darkness of the enemy's map counts, not the looker's.
        if self.map_darkness(enemy) > 0
            && !self.in_light(enemy)
            && !looker_flags.contains(ObjectFlags::SEE_IN_DARK | ObjectFlags::UNDEAD | ObjectFlags::XRAYS)
        {
            return false;
        }
        true
    }

    /// Whether `op` notices `enemy` this tick, and the vector toward it.
    /// Hidden and invisible enemies are found by a stat-driven roll inside a
    /// radius that shrinks for stealth and darkness and never exceeds the
    /// configured clamp.
    pub fn can_detect_enemy(&mut self, op: ObjectId, enemy: ObjectId) -> Option<RangeVector> {
        let rv = range_vector(self.world, op, enemy, true)?;
        let observer = self.world.get(op)?;
        let target = self.world.get(enemy)?;
        if !observer.is_player() && target.has(ObjectFlags::WIZ) {
            return None;
        }
        let observer_is_player = observer.is_player();
        let (level, int, wis) = (observer.level, observer.stats.intelligence, observer.stats.wisdom);
        let sees_in_dark = observer.has(ObjectFlags::SEE_IN_DARK);
        let observer_name = observer.name.clone();

        if self.can_see_enemy(op, enemy) {
            return Some(rv);
        }
        if observer_is_player {
            return None;
        }
        let target = self.world.get(enemy)?;
        let hidden = target.has(ObjectFlags::HIDDEN);
        if target.has(ObjectFlags::INVISIBLE) && !hidden {
            return None;
        }
        let (target_is_player, target_level, hide_skill) = (target.is_player(), target.level, target.hide_skill);
        let (stealthy, undead) = (target.has(ObjectFlags::STEALTH), target.has(ObjectFlags::UNDEAD));

        let min = self.config.min_radius;
        let mut radius = min;
        let mut hide_discovery = int / 5;
        if !hidden {
            radius = (wis / 5 + 1).max(min);
        } else {
            let mut bonus = level / 2 + int / 5;
            if !target_is_player {
                bonus -= target_level;
            } else if hide_skill > 0 {
                bonus -= hide_skill;
            } else {
                warn!(target = %self.name(enemy), "hidden player without a hiding skill");
                self.make_visible(enemy);
            }
            radius += bonus / 5;
            hide_discovery += bonus * 5;
        }

        if stealthy {
            radius /= 2;
            hide_discovery /= 3;
        }

        let darkness = self.map_darkness(op);
        if darkness > 0 && !self.in_light(enemy) {
            // Undead give off no body heat for dark vision to pick up.
            if sees_in_dark && !undead {
                radius += darkness / 2;
            } else {
                radius -= darkness / 2;
            }
            if radius < min && darkness < 5 && rv.distance <= 1 {
                radius = min;
            }
        }

        radius = radius.min(self.config.max_detect_radius);
        if rv.distance > radius {
            return None;
        }

        let target = self.world.get(enemy)?;
        if !is_unseen(target) {
            return Some(rv);
        }
        let hidden = target.has(ObjectFlags::HIDDEN);
        if hidden && rv.distance <= 1 && self.rng.roll_percent() as i32 <= hide_discovery {
            self.make_visible(enemy);
            self.tell_player(enemy, &format!("You are discovered by {observer_name}!"));
            return Some(rv);
        }
        if self.rng.next_int(50) as i32 <= hide_discovery {
            self.tell_player(enemy, &format!("You see {observer_name} noticing your position."));
            return Some(rv);
        }
        None
    }

    /// Nearest friendly creature or player that `seeker` can detect.
    pub fn nearest_player(&mut self, seeker: ObjectId) -> Option<ObjectId> {
        let own = self.world.head_of(seeker);
        let world = &*self.world;
        let placed = |o: &Object| o.head.is_none() && o.is_alive() && o.map.is_some();
        let friendlies = world.objects.iter().filter(|(_, o)| placed(o) && o.has(ObjectFlags::FRIENDLY) && !o.is_player());
        let players = world.objects.iter().filter(|(_, o)| placed(o) && o.is_player());
        let candidates: Vec<ObjectId> = friendlies.chain(players).map(|(id, _)| id).filter(|&id| id != own).collect();

        let mut nearest = None;
        let mut last_distance = 1000;
        for candidate in candidates {
            if let Some(rv) = self.can_detect_enemy(seeker, candidate)
                && rv.distance < last_distance
            {
                nearest = Some(candidate);
                last_distance = rv.distance;
            }
        }
        nearest
    }

    /// Melee reach from `part` to any part of `target`. Confusion makes a
    /// third of the checks fail.
    pub fn monster_can_hit(&mut self, part: ObjectId, target: ObjectId, rv: &RangeVector) -> bool {
        let head = self.world.head_of(part);
        if self.flags(head).contains(ObjectFlags::CONFUSED) && self.rng.one_in(3) {
            return false;
        }
        if rv.is_adjacent() {
            return true;
        }
        self.world
            .parts(target)
            .into_iter()
            .skip(1)
            .any(|more| range_vector(self.world, part, more, false).is_some_and(|rv| rv.is_adjacent()))
    }

    /// First step of a clear route from `mon` toward `target`, or
    /// [`Dir::NONE`] if the walk gets stuck or runs out of steps.
    pub fn path_to_target(&self, mon: ObjectId, target: ObjectId, min_distance: i32) -> Dir {
        let world = &*self.world;
        let Some(rv) = range_vector(world, mon, target, true) else { return Dir::NONE };
        if rv.distance < min_distance {
            return Dir::NONE;
        }
        let Some((mut map, mut pos)) = world.get(mon).and_then(|o| Some((o.map?, o.pos))) else {
            return Dir::NONE;
        };
        let mut dir = rv.direction;
        let mut last_dir = dir;
        let mut first_dir = dir;
        let mut diff = rv.dx.abs().max(rv.dy.abs());
        let mut budget = self.config.line_of_fire_steps;
        if diff > budget {
            return Dir::NONE;
        }
        while diff > 1 && budget > 0 {
            let (last_map, last_pos) = (map, pos);
            let next = world.normalize(map, pos.step(dir)).filter(|&(m, p)| !world.blocked_for(mon, m, p));
            if let Some((m, p)) = next {
                map = m;
                pos = p;
                diff -= 1;
                budget -= 1;
                last_dir = dir;
                if first_dir.is_none() {
                    first_dir = dir;
                }
            } else if let Some(fresh) = range_vector_from_point(world, last_map, last_pos, target)
                && fresh.direction != dir
            {
                dir = fresh.direction;
                first_dir = dir;
            } else {
                let detour = self.config.line_of_fire_detour;
                let side = (-detour..=detour).filter(|&i| i != 0).find_map(|i| {
                    let (m, p) = world.normalize(last_map, last_pos.step(last_dir.rotated(i)))?;
                    (!world.blocked_for(mon, m, p)).then_some((i, m, p))
                });
                let Some((turn, m, p)) = side else { return Dir::NONE };
                map = m;
                pos = p;
                diff -= 1;
                budget -= 1;
                last_dir = dir;
                if first_dir.is_none() {
                    first_dir = dir.rotated(turn);
                }
            }
            if diff <= 1 {
                let Some(fresh) = range_vector_from_point(world, map, pos, target) else {
                    return Dir::NONE;
                };
                diff = fresh.dx.abs().max(fresh.dy.abs());
            }
            if diff > budget {
                return Dir::NONE;
            }
        }
        if budget == 0 {
            return Dir::NONE;
        }
        first_dir
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn isqrt_floors() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(8), 2);
        assert_eq!(isqrt(9), 3);
        assert_eq!(isqrt(10), 3);
    }

    #[test]
    fn range_vector_picks_closest_body_part() {
        let mut fx = Fixture::open(12, 12);
        let dragon = fx.monster("dragon", 2, 5);
        let tail = fx.attach(dragon, "dragon tail", (1, 0));
        let hero = fx.player("hero", 6, 5);

        let rv = range_vector(&fx.world, dragon, hero, true).expect("same map");
        assert_eq!(rv.part, Some(tail));
        assert_eq!((rv.dx, rv.dy, rv.distance), (3, 0, 3));
        assert_eq!(rv.direction, Dir::EAST);

        let head_only = range_vector(&fx.world, dragon, hero, false).expect("same map");
        assert_eq!(head_only.part, Some(dragon));
        assert_eq!(head_only.dx, 4);
    }

    #[test]
    fn search_order_keeps_rings_separate() {
        let mut rng = SeededRandom::new(3);
        let order = search_order(&mut rng);
        assert_eq!(order[0], 0);
        for (begin, end) in SEARCH_RINGS {
            let mut ring: Vec<usize> = order[begin..end].to_vec();
            ring.sort_unstable();
            assert_eq!(ring, (begin..end).collect::<Vec<_>>());
        }
    }

    #[test]
    fn walls_hide_the_outer_rings() {
        let mut fx = Fixture::open(9, 9);
        let map = fx.map;
        // Offset 13 is (2, 0); its only sight lines pass 2, 3 and 4.
        for (dx, dy) in [(1, -1), (1, 0), (1, 1)] {
            fx.world.maps[map].set_blocks_view(Pos { y: 4 + dy, x: 4 + dx }, true);
        }
        assert!(!can_see_offset(&fx.world, map, Pos { y: 4, x: 4 }, 13));
        assert!(can_see_offset(&fx.world, map, Pos { y: 4, x: 4 }, 21));
        assert!(!can_see_offset(&fx.world, map, Pos { y: 4, x: 4 }, -1));
    }

    #[test]
    fn light_sources_reach_within_their_radius() {
        let mut fx = Fixture::open(12, 12);
        let hero = fx.player("hero", 5, 5);
        assert!(!stand_in_light(&fx.world, hero, 4));
        fx.world.maps[fx.map].set_light(Pos { y: 5, x: 8 }, 4);
        assert!(stand_in_light(&fx.world, hero, 4));
        fx.world.maps[fx.map].set_light(Pos { y: 5, x: 8 }, 3);
        assert!(!stand_in_light(&fx.world, hero, 4));
    }

    #[test]
    fn nearest_creature_skips_own_body() {
        let mut fx = Fixture::open(12, 12);
        let dragon = fx.monster("dragon", 4, 4);
        fx.attach(dragon, "dragon tail", (1, 0));
        let rat = fx.monster("rat", 2, 4);
        let mut rng = SeededRandom::new(11);
        let found = fx.engine(&mut rng).find_nearest_living_creature(dragon);
        assert_eq!(found, Some(rat));
    }

    #[test]
    fn detection_radius_is_clamped() {
        for (distance, expected) in [(13, true), (14, false)] {
            let mut fx = Fixture::open(30, 5);
            let owl = fx.monster("owl", 1, 2);
            fx.world.objects[owl].stats.wisdom = 100;
            fx.world.objects[owl].set(ObjectFlags::BLIND, true);
            let hero = fx.player("hero", 1 + distance, 2);
            let mut rng = ScriptedRandom::zeros();
            let rv = fx.engine(&mut rng).can_detect_enemy(owl, hero);
            assert_eq!(rv.is_some(), expected, "distance {distance}");
        }
    }

    #[test]
    fn hidden_enemy_with_light_is_revealed() {
        let mut fx = Fixture::open(10, 10);
        let orc = fx.monster("orc", 2, 2);
        let hero = fx.player("hero", 6, 2);
        fx.world.objects[hero].set(ObjectFlags::HIDDEN | ObjectFlags::INVISIBLE, true);
        let torch = fx.item(hero, "torch", ObjectKind::Misc);
        fx.world.objects[torch].glow_radius = 2;

        let mut rng = ScriptedRandom::zeros();
        let mut services = RecordingServices::default();
        let seen = fx.engine_with(&mut rng, &mut services).can_see_enemy(orc, hero);
        assert!(seen);
        assert!(!fx.world.objects[hero].has(ObjectFlags::HIDDEN));
        assert_eq!(services.messages, vec![(hero, "Your light reveals your hiding spot!".to_string())]);
    }

    #[test]
    fn invisible_monster_is_never_detected_without_see_invisible() {
        let mut fx = Fixture::open(10, 10);
        let orc = fx.monster("orc", 2, 2);
        let ghost = fx.monster("ghost", 3, 2);
        fx.world.objects[ghost].set(ObjectFlags::INVISIBLE, true);
        let mut rng = ScriptedRandom::zeros();
        assert!(fx.engine(&mut rng).can_detect_enemy(orc, ghost).is_none());
        fx.world.objects[orc].set(ObjectFlags::SEE_INVISIBLE, true);
        assert!(fx.engine(&mut rng).can_detect_enemy(orc, ghost).is_some());
    }

    #[test]
    fn can_hit_reaches_any_target_part() {
        let mut fx = Fixture::open(12, 12);
        let orc = fx.monster("orc", 2, 5);
        let dragon = fx.monster("dragon", 5, 5);
        fx.attach(dragon, "dragon tail", (-2, 0));
        let mut rng = ScriptedRandom::zeros();
        let rv = range_vector(&fx.world, orc, dragon, true).expect("same map");
        assert!(!rv.is_adjacent());
        assert!(fx.engine(&mut rng).monster_can_hit(orc, dragon, &rv));
    }

    #[test]
    fn line_of_fire_steps_around_a_pillar() {
        let mut fx = Fixture::open(12, 12);
        let mage = fx.monster("mage", 2, 5);
        let hero = fx.player("hero", 8, 5);
        fx.world.maps[fx.map].set_wall(Pos { y: 5, x: 4 });
        let mut rng = ScriptedRandom::zeros();
        let dir = fx.engine(&mut rng).path_to_target(mage, hero, 0);
        assert!(!dir.is_none());

        fx.world.maps[fx.map].set_wall(Pos { y: 5, x: 3 });
        fx.world.maps[fx.map].set_wall(Pos { y: 4, x: 3 });
        fx.world.maps[fx.map].set_wall(Pos { y: 6, x: 3 });
        fx.world.maps[fx.map].set_wall(Pos { y: 4, x: 2 });
        fx.world.maps[fx.map].set_wall(Pos { y: 6, x: 2 });
        assert_eq!(fx.engine(&mut rng).path_to_target(mage, hero, 0), Dir::NONE);
    }
}
