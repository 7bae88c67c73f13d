//! Shared fixtures for the engine test suites.
//! This module exists to avoid repeating map and creature setup across tests.
//! It does not own production decision logic.

pub(super) use crate::rng::{RandomSource, ScriptedRandom, SeededRandom};
pub(super) use crate::services::NullServices;
pub(super) use crate::state::{Map, Object, World};
pub(super) use crate::types::*;

use super::*;

/// One open map with everything the engine needs to run against it.
pub(super) struct Fixture {
    pub world: World,
    pub map: MapId,
    pub config: AiConfig,
    services: NullServices,
}

impl Fixture {
    /// A lit map of the given size with no walls.
    pub fn open(width: i32, height: i32) -> Self {
        let mut world = World::new();
        let map = world.add_map(Map::new("arena", width, height));
        Self { world, map, config: AiConfig::default(), services: NullServices }
    }

    fn put(&mut self, object: Object, x: i32, y: i32) -> ObjectId {
        let id = self.world.spawn(object);
        self.world.place(id, self.map, Pos { y, x }).expect("fixture placement in bounds");
        id
    }

    pub fn monster(&mut self, name: &str, x: i32, y: i32) -> ObjectId {
        self.put(Object::monster(name), x, y)
    }

    pub fn player(&mut self, name: &str, x: i32, y: i32) -> ObjectId {
        self.put(Object::player(name), x, y)
    }

    /// A friendly creature following `owner`.
    pub fn pet(&mut self, name: &str, x: i32, y: i32, owner: ObjectId) -> ObjectId {
        let mut ob = Object::monster(name).with_flags(ObjectFlags::FRIENDLY);
        ob.attack_movement = IdlePattern::PET_MOVE_BITS;
        ob.owner = Some(owner);
        self.put(ob, x, y)
    }

    /// Adds a body part to `head` and puts it back on the map so the new
    /// part lands at its offset.
    pub fn attach(&mut self, head: ObjectId, name: &str, offset: (i32, i32)) -> ObjectId {
        let part = self.world.spawn(Object::monster(name));
        self.world.attach_part(head, part, offset).expect("attach part");
        let (map, pos) = {
            let ob = &self.world.objects[head];
            (ob.map.expect("head on a map"), ob.pos)
        };
        self.world.place(head, map, pos).expect("re-place multipart creature");
        part
    }

    pub fn item(&mut self, holder: ObjectId, name: &str, kind: ObjectKind) -> ObjectId {
        let item = self.world.spawn(Object::new(name, kind));
        self.world.insert_in_inventory(holder, item).expect("give item");
        item
    }

    pub fn engine<'a>(&'a mut self, rng: &'a mut dyn RandomSource) -> Engine<'a> {
        Engine::new(&mut self.world, rng, &mut self.services, &self.config)
    }

    pub fn engine_with<'a>(
        &'a mut self,
        rng: &'a mut dyn RandomSource,
        services: &'a mut dyn GameServices,
    ) -> Engine<'a> {
        Engine::new(&mut self.world, rng, services, &self.config)
    }
}

/// Records every call the engine makes into the game. Actions that can
/// succeed report success.
#[derive(Debug, Default)]
pub(super) struct RecordingServices {
    pub messages: Vec<(ObjectId, String)>,
    /// `(target, attacker)` per melee exchange.
    pub attacks: Vec<(ObjectId, ObjectId)>,
    /// Attacker's weapon class at the moment of each exchange.
    pub attack_wc: Vec<i32>,
    /// `(caster, source, dir, spell)`.
    pub casts: Vec<(ObjectId, ObjectId, Dir, ObjectId)>,
    pub shots: Vec<Dir>,
    pub skills: Vec<(ObjectId, Dir)>,
    pub applied: Vec<(ObjectId, ObjectId, ApplyMode)>,
    pub follows: usize,
    pub pet_idles: usize,
    pub hidden_moves: usize,
    pub facing_changes: usize,
}

impl GameServices for RecordingServices {
    fn skill_attack(&mut self, world: &mut World, target: ObjectId, attacker: ObjectId) {
        self.attacks.push((target, attacker));
        self.attack_wc.push(world.get(attacker).map_or(0, |o| o.stats.wc));
    }

    fn cast_spell(&mut self, _world: &mut World, caster: ObjectId, source: ObjectId, dir: Dir, spell: ObjectId) -> bool {
        self.casts.push((caster, source, dir, spell));
        true
    }

    fn use_skill(&mut self, _world: &mut World, _head: ObjectId, _part: ObjectId, skill: ObjectId, dir: Dir) -> bool {
        self.skills.push((skill, dir));
        true
    }

    fn fire_bow(&mut self, _world: &mut World, _head: ObjectId, _part: ObjectId, dir: Dir) -> bool {
        self.shots.push(dir);
        true
    }

    fn apply_item(&mut self, _world: &mut World, who: ObjectId, item: ObjectId, mode: ApplyMode) -> bool {
        self.applied.push((who, item, mode));
        true
    }

    fn pet_idle_move(&mut self, _world: &mut World, _pet: ObjectId) {
        self.pet_idles += 1;
    }

    fn pet_follow_owner(&mut self, _world: &mut World, _pet: ObjectId) {
        self.follows += 1;
    }

    fn hidden_move(&mut self, _world: &mut World, _monster: ObjectId) {
        self.hidden_moves += 1;
    }

    fn facing_changed(&mut self, _world: &mut World, _object: ObjectId) {
        self.facing_changes += 1;
    }

    fn notify(&mut self, _world: &mut World, recipient: ObjectId, message: &str) {
        self.messages.push((recipient, message.to_string()));
    }
}
