//! Calls the AI makes into the rest of the game server.
//! This module exists so combat, spell and skill resolution can be plugged
//! in from outside and replaced by recording doubles in tests.
//! It does not decide anything; every default is a plain no-op.

use crate::state::World;
use crate::types::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpellCost {
    pub mana: i32,
    pub grace: i32,
}

/// How an item is being applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyMode {
    /// Reading a scroll, pulling a handle, opening treasure.
    Use,
    /// Wielding or wearing; curses are ignored for monsters.
    Equip,
}

pub trait GameServices {
    /// Resolves one melee exchange between `attacker` (a body part) and `target`.
    fn skill_attack(&mut self, _world: &mut World, _target: ObjectId, _attacker: ObjectId) {}

    /// `source` is the body part, wand or rod the spell comes out of.
    fn cast_spell(
        &mut self,
        _world: &mut World,
        _caster: ObjectId,
        _source: ObjectId,
        _dir: Dir,
        _spell: ObjectId,
    ) -> bool {
        false
    }

    fn spell_cost(&self, world: &World, _caster: ObjectId, spell: ObjectId) -> SpellCost {
        world
            .get(spell)
            .map(|s| SpellCost { mana: s.stats.sp, grace: s.stats.grace })
            .unwrap_or_default()
    }

    fn use_skill(
        &mut self,
        _world: &mut World,
        _head: ObjectId,
        _part: ObjectId,
        _skill: ObjectId,
        _dir: Dir,
    ) -> bool {
        false
    }

    fn fire_bow(&mut self, _world: &mut World, _head: ObjectId, _part: ObjectId, _dir: Dir) -> bool {
        false
    }

    fn can_apply(&self, _world: &World, _who: ObjectId, _item: ObjectId) -> bool {
        true
    }

    fn apply_item(&mut self, _world: &mut World, _who: ObjectId, _item: ObjectId, _mode: ApplyMode) -> bool {
        false
    }

    /// Target for a pet; defaults to whatever its owner is fighting.
    fn pet_select_enemy(&mut self, world: &mut World, pet: ObjectId) -> Option<ObjectId> {
        let owner = world.get(pet)?.owner?;
        world.get(owner)?.enemy.filter(|&e| e != pet && world.exists(e))
    }

    fn pet_idle_move(&mut self, _world: &mut World, _pet: ObjectId) {}

    fn pet_follow_owner(&mut self, _world: &mut World, _pet: ObjectId) {}

    fn hidden_move(&mut self, _world: &mut World, _monster: ObjectId) {}

    fn facing_changed(&mut self, _world: &mut World, _object: ObjectId) {}

    fn notify(&mut self, _world: &mut World, _recipient: ObjectId, _message: &str) {}
}

/// Services that do nothing beyond the trait defaults.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullServices;

impl GameServices for NullServices {}
