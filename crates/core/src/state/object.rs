use serde::{Deserialize, Serialize};

use crate::types::*;

/// Number of resistance slots; slot 0 is physical.
pub const RESIST_KINDS: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub wisdom: i32,
    pub charisma: i32,
    pub intelligence: i32,
    pub power: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub sp: i32,
    pub max_sp: i32,
    pub grace: i32,
    pub max_grace: i32,
    pub wc: i32,
    pub ac: i32,
    pub dam: i32,
    /// Charges on wands, nourishment on food.
    pub food: i32,
}

impl Stats {
    pub fn attribute_sum(&self) -> i32 {
        self.strength
            + self.dexterity
            + self.constitution
            + self.wisdom
            + self.charisma
            + self.intelligence
            + self.power
    }
}

/// Which movement pattern currently owns the scratch counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternOwner {
    Combat(CombatPattern),
    Idle(IdlePattern),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternState {
    pub owner: PatternOwner,
    pub counter: i32,
}

#[derive(Clone, Debug)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    pub flags: ObjectFlags,
    pub stats: Stats,
    pub level: i32,
    pub magic: i32,
    pub map: Option<MapId>,
    pub pos: Pos,
    /// Container holding this object.
    pub env: Option<ObjectId>,
    pub inventory: Vec<ObjectId>,
    pub head: Option<ObjectId>,
    pub more: Option<ObjectId>,
    /// Offset of a body part from its head.
    pub offset: (i32, i32),
    pub owner: Option<ObjectId>,
    pub enemy: Option<ObjectId>,
    pub attacked_by: Option<ObjectId>,
    pub direction: Dir,
    pub facing: Dir,
    pub speed: f32,
    pub speed_left: f32,
    pub attack_movement: u8,
    pub pattern_state: Option<PatternState>,
    /// Flee below this percentage of max hp.
    pub run_away: i32,
    pub pick_up: PickUp,
    pub will_apply: WillApply,
    pub chosen_skill: Option<ObjectId>,
    pub spell_item: Option<ObjectId>,
    pub spell_subtype: Option<SpellSubtype>,
    /// Spell reach; `<= 1` means self-targeted.
    pub range: i32,
    pub race: Option<String>,
    pub glow_radius: i32,
    pub move_type: MoveType,
    /// Level of the hiding skill, for players.
    pub hide_skill: i32,
    pub talked_to: u8,
    pub last_heal: i32,
    pub last_sp: i32,
    pub weight: i32,
    pub carrying: i32,
    pub nrof: u32,
    pub resist: [i32; RESIST_KINDS],
}

impl Object {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: ObjectFlags::empty(),
            stats: Stats::default(),
            level: 1,
            magic: 0,
            map: None,
            pos: Pos::default(),
            env: None,
            inventory: Vec::new(),
            head: None,
            more: None,
            offset: (0, 0),
            owner: None,
            enemy: None,
            attacked_by: None,
            direction: Dir::NONE,
            facing: Dir::NONE,
            speed: 0.0,
            speed_left: 0.0,
            attack_movement: 0,
            pattern_state: None,
            run_away: 0,
            pick_up: PickUp::empty(),
            will_apply: WillApply::empty(),
            chosen_skill: None,
            spell_item: None,
            spell_subtype: None,
            range: 0,
            race: None,
            glow_radius: 0,
            move_type: MoveType::empty(),
            hide_skill: 0,
            talked_to: 0,
            last_heal: 0,
            last_sp: 0,
            weight: 0,
            carrying: 0,
            nrof: 1,
            resist: [0; RESIST_KINDS],
        }
    }

    /// A walking, living creature with the `MONSTER` flag.
    pub fn monster(name: impl Into<String>) -> Self {
        let mut ob = Self::new(name, ObjectKind::Creature);
        ob.flags = ObjectFlags::ALIVE | ObjectFlags::MONSTER;
        ob.move_type = MoveType::WALK;
        ob.speed = 1.0;
        ob.stats.hp = 10;
        ob.stats.max_hp = 10;
        ob
    }

    pub fn player(name: impl Into<String>) -> Self {
        let mut ob = Self::new(name, ObjectKind::Player);
        ob.flags = ObjectFlags::ALIVE;
        ob.move_type = MoveType::WALK;
        ob.speed = 1.0;
        ob.stats.hp = 20;
        ob.stats.max_hp = 20;
        ob
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn has(&self, flags: ObjectFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn set(&mut self, flags: ObjectFlags, on: bool) {
        self.flags.set(flags, on);
    }

    pub fn is_player(&self) -> bool {
        self.kind == ObjectKind::Player
    }

    pub fn is_alive(&self) -> bool {
        self.has(ObjectFlags::ALIVE)
    }

    /// Something a monster may fight: monsters, generators, players, golems.
    pub fn is_combatant(&self) -> bool {
        self.flags.intersects(ObjectFlags::MONSTER | ObjectFlags::GENERATOR)
            || matches!(self.kind, ObjectKind::Player | ObjectKind::Golem)
    }

    pub fn is_pet(&self) -> bool {
        self.attack_movement & 0xf0 == IdlePattern::PET_MOVE_BITS
    }

    pub fn alignment(&self) -> Alignment {
        Alignment::of(self.flags)
    }

    /// Counter for `owner`, restarted whenever a different pattern held it.
    pub fn pattern_counter(&mut self, owner: PatternOwner) -> &mut i32 {
        if self.pattern_state.is_some_and(|s| s.owner != owner) {
            self.pattern_state = None;
        }
        &mut self.pattern_state.get_or_insert(PatternState { owner, counter: 0 }).counter
    }
}
