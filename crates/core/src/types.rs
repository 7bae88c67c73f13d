use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    pub struct ObjectId;
    pub struct MapId;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub y: i32,
    pub x: i32,
}

impl Pos {
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Pos { y: self.y + dy, x: self.x + dx }
    }

    pub fn step(self, dir: Dir) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }
}

/// Offsets searched around a point: the centre, then the ring at distance 1
/// (indices 1..9), distance 2 (9..25) and distance 3 (25..49).
/// Indices 1..=8 double as the compass directions of [`Dir`].
pub const SEARCH_OFFSETS: [(i32, i32); 49] = [
    (0, 0), (0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0),
    (-1, -1), (0, -2), (1, -2), (2, -2), (2, -1), (2, 0), (2, 1), (2, 2),
    (1, 2), (0, 2), (-1, 2), (-2, 2), (-2, 1), (-2, 0), (-2, -1), (-2, -2),
    (-1, -2), (0, -3), (1, -3), (2, -3), (3, -3), (3, -2), (3, -1), (3, 0),
    (3, 1), (3, 2), (3, 3), (2, 3), (1, 3), (0, 3), (-1, 3), (-2, 3),
    (-3, 3), (-3, 2), (-3, 1), (-3, 0), (-3, -1), (-3, -2), (-3, -3), (-2, -3),
    (-1, -3),
];

/// Boundaries of the three rings inside [`SEARCH_OFFSETS`].
pub const SEARCH_RINGS: [(usize, usize); 3] = [(1, 9), (9, 25), (25, 49)];

/// Compass direction. `0` means "no direction"; `1` is north and the rest
/// follow clockwise up to `8` (north-west). Arithmetic wraps inside `1..=8`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dir(u8);

impl Dir {
    pub const NONE: Dir = Dir(0);
    pub const NORTH: Dir = Dir(1);
    pub const NORTH_EAST: Dir = Dir(2);
    pub const EAST: Dir = Dir(3);
    pub const SOUTH_EAST: Dir = Dir(4);
    pub const SOUTH: Dir = Dir(5);
    pub const SOUTH_WEST: Dir = Dir(6);
    pub const WEST: Dir = Dir(7);
    pub const NORTH_WEST: Dir = Dir(8);

    pub const ALL: [Dir; 8] = [
        Dir::NORTH,
        Dir::NORTH_EAST,
        Dir::EAST,
        Dir::SOUTH_EAST,
        Dir::SOUTH,
        Dir::SOUTH_WEST,
        Dir::WEST,
        Dir::NORTH_WEST,
    ];

    /// Wraps any integer into a real direction (`0` and `8` both map to
    /// north-west, `9` to north).
    pub fn wrap(raw: i32) -> Dir {
        Dir((raw - 1).rem_euclid(8) as u8 + 1)
    }

    /// Accepts only `0..=8`.
    pub fn from_index(raw: u8) -> Option<Dir> {
        (raw <= 8).then_some(Dir(raw))
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    pub const fn is_diagonal(self) -> bool {
        self.0 != 0 && self.0 % 2 == 0
    }

    pub fn delta(self) -> (i32, i32) {
        SEARCH_OFFSETS[self.0 as usize]
    }

    pub fn rotated(self, steps: i32) -> Dir {
        Dir::wrap(i32::from(self.0) + steps)
    }

    pub fn reversed(self) -> Dir {
        if self.is_none() { self } else { self.rotated(4) }
    }

    /// Number of 45 degree turns between two directions (0..=4).
    pub fn diff(self, other: Dir) -> u8 {
        let d = (i32::from(self.0) - i32::from(other.0)).unsigned_abs() as u8;
        d.min(8 - d)
    }

    /// Direction from the origin toward the point `(dx, dy)`, using the
    /// 22.5 degree sector boundaries of the eight-way compass.
    pub fn toward(dx: i32, dy: i32) -> Dir {
        if dx == 0 && dy == 0 {
            return Dir::NONE;
        }
        let (x, y) = (-dx, -dy);
        let q = if y == 0 { -300 * x } else { x * 100 / y };
        let raw = if y > 0 {
            match q {
                q if q < -242 => 3,
                q if q < -41 => 2,
                q if q < 41 => 1,
                q if q < 242 => 8,
                _ => 7,
            }
        } else {
            match q {
                q if q < -242 => 7,
                q if q < -41 => 6,
                q if q < 41 => 5,
                q if q < 242 => 4,
                _ => 3,
            }
        };
        Dir(raw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Player,
    Creature,
    Golem,
    Weapon,
    Armour,
    Shield,
    Ring,
    Wand,
    Rod,
    Bow,
    Arrow,
    Scroll,
    Spellbook,
    Spell,
    Skill,
    Money,
    Gem,
    Food,
    Treasure,
    Handle,
    Trigger,
    Door,
    EarthWall,
    Floor,
    Misc,
}

impl ObjectKind {
    pub const fn is_weapon(self) -> bool {
        matches!(self, ObjectKind::Weapon | ObjectKind::Bow | ObjectKind::Arrow)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellSubtype {
    Bolt,
    Bullet,
    Explosion,
    Cone,
    Bomb,
    Smite,
    MagicMissile,
    SummonGolem,
    MagicWall,
    SummonMonster,
    MovingBall,
    Swarm,
    Invisible,
    Heal,
    Protection,
    Detection,
    Other,
}

impl SpellSubtype {
    /// Spells a monster will pick on its own during combat.
    pub const fn is_offensive(self) -> bool {
        matches!(
            self,
            SpellSubtype::Bolt
                | SpellSubtype::Bullet
                | SpellSubtype::Explosion
                | SpellSubtype::Cone
                | SpellSubtype::Bomb
                | SpellSubtype::Smite
                | SpellSubtype::MagicMissile
                | SpellSubtype::SummonGolem
                | SpellSubtype::MagicWall
                | SpellSubtype::SummonMonster
                | SpellSubtype::MovingBall
                | SpellSubtype::Swarm
                | SpellSubtype::Invisible
        )
    }
}

bitflags! {
    /// Boolean state and capability bits of an object.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ObjectFlags: u64 {
        const ALIVE         = 1 << 0;
        const MONSTER       = 1 << 1;
        const GENERATOR     = 1 << 2;
        const SLEEP         = 1 << 3;
        const BLIND         = 1 << 4;
        const CONFUSED      = 1 << 5;
        const SCARED        = 1 << 6;
        const RUN_AWAY      = 1 << 7;
        const BERSERK       = 1 << 8;
        const STAND_STILL   = 1 << 9;
        const ONLY_ATTACK   = 1 << 10;
        const FRIENDLY      = 1 << 11;
        const NEUTRAL       = 1 << 12;
        const UNAGGRESSIVE  = 1 << 13;
        const NO_ATTACK     = 1 << 14;
        const RANDOM_MOVE   = 1 << 15;
        const CAST_SPELL    = 1 << 16;
        const READY_SCROLL  = 1 << 17;
        const READY_RANGE   = 1 << 18;
        const READY_BOW     = 1 << 19;
        const READY_SKILL   = 1 << 20;
        const USE_SCROLL    = 1 << 21;
        const USE_RANGE     = 1 << 22;
        const USE_BOW       = 1 << 23;
        const USE_WEAPON    = 1 << 24;
        const USE_ARMOUR    = 1 << 25;
        const USE_SHIELD    = 1 << 26;
        const USE_RING      = 1 << 27;
        const CAN_USE_SKILL = 1 << 28;
        const SEE_IN_DARK   = 1 << 29;
        const SEE_INVISIBLE = 1 << 30;
        const XRAYS         = 1 << 31;
        const STEALTH       = 1 << 32;
        const INVISIBLE     = 1 << 33;
        const HIDDEN        = 1 << 34;
        const UNDEAD        = 1 << 35;
        const WIZ           = 1 << 36;
        const APPLIED       = 1 << 37;
        const UNPAID        = 1 << 38;
        const IS_THROWN     = 1 << 39;
        const IS_FLOOR      = 1 << 40;
        const NO_PICK       = 1 << 41;
    }
}

bitflags! {
    /// Movement modes; on a tile the same bits describe what is blocked.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MoveType: u8 {
        const WALK      = 1 << 0;
        const FLY_LOW   = 1 << 1;
        const FLY_HIGH  = 1 << 2;
        const SWIM      = 1 << 3;
        const BOAT      = 1 << 4;
    }
}

impl MoveType {
    /// True when every way `mover` can move is blocked by `self`.
    pub fn blocks(self, mover: MoveType) -> bool {
        !mover.is_empty() && !self.is_empty() && self.contains(mover)
    }
}

bitflags! {
    /// What kinds of items a creature picks up from the floor.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PickUp: u8 {
        const MONEY   = 2;
        const FOOD    = 4;
        const WEAPON  = 8;
        const ARMOUR  = 16;
        const INVERSE = 32;
        const ALL     = 64;
    }
}

bitflags! {
    /// What a creature applies on its own while wandering.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WillApply: u8 {
        const HANDLE    = 0x01;
        const TREASURE  = 0x02;
        const EARTHWALL = 0x04;
        const DOOR      = 0x08;
        const FOOD      = 0x10;
    }
}

/// Combat movement pattern selected by the low nibble of `attack_movement`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatPattern {
    DistAtt,
    RunAtt,
    HitRun,
    WaitAtt,
    Rush,
    AllRun,
    DistHit,
    Wait2,
}

impl CombatPattern {
    /// `Ok(None)` when no pattern is set, `Err(raw)` for an unknown id.
    pub fn from_attack_movement(attack_movement: u8) -> Result<Option<Self>, u8> {
        let pattern = match attack_movement & 0x0f {
            0 => return Ok(None),
            1 => CombatPattern::DistAtt,
            2 => CombatPattern::RunAtt,
            3 => CombatPattern::HitRun,
            4 => CombatPattern::WaitAtt,
            5 => CombatPattern::Rush,
            6 => CombatPattern::AllRun,
            7 => CombatPattern::DistHit,
            8 => CombatPattern::Wait2,
            raw => return Err(raw),
        };
        Ok(Some(pattern))
    }
}

/// Idle movement pattern selected by the high nibble of `attack_movement`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdlePattern {
    PetMove,
    Circle1,
    Circle2,
    PaceH,
    PaceH2,
    Rando,
    Rando2,
    PaceV,
    PaceV2,
}

impl IdlePattern {
    pub const PET_MOVE_BITS: u8 = 0x10;

    /// Unknown values yield `None` and leave the creature idle.
    pub fn from_attack_movement(attack_movement: u8) -> Option<Self> {
        match attack_movement & 0xf0 {
            0x10 => Some(IdlePattern::PetMove),
            0x20 => Some(IdlePattern::Circle1),
            0x30 => Some(IdlePattern::Circle2),
            0x40 => Some(IdlePattern::PaceH),
            0x50 => Some(IdlePattern::PaceH2),
            0x60 => Some(IdlePattern::Rando),
            0x70 => Some(IdlePattern::Rando2),
            0x80 => Some(IdlePattern::PaceV),
            0x90 => Some(IdlePattern::PaceV2),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Hostile,
    Friendly,
    Neutral,
}

impl Alignment {
    pub fn of(flags: ObjectFlags) -> Self {
        if flags.contains(ObjectFlags::NEUTRAL) {
            Alignment::Neutral
        } else if flags.contains(ObjectFlags::FRIENDLY) {
            Alignment::Friendly
        } else {
            Alignment::Hostile
        }
    }
}

/// Fear level; `Scared` overrides `RunningAway` when both bits are set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Morale {
    Steady,
    RunningAway,
    Scared,
}

impl Morale {
    pub const fn is_fleeing(self) -> bool {
        !matches!(self, Morale::Steady)
    }
}

/// Per-tick view of a creature's behavioural flags, derived once and passed
/// down instead of testing bits everywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Disposition {
    pub alignment: Alignment,
    pub morale: Morale,
    pub berserk: bool,
    pub confused: bool,
    pub unaggressive: bool,
    pub only_attack: bool,
    pub stand_still: bool,
}

impl Disposition {
    pub fn of(flags: ObjectFlags) -> Self {
        let morale = if flags.contains(ObjectFlags::SCARED) {
            Morale::Scared
        } else if flags.contains(ObjectFlags::RUN_AWAY) {
            Morale::RunningAway
        } else {
            Morale::Steady
        };
        Disposition {
            alignment: Alignment::of(flags),
            morale,
            berserk: flags.contains(ObjectFlags::BERSERK),
            confused: flags.contains(ObjectFlags::CONFUSED),
            unaggressive: flags.contains(ObjectFlags::UNAGGRESSIVE),
            only_attack: flags.contains(ObjectFlags::ONLY_ATTACK),
            stand_still: flags.contains(ObjectFlags::STAND_STILL),
        }
    }

    pub const fn is_scared(&self) -> bool {
        matches!(self.morale, Morale::Scared)
    }

    pub const fn is_running_away(&self) -> bool {
        matches!(self.morale, Morale::RunningAway)
    }

    /// Seeks out players on its own.
    pub const fn is_aggressive(&self) -> bool {
        !self.unaggressive && matches!(self.alignment, Alignment::Hostile)
    }
}

/// Result of one `monster_move` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The creature was freed during the call; its handle is stale.
    Destroyed,
}
