//! Ranged and skill actions tried before a creature moves: spells,
//! scrolls, wands and rods, skills, and bows.

use super::spatial::range_vector;
use super::*;

/// Spells considered when picking one at random.
const MAX_KNOWN_SPELLS: usize = 20;

impl Engine<'_> {
    fn is_offensive_spell(&self, spell: Option<ObjectId>) -> bool {
        spell
            .and_then(|s| self.world.get(s))
            .and_then(|s| s.spell_subtype)
            .is_some_and(SpellSubtype::is_offensive)
    }

    /// Whether aiming along `dir` risks hitting the owner of a friendly
    /// creature. `tolerance` is the number of 45 degree turns that still
    /// count as "toward the owner" plus one.
    fn might_hit_owner(&self, head: ObjectId, dir: Dir, closest_part: bool, tolerance: u8) -> bool {
        if !self.flags(head).contains(ObjectFlags::FRIENDLY) {
            return false;
        }
        let Some(owner) = self.live_owner(head) else { return false };
        range_vector(self.world, head, owner, closest_part).is_some_and(|rv| dir.diff(rv.direction) < tolerance)
    }

    fn confuse(&mut self, head: ObjectId, dir: Dir) -> Dir {
        if self.flags(head).contains(ObjectFlags::CONFUSED) { self.randomized_dir(dir) } else { dir }
    }

    /// Clear first step toward `enemy`, already checked against the owner.
    fn aim(&mut self, head: ObjectId, part: ObjectId, enemy: ObjectId, closest_part: bool, tolerance: u8) -> Option<Dir> {
        let dir = self.path_to_target(part, enemy, 0);
        if dir.is_none() || self.might_hit_owner(head, dir, closest_part, tolerance) {
            return None;
        }
        Some(self.confuse(head, dir))
    }

    /// A spellbook or spell from the inventory whose spell is worth casting.
    fn choose_random_spell(&mut self, head: ObjectId) -> Option<ObjectId> {
        let inventory = self.world.get(head)?.inventory.clone();
        let candidates: Vec<ObjectId> = inventory
            .into_iter()
            .filter(|&item| {
                let spell = match self.world.get(item).map(|o| o.kind) {
                    Some(ObjectKind::Spellbook) => self.world.first_inventory(item),
                    Some(ObjectKind::Spell) => Some(item),
                    _ => None,
                };
                self.is_offensive_spell(spell)
            })
            .take(MAX_KNOWN_SPELLS)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let pick = self.rng.next_int(candidates.len() as u32) as usize;
        candidates.get(pick).copied()
    }

    /// Casts a known spell at `enemy`, paying its mana and grace.
    pub fn cast_spell(&mut self, head: ObjectId, part: ObjectId, enemy: ObjectId) -> bool {
        let Some(mut dir) = self.aim(head, part, enemy, false, 2) else { return false };

        let chosen = self.world.get(head).and_then(|o| o.spell_item).filter(|&s| self.world.exists(s));
        let spell = match chosen {
            Some(spell) => spell,
            None => {
                let Some(item) = self.choose_random_spell(head) else {
                    debug!(monster = %self.name(head), "no useful spells, turning spellcasting off");
                    self.set_flag(head, ObjectFlags::CAST_SPELL, false);
                    return false;
                };
                if self.world.get(item).is_some_and(|o| o.kind == ObjectKind::Spellbook) {
                    let Some(inner) = self.world.first_inventory(item) else {
                        warn!(book = %self.name(item), "spellbook does not contain a spell");
                        return false;
                    };
                    inner
                } else {
                    item
                }
            }
        };

        let Some(spell_ob) = self.world.get(spell) else { return false };
        // Short reach or negative damage: a defensive or healing spell.
        if spell_ob.range <= 1 || spell_ob.stats.dam < 0 {
            dir = Dir::NONE;
        }
        let cost = self.services.spell_cost(self.world, head, spell);
        let Some(caster) = self.world.get_mut(head) else { return false };
        if caster.stats.sp < cost.mana || caster.stats.grace < cost.grace {
            return false;
        }
        caster.stats.sp -= cost.mana;
        caster.stats.grace -= cost.grace;
        caster.spell_item = None;
        trace!(monster = %self.name(head), spell = %self.name(spell), ?dir, "casting");
        self.services.cast_spell(self.world, head, part, dir, spell)
    }

    /// Reads the first scroll holding an offensive spell. With none left the
    /// creature stops trying.
    pub fn use_scroll(&mut self, head: ObjectId, part: ObjectId, enemy: ObjectId) -> bool {
        let Some(mut dir) = self.aim(head, part, enemy, false, 2) else { return false };
        let inventory = self.world.get(head).map(|o| o.inventory.clone()).unwrap_or_default();
        let scroll = inventory.into_iter().find(|&item| {
            self.world.get(item).is_some_and(|o| o.kind == ObjectKind::Scroll)
                && self.is_offensive_spell(self.world.first_inventory(item))
        });
        let Some(scroll) = scroll else {
            self.set_flag(head, ObjectFlags::READY_SCROLL, false);
            return false;
        };
        let self_targeted = self
            .world
            .first_inventory(scroll)
            .and_then(|s| self.world.get(s))
            .is_some_and(|s| s.range == 0);
        if self_targeted {
            dir = Dir::NONE;
        }
        if let Some(ob) = self.world.get_mut(head) {
            ob.direction = dir;
            ob.facing = dir;
        }
        self.services.facing_changed(self.world, head);
        self.services.apply_item(self.world, part, scroll, ApplyMode::Use);
        true
    }

    /// Uses a skill, alternating between the first two skills carried.
    pub fn use_skill(&mut self, head: ObjectId, part: ObjectId, enemy: ObjectId) -> bool {
        let Some(dir) = self.aim(head, part, enemy, true, 1) else { return false };
        let Some(ob) = self.world.get(head) else { return false };
        let current = ob.chosen_skill;
        let next = ob
            .inventory
            .iter()
            .copied()
            .find(|&item| Some(item) != current && self.world.get(item).is_some_and(|o| o.kind == ObjectKind::Skill));
        let skill = match (next, current) {
            (Some(skill), _) => {
                if let Some(ob) = self.world.get_mut(head) {
                    ob.chosen_skill = Some(skill);
                }
                skill
            }
            (None, Some(skill)) => skill,
            (None, None) => {
                debug!(monster = %self.name(head), "ready to use a skill but carries none");
                self.set_flag(head, ObjectFlags::READY_SKILL, false);
                return false;
            }
        };
        self.services.use_skill(self.world, head, part, skill, dir)
    }

    /// Zaps the first charged wand or rod.
    pub fn use_range(&mut self, head: ObjectId, part: ObjectId, enemy: ObjectId) -> bool {
        let Some(dir) = self.aim(head, part, enemy, true, 2) else { return false };
        let inventory = self.world.get(head).map(|o| o.inventory.clone()).unwrap_or_default();
        let mut carries_any = false;
        for item in inventory {
            let Some((kind, charges, rod_power)) = self.world.get(item).map(|o| (o.kind, o.stats.food, o.stats.hp)) else {
                continue;
            };
            match kind {
                ObjectKind::Wand => {
                    carries_any = true;
                    if charges <= 0 {
                        continue;
                    }
                    let Some(spell) = self.world.first_inventory(item) else { continue };
                    self.services.cast_spell(self.world, head, item, dir, spell);
                    if let Some(wand) = self.world.get_mut(item) {
                        wand.stats.food -= 1;
                    }
                    return true;
                }
                ObjectKind::Rod => {
                    carries_any = true;
                    let Some(spell) = self.world.first_inventory(item) else { continue };
                    let cost = self.world.get(spell).map_or(0, |s| s.stats.sp.max(s.stats.grace));
                    if rod_power < cost {
                        continue;
                    }
                    // Drain first: the spell may destroy the rod.
                    if let Some(rod) = self.world.get_mut(item) {
                        rod.stats.hp -= cost;
                    }
                    self.services.cast_spell(self.world, head, item, dir, spell);
                    return true;
                }
                _ => {}
            }
        }
        if !carries_any {
            warn!(monster = %self.name(head), "ready to use a wand or rod but carries none");
            self.set_flag(head, ObjectFlags::READY_RANGE, false);
        }
        false
    }

    /// Fires a bow when the enemy stands on a straight or diagonal line
    /// within range and nothing low-flying would stop the arrow.
    pub fn use_bow(&mut self, head: ObjectId, part: ObjectId, enemy: ObjectId) -> bool {
        let Some(rv) = range_vector(self.world, part, enemy, false) else { return false };
        if rv.distance > self.config.bow_range {
            return false;
        }
        if rv.dx != 0 && rv.dy != 0 && rv.dx.abs() != rv.dy.abs() {
            return false;
        }
        let owner = if self.flags(head).contains(ObjectFlags::FRIENDLY) { self.live_owner(head) } else { None };
        let owner_at = owner.and_then(|o| self.world.get(o)).and_then(|o| Some((o.map?, o.pos)));
        let Some((mut map, mut pos)) = self.world.get(part).and_then(|o| Some((o.map?, o.pos))) else {
            return false;
        };
        for _ in 0..rv.dx.abs().max(rv.dy.abs()) {
            let Some((m, p)) = self.world.normalize(map, pos.step(rv.direction)) else {
                warn!(monster = %self.name(head), "arrow path leaves the world");
                return false;
            };
            (map, pos) = (m, p);
            if self.world.move_block_at(map, pos).contains(MoveType::FLY_LOW) {
                return false;
            }
            if owner_at == Some((map, pos)) {
                return false;
            }
        }
        let dir = self.confuse(head, rv.direction);
        self.services.fire_bow(self.world, head, part, dir)
    }

    /// Tries each readied ranged or skill action once, behind its own
    /// random gate. True as soon as one fires.
    pub(super) fn ranged_attack(&mut self, op: ObjectId, enemy: ObjectId, rv: &RangeVector) -> bool {
        let part = rv.part.unwrap_or(op);
        let flags = self.flags(op);
        let chances = self.config.actions;
        if flags.contains(ObjectFlags::CAST_SPELL) && self.rng.one_in(chances.spell) && self.cast_spell(op, part, enemy) {
            return true;
        }
        if flags.contains(ObjectFlags::READY_SCROLL) && self.rng.one_in(chances.scroll) && self.use_scroll(op, part, enemy) {
            return true;
        }
        if flags.contains(ObjectFlags::READY_RANGE) && self.rng.one_in(chances.range) && self.use_range(op, part, enemy) {
            return true;
        }
        if flags.contains(ObjectFlags::READY_SKILL) && self.rng.one_in(chances.skill) && self.use_skill(op, part, enemy) {
            return true;
        }
        flags.contains(ObjectFlags::READY_BOW) && self.rng.one_in(chances.bow) && self.use_bow(op, part, enemy)
    }
}
