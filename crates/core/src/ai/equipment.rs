//! Picking things up, equipping them, using what lies underfoot, and
//! calling neighbours for help.

use crate::state::RESIST_KINDS;

use super::*;

/// Skill that lets a creature make use of thrown items.
const THROWING_SKILL: &str = "throwing";

fn weapon_quality(item: &Object) -> i32 {
    item.stats.dam + item.magic * 3 + item.stats.attribute_sum() * 2
}

fn armour_quality(item: &Object) -> i32 {
    item.stats.ac + item.resist[0] / 5 + item.magic * 3
}

/// Spell users pick up and learn from spellbooks.
fn is_caster(ob: &Object) -> bool {
    ob.stats.max_sp > 0 || ob.stats.max_grace > 0
}

impl Engine<'_> {
    /// Objects under `id` on its tile, nearest first.
    fn objects_below(&self, id: ObjectId) -> Vec<ObjectId> {
        let Some(ob) = self.world.get(id) else { return Vec::new() };
        let Some(map) = ob.map else { return Vec::new() };
        let stack = self.world.objects_at(map, ob.pos);
        let end = stack.iter().position(|&o| o == id).unwrap_or(stack.len());
        stack[..end].iter().rev().copied().collect()
    }

    fn applied_of_kind(&self, who: ObjectId, kind: ObjectKind, except: ObjectId) -> Option<ObjectId> {
        self.world.get(who)?.inventory.iter().copied().find(|&item| {
            item != except && self.world.get(item).is_some_and(|o| o.kind == kind && o.has(ObjectFlags::APPLIED))
        })
    }

    fn carries(&self, who: ObjectId, pred: impl Fn(&Object) -> bool) -> bool {
        self.world
            .get(who)
            .is_some_and(|o| o.inventory.iter().any(|&item| self.world.get(item).is_some_and(&pred)))
    }

    /// Whether `monster` wants `item`. The `INVERSE` bit of `pick_up` turns
    /// the answer around.
    pub fn can_pick(&self, monster: ObjectId, item: ObjectId) -> bool {
        let (Some(mon), Some(it)) = (self.world.get(monster), self.world.get(item)) else { return false };
        if it.is_alive()
            || it.env.is_some()
            || it.flags.intersects(ObjectFlags::NO_PICK | ObjectFlags::IS_FLOOR | ObjectFlags::UNPAID)
            || self.world.head_of(item) == self.world.head_of(monster)
        {
            return false;
        }
        let pick_up = mon.pick_up;
        let uses = |flag: ObjectFlags| mon.has(flag);
        let mut wanted = if pick_up.contains(PickUp::ALL) {
            true
        } else if it.kind.is_weapon() {
            pick_up.contains(PickUp::WEAPON) || uses(ObjectFlags::USE_WEAPON)
        } else {
            match it.kind {
                ObjectKind::Armour => pick_up.contains(PickUp::ARMOUR) || uses(ObjectFlags::USE_ARMOUR),
                ObjectKind::Shield => pick_up.contains(PickUp::ARMOUR) || uses(ObjectFlags::USE_SHIELD),
                ObjectKind::Money | ObjectKind::Gem => pick_up.contains(PickUp::MONEY),
                ObjectKind::Food => pick_up.contains(PickUp::FOOD),
                ObjectKind::Skill => uses(ObjectFlags::CAN_USE_SKILL),
                ObjectKind::Ring => uses(ObjectFlags::USE_RING),
                ObjectKind::Wand | ObjectKind::Rod => uses(ObjectFlags::USE_RANGE),
                ObjectKind::Spellbook => is_caster(mon),
                ObjectKind::Scroll => uses(ObjectFlags::USE_SCROLL),
                _ => false,
            }
        };
        if !wanted
            && it.has(ObjectFlags::IS_THROWN)
            && self.carries(monster, |o| o.kind == ObjectKind::Skill && o.name == THROWING_SKILL)
        {
            wanted = pick_up.contains(PickUp::WEAPON) || uses(ObjectFlags::USE_WEAPON);
        }
        wanted != pick_up.contains(PickUp::INVERSE)
    }

    /// Picks up whatever the creature wants from under each of its parts,
    /// as much of each stack as its strength allows.
    pub fn check_pickup(&mut self, monster: ObjectId) {
        for part in self.world.parts(monster) {
            for item in self.objects_below(part) {
                if !self.can_pick(monster, item) {
                    continue;
                }
                let (Some(mon), Some(it)) = (self.world.get(monster), self.world.get(item)) else { continue };
                let stack = it.nrof.max(1);
                let count = if it.weight > 0 {
                    let room = self.config.weight_limit(mon.stats.strength) - mon.weight - mon.carrying;
                    (room.max(0) / it.weight) as u32
                } else {
                    stack
                };
                if count == 0 {
                    continue;
                }
                let Some(taken) = self.split_stack(item, count.min(stack)) else { continue };
                if let Err(error) = self.world.insert_in_inventory(monster, taken) {
                    debug!(monster = %self.name(monster), %error, "pickup failed");
                    continue;
                }
                trace!(monster = %self.name(monster), item = %self.name(taken), "picked up");
                self.check_apply(monster, taken);
            }
        }
    }

    /// Takes `count` items off the stack `item`, which keeps the rest.
    fn split_stack(&mut self, item: ObjectId, count: u32) -> Option<ObjectId> {
        let ob = self.world.get_mut(item)?;
        if count >= ob.nrof {
            return Some(item);
        }
        ob.nrof -= count;
        let mut split = ob.clone();
        split.nrof = count;
        split.map = None;
        split.env = None;
        split.inventory.clear();
        Some(self.world.spawn(split))
    }

    /// Runs [`Engine::check_apply`] on everything `monster` carries.
    /// Called by the host after it hands a monster new items.
    pub fn check_apply_all(&mut self, monster: ObjectId) {
        let inventory = self.world.get(monster).map(|o| o.inventory.clone()).unwrap_or_default();
        for item in inventory {
            self.check_apply(monster, item);
        }
    }

    /// Readies or equips a freshly acquired item when it is useful and,
    /// for gear, better than what is worn already.
    pub fn check_apply(&mut self, mon: ObjectId, item: ObjectId) {
        let (Some(m), Some(it)) = (self.world.get(mon), self.world.get(item)) else { return };
        let (flags, will_apply) = (m.flags, m.will_apply);
        let kind = it.kind;

        if kind == ObjectKind::Spellbook && is_caster(m) {
            self.set_flag(mon, ObjectFlags::CAST_SPELL, true);
            return;
        }
        if it.has(ObjectFlags::APPLIED) {
            return;
        }
        if flags.contains(ObjectFlags::USE_BOW) && kind == ObjectKind::Arrow {
            let race = it.race.clone();
            if self.carries(mon, |o| o.kind == ObjectKind::Bow && o.race == race) {
                trace!(monster = %self.name(mon), "found a bow for these arrows");
                self.set_flag(mon, ObjectFlags::READY_BOW, true);
                return;
            }
        }

        let wanted = match kind {
            ObjectKind::Treasure => will_apply.contains(WillApply::TREASURE),
            ObjectKind::Food => will_apply.contains(WillApply::FOOD),
            ObjectKind::Scroll if flags.contains(ObjectFlags::USE_SCROLL) => {
                let spell = self.world.first_inventory(item);
                if spell.is_none() {
                    debug!(monster = %self.name(mon), "scroll with nothing inside");
                } else if spell.and_then(|s| self.world.get(s)?.spell_subtype).is_some_and(SpellSubtype::is_offensive) {
                    self.set_flag(mon, ObjectFlags::READY_SCROLL, true);
                }
                return;
            }
            ObjectKind::Weapon => self.is_better_weapon(mon, item),
            ObjectKind::Armour | ObjectKind::Shield => self.is_better_armour(mon, item),
            ObjectKind::Ring => true,
            ObjectKind::Wand | ObjectKind::Rod => {
                if self.services.can_apply(self.world, mon, item) {
                    self.set_flag(mon, ObjectFlags::READY_RANGE, true);
                    self.set_flag(item, ObjectFlags::APPLIED, true);
                }
                return;
            }
            ObjectKind::Bow => {
                if self.services.can_apply(self.world, mon, item) {
                    self.set_flag(mon, ObjectFlags::READY_BOW, true);
                }
                return;
            }
            ObjectKind::Skill => {
                self.set_flag(mon, ObjectFlags::READY_SKILL, true);
                return;
            }
            _ => false,
        };
        if wanted && self.services.can_apply(self.world, mon, item) {
            self.services.apply_item(self.world, mon, item, ApplyMode::Equip);
        }
    }

    fn is_better_weapon(&self, who: ObjectId, item: ObjectId) -> bool {
        let Some(new) = self.world.get(item) else { return false };
        match self.applied_of_kind(who, new.kind, item).and_then(|o| self.world.get(o)) {
            None => true,
            Some(old) => weapon_quality(new) > weapon_quality(old),
        }
    }

    fn is_better_armour(&self, who: ObjectId, item: ObjectId) -> bool {
        let Some(new) = self.world.get(item) else { return false };
        let Some(old) = self.applied_of_kind(who, new.kind, item).and_then(|o| self.world.get(o)) else {
            return true;
        };
        let mut score = armour_quality(new) - armour_quality(old);
        for i in 1..RESIST_KINDS {
            score += (new.resist[i] - old.resist[i]).signum();
        }
        score > 0
    }

    /// Pulls handles and opens treasure under the creature, down to the floor.
    pub fn apply_below(&mut self, monster: ObjectId) {
        let will_apply = self.world.get(monster).map_or(WillApply::empty(), |o| o.will_apply);
        for item in self.objects_below(monster) {
            let Some(it) = self.world.get(item) else { continue };
            let is_floor = it.has(ObjectFlags::IS_FLOOR);
            let wanted = match it.kind {
                ObjectKind::Handle | ObjectKind::Trigger => will_apply.contains(WillApply::HANDLE),
                ObjectKind::Treasure => will_apply.contains(WillApply::TREASURE),
                _ => false,
            };
            if wanted {
                self.services.apply_item(self.world, monster, item, ApplyMode::Use);
            }
            if is_floor {
                break;
            }
        }
    }

    /// Every living, unaggressive creature near `op` takes on its enemy.
    /// Called by the host when `op` is attacked.
    pub fn npc_call_help(&mut self, op: ObjectId) {
        let Some(ob) = self.world.get(op) else { return };
        let Some(map) = ob.map else { return };
        let (origin, enemy) = (ob.pos, ob.enemy);
        let r = self.config.call_help_radius;
        let mut helpers = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let Some((m, p)) = self.world.normalize(map, origin.offset(dx, dy)) else { continue };
                helpers.extend(self.world.objects_at(m, p).iter().copied().filter(|&o| {
                    self.world.get(o).is_some_and(|o| o.is_alive() && o.has(ObjectFlags::UNAGGRESSIVE))
                }));
            }
        }
        for helper in helpers {
            self.set_enemy(helper, enemy);
        }
    }

    /// First carried item that can be thrown. Used by the host's throwing code.
    pub fn find_throw_ob(&self, op: ObjectId) -> Option<ObjectId> {
        self.world.get(op)?.inventory.iter().copied().find(|&item| {
            self.world.get(item).is_some_and(|o| {
                o.has(ObjectFlags::IS_THROWN) && !o.flags.intersects(ObjectFlags::INVISIBLE | ObjectFlags::APPLIED)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    /// Puts a loose item on a tile before anything stands on it.
    fn drop_item(fx: &mut Fixture, name: &str, kind: ObjectKind, x: i32, y: i32) -> ObjectId {
        let item = fx.world.spawn(Object::new(name, kind));
        fx.world.place(item, fx.map, Pos { y, x }).expect("place item");
        item
    }

    #[test]
    fn picks_up_coins_but_not_unpaid_goods() {
        let mut fx = Fixture::open(5, 5);
        let coins = drop_item(&mut fx, "coins", ObjectKind::Money, 2, 2);
        let ring = drop_item(&mut fx, "shop ring", ObjectKind::Money, 2, 2);
        fx.world.objects[ring].set(ObjectFlags::UNPAID, true);
        let magpie = fx.monster("magpie", 2, 2);
        fx.world.objects[magpie].pick_up = PickUp::MONEY;

        let mut rng = ScriptedRandom::zeros();
        fx.engine(&mut rng).check_pickup(magpie);
        assert_eq!(fx.world.objects[magpie].inventory, vec![coins]);
        assert_eq!(fx.world.objects[ring].map, Some(fx.map));
    }

    #[test]
    fn inverse_pickup_takes_everything_else() {
        let mut fx = Fixture::open(5, 5);
        let apple = drop_item(&mut fx, "apple", ObjectKind::Food, 2, 2);
        let gem = drop_item(&mut fx, "gem", ObjectKind::Gem, 2, 2);
        let goat = fx.monster("goat", 2, 2);
        fx.world.objects[goat].pick_up = PickUp::MONEY | PickUp::INVERSE;

        let mut rng = ScriptedRandom::zeros();
        let engine = fx.engine(&mut rng);
        assert!(engine.can_pick(goat, apple));
        assert!(!engine.can_pick(goat, gem));
    }

    #[test]
    fn strength_limits_how_much_of_a_stack_is_taken() {
        let mut fx = Fixture::open(5, 5);
        fx.config.carry_limit_base = 100;
        fx.config.carry_limit_per_str = 0;
        let rocks = drop_item(&mut fx, "rocks", ObjectKind::Misc, 1, 1);
        {
            let ob = &mut fx.world.objects[rocks];
            ob.weight = 30;
            ob.nrof = 10;
        }
        let troll = fx.monster("troll", 1, 1);
        fx.world.objects[troll].pick_up = PickUp::ALL;

        let mut rng = ScriptedRandom::zeros();
        fx.engine(&mut rng).check_pickup(troll);
        let carried = fx.world.objects[troll].inventory.clone();
        assert_eq!(carried.len(), 1);
        assert_eq!(fx.world.objects[carried[0]].nrof, 3);
        assert_eq!(fx.world.objects[rocks].nrof, 7);
        assert_eq!(fx.world.objects[troll].carrying, 90);
    }

    #[test]
    fn better_weapon_is_wielded_and_worse_is_kept_in_the_pack() {
        let mut fx = Fixture::open(5, 5);
        let orc = fx.monster("orc", 1, 1);
        let club = fx.item(orc, "club", ObjectKind::Weapon);
        {
            let ob = &mut fx.world.objects[club];
            ob.stats.dam = 4;
            ob.set(ObjectFlags::APPLIED, true);
        }
        let stick = fx.item(orc, "stick", ObjectKind::Weapon);
        fx.world.objects[stick].stats.dam = 2;
        let axe = fx.item(orc, "axe", ObjectKind::Weapon);
        fx.world.objects[axe].stats.dam = 3;
        fx.world.objects[axe].magic = 1;

        let mut services = RecordingServices::default();
        let mut rng = ScriptedRandom::zeros();
        fx.engine_with(&mut rng, &mut services).check_apply_all(orc);
        assert_eq!(services.applied, vec![(orc, axe, ApplyMode::Equip)]);
    }

    #[test]
    fn armour_resistances_tip_the_balance() {
        let mut fx = Fixture::open(5, 5);
        let knight = fx.monster("knight", 1, 1);
        let mail = fx.item(knight, "mail", ObjectKind::Armour);
        {
            let ob = &mut fx.world.objects[mail];
            ob.stats.ac = 3;
            ob.set(ObjectFlags::APPLIED, true);
        }
        let robe = fx.item(knight, "robe", ObjectKind::Armour);
        {
            let ob = &mut fx.world.objects[robe];
            ob.stats.ac = 3;
            ob.resist[3] = 20;
        }
        let mut services = RecordingServices::default();
        let mut rng = ScriptedRandom::zeros();
        fx.engine_with(&mut rng, &mut services).check_apply(knight, robe);
        assert_eq!(services.applied, vec![(knight, robe, ApplyMode::Equip)]);
    }

    #[test]
    fn devices_are_readied_not_wielded() {
        let mut fx = Fixture::open(5, 5);
        let kobold = fx.monster("kobold", 1, 1);
        let wand = fx.item(kobold, "wand", ObjectKind::Wand);
        let skill = fx.item(kobold, "karate", ObjectKind::Skill);
        let scroll = fx.item(kobold, "scroll", ObjectKind::Scroll);
        let spell = fx.item(scroll, "bolt", ObjectKind::Spell);
        fx.world.objects[spell].spell_subtype = Some(SpellSubtype::Bolt);
        fx.world.objects[kobold].set(ObjectFlags::USE_SCROLL, true);

        let mut services = RecordingServices::default();
        let mut rng = ScriptedRandom::zeros();
        let mut engine = fx.engine_with(&mut rng, &mut services);
        for item in [wand, skill, scroll] {
            engine.check_apply(kobold, item);
        }
        let ob = &fx.world.objects[kobold];
        assert!(ob.has(ObjectFlags::READY_RANGE | ObjectFlags::READY_SKILL | ObjectFlags::READY_SCROLL));
        assert!(fx.world.objects[wand].has(ObjectFlags::APPLIED));
        assert!(services.applied.is_empty());
    }

    #[test]
    fn arrows_ready_a_matching_bow() {
        let mut fx = Fixture::open(5, 5);
        let elf = fx.monster("elf", 1, 1);
        fx.world.objects[elf].set(ObjectFlags::USE_BOW, true);
        let bow = fx.item(elf, "long bow", ObjectKind::Bow);
        fx.world.objects[bow].race = Some("arrows".into());
        let arrows = fx.item(elf, "arrows", ObjectKind::Arrow);
        fx.world.objects[arrows].race = Some("arrows".into());

        let mut rng = ScriptedRandom::zeros();
        fx.engine(&mut rng).check_apply(elf, arrows);
        assert!(fx.world.objects[elf].has(ObjectFlags::READY_BOW));
    }

    #[test]
    fn handles_below_are_pulled_down_to_the_floor() {
        let mut fx = Fixture::open(5, 5);
        let cellar = drop_item(&mut fx, "cellar lever", ObjectKind::Handle, 2, 2);
        let floor = drop_item(&mut fx, "floor", ObjectKind::Floor, 2, 2);
        fx.world.objects[floor].set(ObjectFlags::IS_FLOOR, true);
        let lever = drop_item(&mut fx, "lever", ObjectKind::Handle, 2, 2);
        let chest = drop_item(&mut fx, "chest", ObjectKind::Treasure, 2, 2);
        let imp = fx.monster("imp", 2, 2);
        fx.world.objects[imp].will_apply = WillApply::HANDLE;

        let mut services = RecordingServices::default();
        let mut rng = ScriptedRandom::zeros();
        fx.engine_with(&mut rng, &mut services).apply_below(imp);
        assert_eq!(services.applied, vec![(imp, lever, ApplyMode::Use)]);
        assert!(!services.applied.iter().any(|&(_, item, _)| item == cellar || item == chest));
    }

    #[test]
    fn call_for_help_rouses_nearby_peaceful_creatures() {
        let mut fx = Fixture::open(12, 5);
        let guard = fx.monster("guard", 2, 2);
        let hero = fx.player("hero", 9, 2);
        fx.world.objects[guard].enemy = Some(hero);
        let near = fx.monster("near", 5, 2);
        let far = fx.monster("far", 6, 2);
        let angry = fx.monster("angry", 4, 3);
        for id in [near, far] {
            fx.world.objects[id].set(ObjectFlags::UNAGGRESSIVE, true);
        }

        let mut rng = ScriptedRandom::zeros();
        fx.engine(&mut rng).npc_call_help(guard);
        assert_eq!(fx.world.objects[near].enemy, Some(hero));
        assert_eq!(fx.world.objects[far].enemy, None);
        assert_eq!(fx.world.objects[angry].enemy, None);
    }

    #[test]
    fn throwables_skip_applied_and_invisible_items() {
        let mut fx = Fixture::open(5, 5);
        let giant = fx.monster("giant", 1, 1);
        let worn = fx.item(giant, "worn dagger", ObjectKind::Weapon);
        fx.world.objects[worn].set(ObjectFlags::IS_THROWN | ObjectFlags::APPLIED, true);
        let hidden = fx.item(giant, "hidden rock", ObjectKind::Misc);
        fx.world.objects[hidden].set(ObjectFlags::IS_THROWN | ObjectFlags::INVISIBLE, true);
        let boulder = fx.item(giant, "boulder", ObjectKind::Misc);
        fx.world.objects[boulder].set(ObjectFlags::IS_THROWN, true);

        let mut rng = ScriptedRandom::zeros();
        assert_eq!(fx.engine(&mut rng).find_throw_ob(giant), Some(boulder));
    }
}
