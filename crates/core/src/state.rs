//! World arena: maps, objects and the per-tile spatial index.
//! This module exists so the AI can hold plain `ObjectId` handles and find
//! out cheaply whether they still point at a live object.
//! It does not own any decision logic.

use slotmap::SlotMap;

use crate::types::*;

mod map;
mod object;

pub use map::{Edge, Map};
pub use object::{Object, PatternOwner, PatternState, RESIST_KINDS, Stats};

/// Hops followed when resolving coordinates across tiled maps.
const MAX_TILE_HOPS: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("object handle is stale")]
    UnknownObject,
    #[error("map handle is stale")]
    UnknownMap,
    #[error("({x}, {y}) is outside map `{map}` and its neighbours")]
    OutOfBounds { map: String, x: i32, y: i32 },
    #[error("object cannot contain itself")]
    SelfContainment,
}

#[derive(Clone, Debug, Default)]
pub struct World {
    pub maps: SlotMap<MapId, Map>,
    pub objects: SlotMap<ObjectId, Object>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_map(&mut self, map: Map) -> MapId {
        self.maps.insert(map)
    }

    /// Joins `from`'s `edge` to `to`, and `to`'s opposite edge back.
    pub fn tile_maps(&mut self, from: MapId, edge: Edge, to: MapId) {
        if let Some(m) = self.maps.get_mut(from) {
            m.tiled[edge as usize] = Some(to);
        }
        if let Some(m) = self.maps.get_mut(to) {
            m.tiled[edge.opposite() as usize] = Some(from);
        }
    }

    pub fn spawn(&mut self, object: Object) -> ObjectId {
        self.objects.insert(object)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    pub fn exists(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Neither on a map nor inside a container. Stale handles count as removed.
    pub fn is_removed(&self, id: ObjectId) -> bool {
        self.get(id).is_none_or(|o| o.map.is_none() && o.env.is_none())
    }

    pub fn head_of(&self, id: ObjectId) -> ObjectId {
        self.get(id).and_then(|o| o.head).filter(|&h| self.exists(h)).unwrap_or(id)
    }

    /// Head followed by its `more` chain.
    pub fn parts(&self, id: ObjectId) -> Vec<ObjectId> {
        let head = self.head_of(id);
        let mut parts = Vec::new();
        let mut cursor = Some(head);
        while let Some(part) = cursor
            && self.exists(part)
            && parts.len() <= self.objects.len()
        {
            parts.push(part);
            cursor = self.objects[part].more;
        }
        parts
    }

    /// Appends `part` to `head`'s body at the given offset from the head.
    pub fn attach_part(&mut self, head: ObjectId, part: ObjectId, offset: (i32, i32)) -> Result<(), WorldError> {
        if !self.exists(head) || !self.exists(part) {
            return Err(WorldError::UnknownObject);
        }
        let tail = self.parts(head).last().copied().unwrap_or(head);
        self.objects[tail].more = Some(part);
        let template = &self.objects[head];
        let (flags, move_type) = (template.flags, template.move_type);
        let part_ob = &mut self.objects[part];
        part_ob.head = Some(head);
        part_ob.offset = offset;
        part_ob.flags |= flags & ObjectFlags::ALIVE;
        part_ob.move_type = move_type;
        Ok(())
    }

    /// Resolves `pos` on `map`, following tiled neighbours when it falls off an edge.
    pub fn normalize(&self, map: MapId, pos: Pos) -> Option<(MapId, Pos)> {
        let (mut map_id, mut pos) = (map, pos);
        for _ in 0..MAX_TILE_HOPS {
            let map = self.maps.get(map_id)?;
            if map.in_bounds(pos) {
                return Some((map_id, pos));
            }
            if pos.x < 0 {
                map_id = map.neighbour(Edge::West)?;
                pos.x += self.maps.get(map_id)?.width;
            } else if pos.x >= map.width {
                pos.x -= map.width;
                map_id = map.neighbour(Edge::East)?;
            } else if pos.y < 0 {
                map_id = map.neighbour(Edge::North)?;
                pos.y += self.maps.get(map_id)?.height;
            } else {
                pos.y -= map.height;
                map_id = map.neighbour(Edge::South)?;
            }
        }
        None
    }

    /// Position of `to`'s origin in `from`'s coordinates, when the maps are
    /// the same or joined directly or through one intermediate map.
    pub fn map_offset(&self, from: MapId, to: MapId) -> Option<(i32, i32)> {
        if from == to {
            return self.maps.contains_key(from).then_some((0, 0));
        }
        let hop = |m: MapId, edge: Edge| -> Option<(MapId, (i32, i32))> {
            let map = self.maps.get(m)?;
            let next = map.neighbour(edge)?;
            let next_map = self.maps.get(next)?;
            let delta = match edge {
                Edge::North => (0, -next_map.height),
                Edge::East => (map.width, 0),
                Edge::South => (0, map.height),
                Edge::West => (-next_map.width, 0),
            };
            Some((next, delta))
        };
        for edge in Edge::ALL {
            if let Some((next, delta)) = hop(from, edge)
                && next == to
            {
                return Some(delta);
            }
        }
        for first in Edge::ALL {
            let Some((mid, d1)) = hop(from, first) else { continue };
            for second in Edge::ALL {
                if let Some((next, d2)) = hop(mid, second)
                    && next == to
                {
                    return Some((d1.0 + d2.0, d1.1 + d2.1));
                }
            }
        }
        None
    }

    pub fn on_same_map(&self, a: ObjectId, b: ObjectId) -> bool {
        match (self.get(a).and_then(|o| o.map), self.get(b).and_then(|o| o.map)) {
            (Some(ma), Some(mb)) => self.map_offset(ma, mb).is_some(),
            _ => false,
        }
    }

    pub fn objects_at(&self, map: MapId, pos: Pos) -> &[ObjectId] {
        self.maps.get(map).map_or(&[], |m| m.objects_at(pos))
    }

    pub fn is_alive_at(&self, map: MapId, pos: Pos) -> bool {
        self.objects_at(map, pos).iter().any(|&o| self.get(o).is_some_and(Object::is_alive))
    }

    pub fn move_block_at(&self, map: MapId, pos: Pos) -> MoveType {
        self.maps.get(map).map_or(MoveType::all(), |m| m.move_block(pos))
    }

    /// Whether `id` (or its head) may not enter `pos`: the terrain blocks
    /// every way it moves, or a living thing other than itself stands there.
    pub fn blocked_for(&self, id: ObjectId, map: MapId, pos: Pos) -> bool {
        let head = self.head_of(id);
        let Some(ob) = self.get(head) else { return true };
        let Some(m) = self.maps.get(map) else { return true };
        if !m.in_bounds(pos) {
            return true;
        }
        if m.move_block(pos).blocks(ob.move_type) {
            return true;
        }
        m.objects_at(pos).iter().any(|&other| {
            self.head_of(other) != head && self.get(other).is_some_and(Object::is_alive)
        })
    }

    /// Puts `id` (and its body parts) on `map` at `pos`.
    pub fn place(&mut self, id: ObjectId, map: MapId, pos: Pos) -> Result<(), WorldError> {
        let head = self.head_of(id);
        let parts = self.parts(head);
        if parts.is_empty() {
            return Err(WorldError::UnknownObject);
        }
        let Some(map_ob) = self.maps.get(map) else {
            return Err(WorldError::UnknownMap);
        };
        let map_name = map_ob.name.clone();
        let mut targets = Vec::with_capacity(parts.len());
        for &part in &parts {
            let (dx, dy) = self.objects[part].offset;
            let want = pos.offset(dx, dy);
            let Some(target) = self.normalize(map, want) else {
                return Err(WorldError::OutOfBounds { map: map_name, x: want.x, y: want.y });
            };
            targets.push(target);
        }
        self.remove(head);
        for (part, (m, p)) in parts.into_iter().zip(targets) {
            let ob = &mut self.objects[part];
            ob.map = Some(m);
            ob.pos = p;
            if let Some(map) = self.maps.get_mut(m) {
                map.add_occupant(p, part);
            }
        }
        Ok(())
    }

    /// Takes the whole object off its map, or out of its container.
    pub fn remove(&mut self, id: ObjectId) {
        let head = self.head_of(id);
        for part in self.parts(head) {
            let ob = &mut self.objects[part];
            if let Some(map) = ob.map.take()
                && let Some(m) = self.maps.get_mut(map)
            {
                m.remove_occupant(ob.pos, part);
            }
        }
        let Some(ob) = self.objects.get_mut(head) else { return };
        if let Some(env) = ob.env.take() {
            let weight = ob.weight * ob.nrof as i32;
            if let Some(container) = self.objects.get_mut(env) {
                container.inventory.retain(|&o| o != head);
                container.carrying -= weight;
            }
        }
    }

    /// Removes and destroys the object, its body parts and its inventory.
    /// Every handle to them becomes stale.
    pub fn free(&mut self, id: ObjectId) {
        if !self.exists(id) {
            return;
        }
        let head = self.head_of(id);
        self.remove(head);
        for part in self.parts(head) {
            let inventory = self.objects.get(part).map(|o| o.inventory.clone()).unwrap_or_default();
            for item in inventory {
                if let Some(ob) = self.objects.get_mut(item) {
                    ob.env = None;
                }
                self.free(item);
            }
            self.objects.remove(part);
        }
    }

    /// Like [`World::free`], but the inventory lands on the tile the object
    /// stood on first. Items are freed with it when it stands on no map.
    pub fn free_drop_inventory(&mut self, id: ObjectId) {
        let head = self.head_of(id);
        let Some(ob) = self.get(head) else { return };
        if let Some(map) = ob.map {
            let pos = ob.pos;
            let items: Vec<ObjectId> =
                self.parts(head).iter().flat_map(|&p| self.objects[p].inventory.clone()).collect();
            for item in items {
                self.remove(item);
                if self.place(item, map, pos).is_err() {
                    self.free(item);
                }
            }
        }
        self.free(head);
    }

    pub fn insert_in_inventory(&mut self, container: ObjectId, item: ObjectId) -> Result<(), WorldError> {
        if !self.exists(container) || !self.exists(item) {
            return Err(WorldError::UnknownObject);
        }
        let item_head = self.head_of(item);
        let mut holder = Some(container);
        while let Some(id) = holder {
            let head = self.head_of(id);
            if head == item_head {
                return Err(WorldError::SelfContainment);
            }
            holder = self.get(head).and_then(|o| o.env);
        }
        self.remove(item);
        let ob = &mut self.objects[item];
        ob.env = Some(container);
        let weight = ob.weight * ob.nrof as i32;
        let holder = &mut self.objects[container];
        holder.inventory.push(item);
        holder.carrying += weight;
        Ok(())
    }

    /// First inventory item, typically the spell inside a scroll, wand or book.
    pub fn first_inventory(&self, id: ObjectId) -> Option<ObjectId> {
        self.get(id)?.inventory.iter().copied().find(|&o| self.exists(o))
    }

    /// Moves a possibly multi-part object one step. Fails without side
    /// effects when any part would leave the world or enter a blocked tile.
    pub fn move_object(&mut self, id: ObjectId, dir: Dir) -> bool {
        if dir.is_none() {
            return false;
        }
        let head = self.head_of(id);
        let parts = self.parts(head);
        let mut targets = Vec::with_capacity(parts.len());
        for &part in &parts {
            let ob = &self.objects[part];
            let Some(map) = ob.map else { return false };
            let Some(target) = self.normalize(map, ob.pos.step(dir)) else {
                return false;
            };
            if self.blocked_for(head, target.0, target.1) {
                return false;
            }
            targets.push(target);
        }
        for (&part, &(m, p)) in parts.iter().zip(&targets) {
            let ob = &mut self.objects[part];
            let (old_map, old_pos) = (ob.map, ob.pos);
            ob.map = Some(m);
            ob.pos = p;
            if let Some(old) = old_map
                && let Some(map) = self.maps.get_mut(old)
            {
                map.remove_occupant(old_pos, part);
            }
            if let Some(map) = self.maps.get_mut(m) {
                map.add_occupant(p, part);
            }
        }
        if let Some(ob) = self.objects.get_mut(head) {
            ob.direction = dir;
        }
        true
    }
}
