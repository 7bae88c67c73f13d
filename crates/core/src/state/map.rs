use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Edge of a map through which it can be tiled to a neighbour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::North, Edge::East, Edge::South, Edge::West];

    pub const fn opposite(self) -> Edge {
        match self {
            Edge::North => Edge::South,
            Edge::East => Edge::West,
            Edge::South => Edge::North,
            Edge::West => Edge::East,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Map {
    pub name: String,
    pub width: i32,
    pub height: i32,
    /// Ambient darkness, `0` is fully lit.
    pub darkness: i32,
    pub tiled: [Option<MapId>; 4],
    move_block: Vec<MoveType>,
    blocks_view: Vec<bool>,
    light: Vec<i32>,
    occupants: BTreeMap<Pos, Vec<ObjectId>>,
}

impl Map {
    pub fn new(name: impl Into<String>, width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let cells = (width * height) as usize;
        Self {
            name: name.into(),
            width,
            height,
            darkness: 0,
            tiled: [None; 4],
            move_block: vec![MoveType::empty(); cells],
            blocks_view: vec![false; cells],
            light: vec![0; cells],
            occupants: BTreeMap::new(),
        }
    }

    /// A map whose outermost ring is wall.
    pub fn walled(name: impl Into<String>, width: i32, height: i32) -> Self {
        let mut map = Self::new(name, width, height);
        for x in 0..map.width {
            map.set_wall(Pos { y: 0, x });
            map.set_wall(Pos { y: map.height - 1, x });
        }
        for y in 0..map.height {
            map.set_wall(Pos { y, x: 0 });
            map.set_wall(Pos { y, x: map.width - 1 });
        }
        map
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        self.in_bounds(pos).then(|| (pos.y * self.width + pos.x) as usize)
    }

    pub fn neighbour(&self, edge: Edge) -> Option<MapId> {
        self.tiled[edge as usize]
    }

    pub fn is_dark(&self) -> bool {
        self.darkness > 0
    }

    /// Out-of-bounds positions block everything.
    pub fn move_block(&self, pos: Pos) -> MoveType {
        self.index(pos).map_or(MoveType::all(), |i| self.move_block[i])
    }

    pub fn set_move_block(&mut self, pos: Pos, block: MoveType) {
        if let Some(i) = self.index(pos) {
            self.move_block[i] = block;
        }
    }

    /// Blocks walking, low flight and sight.
    pub fn set_wall(&mut self, pos: Pos) {
        self.set_move_block(pos, MoveType::WALK | MoveType::FLY_LOW | MoveType::SWIM | MoveType::BOAT);
        self.set_blocks_view(pos, true);
    }

    pub fn clear_tile(&mut self, pos: Pos) {
        self.set_move_block(pos, MoveType::empty());
        self.set_blocks_view(pos, false);
    }

    pub fn blocks_view(&self, pos: Pos) -> bool {
        self.index(pos).is_none_or(|i| self.blocks_view[i])
    }

    pub fn set_blocks_view(&mut self, pos: Pos, blocks: bool) {
        if let Some(i) = self.index(pos) {
            self.blocks_view[i] = blocks;
        }
    }

    /// Radius of the light source standing on `pos`, `0` for none.
    pub fn light(&self, pos: Pos) -> i32 {
        self.index(pos).map_or(0, |i| self.light[i])
    }

    pub fn set_light(&mut self, pos: Pos, radius: i32) {
        if let Some(i) = self.index(pos) {
            self.light[i] = radius.max(0);
        }
    }

    /// Objects on a tile, bottom first.
    pub fn objects_at(&self, pos: Pos) -> &[ObjectId] {
        self.occupants.get(&pos).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn add_occupant(&mut self, pos: Pos, id: ObjectId) {
        self.occupants.entry(pos).or_default().push(id);
    }

    pub(crate) fn remove_occupant(&mut self, pos: Pos, id: ObjectId) {
        if let Some(list) = self.occupants.get_mut(&pos) {
            list.retain(|&o| o != id);
            if list.is_empty() {
                self.occupants.remove(&pos);
            }
        }
    }

    pub fn occupied_tiles(&self) -> impl Iterator<Item = (&Pos, &Vec<ObjectId>)> {
        self.occupants.iter()
    }
}
