//! Route finding toward an enemy and aimless wandering.

use super::*;

const UNREACHED: u32 = 999;

impl Engine<'_> {
    /// First step from `source` toward `target`, found by flooding outward
    /// from the target until the flood touches the source. Neighbours are
    /// expanded in a freshly shuffled order at every cell so equal routes are
    /// picked at random. Returns `default` when the two are on different
    /// maps, when no route exists, or when the flood exceeds the budget.
    pub fn compute_path(&mut self, source: ObjectId, target: ObjectId, default: Dir) -> Dir {
        let (Some(src), Some(dst)) = (self.world.get(source), self.world.get(target)) else {
            return default;
        };
        let (Some(map_id), Some(target_map)) = (src.map, dst.map) else { return default };
        if map_id != target_map {
            return default;
        }
        let (from, goal) = (src.pos, dst.pos);
        let Some(map) = self.world.maps.get(map_id) else { return default };
        let (width, height) = (map.width, map.height);
        let cell = |p: Pos| (p.x * height + p.y) as usize;
        let in_bounds = |p: Pos| (0..width).contains(&p.x) && (0..height).contains(&p.y);

        let mut distance = vec![UNREACHED; (width * height).max(0) as usize];
        let Some(start) = distance.get_mut(cell(goal)) else { return default };
        *start = 0;
        let mut explore = vec![goal];
        let mut current = 0;

        while current < explore.len() {
            let here = explore[current];
            let mut dirs = [0i32; 8];
            dirs[0] = 1;
            for i in 1..8 {
                let j = self.rng.next_int(i as u32 + 1) as usize;
                dirs[i] = dirs[j];
                dirs[j] = i as i32 + 1;
            }
            for check in dirs {
                let dir = default.rotated(4 + check);
                let (dx, dy) = dir.delta();
                let next = here.offset(dx, dy);
                if next == from {
                    return dir.reversed();
                }
                if !in_bounds(next) || self.world.blocked_for(source, map_id, next) {
                    continue;
                }
                let cost = distance[cell(here)] + if dir.is_diagonal() { 3 } else { 2 };
                if distance[cell(next)] > cost {
                    distance[cell(next)] = cost;
                    explore.push(next);
                    if explore.len() >= self.config.path_budget {
                        trace!(source = %self.name(source), budget = self.config.path_budget, "path search budget spent");
                        return default;
                    }
                }
            }
            current += 1;
        }
        default
    }

    /// Tries a handful of random steps. A creature pausing after a
    /// conversation counts down instead of moving.
    pub fn move_randomly(&mut self, op: ObjectId) -> bool {
        let Some(ob) = self.world.get_mut(op) else { return false };
        if ob.has(ObjectFlags::UNAGGRESSIVE) && ob.talked_to > 0 {
            ob.talked_to -= 1;
            if ob.talked_to != 0 {
                return true;
            }
        }
        for _ in 0..self.config.random_move_tries {
            let dir = self.random_dir();
            if self.step(op, dir) {
                return true;
            }
        }
        false
    }
}
