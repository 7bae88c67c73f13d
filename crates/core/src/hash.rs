//! Stable snapshot hashing for deterministic verification.
//! This module exists to keep hashing concerns separate from the engine.
//! It does not decide which fields matter for gameplay; it hashes everything
//! a monster decision can change.

use std::hash::Hasher;

use slotmap::Key;
use xxhash_rust::xxh3::Xxh3;

use crate::state::World;
use crate::types::*;

fn write_handle(hasher: &mut Xxh3, handle: Option<impl Key>) {
    hasher.write_u64(handle.map_or(0, |h| h.data().as_ffi()));
}

/// Hash of every object's position, vitals, flags and targets, in arena
/// slot order. Equal worlds built the same way hash equally.
pub fn snapshot_hash(world: &World) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.write_usize(world.objects.len());
    for (id, ob) in &world.objects {
        write_handle(&mut hasher, Some(id));
        hasher.write(ob.name.as_bytes());
        write_handle(&mut hasher, ob.map);
        hasher.write_i32(ob.pos.x);
        hasher.write_i32(ob.pos.y);
        write_handle(&mut hasher, ob.env);
        hasher.write_i32(ob.stats.hp);
        hasher.write_i32(ob.stats.sp);
        hasher.write_i32(ob.stats.grace);
        hasher.write_u64(ob.flags.bits());
        write_handle(&mut hasher, ob.enemy);
        write_handle(&mut hasher, ob.attacked_by);
        hasher.write_u8(ob.direction.index());
        hasher.write_u32(ob.speed_left.to_bits());
        hasher.write_u32(ob.nrof);
        if let Some(state) = ob.pattern_state {
            hasher.write_i32(state.counter);
        }
    }
    hasher.finish()
}
