use anyhow::{Result, bail};
use clap::Parser;
use monster_ai::{
    AiConfig, Map, MoveType, NullServices, Object, ObjectFlags, ObjectKind, Pos, Scheduler, SeededRandom, World,
    snapshot_hash,
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 1000)]
    ticks: u32,
    /// Fresh worlds to generate, each from the next seed
    #[arg(short, long, default_value_t = 1)]
    worlds: u64,
}

const FLAG_POOL: [ObjectFlags; 12] = [
    ObjectFlags::SLEEP,
    ObjectFlags::BLIND,
    ObjectFlags::CONFUSED,
    ObjectFlags::SCARED,
    ObjectFlags::RUN_AWAY,
    ObjectFlags::BERSERK,
    ObjectFlags::STAND_STILL,
    ObjectFlags::FRIENDLY,
    ObjectFlags::UNAGGRESSIVE,
    ObjectFlags::RANDOM_MOVE,
    ObjectFlags::ONLY_ATTACK,
    ObjectFlags::SEE_IN_DARK,
];

fn below(rng: &mut ChaCha8Rng, bound: u64) -> i32 {
    (rng.next_u64() % bound) as i32
}

fn random_world(rng: &mut ChaCha8Rng) -> World {
    let mut world = World::new();
    let (width, height) = (8 + below(rng, 24), 8 + below(rng, 24));
    let mut map = Map::walled("fuzz", width, height);
    map.darkness = below(rng, 3);
    for _ in 0..below(rng, 40) {
        map.set_wall(Pos { y: below(rng, height as u64), x: below(rng, width as u64) });
    }
    let map_id = world.add_map(map);

    let mut placed = Vec::new();
    for i in 0..2 + below(rng, 20) {
        let mut ob = if i < 2 { Object::player(format!("player{i}")) } else { Object::monster(format!("monster{i}")) };
        for flag in FLAG_POOL {
            if below(rng, 8) == 0 {
                ob.flags |= flag;
            }
        }
        ob.attack_movement = below(rng, 256) as u8;
        ob.speed = below(rng, 30) as f32 / 10.0;
        ob.stats.wisdom = below(rng, 20);
        ob.stats.constitution = below(rng, 10);
        let id = world.spawn(ob);
        let pos = Pos { y: below(rng, height as u64), x: below(rng, width as u64) };
        if world.blocked_for(id, map_id, pos) || world.place(id, map_id, pos).is_err() {
            world.free(id);
            continue;
        }
        placed.push(id);
    }
    for &id in &placed {
        if below(rng, 3) == 0 {
            let item = world.spawn(Object::new("rock", ObjectKind::Misc).with_flags(ObjectFlags::IS_THROWN));
            let _ = world.insert_in_inventory(id, item);
        }
        if world.objects[id].is_pet() {
            world.objects[id].owner = placed.first().copied();
        }
    }
    world
}

fn check_invariants(world: &World) -> Result<()> {
    for (id, ob) in &world.objects {
        if ob.stats.hp > ob.stats.max_hp {
            bail!("{} has {} of {} hp", ob.name, ob.stats.hp, ob.stats.max_hp);
        }
        if ob.enemy == Some(id) {
            bail!("{} is its own enemy", ob.name);
        }
        let Some(map) = ob.map else { continue };
        if !world.objects_at(map, ob.pos).contains(&id) {
            bail!("{} is missing from the tile index at {:?}", ob.name, ob.pos);
        }
        if ob.is_alive() && world.maps[map].move_block(ob.pos).blocks(ob.move_type) && ob.move_type != MoveType::empty() {
            bail!("{} stands inside a wall at {:?}", ob.name, ob.pos);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = AiConfig::default();

    for seed in args.seed..args.seed + args.worlds {
        println!("Starting fuzz harness on seed {} for {} ticks...", seed, args.ticks);
        let mut gen_rng = ChaCha8Rng::seed_from_u64(seed);
        let mut world = random_world(&mut gen_rng);
        let mut rng = SeededRandom::new(seed);
        let mut scheduler = Scheduler::new();
        let mut destroyed = 0;
        for _ in 0..args.ticks {
            destroyed += scheduler.run_tick(&mut world, &mut rng, &mut NullServices, &config).destroyed;
            check_invariants(&world)?;
        }
        println!("Seed {seed}: {destroyed} destroyed, hash {}", snapshot_hash(&world));
    }

    println!("Fuzzing completed successfully.");
    Ok(())
}
