use monster_ai::{
    AiConfig, Engine, Map, NullServices, Object, ObjectFlags, Pos, Scheduler, SeededRandom, World,
};
use proptest::{
    arbitrary::any,
    test_runner::{Config as ProptestConfig, TestCaseError, TestRunner},
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

const FLAGS: [ObjectFlags; 10] = [
    ObjectFlags::SLEEP,
    ObjectFlags::CONFUSED,
    ObjectFlags::SCARED,
    ObjectFlags::RUN_AWAY,
    ObjectFlags::BERSERK,
    ObjectFlags::FRIENDLY,
    ObjectFlags::UNAGGRESSIVE,
    ObjectFlags::RANDOM_MOVE,
    ObjectFlags::ONLY_ATTACK,
    ObjectFlags::STAND_STILL,
];

fn below(rng: &mut ChaCha8Rng, bound: u32) -> i32 {
    (rng.next_u32() % bound) as i32
}

fn random_world(seed: u64) -> World {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut world = World::new();
    let map = world.add_map(Map::walled("arena", 16, 12));
    for _ in 0..below(&mut rng, 20) {
        world.maps[map].set_wall(Pos { y: below(&mut rng, 12), x: below(&mut rng, 16) });
    }
    for i in 0..3 + below(&mut rng, 10) {
        let mut ob = if i == 0 { Object::player("hero") } else { Object::monster(format!("m{i}")) };
        for flag in FLAGS {
            if below(&mut rng, 6) == 0 {
                ob.flags |= flag;
            }
        }
        ob.attack_movement = below(&mut rng, 256) as u8;
        ob.speed = 0.5 + below(&mut rng, 3) as f32 * 0.5;
        ob.run_away = below(&mut rng, 60);
        let id = world.spawn(ob);
        let pos = Pos { y: below(&mut rng, 12), x: below(&mut rng, 16) };
        if world.blocked_for(id, map, pos) || world.place(id, map, pos).is_err() {
            world.free(id);
        }
    }
    world
}

fn run_fuzz_simulation(seed: u64, ticks: u32) -> Result<(), String> {
    let mut world = random_world(seed);
    let config = AiConfig::default();
    let mut rng = SeededRandom::new(seed ^ 0x5eed);
    let mut scheduler = Scheduler::new();
    for tick in 0..ticks {
        scheduler.run_tick(&mut world, &mut rng, &mut NullServices, &config);
        for (id, ob) in &world.objects {
            if ob.stats.hp > ob.stats.max_hp {
                return Err(format!("Invariant failed: hp above max on seed {seed}, tick {tick}"));
            }
            if ob.enemy == Some(id) {
                return Err(format!("Invariant failed: {} targets itself on seed {seed}", ob.name));
            }
            if let Some(map) = ob.map {
                if !world.objects_at(map, ob.pos).contains(&id) {
                    return Err(format!("Invariant failed: {} missing from its tile on seed {seed}", ob.name));
                }
                if ob.is_alive() && world.maps[map].move_block(ob.pos).blocks(ob.move_type) {
                    return Err(format!("Invariant failed: {} inside a wall on seed {seed}", ob.name));
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_fuzz_monster_simulation() {
    let mut runner = TestRunner::new(ProptestConfig::with_cases(24));
    runner
        .run(&any::<u64>(), |seed| {
            run_fuzz_simulation(seed, 150).map_err(TestCaseError::fail)?;
            Ok(())
        })
        .expect("monster fuzz simulation should preserve invariants");
}

#[test]
fn test_melee_reach_is_symmetric() {
    let mut runner = TestRunner::new(ProptestConfig::with_cases(64));
    let offsets = (-1i32..=1, -1i32..=1, 1i32..9, 1i32..9);
    runner
        .run(&offsets, |(dx, dy, x, y)| {
            if dx == 0 && dy == 0 {
                return Ok(());
            }
            let mut world = World::new();
            let map = world.add_map(Map::new("open", 12, 12));
            let a = world.spawn(Object::monster("a"));
            let b = world.spawn(Object::monster("b"));
            world.place(a, map, Pos { y, x }).map_err(|e| TestCaseError::fail(e.to_string()))?;
            world.place(b, map, Pos { y: y + dy, x: x + dx }).map_err(|e| TestCaseError::fail(e.to_string()))?;

            let config = AiConfig::default();
            let mut rng = SeededRandom::new(0);
            let mut services = NullServices;
            let mut engine = Engine::new(&mut world, &mut rng, &mut services, &config);
            for (from, to) in [(a, b), (b, a)] {
                let found = engine.can_detect_enemy(from, to).ok_or_else(|| TestCaseError::fail("adjacent and lit"))?;
                if !engine.monster_can_hit(from, to, &found) {
                    return Err(TestCaseError::fail(format!("{dx},{dy} not in reach")));
                }
            }
            Ok(())
        })
        .expect("melee reach should not depend on which side asks");
}
