//! JSON scenario files: maps, creatures and items to load into a [`World`].
//!
//! A scenario names every map and object so links between them (tiling,
//! owners, enemies) can be written by name:
//!
//! ```json
//! {
//!   "seed": 7,
//!   "maps": [{ "name": "cave", "width": 12, "height": 8, "walls": [{ "y": 3, "x": 5 }] }],
//!   "objects": [
//!     { "name": "hero", "kind": "player", "at": { "map": "cave", "x": 1, "y": 1 } },
//!     { "name": "orc", "kind": "creature", "at": { "map": "cave", "x": 9, "y": 6 },
//!       "inventory": [{ "name": "club", "kind": "weapon" }] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::state::{Edge, Map, Object, Stats, World, WorldError};
use crate::types::*;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error("name `{0}` is used twice")]
    DuplicateName(String),
    #[error("unknown map `{0}`")]
    UnknownMap(String),
    #[error("unknown object `{0}`")]
    UnknownObject(String),
    #[error("`{name}` has a speed that is not a finite number")]
    InvalidSpeed { name: String },
    #[error("cannot place `{name}`: {source}")]
    Placement {
        name: String,
        #[source]
        source: WorldError,
    },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub seed: u64,
    pub maps: Vec<MapSpec>,
    #[serde(default)]
    pub tiling: Vec<TileSpec>,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapSpec {
    pub name: String,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub darkness: i32,
    /// Surround the map with a wall ring.
    #[serde(default)]
    pub walled: bool,
    #[serde(default)]
    pub walls: Vec<Pos>,
    #[serde(default)]
    pub lights: Vec<LightSpec>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LightSpec {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

/// Joins `from`'s `edge` to `to`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileSpec {
    pub from: String,
    pub edge: Edge,
    pub to: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Placement {
    pub map: String,
    pub x: i32,
    pub y: i32,
}

/// Extra body part, placed at an offset from its head.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartSpec {
    pub name: String,
    pub dx: i32,
    pub dy: i32,
}

/// One object. Creatures and players start from living defaults; every
/// other kind starts inert. Flags are added to the defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSpec {
    pub name: String,
    pub kind: Option<ObjectKind>,
    pub at: Option<Placement>,
    pub flags: ObjectFlags,
    pub stats: Option<Stats>,
    pub level: Option<i32>,
    pub magic: i32,
    pub speed: Option<f32>,
    pub attack_movement: u8,
    pub run_away: i32,
    pub pick_up: PickUp,
    pub will_apply: WillApply,
    pub move_type: Option<MoveType>,
    pub spell_subtype: Option<SpellSubtype>,
    pub range: i32,
    pub race: Option<String>,
    pub glow_radius: i32,
    pub hide_skill: i32,
    pub weight: i32,
    pub nrof: Option<u32>,
    pub resist: Vec<i32>,
    pub owner: Option<String>,
    pub enemy: Option<String>,
    pub parts: Vec<PartSpec>,
    pub inventory: Vec<ObjectSpec>,
}

impl ObjectSpec {
    fn to_object(&self) -> Object {
        let kind = self.kind.unwrap_or(ObjectKind::Misc);
        let mut ob = match kind {
            ObjectKind::Creature => Object::monster(&self.name),
            ObjectKind::Player => Object::player(&self.name),
            _ => Object::new(&self.name, kind),
        };
        ob.flags |= self.flags;
        if let Some(stats) = self.stats {
            ob.stats = stats;
        }
        if let Some(level) = self.level {
            ob.level = level;
        }
        if let Some(speed) = self.speed {
            ob.speed = speed;
        }
        if let Some(move_type) = self.move_type {
            ob.move_type = move_type;
        }
        if let Some(nrof) = self.nrof {
            ob.nrof = nrof;
        }
        ob.magic = self.magic;
        ob.attack_movement = self.attack_movement;
        ob.run_away = self.run_away;
        ob.pick_up = self.pick_up;
        ob.will_apply = self.will_apply;
        ob.spell_subtype = self.spell_subtype;
        ob.range = self.range;
        ob.race.clone_from(&self.race);
        ob.glow_radius = self.glow_radius;
        ob.hide_skill = self.hide_skill;
        ob.weight = self.weight;
        for (slot, value) in ob.resist.iter_mut().zip(&self.resist) {
            *slot = *value;
        }
        ob
    }
}

/// A loaded scenario with its name tables.
#[derive(Debug)]
pub struct Built {
    pub world: World,
    pub seed: u64,
    pub maps: BTreeMap<String, MapId>,
    pub objects: BTreeMap<String, ObjectId>,
}

impl Built {
    pub fn object(&self, name: &str) -> Result<ObjectId, ScenarioError> {
        self.objects.get(name).copied().ok_or_else(|| ScenarioError::UnknownObject(name.to_string()))
    }
}

impl Scenario {
    pub fn from_json_str(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| ScenarioError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&text)
    }

    /// Creates the maps, then every object, then the links between them.
    pub fn build(&self) -> Result<Built, ScenarioError> {
        let mut built = Built { world: World::new(), seed: self.seed, maps: BTreeMap::new(), objects: BTreeMap::new() };

        for spec in &self.maps {
            let mut map = if spec.walled {
                Map::walled(&spec.name, spec.width, spec.height)
            } else {
                Map::new(&spec.name, spec.width, spec.height)
            };
            map.darkness = spec.darkness;
            for &wall in &spec.walls {
                map.set_wall(wall);
            }
            for light in &spec.lights {
                map.set_light(Pos { y: light.y, x: light.x }, light.radius);
            }
            let id = built.world.add_map(map);
            if built.maps.insert(spec.name.clone(), id).is_some() {
                return Err(ScenarioError::DuplicateName(spec.name.clone()));
            }
        }
        for tile in &self.tiling {
            let from = map_named(&built, &tile.from)?;
            let to = map_named(&built, &tile.to)?;
            built.world.tile_maps(from, tile.edge, to);
        }

        for spec in &self.objects {
            spawn(&mut built, spec, None)?;
        }
        for spec in &self.objects {
            link(&mut built, spec)?;
        }
        Ok(built)
    }
}

fn map_named(built: &Built, name: &str) -> Result<MapId, ScenarioError> {
    built.maps.get(name).copied().ok_or_else(|| ScenarioError::UnknownMap(name.to_string()))
}

fn register(built: &mut Built, name: &str, id: ObjectId) -> Result<(), ScenarioError> {
    if built.objects.insert(name.to_string(), id).is_some() {
        return Err(ScenarioError::DuplicateName(name.to_string()));
    }
    Ok(())
}

fn spawn(built: &mut Built, spec: &ObjectSpec, container: Option<ObjectId>) -> Result<ObjectId, ScenarioError> {
    let placement_error = |source| ScenarioError::Placement { name: spec.name.clone(), source };
    if spec.speed.is_some_and(|speed| !speed.is_finite()) {
        return Err(ScenarioError::InvalidSpeed { name: spec.name.clone() });
    }
    let id = built.world.spawn(spec.to_object());
    register(built, &spec.name, id)?;

    for part in &spec.parts {
        let mut ob = spec.to_object();
        ob.name.clone_from(&part.name);
        let part_id = built.world.spawn(ob);
        register(built, &part.name, part_id)?;
        built.world.attach_part(id, part_id, (part.dx, part.dy)).map_err(placement_error)?;
    }

    if let Some(container) = container {
        built.world.insert_in_inventory(container, id).map_err(placement_error)?;
    } else if let Some(at) = &spec.at {
        let map = map_named(built, &at.map)?;
        built.world.place(id, map, Pos { y: at.y, x: at.x }).map_err(placement_error)?;
    }

    for item in &spec.inventory {
        spawn(built, item, Some(id))?;
    }
    Ok(id)
}

fn link(built: &mut Built, spec: &ObjectSpec) -> Result<(), ScenarioError> {
    let id = built.object(&spec.name)?;
    let owner = spec.owner.as_deref().map(|name| built.object(name)).transpose()?;
    let enemy = spec.enemy.as_deref().map(|name| built.object(name)).transpose()?;
    if let Some(ob) = built.world.get_mut(id) {
        ob.owner = owner;
        ob.enemy = enemy;
    }
    for item in &spec.inventory {
        link(built, item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const TWO_ROOMS: &str = r#"{
        "seed": 42,
        "maps": [
            { "name": "west", "width": 6, "height": 6, "walls": [{ "y": 2, "x": 3 }], "darkness": 2,
              "lights": [{ "x": 1, "y": 1, "radius": 3 }] },
            { "name": "east", "width": 6, "height": 6 }
        ],
        "tiling": [{ "from": "west", "edge": "east", "to": "east" }],
        "objects": [
            { "name": "hero", "kind": "player", "at": { "map": "west", "x": 1, "y": 1 } },
            { "name": "orc", "kind": "creature", "at": { "map": "east", "x": 2, "y": 2 },
              "flags": "SLEEP | RANDOM_MOVE", "enemy": "hero", "attack_movement": 3,
              "parts": [{ "name": "orc shadow", "dx": 1, "dy": 0 }],
              "inventory": [{ "name": "club", "kind": "weapon", "stats": { "dam": 4 } }] },
            { "name": "dog", "kind": "creature", "at": { "map": "west", "x": 2, "y": 1 },
              "flags": "FRIENDLY", "attack_movement": 16, "owner": "hero" }
        ]
    }"#;

    #[test]
    fn builds_maps_objects_and_links() {
        let built = Scenario::from_json_str(TWO_ROOMS).expect("parse").build().expect("build");
        let world = &built.world;
        let (west, east) = (built.maps["west"], built.maps["east"]);
        assert_eq!(built.seed, 42);
        assert_eq!(world.normalize(west, Pos { y: 0, x: 6 }), Some((east, Pos { y: 0, x: 0 })));
        assert_eq!(world.maps[west].darkness, 2);
        assert_eq!(world.maps[west].light(Pos { y: 1, x: 1 }), 3);

        let orc = built.object("orc").expect("orc");
        let hero = built.object("hero").expect("hero");
        let ob = &world.objects[orc];
        assert!(ob.has(ObjectFlags::ALIVE | ObjectFlags::MONSTER | ObjectFlags::SLEEP | ObjectFlags::RANDOM_MOVE));
        assert_eq!(ob.enemy, Some(hero));
        assert_eq!(world.parts(orc).len(), 2);
        assert_eq!(world.objects[built.object("orc shadow").expect("part")].pos, Pos { y: 2, x: 3 });

        let club = built.object("club").expect("club");
        assert_eq!(world.objects[club].env, Some(orc));
        assert_eq!(world.objects[club].stats.dam, 4);
        assert!(world.objects[built.object("dog").expect("dog")].is_pet());
    }

    #[test]
    fn unknown_names_are_reported() {
        let text = r#"{ "maps": [{ "name": "a", "width": 3, "height": 3 }],
            "objects": [{ "name": "rat", "kind": "creature", "at": { "map": "b", "x": 0, "y": 0 } }] }"#;
        let err = Scenario::from_json_str(text).expect("parse").build().expect_err("map b is missing");
        assert!(matches!(err, ScenarioError::UnknownMap(name) if name == "b"));

        let text = r#"{ "maps": [{ "name": "a", "width": 3, "height": 3 }],
            "objects": [{ "name": "rat", "kind": "creature", "enemy": "ghost" }] }"#;
        let err = Scenario::from_json_str(text).expect("parse").build().expect_err("ghost is missing");
        assert!(matches!(err, ScenarioError::UnknownObject(name) if name == "ghost"));
    }

    #[test]
    fn duplicate_names_and_bad_positions_are_rejected() {
        let text = r#"{ "maps": [{ "name": "a", "width": 3, "height": 3 }],
            "objects": [{ "name": "rat" }, { "name": "rat" }] }"#;
        assert!(matches!(
            Scenario::from_json_str(text).expect("parse").build(),
            Err(ScenarioError::DuplicateName(_))
        ));

        let text = r#"{ "maps": [{ "name": "a", "width": 3, "height": 3 }],
            "objects": [{ "name": "rat", "kind": "creature", "at": { "map": "a", "x": 5, "y": 0 } }] }"#;
        assert!(matches!(
            Scenario::from_json_str(text).expect("parse").build(),
            Err(ScenarioError::Placement { .. })
        ));

        let text = r#"{ "maps": [], "objects": [{ "name": "comet", "kind": "creature", "speed": 1e39 }] }"#;
        assert!(matches!(
            Scenario::from_json_str(text).expect("parse").build(),
            Err(ScenarioError::InvalidSpeed { .. })
        ));
    }

    #[test]
    fn load_reads_a_file_and_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(TWO_ROOMS.as_bytes()).expect("write scenario");
        let scenario = Scenario::load(file.path()).expect("load");
        assert_eq!(scenario.objects.len(), 3);

        assert!(matches!(Scenario::from_json_str("{ not json"), Err(ScenarioError::Json(_))));
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(matches!(Scenario::load(dir.path().join("missing.json")), Err(ScenarioError::Io { .. })));
    }
}
