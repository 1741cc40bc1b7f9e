/// Level loader.
///
/// ## Sources (priority order):
///   1. The catalog entry's map file (`levels_dir/<n>.json`)
///   2. The designated default level's map file
///   3. The embedded fallback map below
///
/// A missing or corrupt map file is logged and skipped; loading never
/// fails.
///
/// ## Row legend (embedded maps and tests):
///   '#' = grass        'A' = autumn      'I' = ice        'R' = tropic
///   'm' = moving tile  'f' = food        'F' = finish     'c' = checkpoint
///   'P' = player       '1' '2' '3' = squirrel1 / squirrel2 / cat
///   'o' = fire hole    's' = fire swing  'T' = tree       ' ' = empty

use tracing::{debug, info, warn};

use crate::config::{GameConfig, Season};
use crate::domain::effects::Effects;
use crate::domain::enemy::{Enemy, EnemyKind};
use crate::domain::geom::{Rect, Vec2};
use crate::domain::player::{Player, Skin};
use crate::domain::tile::{GridPos, PlacedTile, Tile, TileKind};
use crate::domain::tilemap::{Tilemap, DEFAULT_TILE_SIZE};
use crate::sim::event::GameEvent;
use crate::sim::world::{Level, Phase, WorldState};

/// Catalog index loaded when the requested level cannot be read.
pub const DEFAULT_LEVEL: usize = 1;

/// Player position used when a map has no player spawner.
const DEFAULT_PLAYER_POS: Vec2 = Vec2::new(70.0, 20.0);

/// Iris transition value right after a load (opens up to 0).
const TRANSITION_START: f32 = -30.0;

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Fresh game: score 0, full lives, first level.
pub fn start_game(world: &mut WorldState, config: &GameConfig) -> Vec<GameEvent> {
    world.score = 0;
    world.lives = config.rules.first_lives;
    let first = config.first_level.min(config.levels.len().saturating_sub(1));
    load_level(world, first, config, false);
    world.phase = Phase::Playing;
    vec![GameEvent::LevelLoaded { index: first }]
}

/// Load catalog level `index` into the world. Score and lives are kept.
///
/// `retry` reloads after a death: the player keeps the checkpoints
/// passed on this level and respawns at the furthest one, and the clock
/// gets `extra_frames_after_death` on top of what was left (capped at
/// the level's limit).
pub fn load_level(world: &mut WorldState, index: usize, config: &GameConfig, retry: bool) {
    let (mut map, season) = read_map(index, config);

    let limit = config.levels.get(index)
        .and_then(|e| e.time_limit_frames)
        .unwrap_or(config.rules.time_limit_frames);
    let time_limit = if retry {
        (world.level.time_remaining + config.rules.extra_frames_after_death).min(limit)
    } else {
        limit
    };

    let fire_holes = cell_rects(&map.extract(&[(TileKind::FireHole, 0)], true), map.tile_size);
    let fireswing_hubs = cell_rects(&map.extract(&[(TileKind::FireSwing, 0)], true), map.tile_size);

    let spawners = map.extract(
        &[
            (TileKind::Spawners, 0),
            (TileKind::Spawners, 1),
            (TileKind::Spawners, 2),
            (TileKind::Spawners, 3),
        ],
        false,
    );
    let checkpoints: Vec<Vec2> = map.extract(&[(TileKind::Checkpoint, 0)], false)
        .into_iter()
        .map(|t| t.pos)
        .collect();

    let mut spawn = DEFAULT_PLAYER_POS;
    let mut enemies = Vec::new();
    for s in &spawners {
        match EnemyKind::from_spawner_variant(s.variant) {
            Some(kind) => enemies.push(Enemy::new(kind, s.pos)),
            None => spawn = s.pos,
        }
    }

    let passed = if retry && world.level.index == index {
        std::mem::take(&mut world.level.player.passed_checkpoints)
    } else {
        Vec::new()
    };

    let mut player = Player::new(spawn);
    player.passed_checkpoints = passed;
    let start = player.spawning_position();
    player.respawn(start);
    player.set_skin(if season == Season::Winter { Skin::Winter } else { Skin::Default });

    let rng = world.level.rng.clone();
    world.level = Level {
        index,
        season,
        map,
        player,
        enemies,
        effects: Effects::default(),
        fire_holes,
        fireswing_hubs,
        checkpoints,
        rng,
        time_limit,
        time_remaining: time_limit,
        dead: 0,
        transition: TRANSITION_START,
    };
    world.camera.center_on(world.level.player.body.center());

    info!(
        "level {index} loaded: {} tiles, {} enemies, {} checkpoints, {} frames",
        world.level.map.len(),
        world.level.enemies.len(),
        world.level.checkpoints.len(),
        time_limit,
    );
}

/// Build a tilemap from string rows (see the legend at the top).
/// Ground tiles are autotiled afterwards.
pub fn map_from_rows(rows: &[&str]) -> Tilemap {
    let mut map = Tilemap::new(DEFAULT_TILE_SIZE);
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let (kind, variant) = match ch {
                '#' => (TileKind::Grass, 0),
                'A' => (TileKind::Autumn, 0),
                'I' => (TileKind::Ice, 0),
                'R' => (TileKind::Tropic, 0),
                'm' => (TileKind::MovingTile, 0),
                'f' => (TileKind::Food, 0),
                'F' => (TileKind::FinishLine, 0),
                'c' => (TileKind::Checkpoint, 0),
                'P' => (TileKind::Spawners, 0),
                '1' => (TileKind::Spawners, 1),
                '2' => (TileKind::Spawners, 2),
                '3' => (TileKind::Spawners, 3),
                'o' => (TileKind::FireHole, 0),
                's' => (TileKind::FireSwing, 0),
                'T' => (TileKind::Tree, 0),
                _ => continue,
            };
            map.insert(Tile::new(kind, variant, GridPos(x as i32, y as i32)));
        }
    }
    map.autotile();
    map
}

/// The map used when neither the requested nor the default level loads.
pub fn fallback_map() -> Tilemap {
    map_from_rows(&[
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "  P                  f f f                        ",
        "                                 c        T       ",
        "           f  f            2              F       ",
        "#######   ######     #######   ###########  ####  ",
        "#######   ######               ###########  ####  ",
        "#######   ######               ###########  ####  ",
    ])
}

// ══════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════

/// Requested map, then the default level, then the embedded map.
fn read_map(index: usize, config: &GameConfig) -> (Tilemap, Season) {
    let attempts = [index, DEFAULT_LEVEL];
    for (n, &i) in attempts.iter().enumerate() {
        if n > 0 && i == index {
            continue;
        }
        let Some(entry) = config.levels.get(i) else {
            warn!("level {i} is not in the catalog");
            continue;
        };
        let path = config.map_path(entry);
        match Tilemap::load(&path) {
            Ok(map) => {
                if i != index {
                    warn!("level {index} unavailable, loaded default level {i}");
                }
                debug!("read {}", path.display());
                return (map, entry.season);
            }
            Err(e) => warn!("could not load {}: {e}", path.display()),
        }
    }
    warn!("using the embedded fallback map for level {index}");
    let season = config.levels.get(index).map(|e| e.season).unwrap_or(Season::Summer);
    (fallback_map(), season)
}

fn cell_rects(tiles: &[PlacedTile], tile_size: u32) -> Vec<Rect> {
    let ts = tile_size as f32;
    tiles.iter().map(|t| Rect::at(t.pos, Vec2::new(ts, ts))).collect()
}
