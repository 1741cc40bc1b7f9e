/// Sparse tile grid: storage, spatial queries, collision rects,
/// autotiling, moving platforms and the JSON level format.
///
/// ## Layers
///
///   - `tiles`  : on-grid tiles keyed by `GridPos`. One tile per cell.
///   - `offgrid`: decor at free pixel positions. Never collides.
///
/// ## Moving platforms
///
/// All `movingtile` tiles of one variant share a phase vector (`transport`)
/// and move in lockstep. `advance_moving_platforms()` integrates the phases
/// and recomputes each platform's pose into a side cache (`poses`). The cache
/// is render/collision state, not map content, and is never persisted.
///
/// Because a moving tile's cell index says nothing about where it currently
/// is, neighbourhood queries find moving tiles by pixel proximity instead.

use std::collections::{BTreeMap, HashMap};
use std::f32::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::geom::{Rect, Vec2};
use super::tile::{GridPos, PlacedTile, Tile, TileCategory, TileKind};

pub const DEFAULT_TILE_SIZE: u32 = 16;

/// 3×3 block around the entity's cell.
const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),  (0, 0),  (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// Entities taller than a tile probe one extra row below.
const NEIGHBOR_OFFSETS_TALL: [(i32, i32); 12] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),  (0, 0),  (0, 1),
    (1, -1),  (1, 0),  (1, 1),
    (-1, 2),  (0, 2),  (1, 2),
];

// Neighbour bits for autotiling.
const RIGHT: u8 = 1;
const LEFT: u8 = 2;
const UP: u8 = 4;
const DOWN: u8 = 8;

/// Connectivity pattern → visual variant.
const AUTOTILE_MAP: [(u8, u32); 9] = [
    (RIGHT | DOWN, 0),
    (RIGHT | DOWN | LEFT, 1),
    (LEFT | DOWN, 2),
    (LEFT | UP | DOWN, 3),
    (LEFT | UP, 4),
    (LEFT | UP | RIGHT, 5),
    (RIGHT | UP, 6),
    (RIGHT | UP | DOWN, 7),
    (RIGHT | LEFT | UP | DOWN, 8),
];

/// Per-variant motion of a moving platform.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PlatformSpec {
    /// Peak displacement in pixels.
    pub range: Vec2,
    /// Phase increment per frame, in half-turns.
    pub speed: Vec2,
}

pub const PLATFORM_VARIANTS: u32 = 8;

pub fn platform_spec(variant: u32) -> Option<PlatformSpec> {
    if variant >= PLATFORM_VARIANTS {
        return None;
    }
    let range = if variant < 4 { 3.0 * 16.0 } else { 4.0 * 16.0 };
    let speed = match variant % 4 {
        0 => 0.005,
        1 => -0.005,
        2 => 0.008,
        _ => -0.008,
    };
    Some(PlatformSpec {
        range: Vec2::new(range, 0.0),
        speed: Vec2::new(speed, 0.0),
    })
}

#[derive(Debug, Error)]
pub enum TilemapError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed level json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad grid key {0:?} (expected \"x;y\")")]
    BadKey(String),
}

/// A collidable rectangle near an entity.
/// Moving platforms also report where they were last frame.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CollisionRect {
    pub rect: Rect,
    pub prev: Option<Rect>,
    /// Horizontal platform displacement since last frame (0 for static tiles).
    pub dx: f32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
struct PlatformPose {
    rect: Rect,
    prev: Rect,
}

#[derive(Clone, Debug)]
pub struct Tilemap {
    pub tile_size: u32,
    tiles: HashMap<GridPos, Tile>,
    offgrid: Vec<PlacedTile>,
    transport: HashMap<u32, Vec2>,
    poses: HashMap<GridPos, PlatformPose>,
}

impl Default for Tilemap {
    fn default() -> Self {
        Tilemap::new(DEFAULT_TILE_SIZE)
    }
}

// ══════════════════════════════════════════════════════════════
// Storage
// ══════════════════════════════════════════════════════════════

impl Tilemap {
    pub fn new(tile_size: u32) -> Self {
        Tilemap {
            tile_size,
            tiles: HashMap::new(),
            offgrid: Vec::new(),
            transport: HashMap::new(),
            poses: HashMap::new(),
        }
    }

    /// Place a tile at its own grid position, replacing any previous occupant.
    pub fn insert(&mut self, tile: Tile) -> Option<Tile> {
        self.poses.remove(&tile.pos);
        self.tiles.insert(tile.pos, tile)
    }

    pub fn remove(&mut self, pos: GridPos) -> Option<Tile> {
        self.poses.remove(&pos);
        self.tiles.remove(&pos)
    }

    pub fn get(&self, pos: GridPos) -> Option<&Tile> {
        self.tiles.get(&pos)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.offgrid.is_empty()
    }

    pub fn offgrid(&self) -> &[PlacedTile] {
        &self.offgrid
    }

    pub fn push_offgrid(&mut self, tile: PlacedTile) {
        self.offgrid.push(tile);
    }

    fn tile_rect_at(&self, pos: GridPos) -> Rect {
        let ts = self.tile_size as f32;
        Rect::at(pos.to_pixels(self.tile_size), Vec2::new(ts, ts))
    }

    /// Where a tile is drawn and collides this frame.
    /// Moving platforms report their cached pose, everything else its cell.
    pub fn render_rect(&self, tile: &Tile) -> Rect {
        match self.poses.get(&tile.pos) {
            Some(pose) if tile.kind.is_moving() => pose.rect,
            _ => self.tile_rect_at(tile.pos),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Spatial queries
// ══════════════════════════════════════════════════════════════

impl Tilemap {
    /// Solid tile whose cell contains `p`, if any.
    pub fn solid_at(&self, p: Vec2) -> Option<&Tile> {
        self.tiles
            .get(&GridPos::containing(p, self.tile_size))
            .filter(|t| t.kind.is_solid())
    }

    /// Tiles in the neighbourhood of an entity whose top-left is `pos`.
    ///
    /// Static tiles come from the fixed cell offsets around the entity's cell.
    /// Moving tiles are matched by testing each offset point
    /// `pos + offset * tile_size` against the platform's current rect.
    fn tiles_around(&self, pos: Vec2, tall: bool) -> Vec<&Tile> {
        let offsets: &[(i32, i32)] = if tall { &NEIGHBOR_OFFSETS_TALL } else { &NEIGHBOR_OFFSETS };
        let cell = GridPos::containing(pos, self.tile_size);
        let ts = self.tile_size as f32;

        let mut found: Vec<&Tile> = offsets
            .iter()
            .filter_map(|&(dx, dy)| self.tiles.get(&cell.offset(dx, dy)))
            .filter(|t| !t.kind.is_moving())
            .collect();

        let mut moving: Vec<&Tile> = self.tiles.values().filter(|t| t.kind.is_moving()).collect();
        moving.sort_by_key(|t| t.pos);
        for tile in moving {
            let rect = self.render_rect(tile);
            for &(dx, dy) in offsets {
                let probe = pos + Vec2::new(dx as f32 * ts, dy as f32 * ts);
                if rect.contains_strict(probe) {
                    found.push(tile);
                }
            }
        }
        found
    }

    fn is_tall(&self, body: &Rect) -> bool {
        body.h > self.tile_size as f32
    }

    /// Collidable rects near `body` for tiles in any of `cats`.
    pub fn collision_rects(&self, body: &Rect, cats: &[TileCategory]) -> Vec<CollisionRect> {
        self.tiles_around(body.pos(), self.is_tall(body))
            .into_iter()
            .filter(|t| t.kind.in_any(cats))
            .map(|t| {
                if t.kind.is_moving() {
                    let origin = self.tile_rect_at(t.pos);
                    let pose = self.poses.get(&t.pos).copied()
                        .unwrap_or(PlatformPose { rect: origin, prev: origin });
                    CollisionRect {
                        rect: pose.rect,
                        prev: Some(pose.prev),
                        dx: pose.rect.x - pose.prev.x,
                    }
                } else {
                    CollisionRect { rect: self.tile_rect_at(t.pos), prev: None, dx: 0.0 }
                }
            })
            .collect()
    }

    /// Snapshots of tiles near `body` in any of `cats`.
    pub fn tiles_near(&self, body: &Rect, cats: &[TileCategory]) -> Vec<Tile> {
        self.tiles_around(body.pos(), self.is_tall(body))
            .into_iter()
            .filter(|t| t.kind.in_any(cats))
            .cloned()
            .collect()
    }

    /// Pull out every tile matching a `(kind, variant)` pair, scaled to pixels.
    ///
    /// Off-grid matches come first, then on-grid ones ordered by cell.
    /// `keep = false` removes the matches from the map.
    pub fn extract(&mut self, pairs: &[(TileKind, u32)], keep: bool) -> Vec<PlacedTile> {
        let wanted = |kind: &TileKind, variant: u32| {
            pairs.iter().any(|(k, v)| k == kind && *v == variant)
        };

        let mut matches: Vec<PlacedTile> = Vec::new();

        let mut kept_offgrid = Vec::with_capacity(self.offgrid.len());
        for tile in self.offgrid.drain(..) {
            if wanted(&tile.kind, tile.variant) {
                matches.push(tile.clone());
                if keep {
                    kept_offgrid.push(tile);
                }
            } else {
                kept_offgrid.push(tile);
            }
        }
        self.offgrid = kept_offgrid;

        let mut cells: Vec<GridPos> = self.tiles.values()
            .filter(|t| wanted(&t.kind, t.variant))
            .map(|t| t.pos)
            .collect();
        cells.sort();

        for cell in cells {
            let snapshot = if keep {
                self.tiles.get(&cell).cloned()
            } else {
                self.remove(cell)
            };
            if let Some(t) = snapshot {
                matches.push(PlacedTile {
                    kind: t.kind,
                    variant: t.variant,
                    pos: t.pos.to_pixels(self.tile_size),
                });
            }
        }

        matches
    }
}

// ══════════════════════════════════════════════════════════════
// Autotile + moving platforms
// ══════════════════════════════════════════════════════════════

impl Tilemap {
    /// Pick each auto-tileable tile's variant from its same-kind
    /// 4-connected neighbours. Unmatched patterns keep their variant.
    pub fn autotile(&mut self) {
        let mut updates: Vec<(GridPos, u32)> = Vec::new();

        for tile in self.tiles.values() {
            if !tile.kind.is_autotiled() {
                continue;
            }
            let mut mask = 0u8;
            for (dx, dy, bit) in [(1, 0, RIGHT), (-1, 0, LEFT), (0, -1, UP), (0, 1, DOWN)] {
                if let Some(n) = self.tiles.get(&tile.pos.offset(dx, dy)) {
                    if n.kind == tile.kind {
                        mask |= bit;
                    }
                }
            }
            if let Some(&(_, variant)) = AUTOTILE_MAP.iter().find(|(m, _)| *m == mask) {
                updates.push((tile.pos, variant));
            }
        }

        for (pos, variant) in updates {
            if let Some(t) = self.tiles.get_mut(&pos) {
                t.variant = variant;
            }
        }
    }

    /// Current phase of a platform variant.
    pub fn transport(&self, variant: u32) -> Vec2 {
        self.transport.get(&variant).copied().unwrap_or(Vec2::ZERO)
    }

    /// Integrate every variant's phase and recompute platform poses.
    /// Call once per frame, before any collision query.
    pub fn advance_moving_platforms(&mut self) {
        for variant in 0..PLATFORM_VARIANTS {
            let Some(spec) = platform_spec(variant) else { continue };
            let phase = self.transport.entry(variant).or_insert(Vec2::ZERO);
            *phase += spec.speed;
            if phase.x.abs() > 2.0 {
                phase.x = -phase.x;
            }
            if phase.y.abs() > 2.0 {
                phase.y = -phase.y;
            }
        }

        let moving: Vec<(GridPos, u32)> = self.tiles.values()
            .filter(|t| t.kind.is_moving())
            .map(|t| (t.pos, t.variant))
            .collect();

        for (pos, variant) in moving {
            let Some(spec) = platform_spec(variant) else { continue };
            let phase = self.transport(variant);
            let origin = self.tile_rect_at(pos);
            let rect = origin.translate(Vec2::new(
                (phase.x * PI).sin() * spec.range.x,
                (phase.y * PI).cos() * spec.range.y,
            ));
            let prev = self.poses.get(&pos).map(|p| p.rect).unwrap_or(origin);
            self.poses.insert(pos, PlatformPose { rect, prev });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Persistence
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize)]
struct TileRecord {
    #[serde(rename = "type")]
    kind: TileKind,
    variant: u32,
    pos: [i32; 2],
}

#[derive(Serialize, Deserialize)]
struct OffgridRecord {
    #[serde(rename = "type")]
    kind: TileKind,
    variant: u32,
    pos: [f32; 2],
}

#[derive(Serialize, Deserialize)]
struct MapFile {
    tilemap: BTreeMap<String, TileRecord>,
    tile_size: u32,
    #[serde(default)]
    offgrid: Vec<OffgridRecord>,
}

impl Tilemap {
    /// Serialize to the level JSON format. Platform poses and phases are dropped.
    pub fn to_json(&self) -> Result<String, TilemapError> {
        let mut tilemap = BTreeMap::new();
        for t in self.tiles.values() {
            tilemap.insert(t.pos.to_string(), TileRecord {
                kind: t.kind.clone(),
                variant: t.variant,
                pos: [t.pos.0, t.pos.1],
            });
        }
        let file = MapFile {
            tilemap,
            tile_size: self.tile_size,
            offgrid: self.offgrid.iter()
                .map(|o| OffgridRecord { kind: o.kind.clone(), variant: o.variant, pos: [o.pos.x, o.pos.y] })
                .collect(),
        };
        Ok(serde_json::to_string(&file)?)
    }

    /// Parse the level JSON format. Unknown fields (`renderpos`, `transport`, ...)
    /// are ignored. The grid key is authoritative for a tile's cell.
    pub fn from_json(text: &str) -> Result<Self, TilemapError> {
        let file: MapFile = serde_json::from_str(text)?;
        if file.tile_size == 0 {
            return Err(TilemapError::Json(serde::de::Error::custom("tile_size must be positive")));
        }

        let mut map = Tilemap::new(file.tile_size);
        for (key, rec) in file.tilemap {
            let pos: GridPos = key.parse().map_err(TilemapError::BadKey)?;
            if rec.pos != [pos.0, pos.1] {
                debug!("tile at {key} records pos {:?}; using key", rec.pos);
            }
            map.tiles.insert(pos, Tile::new(rec.kind, rec.variant, pos));
        }
        map.offgrid = file.offgrid.into_iter()
            .map(|o| PlacedTile { kind: o.kind, variant: o.variant, pos: Vec2::new(o.pos[0], o.pos[1]) })
            .collect();
        Ok(map)
    }

    pub fn save(&self, path: &Path) -> Result<(), TilemapError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, TilemapError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// `#` grass, `i` ice, `m` moving platform (variant 0), `f` food,
    /// `F` finish line, `c` checkpoint, `P` player spawner, `s` squirrel spawner.
    fn map_from(rows: &[&str]) -> Tilemap {
        let mut map = Tilemap::new(16);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let (kind, variant) = match ch {
                    '#' => (TileKind::Grass, 0),
                    'i' => (TileKind::Ice, 0),
                    'm' => (TileKind::MovingTile, 0),
                    'f' => (TileKind::Food, 0),
                    'F' => (TileKind::FinishLine, 0),
                    'c' => (TileKind::Checkpoint, 0),
                    'P' => (TileKind::Spawners, 0),
                    's' => (TileKind::Spawners, 1),
                    _ => continue,
                };
                map.insert(Tile::new(kind, variant, GridPos(x as i32, y as i32)));
            }
        }
        map
    }

    fn variants(map: &Tilemap) -> Vec<(GridPos, u32)> {
        let mut v: Vec<_> = map.tiles().map(|t| (t.pos, t.variant)).collect();
        v.sort();
        v
    }

    // ── solid_at ──

    #[test]
    fn solid_at_uses_containing_cell() {
        let map = map_from(&["  ", "#f"]);
        assert!(map.solid_at(Vec2::new(5.0, 20.0)).is_some());
        assert!(map.solid_at(Vec2::new(20.0, 20.0)).is_none()); // food is not solid
        assert!(map.solid_at(Vec2::new(5.0, 5.0)).is_none());
        assert!(map.solid_at(Vec2::new(-500.0, 9000.0)).is_none());
    }

    #[test]
    fn unknown_kind_is_not_solid() {
        let mut map = Tilemap::new(16);
        map.insert(Tile::new(TileKind::from_name("lava"), 0, GridPos(0, 0)));
        assert!(map.solid_at(Vec2::new(1.0, 1.0)).is_none());
        let body = Rect::new(0.0, 0.0, 12.0, 12.0);
        assert!(map.collision_rects(&body, &[TileCategory::Solid]).is_empty());
    }

    // ── collision_rects ──

    #[test]
    fn neighbourhood_is_three_by_three() {
        let map = map_from(&[
            "#####",
            "#####",
            "#####",
            "#####",
        ]);
        let body = Rect::new(32.0, 16.0, 12.0, 12.0);
        assert_eq!(map.collision_rects(&body, &[TileCategory::Solid]).len(), 9);
    }

    #[test]
    fn tall_entity_probes_extra_row() {
        let map = map_from(&[
            "#####",
            "#####",
            "#####",
            "#####",
        ]);
        let body = Rect::new(32.0, 16.0, 12.0, 22.0);
        assert_eq!(map.collision_rects(&body, &[TileCategory::Solid]).len(), 12);
    }

    #[test]
    fn rects_filtered_by_category() {
        let map = map_from(&[" fF", "###"]);
        let body = Rect::new(16.0, 0.0, 12.0, 12.0);
        let finish = map.collision_rects(&body, &[TileCategory::Finish]);
        assert_eq!(finish.len(), 1);
        assert_eq!(finish[0].rect, Rect::new(32.0, 0.0, 16.0, 16.0));
        assert_eq!(finish[0].prev, None);
        assert_eq!(map.collision_rects(&body, &[TileCategory::Solid]).len(), 3);
    }

    #[test]
    fn far_away_entity_gets_nothing() {
        let map = map_from(&["###"]);
        let body = Rect::new(10_000.0, -10_000.0, 12.0, 22.0);
        assert!(map.collision_rects(&body, &[TileCategory::Solid]).is_empty());
    }

    #[test]
    fn collision_query_does_not_mutate() {
        let map = map_from(&["   ", "###"]);
        let before = map.to_json().unwrap();
        let _ = map.collision_rects(&Rect::new(16.0, 0.0, 12.0, 12.0), &[TileCategory::Solid]);
        assert_eq!(map.to_json().unwrap(), before);
    }

    // ── moving platforms ──

    #[test]
    fn platform_table() {
        assert_eq!(platform_spec(0).unwrap().range.x, 48.0);
        assert_eq!(platform_spec(5).unwrap().range.x, 64.0);
        assert_eq!(platform_spec(3).unwrap().speed.x, -0.008);
        assert_eq!(platform_spec(6).unwrap().speed.x, 0.008);
        assert!(platform_spec(8).is_none());
    }

    #[test]
    fn phase_stays_bounded() {
        let mut map = map_from(&["m"]);
        for _ in 0..5000 {
            map.advance_moving_platforms();
            let p = map.transport(2);
            assert!(p.x.abs() <= 2.01);
        }
    }

    #[test]
    fn platform_moves_sinusoidally_and_reports_dx() {
        let mut map = map_from(&["   ", " m "]);
        map.advance_moving_platforms();
        map.advance_moving_platforms();
        let tile = map.get(GridPos(1, 1)).unwrap().clone();
        let rect = map.render_rect(&tile);
        let expected = 16.0 + (0.010f32 * PI).sin() * 48.0;
        assert!((rect.x - expected).abs() < 1e-3);
        assert_eq!(rect.y, 16.0);

        let body = Rect::new(rect.x + 2.0, 4.0, 12.0, 12.0);
        let hits = map.collision_rects(&body, &[TileCategory::Solid]);
        assert_eq!(hits.len(), 1);
        let prev = hits[0].prev.unwrap();
        assert!((hits[0].dx - (hits[0].rect.x - prev.x)).abs() < 1e-6);
        assert!(hits[0].dx > 0.0);
    }

    #[test]
    fn moving_tile_found_by_proximity_not_cell() {
        let mut map = map_from(&["m"]);
        for _ in 0..100 {
            map.advance_moving_platforms();
        }
        // phase 0.5 → platform has slid a full 48px right
        let tile = map.get(GridPos(0, 0)).unwrap().clone();
        let rect = map.render_rect(&tile);
        assert!(rect.x > 40.0);

        let at_origin = Rect::new(2.0, 2.0, 12.0, 12.0);
        assert!(map.collision_rects(&at_origin, &[TileCategory::Solid]).is_empty());
        let on_platform = Rect::new(rect.x + 2.0, 2.0, 12.0, 12.0);
        assert_eq!(map.collision_rects(&on_platform, &[TileCategory::Solid]).len(), 1);
    }

    // ── extract ──

    #[test]
    fn extract_remove_then_empty() {
        let mut map = map_from(&["P s", "###"]);
        let pairs = [(TileKind::Spawners, 0), (TileKind::Spawners, 1)];
        let first = map.extract(&pairs, false);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].pos, Vec2::new(0.0, 0.0));
        assert_eq!(first[1].pos, Vec2::new(32.0, 0.0));
        assert!(map.extract(&pairs, false).is_empty());
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn extract_keep_is_repeatable() {
        let mut map = map_from(&["F", "#"]);
        map.push_offgrid(PlacedTile { kind: TileKind::FinishLine, variant: 0, pos: Vec2::new(3.5, 7.0) });
        let pairs = [(TileKind::FinishLine, 0)];
        let a = map.extract(&pairs, true);
        let b = map.extract(&pairs, true);
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);
        assert_eq!(a[0].pos, Vec2::new(3.5, 7.0)); // off-grid first
    }

    #[test]
    fn extract_ignores_other_variants() {
        let mut map = map_from(&["s"]);
        assert!(map.extract(&[(TileKind::Spawners, 0)], false).is_empty());
        assert_eq!(map.len(), 1);
    }

    // ── autotile ──

    #[test]
    fn autotile_picks_patterns() {
        let mut map = map_from(&[
            "###",
            "###",
            "###",
        ]);
        map.autotile();
        assert_eq!(map.get(GridPos(0, 0)).unwrap().variant, 0);
        assert_eq!(map.get(GridPos(1, 0)).unwrap().variant, 1);
        assert_eq!(map.get(GridPos(2, 0)).unwrap().variant, 2);
        assert_eq!(map.get(GridPos(2, 1)).unwrap().variant, 3);
        assert_eq!(map.get(GridPos(2, 2)).unwrap().variant, 4);
        assert_eq!(map.get(GridPos(1, 2)).unwrap().variant, 5);
        assert_eq!(map.get(GridPos(0, 2)).unwrap().variant, 6);
        assert_eq!(map.get(GridPos(0, 1)).unwrap().variant, 7);
        assert_eq!(map.get(GridPos(1, 1)).unwrap().variant, 8);
    }

    #[test]
    fn autotile_only_same_kind_and_unmatched_unchanged() {
        let mut map = map_from(&["#i", "  "]);
        map.insert(Tile::new(TileKind::Grass, 5, GridPos(0, 0)));
        map.autotile();
        // lone grass next to ice: empty pattern has no entry
        assert_eq!(map.get(GridPos(0, 0)).unwrap().variant, 5);
    }

    #[test]
    fn autotile_is_idempotent() {
        let mut map = map_from(&[
            "#  ####  ",
            "## #  ###",
            " ####  i#",
            "   ii ###",
        ]);
        map.autotile();
        let once = variants(&map);
        map.autotile();
        assert_eq!(variants(&map), once);
    }

    // ── persistence ──

    #[test]
    fn json_round_trip() {
        let mut map = map_from(&["P f F", "##m##", "c    "]);
        map.push_offgrid(PlacedTile { kind: TileKind::Tree, variant: 1, pos: Vec2::new(12.5, -3.0) });
        map.advance_moving_platforms();

        let text = map.to_json().unwrap();
        assert!(!text.contains("renderpos"));
        assert!(!text.contains("transport"));

        let back = Tilemap::from_json(&text).unwrap();
        assert_eq!(back.tile_size, 16);
        assert_eq!(variants(&back), variants(&map));
        let mut a: Vec<_> = map.tiles().cloned().map(|t| (t.pos, t.kind)).collect();
        let mut b: Vec<_> = back.tiles().cloned().map(|t| (t.pos, t.kind)).collect();
        a.sort_by_key(|x| x.0);
        b.sort_by_key(|x| x.0);
        assert_eq!(a, b);
        assert_eq!(back.offgrid(), map.offgrid());
        assert_eq!(back.to_json().unwrap(), text);
    }

    #[test]
    fn transient_fields_ignored_on_load() {
        let text = r#"{"tilemap": {"2;3": {"type": "movingtile", "variant": 4, "pos": [2, 3],
            "renderpos": [40.5, 48], "renderpos_prev": [40, 48], "transport": [0.3, 0]}},
            "tile_size": 16, "offgrid": []}"#;
        let map = Tilemap::from_json(text).unwrap();
        assert_eq!(map.get(GridPos(2, 3)).unwrap().variant, 4);
        assert!(!map.to_json().unwrap().contains("renderpos"));
    }

    #[test]
    fn unknown_kind_round_trips() {
        let text = r#"{"tilemap": {"0;0": {"type": "decor/statue", "variant": 2, "pos": [0, 0]}},
            "tile_size": 16, "offgrid": []}"#;
        let map = Tilemap::from_json(text).unwrap();
        assert!(map.to_json().unwrap().contains("decor/statue"));
    }

    #[test]
    fn bad_key_is_error() {
        let text = r#"{"tilemap": {"0,0": {"type": "grass", "variant": 0, "pos": [0, 0]}},
            "tile_size": 16, "offgrid": []}"#;
        assert!(matches!(Tilemap::from_json(text), Err(TilemapError::BadKey(_))));
    }

    #[test]
    fn malformed_and_missing_files_are_errors() {
        assert!(matches!(Tilemap::from_json("{ nope"), Err(TilemapError::Json(_))));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Tilemap::load(&dir.path().join("missing.json")), Err(TilemapError::Io(_))));
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");
        let map = map_from(&["  f", "###"]);
        map.save(&path).unwrap();
        let back = Tilemap::load(&path).unwrap();
        assert_eq!(variants(&back), variants(&map));
    }
}
