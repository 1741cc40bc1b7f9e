/// Tile kinds and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geom::Vec2;

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TileKind {
    Grass,       // Solid + autotiled (summer)
    Autumn,      // Solid + autotiled
    Ice,         // Solid + autotiled (winter)
    Tropic,      // Solid + autotiled
    MovingTile,  // Solid, oscillates sinusoidally
    FireSwing,   // Solid hub of a swinging fire chain
    FireHole,    // Spawns fireballs
    Tree,
    SummerTree,
    Fence,
    Building,
    LargeDecor,
    Food,        // Reward pickup
    FinishLine,
    Checkpoint,
    Spawners,    // variant 0 player, 1 squirrel1, 2 squirrel2, 3 cat
    /// Any name outside the catalog. Belongs to no category.
    Unknown(String),
}

/// Query categories used by the tilemap's spatial lookups.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileCategory {
    Solid,
    Reward,
    Finish,
    Spawner,
    Checkpoint,
}

impl TileKind {
    pub fn from_name(name: &str) -> TileKind {
        match name {
            "grass" => TileKind::Grass,
            "autumn" => TileKind::Autumn,
            "ice" => TileKind::Ice,
            "tropic" => TileKind::Tropic,
            "movingtile" => TileKind::MovingTile,
            "decor/fireswing" => TileKind::FireSwing,
            "decor/firehole" => TileKind::FireHole,
            "decor/tree" => TileKind::Tree,
            "decor/summer_tree" => TileKind::SummerTree,
            "decor/fence" => TileKind::Fence,
            "decor/building" => TileKind::Building,
            "largedecor" => TileKind::LargeDecor,
            "reward/food" => TileKind::Food,
            "finishline" => TileKind::FinishLine,
            "checkpoint" => TileKind::Checkpoint,
            "spawners" => TileKind::Spawners,
            other => TileKind::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TileKind::Grass => "grass",
            TileKind::Autumn => "autumn",
            TileKind::Ice => "ice",
            TileKind::Tropic => "tropic",
            TileKind::MovingTile => "movingtile",
            TileKind::FireSwing => "decor/fireswing",
            TileKind::FireHole => "decor/firehole",
            TileKind::Tree => "decor/tree",
            TileKind::SummerTree => "decor/summer_tree",
            TileKind::Fence => "decor/fence",
            TileKind::Building => "decor/building",
            TileKind::LargeDecor => "largedecor",
            TileKind::Food => "reward/food",
            TileKind::FinishLine => "finishline",
            TileKind::Checkpoint => "checkpoint",
            TileKind::Spawners => "spawners",
            TileKind::Unknown(name) => name,
        }
    }

    /// Does this tile block entity movement?
    pub fn is_solid(&self) -> bool {
        matches!(
            self,
            TileKind::Grass
                | TileKind::Autumn
                | TileKind::Ice
                | TileKind::Tropic
                | TileKind::MovingTile
                | TileKind::FireSwing
        )
    }

    /// Does this tile pick its variant from its 4-connected neighbours?
    pub fn is_autotiled(&self) -> bool {
        matches!(self, TileKind::Grass | TileKind::Autumn | TileKind::Ice | TileKind::Tropic)
    }

    pub fn is_moving(&self) -> bool {
        matches!(self, TileKind::MovingTile)
    }

    pub fn in_category(&self, cat: TileCategory) -> bool {
        match cat {
            TileCategory::Solid => self.is_solid(),
            TileCategory::Reward => matches!(self, TileKind::Food),
            TileCategory::Finish => matches!(self, TileKind::FinishLine),
            TileCategory::Spawner => {
                matches!(self, TileKind::Spawners | TileKind::FireHole | TileKind::FireSwing)
            }
            TileCategory::Checkpoint => matches!(self, TileKind::Checkpoint),
        }
    }

    pub fn in_any(&self, cats: &[TileCategory]) -> bool {
        cats.iter().any(|&c| self.in_category(c))
    }
}

impl From<String> for TileKind {
    fn from(s: String) -> Self {
        TileKind::from_name(&s)
    }
}

impl From<TileKind> for String {
    fn from(k: TileKind) -> Self {
        k.name().to_string()
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer cell coordinate. Displays and parses as `"x;y"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct GridPos(pub i32, pub i32);

impl GridPos {
    pub fn offset(self, dx: i32, dy: i32) -> GridPos {
        GridPos(self.0 + dx, self.1 + dy)
    }

    /// Cell containing a pixel position (floor division).
    pub fn containing(p: Vec2, tile_size: u32) -> GridPos {
        let ts = tile_size as f32;
        GridPos((p.x / ts).floor() as i32, (p.y / ts).floor() as i32)
    }

    /// Top-left pixel of this cell.
    pub fn to_pixels(self, tile_size: u32) -> Vec2 {
        let ts = tile_size as f32;
        Vec2::new(self.0 as f32 * ts, self.1 as f32 * ts)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.0, self.1)
    }
}

impl FromStr for GridPos {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s.split_once(';').ok_or_else(|| s.to_string())?;
        let x = x.trim().parse::<i32>().map_err(|_| s.to_string())?;
        let y = y.trim().parse::<i32>().map_err(|_| s.to_string())?;
        Ok(GridPos(x, y))
    }
}

/// On-grid tile. The tilemap owns the authoritative instance.
#[derive(Clone, PartialEq, Debug)]
pub struct Tile {
    pub kind: TileKind,
    pub variant: u32,
    pub pos: GridPos,
}

impl Tile {
    pub fn new(kind: TileKind, variant: u32, pos: GridPos) -> Self {
        Tile { kind, variant, pos }
    }
}

/// A tile at a free pixel position: off-grid decor, or an extracted
/// snapshot of an on-grid tile scaled to pixels.
#[derive(Clone, PartialEq, Debug)]
pub struct PlacedTile {
    pub kind: TileKind,
    pub variant: u32,
    pub pos: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for name in ["grass", "movingtile", "decor/fireswing", "reward/food", "spawners"] {
            assert_eq!(TileKind::from_name(name).name(), name);
        }
    }

    #[test]
    fn unknown_kind_fails_open() {
        let k = TileKind::from_name("decor/lava");
        assert_eq!(k, TileKind::Unknown("decor/lava".into()));
        assert_eq!(k.name(), "decor/lava");
        assert!(!k.is_solid());
        assert!(!k.in_any(&[
            TileCategory::Solid,
            TileCategory::Reward,
            TileCategory::Finish,
            TileCategory::Spawner,
            TileCategory::Checkpoint,
        ]));
    }

    #[test]
    fn categories() {
        assert!(TileKind::FireSwing.is_solid());
        assert!(TileKind::FireSwing.in_category(TileCategory::Spawner));
        assert!(!TileKind::FireHole.is_solid());
        assert!(TileKind::Food.in_category(TileCategory::Reward));
        assert!(!TileKind::Tree.in_any(&[TileCategory::Solid, TileCategory::Reward]));
        assert!(TileKind::Ice.is_autotiled());
        assert!(!TileKind::MovingTile.is_autotiled());
    }

    #[test]
    fn grid_pos_parse_and_display() {
        assert_eq!("3;-2".parse::<GridPos>(), Ok(GridPos(3, -2)));
        assert_eq!(GridPos(-7, 11).to_string(), "-7;11");
        assert!("3,2".parse::<GridPos>().is_err());
        assert!("a;2".parse::<GridPos>().is_err());
    }

    #[test]
    fn containing_cell_floors_negatives() {
        assert_eq!(GridPos::containing(Vec2::new(-1.0, 15.9), 16), GridPos(-1, 0));
        assert_eq!(GridPos::containing(Vec2::new(32.0, 16.0), 16), GridPos(2, 1));
    }
}
