/// Shared kinematics: axis-separated collision resolution against
/// the tilemap's solid rects. Player and Enemy both embed a `Body`.
///
/// ## Per-frame update
///
///   1. Reset collision flags (they are a one-frame snapshot).
///   2. displacement = movement input + velocity.
///   3. Move and resolve X, then Y. Each axis queries rects around the
///      tentatively moved box, so Y sees the X-corrected position.
///   4. Facing follows the sign of the *input*, not the velocity.
///   5. Gravity: vy → min(falling_max, vy + falling_delta); zeroed on
///      any vertical contact.
///   6. Advance the animation.
///
/// ## Contact rules
///
/// Rects must penetrate by more than `CONTACT_EPS` to collide, so a box
/// resting exactly on a floor does not also register as a side hit.
/// On a zero-displacement axis, penetrating rects push the body out on
/// the side they came from (a platform sliding into a standing entity).
/// A body whose bottom sits on a rect top with zero vertical
/// displacement is resting: it gets `down` and rides moving platforms.

use crate::config::PhysicsConfig;

use super::animation::Animation;
use super::geom::{Rect, Vec2};
use super::tile::TileCategory;
use super::tilemap::{CollisionRect, Tilemap};

const CONTACT_EPS: f32 = 1e-3;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CollisionFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl CollisionFlags {
    pub fn horizontal(&self) -> bool {
        self.left || self.right
    }

    pub fn vertical(&self) -> bool {
        self.up || self.down
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Facing {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

fn penetrates(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() - CONTACT_EPS
        && a.right() > b.x + CONTACT_EPS
        && a.y < b.bottom() - CONTACT_EPS
        && a.bottom() > b.y + CONTACT_EPS
}

fn rests_on(a: &Rect, b: &Rect) -> bool {
    (a.bottom() - b.top()).abs() <= CONTACT_EPS
        && a.x < b.right() - CONTACT_EPS
        && a.right() > b.x + CONTACT_EPS
}

#[derive(Clone, Debug)]
pub struct Body {
    /// Top-left, pixels.
    pub pos: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    pub collisions: CollisionFlags,
    pub facing: Facing,
    /// Input movement of the last update.
    pub last_movement: Vec2,
    pub anim: Animation,
}

impl Body {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Body {
            pos,
            size,
            velocity: Vec2::ZERO,
            collisions: CollisionFlags::default(),
            facing: Facing::Right,
            last_movement: Vec2::ZERO,
            anim: Animation::for_key(""),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::at(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }

    pub fn update(&mut self, map: &Tilemap, movement: Vec2, phys: &PhysicsConfig) {
        self.collisions = CollisionFlags::default();
        let frame = movement + self.velocity;

        self.pos.x += frame.x;
        let rects = map.collision_rects(&self.rect(), &[TileCategory::Solid]);
        self.resolve_x(&rects, frame.x);

        self.pos.y += frame.y;
        let rects = map.collision_rects(&self.rect(), &[TileCategory::Solid]);
        self.resolve_y(&rects, frame.y);

        if movement.x > 0.0 {
            self.facing = Facing::Right;
        }
        if movement.x < 0.0 {
            self.facing = Facing::Left;
        }
        self.last_movement = movement;

        self.velocity.y = (self.velocity.y + phys.falling_delta).min(phys.falling_max);
        if self.collisions.vertical() {
            self.velocity.y = 0.0;
        }

        self.anim.update();
    }

    fn resolve_x(&mut self, rects: &[CollisionRect], dx: f32) {
        for cr in rects {
            let mut me = self.rect();
            let r = &cr.rect;
            if !penetrates(&me, r) {
                continue;
            }
            if dx > 0.0 {
                me.set_right(r.left());
                self.collisions.right = true;
            } else if dx < 0.0 {
                me.set_left(r.right());
                self.collisions.left = true;
            } else {
                if me.right() > r.left() && me.left() < r.left() {
                    me.set_right(r.left());
                    self.collisions.right = true;
                }
                if me.left() < r.right() && me.right() > r.right() {
                    me.set_left(r.right());
                    self.collisions.left = true;
                }
            }
            self.pos.x = me.x;
        }
    }

    fn resolve_y(&mut self, rects: &[CollisionRect], dy: f32) {
        let mut carry: Option<f32> = None;

        for cr in rects {
            let mut me = self.rect();
            let r = &cr.rect;
            if penetrates(&me, r) {
                if dy > 0.0 {
                    me.set_bottom(r.top());
                    self.collisions.down = true;
                    carry.get_or_insert(cr.dx);
                } else if dy < 0.0 {
                    me.set_top(r.bottom());
                    self.collisions.up = true;
                } else {
                    if me.bottom() > r.top() && me.top() < r.top() {
                        me.set_bottom(r.top());
                        self.collisions.down = true;
                        carry.get_or_insert(cr.dx);
                    }
                    if me.top() < r.bottom() && me.bottom() > r.bottom() {
                        me.set_top(r.bottom());
                        self.collisions.up = true;
                    }
                }
                self.pos.y = me.y;
            } else if dy == 0.0 && rests_on(&me, r) {
                self.collisions.down = true;
                carry.get_or_insert(cr.dx);
            }
        }

        // Riding a platform: one carry per frame, tiles of a variant move in lockstep.
        if let Some(dx) = carry {
            self.pos.x += dx;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{GridPos, Tile, TileKind};

    /// `#` grass, `m` moving platform variant 0.
    fn map_from(rows: &[&str]) -> Tilemap {
        let mut map = Tilemap::new(16);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let kind = match ch {
                    '#' => TileKind::Grass,
                    'm' => TileKind::MovingTile,
                    _ => continue,
                };
                map.insert(Tile::new(kind, 0, GridPos(x as i32, y as i32)));
            }
        }
        map
    }

    fn phys() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    // ── horizontal ──

    #[test]
    fn walks_flush_into_wall() {
        let map = map_from(&[
            "   #",
            "   #",
        ]);
        let mut b = Body::new(Vec2::new(30.0, 2.0), Vec2::new(12.0, 12.0));
        b.update(&map, Vec2::new(10.0, 0.0), &phys());
        assert_eq!(b.rect().right(), 48.0);
        assert!(b.collisions.right);
        assert!(!b.collisions.left && !b.collisions.up && !b.collisions.down);
        assert_eq!(b.facing, Facing::Right);
    }

    #[test]
    fn walks_flush_into_left_wall() {
        let map = map_from(&["#   "]);
        let mut b = Body::new(Vec2::new(18.0, 2.0), Vec2::new(12.0, 12.0));
        b.update(&map, Vec2::new(-4.0, 0.0), &phys());
        assert_eq!(b.pos.x, 16.0);
        assert!(b.collisions.left);
        assert!(!b.collisions.right && !b.collisions.vertical());
        assert_eq!(b.facing, Facing::Left);
    }

    #[test]
    fn stationary_body_pushed_out_by_overlap() {
        let map = map_from(&["  #"]);
        // right edge at 40, tile spans 32..48
        let mut b = Body::new(Vec2::new(28.0, 2.0), Vec2::new(12.0, 12.0));
        b.update(&map, Vec2::ZERO, &phys());
        assert_eq!(b.pos.x, 20.0);
        assert!(b.collisions.right);
    }

    // ── vertical ──

    #[test]
    fn lands_on_floor_and_zeroes_vy() {
        let map = map_from(&[
            "    ",
            "    ",
            "####",
        ]);
        let mut b = Body::new(Vec2::new(10.0, 5.0), Vec2::new(12.0, 22.0));
        b.velocity.y = 6.0;
        b.update(&map, Vec2::ZERO, &phys());
        assert_eq!(b.rect().bottom(), 32.0);
        assert!(b.collisions.down);
        assert_eq!(b.velocity.y, 0.0);
    }

    #[test]
    fn bumps_ceiling_and_zeroes_vy() {
        let map = map_from(&[
            "####",
            "    ",
            "    ",
        ]);
        let mut b = Body::new(Vec2::new(10.0, 18.0), Vec2::new(12.0, 12.0));
        b.velocity.y = -3.2;
        b.update(&map, Vec2::ZERO, &phys());
        assert_eq!(b.pos.y, 16.0);
        assert!(b.collisions.up);
        assert_eq!(b.velocity.y, 0.0);
    }

    #[test]
    fn resting_body_stays_grounded() {
        let map = map_from(&[
            "    ",
            "    ",
            "####",
        ]);
        let mut b = Body::new(Vec2::new(10.0, 10.0), Vec2::new(12.0, 22.0));
        for _ in 0..10 {
            b.update(&map, Vec2::ZERO, &phys());
            assert!(b.collisions.down);
            assert!(!b.collisions.horizontal());
            assert_eq!(b.velocity.y, 0.0);
            assert_eq!(b.pos, Vec2::new(10.0, 10.0));
        }
    }

    #[test]
    fn free_fall_caps_at_terminal_speed() {
        let map = Tilemap::new(16);
        let mut b = Body::new(Vec2::new(-5000.0, 9000.0), Vec2::new(12.0, 22.0));
        for _ in 0..200 {
            b.update(&map, Vec2::ZERO, &phys());
        }
        assert_eq!(b.velocity.y, 7.0);
        assert_eq!(b.collisions, CollisionFlags::default());
    }

    #[test]
    fn flags_do_not_accumulate() {
        let map = map_from(&["   #"]);
        let mut b = Body::new(Vec2::new(30.0, 2.0), Vec2::new(12.0, 12.0));
        b.update(&map, Vec2::new(10.0, 0.0), &phys());
        assert!(b.collisions.right);
        b.update(&map, Vec2::new(-1.0, 0.0), &phys());
        assert!(!b.collisions.right);
    }

    // ── moving platforms ──

    #[test]
    fn rides_moving_platform() {
        let mut map = map_from(&[
            "      ",
            "      ",
            "      ",
            "  mm  ",
        ]);
        let mut b = Body::new(Vec2::new(36.0, 26.0), Vec2::new(12.0, 22.0));
        for _ in 0..8 {
            map.advance_moving_platforms();
            let tile = map.get(GridPos(2, 3)).unwrap().clone();
            let rect = map.render_rect(&tile);
            let hits = map.collision_rects(&b.rect(), &[TileCategory::Solid]);
            let d = hits.iter().find_map(|h| h.prev.map(|p| rect.x - p.x)).unwrap();

            let x0 = b.pos.x;
            b.update(&map, Vec2::ZERO, &phys());
            assert!(b.collisions.down);
            assert!((b.pos.x - x0 - d).abs() < 1e-4);
            assert_eq!(b.velocity.y, 0.0);
        }
    }

    #[test]
    fn platform_carry_adds_to_input() {
        let mut map = map_from(&[
            "      ",
            "      ",
            "      ",
            "  mm  ",
        ]);
        let mut b = Body::new(Vec2::new(36.0, 26.0), Vec2::new(12.0, 22.0));
        map.advance_moving_platforms();
        map.advance_moving_platforms();
        let tile = map.get(GridPos(2, 3)).unwrap().clone();
        let hits = map.collision_rects(&Rect::new(36.0, 26.0, 12.0, 22.0), &[TileCategory::Solid]);
        let d = hits.iter().find(|h| h.prev.is_some()).unwrap().dx;
        assert!((map.render_rect(&tile).x - 32.0) > 0.0);

        b.update(&map, Vec2::new(1.0, 0.0), &phys());
        assert!((b.pos.x - (36.0 + 1.0 + d)).abs() < 1e-4);
    }
}
