/// Enemies: a `Body` driven by a two-state patrol AI.
///
///   watching   (walking == 0): 1% chance per frame to start a burst
///   patrolling (walking  > 0): walk until the burst ends, turning at
///                               walls and ledges
///
/// Shooting kinds fire once at the end of each burst when the player is
/// level with them and in front.

use rand::Rng;

use crate::config::PhysicsConfig;

use super::animation::Animation;
use super::effects::{cone_sparks, radial_sparks, Effects, Lifecycle, Projectile, TextMark};
use super::geom::Vec2;
use super::physics::{Body, Facing};
use super::player::Player;
use super::tilemap::Tilemap;

const PATROL_CHANCE: f64 = 0.01;
/// Ledge probe: this far ahead of the body centre…
const PROBE_AHEAD: f32 = 7.0;
/// …and this far below the body top.
const PROBE_BELOW: f32 = 25.0;
/// Vertical band within which a shooter sees the player.
const SIGHT_BAND: f32 = 16.0;
const SHOT_SPARKS: usize = 4;
const KILL_SPARKS: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnemyKind {
    Squirrel1,
    Squirrel2,
    Cat,
}

/// Per-kind tuning.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct KindSpec {
    pub size: Vec2,
    pub speed: f32,
    /// Inclusive patrol burst length range, in frames.
    pub burst: (u32, u32),
    pub score: u32,
    /// Energy taken per frame of contact.
    pub contact_damage: f32,
    pub shoots: bool,
}

impl EnemyKind {
    pub fn spec(self) -> KindSpec {
        match self {
            EnemyKind::Squirrel1 => KindSpec {
                size: Vec2::new(20.0, 18.0),
                speed: 0.5,
                burst: (30, 120),
                score: 30,
                contact_damage: 0.4,
                shoots: true,
            },
            EnemyKind::Squirrel2 => KindSpec {
                size: Vec2::new(20.0, 18.0),
                speed: 0.6,
                burst: (30, 120),
                score: 50,
                contact_damage: 0.6,
                shoots: true,
            },
            EnemyKind::Cat => KindSpec {
                size: Vec2::new(32.0, 24.0),
                speed: 2.0,
                burst: (60, 180),
                score: 70,
                contact_damage: 0.8,
                shoots: false,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EnemyKind::Squirrel1 => "squirrel1",
            EnemyKind::Squirrel2 => "squirrel2",
            EnemyKind::Cat => "cat",
        }
    }

    /// Spawner tile variant → enemy kind. Variant 0 is the player.
    pub fn from_spawner_variant(variant: u32) -> Option<EnemyKind> {
        match variant {
            1 => Some(EnemyKind::Squirrel1),
            2 => Some(EnemyKind::Squirrel2),
            3 => Some(EnemyKind::Cat),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnemyAction {
    Idle,
    Run,
}

/// Outcome of one enemy frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EnemyReport {
    /// `Remove` iff the player dashed through this enemy.
    pub lifecycle: Lifecycle,
    pub shot: bool,
    pub hit_player: bool,
}

impl EnemyReport {
    pub fn killed(&self) -> bool {
        self.lifecycle == Lifecycle::Remove
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub kind: EnemyKind,
    pub body: Body,
    /// Frames left in the current patrol burst.
    pub walking: u32,
    pub action: EnemyAction,
}

impl Enemy {
    pub fn new(kind: EnemyKind, pos: Vec2) -> Self {
        let mut body = Body::new(pos, kind.spec().size);
        body.anim = Animation::for_key(&format!("{}/idle", kind.name()));
        Enemy { kind, body, walking: 0, action: EnemyAction::Idle }
    }

    fn set_action(&mut self, action: EnemyAction) {
        if action != self.action {
            self.action = action;
            let name = match action {
                EnemyAction::Idle => "idle",
                EnemyAction::Run => "run",
            };
            self.body.anim = Animation::for_key(&format!("{}/{}", self.kind.name(), name));
        }
    }

    /// One frame of AI, movement and player contact.
    ///
    /// `armed` gates shooting (off on the title screen and while the
    /// player is dying).
    pub fn update(
        &mut self,
        map: &Tilemap,
        player: &mut Player,
        phys: &PhysicsConfig,
        rng: &mut impl Rng,
        effects: &mut Effects,
        armed: bool,
    ) -> EnemyReport {
        let spec = self.kind.spec();
        let mut report = EnemyReport { lifecycle: Lifecycle::Alive, shot: false, hit_player: false };
        let mut movement = Vec2::ZERO;

        if self.walking > 0 {
            let center = self.body.center();
            let probe = Vec2::new(
                center.x + PROBE_AHEAD * self.body.facing.sign(),
                self.body.pos.y + PROBE_BELOW,
            );
            if map.solid_at(probe).is_some() {
                if self.body.collisions.horizontal() {
                    self.body.facing = self.body.facing.flipped();
                } else {
                    movement.x = spec.speed * self.body.facing.sign();
                }
            } else {
                // ledge ahead
                self.body.facing = self.body.facing.flipped();
            }
            self.walking -= 1;

            if self.walking == 0 && spec.shoots && armed {
                report.shot = self.try_shoot(player, rng, effects);
            }
        } else if rng.random_bool(PATROL_CHANCE) {
            self.walking = rng.random_range(spec.burst.0..=spec.burst.1);
        }

        self.body.update(map, movement, phys);

        self.set_action(if movement.x != 0.0 { EnemyAction::Run } else { EnemyAction::Idle });

        let me = self.body.rect();
        if me.overlaps(&player.rect()) {
            if player.is_fast_dashing() {
                effects.textmarks.push(TextMark::new(player.rect().pos(), spec.score.to_string()));
                effects.sparks.extend(radial_sparks(me.center(), KILL_SPARKS, 1.0, rng));
                report.lifecycle = Lifecycle::Remove;
            } else {
                player.take_damage(spec.contact_damage, Some(self.body.pos.x));
                report.hit_player = true;
            }
        }

        report
    }

    fn try_shoot(&self, player: &Player, rng: &mut impl Rng, effects: &mut Effects) -> bool {
        let dx = player.body.pos.x - self.body.pos.x;
        let dy = player.body.pos.y - self.body.pos.y;
        if dy.abs() >= SIGHT_BAND {
            return false;
        }
        let leftward = match self.body.facing {
            Facing::Left if dx < 0.0 => true,
            Facing::Right if dx > 0.0 => false,
            _ => return false,
        };
        let center = self.body.center();
        let muzzle = Vec2::new(center.x + PROBE_AHEAD * self.body.facing.sign(), center.y);
        effects.projectiles.push(Projectile::new(muzzle, leftward));
        effects
            .sparks
            .extend(cone_sparks(muzzle, SHOT_SPARKS, leftward, rng).into_iter().map(|s| s.sized((1, 2))));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::player::DASH_FRAMES;
    use crate::domain::tile::{GridPos, Tile, TileKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn map_from(rows: &[&str]) -> Tilemap {
        let mut map = Tilemap::new(16);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    map.insert(Tile::new(TileKind::Grass, 0, GridPos(x as i32, y as i32)));
                }
            }
        }
        map
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    /// Squirrel standing on row 3 (floor top at y = 48).
    fn squirrel_at(x: f32) -> Enemy {
        Enemy::new(EnemyKind::Squirrel1, Vec2::new(x, 48.0 - 18.0))
    }

    /// A player parked well away from everything.
    fn far_player() -> Player {
        Player::new(Vec2::new(2000.0, -500.0))
    }

    #[test]
    fn spawner_variants() {
        assert_eq!(EnemyKind::from_spawner_variant(0), None);
        assert_eq!(EnemyKind::from_spawner_variant(1), Some(EnemyKind::Squirrel1));
        assert_eq!(EnemyKind::from_spawner_variant(3), Some(EnemyKind::Cat));
        assert_eq!(EnemyKind::from_spawner_variant(9), None);
        assert!(!EnemyKind::Cat.spec().shoots);
    }

    #[test]
    fn patrol_turns_at_ledge() {
        let map = map_from(&["", "", "", "  ######"]);
        let mut e = squirrel_at(80.0);
        e.walking = 200;
        let mut player = far_player();
        let mut effects = Effects::default();
        let mut r = rng();
        let mut turned = false;
        for _ in 0..150 {
            e.update(&map, &mut player, &PhysicsConfig::default(), &mut r, &mut effects, false);
            let cx = e.body.center().x;
            assert!(cx > 32.0 && cx < 128.0, "walked off the ledge at {cx}");
            assert_eq!(e.body.pos.y, 30.0);
            turned |= e.body.facing == Facing::Left;
        }
        assert!(turned);
    }

    #[test]
    fn patrol_turns_at_wall() {
        let map = map_from(&["", "      #", "      #", "##########"]);
        let mut e = squirrel_at(60.0);
        e.walking = 100;
        let mut player = far_player();
        let mut effects = Effects::default();
        let mut r = rng();
        // A 20 px body only sees the wall column once its own cell is
        // adjacent, so it may sink a few pixels in before being pushed out.
        for _ in 0..60 {
            e.update(&map, &mut player, &PhysicsConfig::default(), &mut r, &mut effects, false);
            assert!(e.body.rect().right() < 100.0 + 1e-3);
        }
        assert_eq!(e.body.facing, Facing::Left);
        assert!(e.body.rect().right() < 96.0);
    }

    #[test]
    fn contact_damages_without_dash() {
        let map = map_from(&["", "", "", "##########"]);
        let mut e = squirrel_at(60.0);
        let mut player = Player::new(Vec2::new(65.0, 26.0));
        let mut effects = Effects::default();
        let before = player.energy;
        let rep = e.update(&map, &mut player, &PhysicsConfig::default(), &mut rng(), &mut effects, false);
        assert!(!rep.killed());
        assert!(rep.hit_player);
        assert!((before - player.energy - 0.4).abs() < 1e-5);
        assert!(player.blink > 0);
    }

    #[test]
    fn fast_dash_kills() {
        let map = map_from(&["", "", "", "##########"]);
        let mut e = Enemy::new(EnemyKind::Cat, Vec2::new(60.0, 24.0));
        let mut player = Player::new(Vec2::new(65.0, 26.0));
        player.dashing = DASH_FRAMES - 5;
        let mut effects = Effects::default();
        let before = player.energy;
        let rep = e.update(&map, &mut player, &PhysicsConfig::default(), &mut rng(), &mut effects, false);
        assert!(rep.killed());
        assert_eq!(player.energy, before);
        assert_eq!(effects.textmarks[0].text, "70");
        assert_eq!(effects.sparks.len(), KILL_SPARKS);
    }

    #[test]
    fn slow_dash_tail_does_not_kill() {
        let map = map_from(&["", "", "", "##########"]);
        let mut e = squirrel_at(60.0);
        let mut player = Player::new(Vec2::new(65.0, 26.0));
        player.dashing = -49;
        let rep = e.update(&map, &mut player, &PhysicsConfig::default(), &mut rng(), &mut Effects::default(), false);
        assert!(!rep.killed());
        assert!(rep.hit_player);
    }

    #[test]
    fn shoots_at_level_player_in_front() {
        let map = map_from(&["", "", "", "####################"]);
        let mut e = squirrel_at(60.0);
        e.walking = 1;
        let mut player = Player::new(Vec2::new(200.0, 26.0));
        let mut effects = Effects::default();
        let rep = e.update(&map, &mut player, &PhysicsConfig::default(), &mut rng(), &mut effects, true);
        assert!(rep.shot);
        assert_eq!(effects.projectiles.len(), 1);
        assert!(effects.projectiles[0].speed > 0.0);
        assert_eq!(effects.sparks.len(), SHOT_SPARKS);
    }

    #[test]
    fn no_shot_behind_or_unarmed() {
        let map = map_from(&["", "", "", "####################"]);
        let mut effects = Effects::default();

        let mut e = squirrel_at(150.0);
        e.walking = 1;
        let mut behind = Player::new(Vec2::new(20.0, 26.0));
        let rep = e.update(&map, &mut behind, &PhysicsConfig::default(), &mut rng(), &mut effects, true);
        assert!(!rep.shot);

        let mut e = squirrel_at(60.0);
        e.walking = 1;
        let mut ahead = Player::new(Vec2::new(200.0, 26.0));
        let rep = e.update(&map, &mut ahead, &PhysicsConfig::default(), &mut rng(), &mut effects, false);
        assert!(!rep.shot);
        assert!(effects.projectiles.is_empty());
    }
}
