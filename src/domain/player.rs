/// Player: a `Body` plus jump / dash / wall-slide state, energy and
/// the reward / finish / checkpoint interactions.
///
/// ## Visual state priority (evaluated every frame)
///
///   1. Wall slide: horizontal contact while airborne past the grace window
///   2. Jump pose : airborne past the grace window
///   3. Run       : nonzero horizontal input
///   4. Idle, with a randomized flourish window (random1..4)
///
/// `Hit` overrides all of these while the damage blink runs; the level
/// step applies it after `update()`.

use rand::Rng;

use crate::config::PhysicsConfig;

use super::animation::Animation;
use super::effects::Particle;
use super::geom::{Rect, Vec2};
use super::physics::{Body, Facing};
use super::tile::TileCategory;
use super::tilemap::Tilemap;

pub const PLAYER_SIZE: Vec2 = Vec2::new(12.0, 22.0);
pub const MAX_ENERGY: f32 = 30.0;
pub const DASH_FRAMES: i32 = 60;
/// |dashing| at or above this is the high-speed, invulnerable part of a dash.
pub const DASH_FAST: i32 = 50;
pub const BLINK_FRAMES: u32 = 20;
/// Frames airborne before the jump pose and wall slide kick in.
const AIR_GRACE: u32 = 4;
const REWARD_INSET: f32 = 3.0;
const IDLE_WRAP: u32 = 2500;

/// Intents sampled once per frame by the front end.
/// `jump` and `dash` are edge-triggered; the rest are held.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub dash: bool,
    pub run: bool,
}

impl FrameInput {
    /// Horizontal input movement for this frame.
    pub fn movement(&self, phys: &PhysicsConfig) -> Vec2 {
        let dir = self.right as i32 - self.left as i32;
        let speed = if self.run { phys.run_speed } else { phys.walk_speed };
        Vec2::new(dir as f32 * speed, 0.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerAction {
    Idle,
    Run,
    Jump,
    WallSlide,
    Hit,
    /// Idle flourish 1..=4.
    Random(u8),
}

impl PlayerAction {
    pub fn name(self) -> &'static str {
        match self {
            PlayerAction::Idle => "idle",
            PlayerAction::Run => "run",
            PlayerAction::Jump => "jump",
            PlayerAction::WallSlide => "wall_slide",
            PlayerAction::Hit => "hit",
            PlayerAction::Random(1) => "random1",
            PlayerAction::Random(2) => "random2",
            PlayerAction::Random(3) => "random3",
            PlayerAction::Random(_) => "random4",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Skin {
    Default,
    Winter,
}

impl Skin {
    fn prefix(self) -> &'static str {
        match self {
            Skin::Default => "player",
            Skin::Winter => "player/winter",
        }
    }
}

/// What the player ran into this frame. The level step turns it into
/// score, floating text and sound.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PlayerReport {
    pub rewards: u32,
    pub finished: bool,
    pub fell_out: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    pub action: PlayerAction,
    pub skin: Skin,
    pub energy: f32,
    pub air_time: u32,
    pub jumps: u32,
    pub wall_slide: bool,
    /// Signed frame counter: magnitude = frames left, sign = direction.
    pub dashing: i32,
    /// Damage flash, counts down from `BLINK_FRAMES`.
    pub blink: u32,
    /// Push-back direction while blinking; 0 = away from facing.
    pub bounce_direction: i32,
    pub idle_time: u32,
    idle_window: (u32, u32),
    idle_flourish: PlayerAction,
    /// Level start position.
    pub spawn: Vec2,
    /// Checkpoints reached on the current level (pixel positions).
    pub passed_checkpoints: Vec<Vec2>,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        let mut p = Player {
            body: Body::new(pos, PLAYER_SIZE),
            action: PlayerAction::Jump,
            skin: Skin::Default,
            energy: MAX_ENERGY,
            air_time: 0,
            jumps: 1,
            wall_slide: false,
            dashing: 0,
            blink: 0,
            bounce_direction: 0,
            idle_time: 0,
            idle_window: (200, 250),
            idle_flourish: PlayerAction::Random(1),
            spawn: pos,
            passed_checkpoints: Vec::new(),
        };
        p.set_action(PlayerAction::Idle);
        p
    }

    pub fn rect(&self) -> Rect {
        self.body.rect()
    }

    pub fn set_action(&mut self, action: PlayerAction) {
        if action != self.action {
            self.action = action;
            self.body.anim = Animation::for_key(&format!("{}/{}", self.skin.prefix(), action.name()));
        }
    }

    pub fn set_skin(&mut self, skin: Skin) {
        if skin != self.skin {
            self.skin = skin;
            self.body.anim = Animation::for_key(&format!("{}/{}", skin.prefix(), self.action.name()));
        }
    }

    fn reschedule_idle(&mut self, rng: &mut impl Rng) {
        let start = rng.random_range(200..=600);
        let end = start + rng.random_range(50..=100);
        self.idle_window = (start, end);
        self.idle_flourish = PlayerAction::Random(rng.random_range(1..=4));
    }

    pub fn is_fast_dashing(&self) -> bool {
        self.dashing.abs() >= DASH_FAST
    }

    // ══════════════════════════════════════════════════════════════
    // Per-frame update
    // ══════════════════════════════════════════════════════════════

    pub fn update(
        &mut self,
        map: &mut Tilemap,
        movement: Vec2,
        phys: &PhysicsConfig,
        rng: &mut impl Rng,
        particles: &mut Vec<Particle>,
    ) -> PlayerReport {
        let mut report = PlayerReport::default();

        self.body.update(map, movement, phys);
        self.air_time += 1;

        let me = self.rect();

        for tile in map.tiles_near(&me, &[TileCategory::Reward]) {
            let hitbox = Rect::at(tile.pos.to_pixels(map.tile_size), Vec2::new(map.tile_size as f32, map.tile_size as f32))
                .inset(REWARD_INSET);
            if me.overlaps(&hitbox) && map.remove(tile.pos).is_some() {
                self.heal(1.0);
                report.rewards += 1;
            }
        }

        if map.collision_rects(&me, &[TileCategory::Finish]).iter().any(|cr| me.overlaps(&cr.rect)) {
            report.finished = true;
        }

        if self.air_time > phys.max_air_time {
            report.fell_out = true;
        }

        if self.body.collisions.down {
            self.air_time = 0;
            self.jumps = 1;
        }

        self.wall_slide = false;
        if self.body.collisions.horizontal() && self.air_time > AIR_GRACE {
            self.wall_slide = true;
            self.body.velocity.y = self.body.velocity.y.min(phys.slide_max);
            self.body.facing = if self.body.collisions.right { Facing::Right } else { Facing::Left };
            self.set_action(PlayerAction::WallSlide);
            // sliding does not count toward the fall-death timer
            self.air_time -= 1;
        }

        if !self.wall_slide {
            if self.air_time > AIR_GRACE {
                self.set_action(PlayerAction::Jump);
                self.idle_time = 0;
                self.reschedule_idle(rng);
            } else if movement.x != 0.0 {
                self.set_action(PlayerAction::Run);
                self.idle_time = 0;
                self.reschedule_idle(rng);
            } else if self.idle_time > self.idle_window.0 && self.idle_time < self.idle_window.1 {
                self.set_action(self.idle_flourish);
                self.idle_time += 1;
            } else {
                if self.idle_time >= self.idle_window.1 {
                    // flourish over: idle begins again
                    self.idle_time = 0;
                    self.reschedule_idle(rng);
                }
                self.set_action(PlayerAction::Idle);
                self.idle_time += 1;
            }
        }

        self.update_dash(phys, rng, particles);

        if self.idle_time > IDLE_WRAP {
            self.idle_time = 0;
        }

        // Horizontal velocity (wall kicks, dash tail) bleeds off linearly.
        let friction = 0.1 * phys.wall_jump_multiplier;
        if self.body.velocity.x > 0.0 {
            self.body.velocity.x = (self.body.velocity.x - friction).max(0.0);
        } else {
            self.body.velocity.x = (self.body.velocity.x + friction).min(0.0);
        }

        report
    }

    fn update_dash(&mut self, phys: &PhysicsConfig, rng: &mut impl Rng, particles: &mut Vec<Particle>) {
        let center = self.body.center();

        if self.dashing.abs() == DASH_FRAMES || self.dashing.abs() == DASH_FAST {
            let angle = rng.random::<f32>() * std::f32::consts::TAU;
            let speed = rng.random::<f32>() * 0.5 + 0.5;
            particles.push(Particle::boostgas(center, Vec2::from_angle(angle, speed), rng.random_range(0..=2)));
        }

        self.dashing -= self.dashing.signum();

        if self.dashing.abs() > DASH_FAST {
            let dir = self.dashing.signum() as f32;
            self.body.velocity.x = dir * 6.0 * phys.dash_multiplier;
            if self.dashing.abs() == DASH_FAST + 1 {
                // last fast frame tapers into normal movement
                self.body.velocity.x *= 0.1 * phys.dash_multiplier;
            }
            if rng.random_bool(0.5) {
                let trail = Vec2::new(-dir * rng.random::<f32>(), 0.0);
                particles.push(Particle::boostgas(center, trail, rng.random_range(0..=7)));
            }
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Abilities
    // ══════════════════════════════════════════════════════════════

    /// Wall kick if sliding and pushing into the wall, else a normal jump
    /// if a charge remains. Returns whether a jump happened.
    pub fn jump(&mut self, phys: &PhysicsConfig) -> bool {
        let m = phys.wall_jump_multiplier;
        if self.wall_slide {
            let pushing = self.body.last_movement.x;
            let kick = match self.body.facing {
                Facing::Left if pushing < 0.0 => Some(1.0),
                Facing::Right if pushing > 0.0 => Some(-1.0),
                _ => None,
            };
            if let Some(dir) = kick {
                self.body.velocity.x = dir * 3.5 * m;
                self.body.velocity.y = -2.5 * m;
                self.air_time = 5;
                self.jumps = self.jumps.saturating_sub(1);
                return true;
            }
        }
        if self.jumps > 0 {
            self.body.velocity.y = -phys.jump_speed;
            self.jumps -= 1;
            self.air_time = 5;
            return true;
        }
        false
    }

    /// Start a dash in the facing direction. No-op while already dashing
    /// or while reeling from a hit. Returns whether a dash started.
    pub fn dash(&mut self) -> bool {
        if self.dashing != 0 || self.action == PlayerAction::Hit {
            return false;
        }
        self.dashing = match self.body.facing {
            Facing::Left => -DASH_FRAMES,
            Facing::Right => DASH_FRAMES,
        };
        true
    }

    // ══════════════════════════════════════════════════════════════
    // Energy + damage
    // ══════════════════════════════════════════════════════════════

    pub fn heal(&mut self, amount: f32) {
        self.energy = (self.energy + amount).clamp(0.0, MAX_ENERGY);
    }

    /// Lose `amount` energy (floor 0) and start the blink.
    /// `source_x` picks the bounce direction: away from the source.
    pub fn take_damage(&mut self, amount: f32, source_x: Option<f32>) {
        self.energy = (self.energy - amount).clamp(0.0, MAX_ENERGY);
        self.blink = BLINK_FRAMES;
        if let Some(sx) = source_x {
            self.bounce_direction = if self.body.pos.x > sx { 1 } else { -1 };
        }
    }

    pub fn is_drained(&self) -> bool {
        self.energy <= 0.0
    }

    /// Damage pose and bounce-back; runs once per frame after `update()`.
    pub fn update_blink(&mut self, phys: &PhysicsConfig) {
        if self.blink == 0 {
            return;
        }
        self.set_action(PlayerAction::Hit);
        if phys.bounce_back {
            let x_dir = match self.bounce_direction.signum() {
                0 => -self.body.facing.sign(),
                d => d as f32,
            };
            self.body.pos.x += x_dir * self.blink as f32 / 10.0;
        }
        self.blink -= 1;
        if self.blink == 0 {
            self.bounce_direction = 0;
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Checkpoints + respawn
    // ══════════════════════════════════════════════════════════════

    /// Record every checkpoint tile the player overlaps.
    pub fn pass_checkpoints(&mut self, checkpoints: &[Vec2], tile_size: u32) {
        let me = self.rect();
        let ts = tile_size as f32;
        for &cp in checkpoints {
            if me.overlaps(&Rect::at(cp, Vec2::new(ts, ts))) && !self.passed_checkpoints.contains(&cp) {
                self.passed_checkpoints.push(cp);
            }
        }
    }

    /// Furthest-right passed checkpoint, else the level spawn.
    pub fn spawning_position(&self) -> Vec2 {
        self.passed_checkpoints
            .iter()
            .copied()
            .max_by(|a, b| a.x.total_cmp(&b.x))
            .unwrap_or(self.spawn)
    }

    /// Put the player at `pos` with fresh per-life state. Identity,
    /// skin and passed checkpoints survive.
    pub fn respawn(&mut self, pos: Vec2) {
        self.body.pos = pos;
        self.body.velocity = Vec2::ZERO;
        self.energy = MAX_ENERGY;
        self.air_time = 0;
        self.jumps = 1;
        self.wall_slide = false;
        self.dashing = 0;
        self.blink = 0;
        self.bounce_direction = 0;
        self.idle_time = 0;
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
