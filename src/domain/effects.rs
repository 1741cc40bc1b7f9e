/// Transient effects: projectiles, particles, sparks, floating text and
/// fire-swing balls. Each is self-contained kinematics; `update()` reports
/// whether the owner should drop it.
///
/// Owners never remove while iterating: `update_and_compact` runs every
/// update first, then drops everything that asked for removal in one pass.

use std::f32::consts::{PI, TAU};

use rand::Rng;

use super::animation::{clip, Animation};
use super::geom::Vec2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Lifecycle {
    Alive,
    Remove,
}

/// Update every item, then compact out the ones that returned `Remove`.
pub fn update_and_compact<T>(items: &mut Vec<T>, mut update: impl FnMut(&mut T) -> Lifecycle) {
    let verdicts: Vec<Lifecycle> = items.iter_mut().map(&mut update).collect();
    let mut verdicts = verdicts.into_iter();
    items.retain(|_| verdicts.next() != Some(Lifecycle::Remove));
}

// ══════════════════════════════════════════════════════════════
// Spark
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Spark {
    pub pos: Vec2,
    pub angle: f32,
    pub speed: f32,
    /// Min/max drawn radius.
    pub size: (u8, u8),
}

impl Spark {
    pub fn new(pos: Vec2, angle: f32, speed: f32) -> Self {
        Spark { pos, angle, speed, size: (1, 3) }
    }

    pub fn sized(mut self, size: (u8, u8)) -> Self {
        self.size = size;
        self
    }

    pub fn update(&mut self) -> Lifecycle {
        self.pos += Vec2::from_angle(self.angle, self.speed);
        self.speed = (self.speed - 0.1).max(0.0);
        if self.speed == 0.0 { Lifecycle::Remove } else { Lifecycle::Alive }
    }
}

/// Sparks flying out in every direction.
pub fn radial_sparks(pos: Vec2, count: usize, base_speed: f32, rng: &mut impl Rng) -> Vec<Spark> {
    (0..count)
        .map(|_| {
            let angle = rng.random::<f32>() * TAU;
            Spark::new(pos, angle, base_speed + rng.random::<f32>())
        })
        .collect()
}

/// Sparks sprayed in a ~1 rad cone, to the right or (if `leftward`) to the left.
pub fn cone_sparks(pos: Vec2, count: usize, leftward: bool, rng: &mut impl Rng) -> Vec<Spark> {
    (0..count)
        .map(|_| {
            let angle = rng.random::<f32>() - 0.5 + if leftward { PI } else { 0.0 };
            Spark::new(pos, angle, 2.0 + rng.random::<f32>())
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// TextMark
// ══════════════════════════════════════════════════════════════

/// Floating text that rises and slows to a stop.
#[derive(Clone, Debug, PartialEq)]
pub struct TextMark {
    pub pos: Vec2,
    pub text: String,
    pub speed: f32,
}

impl TextMark {
    pub fn new(pos: Vec2, text: impl Into<String>) -> Self {
        TextMark { pos, text: text.into(), speed: 3.0 }
    }

    pub fn update(&mut self) -> Lifecycle {
        self.pos.y -= self.speed;
        self.speed = (self.speed - 0.1).max(0.0);
        if self.speed == 0.0 { Lifecycle::Remove } else { Lifecycle::Alive }
    }
}

// ══════════════════════════════════════════════════════════════
// Particle
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParticleKind {
    BoostGas,
    Fireball,
}

impl ParticleKind {
    pub fn clip_key(self) -> &'static str {
        match self {
            ParticleKind::BoostGas => "particle/boostgas",
            ParticleKind::Fireball => "particle/fireball",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub kind: ParticleKind,
    pub pos: Vec2,
    initial_pos: Vec2,
    pub velocity: Vec2,
    pub anim: Animation,
    /// Falls under gravity and dies below its launch height.
    freefalling: bool,
    pub flip_y: bool,
}

impl Particle {
    pub fn boostgas(pos: Vec2, velocity: Vec2, start_frame: u32) -> Self {
        let kind = ParticleKind::BoostGas;
        Particle {
            kind,
            pos,
            initial_pos: pos,
            velocity,
            anim: Animation::starting_at(clip(kind.clip_key()), start_frame),
            freefalling: false,
            flip_y: false,
        }
    }

    /// A fireball launched straight up out of a fire hole.
    pub fn fireball(pos: Vec2) -> Self {
        let kind = ParticleKind::Fireball;
        Particle {
            kind,
            pos,
            initial_pos: pos,
            velocity: Vec2::new(0.0, -6.0),
            anim: Animation::for_key(kind.clip_key()),
            freefalling: true,
            flip_y: false,
        }
    }

    pub fn update(&mut self) -> Lifecycle {
        let mut verdict = if self.anim.done { Lifecycle::Remove } else { Lifecycle::Alive };

        self.pos += self.velocity;

        if self.freefalling {
            self.velocity.y += 0.1;
            if self.velocity.y > 0.0 {
                self.flip_y = true;
            }
            if self.velocity.y > 10.0 || self.pos.y > self.initial_pos.y {
                verdict = Lifecycle::Remove;
            }
        }

        self.anim.update();
        verdict
    }
}

// ══════════════════════════════════════════════════════════════
// Projectile
// ══════════════════════════════════════════════════════════════

pub const PROJECTILE_SPEED: f32 = 1.5;
pub const PROJECTILE_LIFETIME: u32 = 300;

/// A squirrel's shot. Collision with walls and the player is resolved by
/// the level step, which owns both.
#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub pos: Vec2,
    /// Signed horizontal speed; the sign is the travel direction.
    pub speed: f32,
    pub timer: u32,
}

impl Projectile {
    pub fn new(pos: Vec2, leftward: bool) -> Self {
        let speed = if leftward { -PROJECTILE_SPEED } else { PROJECTILE_SPEED };
        Projectile { pos, speed, timer: 0 }
    }

    pub fn advance(&mut self) {
        self.pos.x += self.speed;
        self.timer += 1;
    }

    pub fn expired(&self) -> bool {
        self.timer > PROJECTILE_LIFETIME
    }
}

// ══════════════════════════════════════════════════════════════
// Fire swing
// ══════════════════════════════════════════════════════════════

/// One ball of a fire chain orbiting its hub at a fixed radius.
/// Angles are in half-turns (`theta = 1.0` is π radians).
#[derive(Clone, Debug, PartialEq)]
pub struct FireSwingBall {
    pub center: Vec2,
    pub radius: f32,
    pub theta: f32,
    pub omega: f32,
    pub pos: Vec2,
    pub anim: Animation,
}

impl FireSwingBall {
    pub fn new(center: Vec2, radius: f32, theta: f32, omega: f32) -> Self {
        let mut ball = FireSwingBall {
            center,
            radius,
            theta,
            omega,
            pos: center,
            anim: Animation::for_key("particle/fireswing"),
        };
        ball.place();
        ball
    }

    fn place(&mut self) {
        self.pos = self.center + Vec2::from_angle(self.theta * PI, self.radius);
    }

    pub fn update(&mut self) -> Lifecycle {
        self.theta = (self.theta + self.omega) % 2.0;
        self.place();
        self.anim.update();
        Lifecycle::Alive
    }
}

/// A whole chain for one hub: `length` balls sharing phase and speed.
pub fn fire_chain(hub: Vec2, length: usize, unit: f32, rng: &mut impl Rng) -> Vec<FireSwingBall> {
    let theta = rng.random::<f32>() * 2.0;
    let magnitude = rng.random_range(8u32..12) as f32 * 0.001;
    let omega = if rng.random_bool(0.5) { -magnitude } else { magnitude };
    (0..length)
        .map(|i| FireSwingBall::new(hub, i as f32 * unit, theta, omega))
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Per-level collections
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct Effects {
    pub projectiles: Vec<Projectile>,
    pub fireballs: Vec<Particle>,
    pub fireswings: Vec<FireSwingBall>,
    pub particles: Vec<Particle>,
    pub sparks: Vec<Spark>,
    pub textmarks: Vec<TextMark>,
}

impl Effects {
    /// Advance the purely cosmetic effects (no player interaction).
    pub fn update_cosmetic(&mut self) {
        update_and_compact(&mut self.sparks, Spark::update);
        update_and_compact(&mut self.particles, Particle::update);
        update_and_compact(&mut self.textmarks, TextMark::update);
    }
}
