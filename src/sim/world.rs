/// WorldState: the complete snapshot of a running game.
///
/// ## Level aggregate
///
/// Everything that is rebuilt on level load lives in `Level`: the
/// tilemap, the player, enemies, transient effects, hazard spawners,
/// checkpoints, the level clock and the rng. `WorldState` holds what
/// survives across levels: score, lives, high score, phase, camera.
///
/// ## Camera / Viewport
///
/// World coordinates are pixels. The camera eases toward the player
/// (1/10 of the gap per frame) with a fixed look-ahead offset, and the
/// renderer reads the integer `render_scroll()`.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{GameConfig, PhysicsConfig, RulesConfig, Season};
use crate::domain::effects::Effects;
use crate::domain::enemy::Enemy;
use crate::domain::geom::{Rect, Vec2};
use crate::domain::player::Player;
use crate::domain::tilemap::Tilemap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
    /// Death counter running; the player is frozen.
    Dying,
    /// Finish line reached; transition running.
    LevelCleared,
    GameOver,
    Finale,
    Paused,
}

impl Phase {
    /// Phases in which the simulation advances.
    pub fn is_running(self) -> bool {
        matches!(self, Phase::Playing | Phase::Dying | Phase::LevelCleared)
    }
}

const CAMERA_SPEED: f32 = 10.0;
const CAMERA_OFFSET: Vec2 = Vec2::new(100.0, -20.0);

/// Camera: a viewport into the world, in pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    /// Viewport size in pixels; set by the renderer from the terminal size.
    pub view_w: f32,
    pub view_h: f32,
}

impl Camera {
    pub fn new() -> Self {
        Camera { x: 0.0, y: 0.0, view_w: 320.0, view_h: 240.0 }
    }

    fn goal(&self, target: Vec2) -> Vec2 {
        Vec2::new(
            target.x - self.view_w / 2.0 + CAMERA_OFFSET.x,
            target.y - self.view_h / 2.0 + CAMERA_OFFSET.y,
        )
    }

    /// Ease toward `target` (the player's centre).
    pub fn follow(&mut self, target: Vec2) {
        let goal = self.goal(target);
        self.x += (goal.x - self.x) / CAMERA_SPEED;
        self.y += (goal.y - self.y) / CAMERA_SPEED;
    }

    /// Jump straight to `target`. Used on level load.
    pub fn center_on(&mut self, target: Vec2) {
        let goal = self.goal(target);
        self.x = goal.x;
        self.y = goal.y;
    }

    pub fn render_scroll(&self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new()
    }
}

/// Per-level state. Replaced wholesale by `level::load_level`.
#[derive(Clone, Debug)]
pub struct Level {
    /// Index into the level catalog.
    pub index: usize,
    pub season: Season,
    pub map: Tilemap,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub effects: Effects,
    /// Fire-hole cells; fireballs launch from just above them.
    pub fire_holes: Vec<Rect>,
    /// Fire-swing hub cells; chains orbit their centres.
    pub fireswing_hubs: Vec<Rect>,
    /// Checkpoint cells (pixel top-left). Removed from the map at load.
    pub checkpoints: Vec<Vec2>,
    pub rng: ChaCha8Rng,
    /// Frames allowed on this attempt.
    pub time_limit: u32,
    pub time_remaining: u32,
    /// Death counter: 0 while alive, counts up once the player dies.
    pub dead: u32,
    /// Iris transition: negative = opening after load, positive = closing.
    pub transition: f32,
}

impl Level {
    pub fn empty(seed: u64) -> Self {
        Level {
            index: 0,
            season: Season::Summer,
            map: Tilemap::default(),
            player: Player::new(Vec2::new(70.0, 20.0)),
            enemies: Vec::new(),
            effects: Effects::default(),
            fire_holes: Vec::new(),
            fireswing_hubs: Vec::new(),
            checkpoints: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            time_limit: 0,
            time_remaining: 0,
            dead: 0,
            transition: 0.0,
        }
    }
}

pub struct WorldState {
    // ── Meta ──
    pub phase: Phase,
    /// Phase to return to when unpausing.
    resume_phase: Phase,
    pub score: u32,
    pub high_score: u32,
    pub lives: u32,
    pub tick: u64,

    // ── Level ──
    pub level: Level,

    // ── Tunables ──
    pub physics: PhysicsConfig,
    pub rules: RulesConfig,

    // ── Camera / Viewport ──
    pub camera: Camera,
}

impl WorldState {
    pub fn new(config: &GameConfig, high_score: u32, seed: u64) -> Self {
        WorldState {
            phase: Phase::Title,
            resume_phase: Phase::Title,
            score: 0,
            high_score,
            lives: config.rules.first_lives,
            tick: 0,
            level: Level::empty(seed),
            physics: config.physics.clone(),
            rules: config.rules.clone(),
            camera: Camera::new(),
        }
    }

    /// Pause a running game, or resume a paused one. Other phases ignore it.
    pub fn toggle_pause(&mut self) {
        if self.phase == Phase::Paused {
            self.phase = self.resume_phase;
        } else if self.phase.is_running() {
            self.resume_phase = self.phase;
            self.phase = Phase::Paused;
        }
    }

    /// Remaining time in whole seconds at 60 frames per second.
    pub fn seconds_remaining(&self) -> u32 {
        self.level.time_remaining.div_ceil(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_eases_toward_player() {
        let mut cam = Camera::new();
        let target = Vec2::new(500.0, 200.0);
        // goal = (500 - 160 + 100, 200 - 120 - 20) = (440, 60)
        cam.follow(target);
        assert!((cam.x - 44.0).abs() < 1e-4);
        assert!((cam.y - 6.0).abs() < 1e-4);
        for _ in 0..200 {
            cam.follow(target);
        }
        assert!((cam.x - 440.0).abs() < 0.01);
        assert!((cam.y - 60.0).abs() < 0.01);
    }

    #[test]
    fn center_on_snaps() {
        let mut cam = Camera::new();
        cam.center_on(Vec2::new(500.0, 200.0));
        assert_eq!(cam.render_scroll(), (440, 60));
    }

    #[test]
    fn pause_round_trip() {
        let mut w = WorldState::new(&GameConfig::default(), 0, 1);
        w.toggle_pause();
        assert_eq!(w.phase, Phase::Title);

        w.phase = Phase::Dying;
        w.toggle_pause();
        assert_eq!(w.phase, Phase::Paused);
        w.toggle_pause();
        assert_eq!(w.phase, Phase::Dying);
    }

    #[test]
    fn seconds_round_up() {
        let mut w = WorldState::new(&GameConfig::default(), 0, 1);
        w.level.time_remaining = 61;
        assert_eq!(w.seconds_remaining(), 2);
        w.level.time_remaining = 0;
        assert_eq!(w.seconds_remaining(), 0);
    }
}
