/// The step function: advances the world by one frame.
///
/// Processing order:
///   1. Timers (iris transition, death counter, level-cleared countdown)
///   2. Moving platforms
///   3. Hazard spawns (fireballs; fire-swing chains once per load)
///   4. Enemies (kills compacted after all have updated)
///   5. Player intents + update (skipped while dying)
///   6. Damage blink + bounce-back
///   7. Projectiles, fireballs, fire swings vs player
///   8. Sparks, particles, textmarks
///   9. Death / time-out bookkeeping, high score, camera
///
/// Only `Playing`, `Dying` and `LevelCleared` advance; every other
/// phase is driven by the front end.

use rand::Rng;
use tracing::debug;

use crate::config::GameConfig;
use crate::domain::effects::{
    cone_sparks, fire_chain, radial_sparks, update_and_compact, Lifecycle, Particle, TextMark,
};
use crate::domain::geom::Vec2;
use crate::domain::player::FrameInput;
use super::event::GameEvent;
use super::level;
use super::world::{Level, Phase, WorldState};

const DYING_FRAMES: u32 = 40;
const CLEARED_TRANSITION_END: f32 = 40.0;
const FOOD_SCORE: u32 = 5;
const PROJECTILE_DAMAGE: f32 = 5.0;
const FIREBALL_DAMAGE: f32 = 3.0;
const FIRESWING_DAMAGE: f32 = 0.5;
/// Fireballs launched further than this from the player are silent.
const FIREBALL_EARSHOT: f32 = 500.0;
/// A fireball appears this far above its hole.
const FIREBALL_LIFT: f32 = 13.0;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, config: &GameConfig, input: FrameInput) -> Vec<GameEvent> {
    if !world.phase.is_running() { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if resolve_timers(world, config, &mut events) { return events; }

    world.level.map.advance_moving_platforms();
    spawn_hazards(world, &mut events);
    update_enemies(world, &mut events);

    let mut fell_out = false;
    if world.phase != Phase::Dying {
        fell_out = update_player(world, input, &mut events);
        world.level.player.update_blink(&world.physics);
    }

    resolve_hazard_contact(world, &mut events);
    world.level.effects.update_cosmetic();
    resolve_bookkeeping(world, fell_out, &mut events);

    world.camera.follow(world.level.player.body.center());
    events
}

// ══════════════════════════════════════════════════════════════
// Timers
// ══════════════════════════════════════════════════════════════

/// Returns true when this frame ended in a level change or a terminal phase.
fn resolve_timers(world: &mut WorldState, config: &GameConfig, events: &mut Vec<GameEvent>) -> bool {
    match world.phase {
        Phase::Dying => {
            world.level.dead += 1;
            if world.level.dead >= 10 {
                world.level.transition = (world.level.transition + 1.0).min(30.0);
            }
            if world.level.dead > DYING_FRAMES {
                world.lives = world.lives.saturating_sub(1);
                if world.lives == 0 {
                    debug!("game over on level {}", world.level.index);
                    world.phase = Phase::GameOver;
                    events.push(GameEvent::GameOver);
                } else {
                    let index = world.level.index;
                    level::load_level(world, index, config, true);
                    world.phase = Phase::Playing;
                    events.push(GameEvent::LevelLoaded { index });
                }
                return true;
            }
        }
        Phase::LevelCleared => {
            world.level.transition += 0.5;
            if world.level.transition > CLEARED_TRANSITION_END {
                let next = world.level.index + 1;
                if next >= config.levels.len() {
                    debug!("last level cleared");
                    world.phase = Phase::Finale;
                    events.push(GameEvent::Finale);
                } else {
                    debug!("advancing to level {next}");
                    level::load_level(world, next, config, false);
                    world.phase = Phase::Playing;
                    events.push(GameEvent::LevelLoaded { index: next });
                }
                return true;
            }
        }
        _ => {
            if world.level.transition < 0.0 {
                world.level.transition += 1.0;
            }
        }
    }
    false
}

// ══════════════════════════════════════════════════════════════
// Hazards
// ══════════════════════════════════════════════════════════════

fn spawn_hazards(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let rules = &world.rules;
    let level = &mut world.level;
    let player_x = level.player.body.pos.x;
    let chance = rules.fireball_probability.clamp(0.0, 1.0);

    for hole in &level.fire_holes {
        if level.rng.random_bool(chance) {
            let pos = Vec2::new(hole.center().x, hole.y - FIREBALL_LIFT);
            level.effects.fireballs.push(Particle::fireball(pos));
            events.push(GameEvent::FireballLaunched {
                near: (player_x - pos.x).abs() < FIREBALL_EARSHOT,
            });
        }
    }

    if level.effects.fireswings.is_empty() {
        for hub in &level.fireswing_hubs {
            let chain = fire_chain(hub.center(), rules.fireswing_length, rules.fireswing_unit, &mut level.rng);
            level.effects.fireswings.extend(chain);
        }
    }
}

fn resolve_hazard_contact(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let exposed = world.phase != Phase::Dying;
    let Level { map, player, effects, rng, .. } = &mut world.level;
    let mut hit = false;
    let mut sparks = Vec::new();

    update_and_compact(&mut effects.projectiles, |p| {
        p.advance();
        if map.solid_at(p.pos).is_some() {
            sparks.extend(cone_sparks(p.pos, 4, p.speed > 0.0, rng));
            Lifecycle::Remove
        } else if p.expired() {
            Lifecycle::Remove
        } else if exposed && !player.is_fast_dashing() && player.rect().contains(p.pos) {
            player.take_damage(PROJECTILE_DAMAGE, Some(p.pos.x - p.speed));
            sparks.extend(
                radial_sparks(player.rect().center(), 6, 1.0, rng)
                    .into_iter()
                    .map(|s| s.sized((1, 8))),
            );
            hit = true;
            Lifecycle::Remove
        } else {
            Lifecycle::Alive
        }
    });

    update_and_compact(&mut effects.fireballs, |f| {
        if exposed && player.rect().contains(f.pos) {
            player.take_damage(FIREBALL_DAMAGE, None);
            hit = true;
        }
        f.update()
    });

    update_and_compact(&mut effects.fireswings, |ball| {
        if exposed && player.rect().contains(ball.pos) {
            player.take_damage(FIRESWING_DAMAGE, None);
            hit = true;
        }
        ball.update()
    });

    effects.sparks.extend(sparks);
    if hit {
        events.push(GameEvent::HitByFire);
    }
}

// ══════════════════════════════════════════════════════════════
// Entities
// ══════════════════════════════════════════════════════════════

fn update_enemies(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let armed = world.phase == Phase::Playing;
    let phys = &world.physics;
    let Level { map, player, enemies, effects, rng, .. } = &mut world.level;
    let map = &*map;
    let mut gained = 0;
    let mut touched = false;

    update_and_compact(enemies, |enemy| {
        let report = enemy.update(map, player, phys, rng, effects, armed);
        if report.shot {
            events.push(GameEvent::EnemyShot);
        }
        if report.hit_player {
            touched = true;
        }
        if report.killed() {
            let score = enemy.kind.spec().score;
            gained += score;
            events.push(GameEvent::EnemyKilled { score });
        }
        report.lifecycle
    });

    world.score += gained;
    if touched {
        events.push(GameEvent::HitByEnemy);
    }
}

/// Intents, movement, rewards, finish line and checkpoints.
/// Returns whether the player fell out of the world.
fn update_player(world: &mut WorldState, input: FrameInput, events: &mut Vec<GameEvent>) -> bool {
    let phys = &world.physics;
    let Level { map, player, effects, rng, checkpoints, .. } = &mut world.level;

    if input.jump && player.jump(phys) {
        events.push(GameEvent::Jumped);
    }
    if input.dash && player.dash() {
        events.push(GameEvent::Dashed);
    }

    let report = player.update(map, input.movement(phys), phys, rng, &mut effects.particles);

    for _ in 0..report.rewards {
        world.score += FOOD_SCORE;
        effects.textmarks.push(TextMark::new(player.rect().pos(), FOOD_SCORE.to_string()));
        events.push(GameEvent::RewardCollected);
    }

    player.pass_checkpoints(checkpoints, map.tile_size);

    if report.finished && world.phase == Phase::Playing {
        debug!("level {} cleared", world.level.index);
        world.phase = Phase::LevelCleared;
        events.push(GameEvent::LevelCleared);
    }

    report.fell_out
}

// ══════════════════════════════════════════════════════════════
// Bookkeeping
// ══════════════════════════════════════════════════════════════

fn resolve_bookkeeping(world: &mut WorldState, fell_out: bool, events: &mut Vec<GameEvent>) {
    if world.phase == Phase::Playing {
        world.level.time_remaining = world.level.time_remaining.saturating_sub(1);
        if fell_out || world.level.player.is_drained() || world.level.time_remaining == 0 {
            player_die(world, events);
        }
    }

    if world.score > world.high_score {
        world.high_score = world.score;
        events.push(GameEvent::NewHighScore(world.score));
    }
}

fn player_die(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    debug!(
        "player died on level {} (energy {:.1}, {} frames left)",
        world.level.index, world.level.player.energy, world.level.time_remaining,
    );
    world.phase = Phase::Dying;
    world.level.dead = 1;
    events.push(GameEvent::PlayerDied);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LevelEntry, Season};
    use crate::domain::effects::Projectile;
    use crate::domain::player::MAX_ENERGY;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Write each level's rows to a temp dir and start playing level 0.
    fn playing(levels: &[&[&str]]) -> (WorldState, GameConfig, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GameConfig::default();
        config.levels_dir = dir.path().to_path_buf();
        config.levels = Vec::new();
        for (i, rows) in levels.iter().enumerate() {
            let name = format!("{i}.json");
            level::map_from_rows(rows).save(&dir.path().join(&name)).unwrap();
            config.levels.push(LevelEntry { map: PathBuf::from(name), season: Season::Summer, time_limit_frames: None });
        }
        let mut world = WorldState::new(&config, 0, 11);
        level::load_level(&mut world, 0, &config, false);
        world.phase = Phase::Playing;
        (world, config, dir)
    }

    fn run(world: &mut WorldState, config: &GameConfig, input: FrameInput, frames: usize) -> Vec<GameEvent> {
        let mut all = Vec::new();
        for _ in 0..frames {
            all.extend(step(world, config, input));
        }
        all
    }

    const FLOOR: &str = "##############################";

    fn right() -> FrameInput {
        FrameInput { right: true, ..FrameInput::default() }
    }

    #[test]
    fn idle_level_only_ticks_the_clock() {
        let (mut world, config, _dir) = playing(&[&["", "P", "", FLOOR]]);
        let start = world.level.time_remaining;
        let events = run(&mut world, &config, FrameInput::default(), 60);
        assert!(events.is_empty(), "{events:?}");
        assert_eq!(world.phase, Phase::Playing);
        assert_eq!(world.level.time_remaining, start - 60);
        assert_eq!(world.level.player.body.pos.y, 48.0 - 22.0);
        assert_eq!(world.level.transition, 0.0);
    }

    #[test]
    fn paused_world_is_frozen() {
        let (mut world, config, _dir) = playing(&[&["", "P", "", FLOOR]]);
        world.toggle_pause();
        let before = (world.tick, world.level.time_remaining, world.level.player.body.pos);
        assert!(run(&mut world, &config, right(), 10).is_empty());
        assert_eq!((world.tick, world.level.time_remaining, world.level.player.body.pos), before);
        world.toggle_pause();
        assert_eq!(world.phase, Phase::Playing);
    }

    #[test]
    fn food_scores_and_floats_text() {
        let (mut world, config, _dir) = playing(&[&["", "P  f", "", FLOOR]]);
        let events = run(&mut world, &config, right(), 60);
        assert_eq!(events.iter().filter(|e| **e == GameEvent::RewardCollected).count(), 1);
        assert!(events.contains(&GameEvent::NewHighScore(5)));
        assert_eq!(world.score, 5);
        assert_eq!(world.high_score, 5);
        assert!(world.level.map.get(crate::domain::tile::GridPos(3, 1)).is_none());
    }

    #[test]
    fn finish_line_advances_to_next_level() {
        let (mut world, config, _dir) = playing(&[
            &["", "P  F", "", FLOOR],
            &["", "", "P", "", FLOOR],
        ]);
        let events = run(&mut world, &config, right(), 45);
        assert!(events.contains(&GameEvent::LevelCleared));
        assert_eq!(world.phase, Phase::LevelCleared);

        let events = run(&mut world, &config, FrameInput::default(), 200);
        assert!(events.contains(&GameEvent::LevelLoaded { index: 1 }));
        assert_eq!(world.level.index, 1);
        assert_eq!(world.phase, Phase::Playing);
    }

    #[test]
    fn last_level_leads_to_finale() {
        let (mut world, config, _dir) = playing(&[&["", "P  F", "", FLOOR]]);
        let events = run(&mut world, &config, right(), 300);
        assert!(events.contains(&GameEvent::Finale));
        assert_eq!(world.phase, Phase::Finale);
        assert!(step(&mut world, &config, right()).is_empty());
    }

    #[test]
    fn falling_out_costs_a_life_and_reloads() {
        let (mut world, config, _dir) = playing(&[&["P"]]);
        let events = run(&mut world, &config, FrameInput::default(), 141);
        assert_eq!(events, vec![GameEvent::PlayerDied]);
        assert_eq!(world.phase, Phase::Dying);

        let events = run(&mut world, &config, FrameInput::default(), DYING_FRAMES as usize - 1);
        assert!(events.is_empty());
        let events = step(&mut world, &config, FrameInput::default());
        assert_eq!(events, vec![GameEvent::LevelLoaded { index: 0 }]);
        assert_eq!(world.lives, config.rules.first_lives - 1);
        assert_eq!(world.phase, Phase::Playing);
        assert_eq!(world.level.player.energy, MAX_ENERGY);
    }

    #[test]
    fn last_life_is_game_over() {
        let (mut world, config, _dir) = playing(&[&["P"]]);
        world.lives = 1;
        let events = run(&mut world, &config, FrameInput::default(), 200);
        assert!(events.contains(&GameEvent::GameOver));
        assert_eq!(world.phase, Phase::GameOver);
        assert_eq!(world.lives, 0);
    }

    #[test]
    fn running_out_of_time_kills() {
        let (mut world, config, _dir) = playing(&[&["", "P", "", FLOOR]]);
        world.level.time_remaining = 2;
        assert!(step(&mut world, &config, FrameInput::default()).is_empty());
        assert_eq!(step(&mut world, &config, FrameInput::default()), vec![GameEvent::PlayerDied]);
    }

    #[test]
    fn retry_after_time_out_gets_extra_time() {
        let (mut world, config, _dir) = playing(&[&["", "P", "", FLOOR]]);
        world.level.time_remaining = 1;
        // one frame to die, then the death counter
        run(&mut world, &config, FrameInput::default(), 1 + DYING_FRAMES as usize);
        assert_eq!(world.phase, Phase::Playing);
        assert_eq!(world.level.time_remaining, config.rules.extra_frames_after_death);
    }

    #[test]
    fn drained_energy_kills() {
        let (mut world, config, _dir) = playing(&[&["", "P", "", FLOOR]]);
        world.level.player.energy = 0.0;
        let events = step(&mut world, &config, FrameInput::default());
        assert_eq!(events, vec![GameEvent::PlayerDied]);
    }

    #[test]
    fn projectile_hits_player() {
        let (mut world, config, _dir) = playing(&[&["", "P", "", FLOOR]]);
        run(&mut world, &config, FrameInput::default(), 30);
        let c = world.level.player.body.center();
        world.level.effects.projectiles.push(Projectile::new(Vec2::new(c.x - 1.0, c.y), false));

        let events = step(&mut world, &config, FrameInput::default());
        assert_eq!(events, vec![GameEvent::HitByFire]);
        assert!(world.level.effects.projectiles.is_empty());
        assert_eq!(world.level.player.energy, MAX_ENERGY - 5.0);
        assert_eq!(world.level.effects.sparks.len(), 6);
    }

    #[test]
    fn dashing_player_ignores_projectiles() {
        let (mut world, config, _dir) = playing(&[&["", "P", "", FLOOR]]);
        run(&mut world, &config, FrameInput::default(), 30);
        world.level.player.dashing = 55;
        let c = world.level.player.body.center();
        world.level.effects.projectiles.push(Projectile::new(Vec2::new(c.x + 200.0, c.y), true));
        world.level.player.body.pos.x = c.x + 200.0 - 6.0;

        step(&mut world, &config, FrameInput::default());
        assert_eq!(world.level.player.energy, MAX_ENERGY);
    }

    #[test]
    fn projectile_stops_at_wall() {
        let (mut world, config, _dir) = playing(&[&["", "P", "", FLOOR]]);
        world.level.effects.projectiles.push(Projectile::new(Vec2::new(200.0, 50.0), false));
        step(&mut world, &config, FrameInput::default());
        assert!(world.level.effects.projectiles.is_empty());
        assert_eq!(world.level.effects.sparks.len(), 4);
    }

    #[test]
    fn dash_kills_enemy_for_score() {
        let (mut world, config, _dir) = playing(&[&["", "P   1", "", FLOOR]]);
        let mut events = step(&mut world, &config, FrameInput { dash: true, ..FrameInput::default() });
        assert!(events.contains(&GameEvent::Dashed));
        events.extend(run(&mut world, &config, FrameInput::default(), 5));
        assert!(events.contains(&GameEvent::EnemyKilled { score: 30 }));
        assert!(world.level.enemies.is_empty());
        assert_eq!(world.score, 30);
        assert_eq!(world.level.effects.textmarks[0].text, "30");
    }

    #[test]
    fn fire_swings_built_once() {
        let (mut world, config, _dir) = playing(&[&["", "P      s", "", FLOOR]]);
        step(&mut world, &config, FrameInput::default());
        assert_eq!(world.level.effects.fireswings.len(), config.rules.fireswing_length);
        step(&mut world, &config, FrameInput::default());
        assert_eq!(world.level.effects.fireswings.len(), config.rules.fireswing_length);
        // all balls of a chain share one phase
        let theta = world.level.effects.fireswings[0].theta;
        assert!(world.level.effects.fireswings.iter().all(|b| b.theta == theta));
    }

    #[test]
    fn fire_holes_launch_fireballs() {
        let (mut world, mut config, _dir) = playing(&[&["", "P      o", "", FLOOR]]);
        config.rules.fireball_probability = 1.0;
        world.rules.fireball_probability = 1.0;
        let events = step(&mut world, &config, FrameInput::default());
        assert!(events.contains(&GameEvent::FireballLaunched { near: true }));
        assert_eq!(world.level.effects.fireballs.len(), 1);
        assert!(world.level.effects.fireballs[0].pos.y < 16.0);
    }

    #[test]
    fn checkpoint_respawn() {
        let (mut world, config, _dir) = playing(&[&["", "P   c", "", FLOOR]]);
        run(&mut world, &config, right(), 70);
        assert_eq!(world.level.player.passed_checkpoints, vec![Vec2::new(64.0, 16.0)]);

        world.level.player.energy = 0.0;
        run(&mut world, &config, FrameInput::default(), 1 + DYING_FRAMES as usize);
        assert_eq!(world.phase, Phase::Playing);
        assert_eq!(world.level.player.body.pos, Vec2::new(64.0, 16.0));
    }
}
