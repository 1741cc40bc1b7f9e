/// Entry point and game loop.

mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bailey::config::GameConfig;
use bailey::sim::event::GameEvent;
use bailey::sim::level::start_game;
use bailey::sim::save;
use bailey::sim::step::step;
use bailey::sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{InputState, Intents, KEYS_CONFIRM, KEYS_PAUSE, KEYS_QUIT};
use ui::renderer::Renderer;
use ui::sound::{play_events, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "bailey.log";

fn main() {
    init_logging();

    let config = GameConfig::load();
    let high_score = save::load_high_score(&config.highscore_path);
    let mut world = WorldState::new(&config, high_score, seed_from_clock());
    info!("{} levels in catalog, high score {high_score}", config.levels.len());

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        warn!("terminal init failed: {e}");
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        warn!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Bailey's Adventure!");
    println!("Final Score: {}   High Score: {}", world.score, world.high_score);
}

/// Log to a file so the terminal UI stays clean. Filter from RUST_LOG.
fn init_logging() {
    let Ok(file) = File::create(LOG_FILE) else { return };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new(&config.gamepad);
    let mut intents = Intents::default();
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.rules.tick_rate_ms);

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, config, sound, &kb, &gp, &mut intents) {
            break;
        }
        if world.phase.is_running() {
            intents.observe(&kb, &gp);
        }

        if last_tick.elapsed() >= tick_rate {
            if world.phase.is_running() {
                let input = intents.take_frame_input(&kb, &gp);
                let events = step(world, config, input);
                process_events(config, sound, &events);
            }
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_events(config: &GameConfig, sound: Option<&SoundEngine>, events: &[GameEvent]) {
    play_events(sound, events);

    // Only the last high score of the step needs to hit the disk.
    let best = events.iter().rev().find_map(|e| match e {
        GameEvent::NewHighScore(score) => Some(*score),
        _ => None,
    });
    if let Some(score) = best {
        if let Err(e) = save::save_high_score(&config.highscore_path, score) {
            warn!("could not save high score to {}: {e}", config.highscore_path.display());
        }
    }
}

/// Phase changes driven by the player. Returns true to quit.
fn handle_meta(
    world: &mut WorldState,
    config: &GameConfig,
    sound: Option<&SoundEngine>,
    kb: &InputState,
    gp: &GamepadState,
    intents: &mut Intents,
) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let quit = kb.any_pressed(KEYS_QUIT) || gp.cancel_pressed();

    match world.phase {
        // ── Title Screen ──
        Phase::Title => {
            if quit {
                return true;
            }
            if confirm || kb.anything_pressed() {
                intents.clear();
                let events = start_game(world, config);
                process_events(config, sound, &events);
            }
        }

        // ── In game ──
        Phase::Playing | Phase::Dying | Phase::LevelCleared | Phase::Paused => {
            if quit {
                world.phase = Phase::Title;
                intents.clear();
            } else if kb.any_pressed(KEYS_PAUSE) || gp.confirm_pressed() {
                world.toggle_pause();
                intents.clear();
            }
        }

        // ── Game Over / Finale ──
        Phase::GameOver | Phase::Finale => {
            if quit {
                world.phase = Phase::Title;
            } else if confirm {
                intents.clear();
                let events = start_game(world, config);
                process_events(config, sound, &events);
            }
        }
    }

    false
}
