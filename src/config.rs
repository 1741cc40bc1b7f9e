/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    pub levels: Vec<LevelEntry>,
    pub levels_dir: PathBuf,
    pub highscore_path: PathBuf,
    pub first_level: usize,
}

/// Per-frame movement tunables shared by every physics body.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub falling_max: f32,
    pub falling_delta: f32,
    pub walk_speed: f32,
    pub run_speed: f32,
    pub slide_max: f32,
    pub jump_speed: f32,
    pub dash_multiplier: f32,    // larger = faster and shorter dash taper
    pub wall_jump_multiplier: f32,
    pub max_air_time: u32,       // frames airborne before the fall counts as death
    pub bounce_back: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RulesConfig {
    pub first_lives: u32,
    pub time_limit_frames: u32,
    pub extra_frames_after_death: u32,
    pub fireball_probability: f64,
    pub fireswing_length: usize,
    pub fireswing_unit: f32,
    pub tick_rate_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub dash: Vec<String>,
    pub run: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

/// Visual theme of a level. Also selects the player's skin.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Tropic,
}

impl Season {
    pub fn from_name(s: &str) -> Option<Season> {
        match s.to_lowercase().as_str() {
            "summer" => Some(Season::Summer),
            "autumn" => Some(Season::Autumn),
            "winter" => Some(Season::Winter),
            "tropic" => Some(Season::Tropic),
            _ => None,
        }
    }
}

/// One entry of the level catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelEntry {
    /// Map file, relative to `levels_dir` unless absolute.
    pub map: PathBuf,
    pub season: Season,
    /// Overrides `rules.time_limit_frames` for this level.
    pub time_limit_frames: Option<u32>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    levels: Vec<TomlLevel>,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_falling_max")]
    falling_max: f32,
    #[serde(default = "default_falling_delta")]
    falling_delta: f32,
    #[serde(default = "default_walk_speed")]
    walk_speed: f32,
    #[serde(default = "default_run_speed")]
    run_speed: f32,
    #[serde(default = "default_slide_max")]
    slide_max: f32,
    #[serde(default = "default_jump_speed")]
    jump_speed: f32,
    #[serde(default = "default_dash_multiplier")]
    dash_multiplier: f32,
    #[serde(default = "default_wall_jump_multiplier")]
    wall_jump_multiplier: f32,
    #[serde(default = "default_max_air_time")]
    max_air_time: u32,
    #[serde(default = "default_bounce_back")]
    bounce_back: bool,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_first_lives")]
    first_lives: u32,
    #[serde(default = "default_time_limit")]
    time_limit_frames: u32,
    #[serde(default = "default_extra_after_death")]
    extra_frames_after_death: u32,
    #[serde(default = "default_fireball_probability")]
    fireball_probability: f64,
    #[serde(default = "default_fireswing_length")]
    fireswing_length: usize,
    #[serde(default = "default_fireswing_unit")]
    fireswing_unit: f32,
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_jump")]
    jump: Vec<String>,
    #[serde(default = "default_pad_dash")]
    dash: Vec<String>,
    #[serde(default = "default_pad_run")]
    run: Vec<String>,
    #[serde(default = "default_pad_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_pad_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_highscore_file")]
    highscore_file: String,
    #[serde(default = "default_first_level")]
    first_level: usize,
}

#[derive(Deserialize, Debug)]
struct TomlLevel {
    map: String,
    #[serde(default = "default_season")]
    season: String,
    #[serde(default)]
    time_limit_frames: Option<u32>,
}

// ── Defaults ──

fn default_falling_max() -> f32 { 7.0 }
fn default_falling_delta() -> f32 { 0.1 }
fn default_walk_speed() -> f32 { 1.0 }
fn default_run_speed() -> f32 { 2.0 }
fn default_slide_max() -> f32 { 0.5 }
fn default_jump_speed() -> f32 { 3.2 }
fn default_dash_multiplier() -> f32 { 6.0 }
fn default_wall_jump_multiplier() -> f32 { 1.0 }
fn default_max_air_time() -> u32 { 140 }
fn default_bounce_back() -> bool { true }

fn default_first_lives() -> u32 { 4 }         // first player + 3 spare heads
fn default_time_limit() -> u32 { 7200 }       // 120s at 60 fps
fn default_extra_after_death() -> u32 { 900 } // 15s second chance
fn default_fireball_probability() -> f64 { 0.002 }
fn default_fireswing_length() -> usize { 8 }
fn default_fireswing_unit() -> f32 { 6.0 }
fn default_tick_rate() -> u64 { 16 }

fn default_pad_jump() -> Vec<String> { vec!["A".into(), "DPadUp".into()] }
fn default_pad_dash() -> Vec<String> { vec!["X".into(), "R1".into()] }
fn default_pad_run() -> Vec<String> { vec!["B".into(), "L1".into()] }
fn default_pad_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_pad_cancel() -> Vec<String> { vec!["Select".into()] }

fn default_levels_dir() -> String { "levels".into() }
fn default_highscore_file() -> String { "score_highest.dat".into() }
fn default_first_level() -> usize { 1 }
fn default_season() -> String { "summer".into() }

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            falling_max: default_falling_max(),
            falling_delta: default_falling_delta(),
            walk_speed: default_walk_speed(),
            run_speed: default_run_speed(),
            slide_max: default_slide_max(),
            jump_speed: default_jump_speed(),
            dash_multiplier: default_dash_multiplier(),
            wall_jump_multiplier: default_wall_jump_multiplier(),
            max_air_time: default_max_air_time(),
            bounce_back: default_bounce_back(),
        }
    }
}

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            first_lives: default_first_lives(),
            time_limit_frames: default_time_limit(),
            extra_frames_after_death: default_extra_after_death(),
            fireball_probability: default_fireball_probability(),
            fireswing_length: default_fireswing_length(),
            fireswing_unit: default_fireswing_unit(),
            tick_rate_ms: default_tick_rate(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_pad_jump(),
            dash: default_pad_dash(),
            run: default_pad_run(),
            confirm: default_pad_confirm(),
            cancel: default_pad_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            highscore_file: default_highscore_file(),
            first_level: default_first_level(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        TomlPhysics::default().into()
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        TomlRules::default().into()
    }
}

impl From<TomlPhysics> for PhysicsConfig {
    fn from(t: TomlPhysics) -> Self {
        PhysicsConfig {
            falling_max: t.falling_max,
            falling_delta: t.falling_delta,
            walk_speed: t.walk_speed,
            run_speed: t.run_speed,
            slide_max: t.slide_max,
            jump_speed: t.jump_speed,
            dash_multiplier: t.dash_multiplier,
            wall_jump_multiplier: t.wall_jump_multiplier,
            max_air_time: t.max_air_time,
            bounce_back: t.bounce_back,
        }
    }
}

impl From<TomlRules> for RulesConfig {
    fn from(t: TomlRules) -> Self {
        RulesConfig {
            first_lives: t.first_lives,
            time_limit_frames: t.time_limit_frames,
            extra_frames_after_death: t.extra_frames_after_death,
            fireball_probability: t.fireball_probability,
            fireswing_length: t.fireswing_length,
            fireswing_unit: t.fireswing_unit,
            tick_rate_ms: t.tick_rate_ms,
        }
    }
}

/// Built-in catalog: level 0 is the tutorial, 1..=8 the campaign.
pub fn builtin_levels() -> Vec<LevelEntry> {
    let seasons = [
        Season::Summer, Season::Summer, Season::Summer,
        Season::Autumn, Season::Autumn,
        Season::Winter, Season::Winter,
        Season::Tropic, Season::Tropic,
    ];
    seasons.iter().enumerate()
        .map(|(i, &season)| LevelEntry {
            map: PathBuf::from(format!("{i}.json")),
            season,
            time_limit_frames: None,
        })
        .collect()
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Parse a config from TOML text. Unparseable text yields the defaults.
    pub fn from_toml_str(text: &str) -> Self {
        let toml_cfg = match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("config.toml parse error: {e}; using default settings");
                TomlConfig::default()
            }
        };
        Self::resolve(toml_cfg, &[PathBuf::from(".")])
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir = resolve_dir(&toml_cfg.general.levels_dir, search_dirs);

        let levels = if toml_cfg.levels.is_empty() {
            builtin_levels()
        } else {
            toml_cfg.levels.into_iter()
                .map(|l| LevelEntry {
                    season: Season::from_name(&l.season).unwrap_or_else(|| {
                        warn!("unknown season {:?} for {}, using summer", l.season, l.map);
                        Season::Summer
                    }),
                    map: PathBuf::from(l.map),
                    time_limit_frames: l.time_limit_frames,
                })
                .collect()
        };

        GameConfig {
            physics: toml_cfg.physics.into(),
            rules: toml_cfg.rules.into(),
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                dash: toml_cfg.gamepad.dash,
                run: toml_cfg.gamepad.run,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            levels,
            levels_dir,
            highscore_path: PathBuf::from(toml_cfg.general.highscore_file),
            first_level: toml_cfg.general.first_level,
        }
    }

    /// Absolute-or-relative path of a catalog entry's map file.
    pub fn map_path(&self, entry: &LevelEntry) -> PathBuf {
        if entry.map.is_absolute() {
            entry.map.clone()
        } else {
            self.levels_dir.join(&entry.map)
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), &[PathBuf::from(".")])
    }
}

/// Resolve a directory name against the candidate dirs, defaulting to CWD-relative.
fn resolve_dir(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    if Path::new(name).is_absolute() {
        return PathBuf::from(name);
    }
    search_dirs.iter()
        .map(|d| d.join(name))
        .find(|p| p.is_dir())
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Candidate directories to search: exe dir + CWD + XDG data (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/bailey");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        info!("loaded {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
