/// Keyboard input tracker and intent mapping.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous walking/running while a key is held
///   - Edge-triggered jump and dash (only fire on initial press)
///
/// Terminals rarely report key Release events, so a key counts as
/// released once no Press/Repeat has arrived for `HOLD_TIMEOUT`.
///
/// The render loop polls faster than the simulation ticks; `Intents`
/// latches edge presses until the next tick consumes them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use bailey::domain::player::FrameInput;

use super::gamepad::GamepadState;

/// After this duration without a Press/Repeat event, consider the key released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key bindings ──

pub const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_JUMP: &[KeyCode] = &[
    KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W'), KeyCode::Char('z'), KeyCode::Char('Z'),
];
pub const KEYS_DASH: &[KeyCode] = &[KeyCode::Char('x'), KeyCode::Char('X')];
pub const KEYS_RUN: &[KeyCode] = &[KeyCode::Char('c'), KeyCode::Char('C')];
pub const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
pub const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
pub const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent drain.
    fresh_presses: Vec<KeyCode>,

    raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events without blocking.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.raw_events.push(key);
            if key.kind == KeyEventKind::Release {
                continue;
            }
            let was_held = self.is_held(key.code);
            self.last_active.insert(key.code, Instant::now());
            if !was_held {
                self.fresh_presses.push(key.code);
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code).is_some_and(|t| t.elapsed() < HOLD_TIMEOUT)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    /// Any key at all this frame (title screen "press any key").
    pub fn anything_pressed(&self) -> bool {
        !self.fresh_presses.is_empty()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }
}

/// Per-tick intents merged from keyboard and gamepad.
#[derive(Default)]
pub struct Intents {
    pending_jump: bool,
    pending_dash: bool,
}

impl Intents {
    /// Record edge presses seen since the last tick.
    pub fn observe(&mut self, kb: &InputState, gp: &GamepadState) {
        self.pending_jump |= kb.any_pressed(KEYS_JUMP) || gp.jump_pressed();
        self.pending_dash |= kb.any_pressed(KEYS_DASH) || gp.dash_pressed();
    }

    /// Build this tick's input; latched presses are consumed.
    pub fn take_frame_input(&mut self, kb: &InputState, gp: &GamepadState) -> FrameInput {
        FrameInput {
            left: kb.any_held(KEYS_LEFT) || gp.left_held(),
            right: kb.any_held(KEYS_RIGHT) || gp.right_held(),
            jump: std::mem::take(&mut self.pending_jump),
            dash: std::mem::take(&mut self.pending_dash),
            run: kb.any_held(KEYS_RUN) || gp.run_held(),
        }
    }

    pub fn clear(&mut self) {
        *self = Intents::default();
    }
}
