/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from `[gamepad]` in config.toml.
/// Default mapping:
///   D-pad / Left Stick    →  Walk left / right
///   A / D-pad up          →  Jump
///   X / R1                →  Dash
///   B / L1 (held)         →  Run
///   Start                 →  Confirm / Pause
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::{info, warn};

use bailey::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

const BUTTON_COUNT: usize = 14;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER" => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2" => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            "DPADUP" | "UP" => Some(Btn::DPadUp),
            "DPADDOWN" | "DOWN" => Some(Btn::DPadDown),
            "DPADLEFT" | "LEFT" => Some(Btn::DPadLeft),
            "DPADRIGHT" | "RIGHT" => Some(Btn::DPadRight),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2 => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            Button::DPadUp => Some(Btn::DPadUp),
            Button::DPadDown => Some(Btn::DPadDown),
            Button::DPadLeft => Some(Btn::DPadLeft),
            Button::DPadRight => Some(Btn::DPadRight),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

/// Action-to-button mapping.
struct ActionMap {
    jump: Vec<Btn>,
    dash: Vec<Btn>,
    run: Vec<Btn>,
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl ActionMap {
    /// Unknown names are skipped; an action left with no buttons keeps `fallback`.
    fn parse(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
        let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
        if parsed.is_empty() { fallback } else { parsed }
    }

    fn from_config(cfg: &GamepadConfig) -> Self {
        ActionMap {
            jump: Self::parse(&cfg.jump, vec![Btn::A, Btn::DPadUp]),
            dash: Self::parse(&cfg.dash, vec![Btn::X, Btn::R1]),
            run: Self::parse(&cfg.run, vec![Btn::B, Btn::L1]),
            confirm: Self::parse(&cfg.confirm, vec![Btn::Start]),
            cancel: Self::parse(&cfg.cancel, vec![Btn::Select]),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BUTTON_COUNT],

    // Left stick, folded into digital left/right
    stick_x: f32,

    action_map: ActionMap,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs_opt = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                info!("gamepad support ready, pad connected: {has_pad}");
                Some(g)
            }
            Err(e) => {
                warn!("gamepad init failed: {e}");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BUTTON_COUNT],
            stick_x: 0.0,
            action_map: ActionMap::from_config(cfg),
        }
    }

    pub fn update(&mut self) {
        for b in &mut self.buttons {
            b.just_pressed = false;
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = &mut self.gilrs else { return };
        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(Axis::LeftStickX, value, _) => self.stick_x = value,
                EventType::Connected => info!("gamepad {} connected", event.id),
                EventType::Disconnected => {
                    info!("gamepad {} disconnected", event.id);
                    self.buttons = [BtnState::default(); BUTTON_COUNT];
                    self.stick_x = 0.0;
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            let state = &mut self.buttons[btn as usize];
            if held && !state.held {
                state.just_pressed = true;
            }
            state.held = held;
        }
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].held)
    }

    pub fn jump_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.jump)
    }
    pub fn dash_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.dash)
    }
    pub fn run_held(&self) -> bool {
        self.any_held(&self.action_map.run)
    }
    pub fn confirm_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.confirm)
    }
    pub fn cancel_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.cancel)
    }

    pub fn left_held(&self) -> bool {
        self.buttons[Btn::DPadLeft as usize].held || self.stick_x < -STICK_DEADZONE
    }
    pub fn right_held(&self) -> bool {
        self.buttons[Btn::DPadRight as usize].held || self.stick_x > STICK_DEADZONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("dpadup"), Some(Btn::DPadUp));
        assert_eq!(Btn::from_name("rb"), Some(Btn::R1));
        assert_eq!(Btn::from_name("Back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn unusable_mapping_keeps_default() {
        let cfg = GamepadConfig {
            jump: vec!["turbo".into()],
            dash: vec!["Y".into(), "nope".into()],
            run: vec![],
            confirm: vec!["Start".into()],
            cancel: vec!["Select".into()],
        };
        let map = ActionMap::from_config(&cfg);
        assert_eq!(map.jump, vec![Btn::A, Btn::DPadUp]);
        assert_eq!(map.dash, vec![Btn::Y]);
        assert_eq!(map.run, vec![Btn::B, Btn::L1]);
    }
}
