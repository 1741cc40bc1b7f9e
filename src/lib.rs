/// Bailey's Adventure: simulation core and configuration.
///
/// The terminal front end lives in the binary (`main.rs` + `ui/`);
/// everything here is pure game state and runs headless in tests.

pub mod config;
pub mod domain;
pub mod sim;
