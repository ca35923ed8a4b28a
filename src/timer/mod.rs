pub mod commands;
pub mod controller;
pub mod state;

pub use controller::{TimerController, TimerSnapshot};
pub use state::{TimerEvent, TimerPhase, TimerState, DEFAULT_SESSION_SECS};
