//! Turn loop primitives (state machine, console, runner).

pub mod console;
pub mod runner;
pub mod state;

pub use console::{Console, StdConsole};
pub use runner::TurnLoop;
pub use state::LoopState;
