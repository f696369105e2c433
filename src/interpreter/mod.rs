//! Request/response interpreter for Dutch spelling questions.
//!
//! Turns a recognized transcript into a spoken reply plus the written form
//! shown on the terminal.

mod corrections;
mod engine;
mod phase;

pub use engine::{Interpreter, Reply, Spelling};
pub use phase::{Phase, PhaseTracker};
