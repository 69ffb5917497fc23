//! Vox Assistant
//!
//! The per-utterance pipeline: wake word handling, history, scenario
//! tracking, command resolution, reply planning and action dispatch.

pub mod assistant;
pub mod handlers;

pub use assistant::{Assistant, Outcome, NO_COMMAND_ACTION, REPEAT_ACTION, ResolvedCommand};
pub use handlers::{EchoHandler, SayHandler, register_builtin};
