//! Structured logging for the assistant.
//!
//! Console plus rolling NDJSON file output, and a dedicated target for
//! per-interaction events.

pub mod event_logger;
pub mod logger;

pub use event_logger::{INTERACTION_TARGET, InteractionEvent, InteractionLogEntry, InteractionLogger};
pub use logger::init_logger;
