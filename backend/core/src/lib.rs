pub mod error;
pub mod event;
pub mod text;

pub use error::VoxError;
pub use event::{Event, EventKind, EventLog};
pub use text::{normalize, tokenize};
