//! Voice command registry and resolver.
//!
//! Commands are registered once at startup; `CommandRegistry::find` turns an
//! utterance into the ordered list of commands it contains, each paired with
//! its argument text.

pub mod definitions;
pub mod dispatch;
pub mod registry;
pub mod resolver;
pub mod types;

pub use definitions::{load_definitions, CommandDefinition, CommandDefinitions, CompiledDefinitions, RepeatDefinition};
pub use dispatch::{ActionContext, ActionDispatcher, ActionHandler, DispatchReport};
pub use registry::CommandRegistry;
pub use resolver::{Match, MAX_FILLER_WORDS};
pub use types::{Command, Parameters};
