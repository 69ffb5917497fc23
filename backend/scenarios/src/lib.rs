//! Multi-turn scenario tracking.
//!
//! A [`Scenario`] walks a [`Timeline`] of [`Trigger`] steps so that a
//! follow-up such as "yes" only means something after the right opener.

pub mod scenario;
pub mod set;
pub mod timeline;
pub mod trigger;

pub use scenario::{Completion, Scenario, ScenarioStatus};
pub use set::ScenarioSet;
pub use timeline::{Step, StepItem, Timeline};
pub use trigger::{Trigger, TriggerBuilder, TriggerCallback};
