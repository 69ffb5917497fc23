//! Interaction Event Logger
//!
//! One structured record per step of handling a request, emitted on the
//! `interaction_events` target so it can be filtered separately.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

pub const INTERACTION_TARGET: &str = "interaction_events";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionEvent {
    RequestReceived {
        text: String,
    },
    CommandResolved {
        action: String,
        keywords: String,
        context: String,
    },
    ScenarioConsumed {
        scenario: String,
    },
    NoCommand {
        text: String,
    },
    ActionFailed {
        action: String,
        error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct InteractionLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: InteractionEvent,
}

/// Logs interaction events for one assistant session.
#[derive(Debug, Clone)]
pub struct InteractionLogger {
    session_id: String,
}

impl InteractionLogger {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into() }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn entry(&self, event: InteractionEvent) -> InteractionLogEntry {
        InteractionLogEntry {
            session_id: self.session_id.clone(),
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn log_event(&self, event: InteractionEvent) {
        let entry = self.entry(event);
        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: INTERACTION_TARGET, event = %json, "Interaction event"),
            Err(_) => info!(target: INTERACTION_TARGET, event = ?entry, "Interaction event"),
        }
    }
}
