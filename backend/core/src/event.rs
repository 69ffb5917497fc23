use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single interaction event in the assistant's rolling history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub kind: EventKind,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Categories of interaction events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A user-originated request
    Request,
    /// One or more commands were resolved from a request
    CommandResolved,
    /// A scenario consumed a request
    ScenarioConsumed,
    /// Nothing recognised the request
    NoCommand,
    /// The assistant replied
    Response,
}

impl Event {
    pub fn new(kind: EventKind, details: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            details,
            timestamp: Utc::now(),
        }
    }

    /// A user-request event carrying the request text under `details.request`.
    pub fn request(text: impl Into<String>) -> Self {
        Self::new(EventKind::Request, serde_json::json!({ "request": text.into() }))
    }

    /// The request text, if this is a user-request event.
    pub fn request_text(&self) -> Option<&str> {
        if self.kind != EventKind::Request {
            return None;
        }
        self.details.get("request").and_then(|v| v.as_str())
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

/// Insertion-ordered interaction history.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    history: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: Event) {
        self.history.push(event);
    }

    /// Drop the oldest events so that at most `limit` remain.
    pub fn trim_to(&mut self, limit: usize) {
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn events(&self) -> &[Event] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Request texts of user-originated events, oldest first.
    pub fn requests(&self) -> Vec<&str> {
        self.history.iter().filter_map(Event::request_text).collect()
    }
}
