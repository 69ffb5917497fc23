//! Action dispatch: route resolved commands to handler implementations.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use vox_core::VoxError;

use crate::resolver::Match;
use crate::types::Parameters;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Context passed to every action handler.
#[derive(Debug, Clone, Serialize)]
pub struct ActionContext {
    pub action: String,
    pub parameters: Parameters,
    /// Residual text around the command's keywords.
    pub argument: String,
    /// The full utterance the command was found in.
    pub request: String,
}

impl ActionContext {
    pub fn from_match(found: &Match<'_>, request: &str) -> Self {
        Self {
            action: found.command.action.clone(),
            parameters: found.command.parameters.clone(),
            argument: found.context.clone(),
            request: request.to_string(),
        }
    }
}

/// Returns an optional spoken reply.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &ActionContext) -> Result<Option<String>>;
}

/// What happened when one action ran.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub action: String,
    pub reply: Option<String>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct ActionDispatcher {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    pub fn register(&mut self, action: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(action.into(), handler);
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    pub fn actions(&self) -> Vec<&str> {
        let mut actions: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        actions.sort_unstable();
        actions
    }

    pub async fn dispatch(&self, ctx: &ActionContext) -> Result<Option<String>> {
        let handler = self
            .handlers
            .get(&ctx.action)
            .ok_or_else(|| VoxError::UnknownAction(ctx.action.clone()))?;
        info!(action = %ctx.action, argument = %ctx.argument, "Dispatching action");
        handler.handle(ctx).await
    }

    /// Run every action on its own task. Failures are logged and reported,
    /// never propagated.
    pub async fn dispatch_all(&self, contexts: Vec<ActionContext>) -> Vec<DispatchReport> {
        let mut tasks = Vec::with_capacity(contexts.len());
        for ctx in contexts {
            let dispatcher = self.clone();
            let action = ctx.action.clone();
            let task = tokio::spawn(async move { dispatcher.dispatch(&ctx).await });
            tasks.push((action, task));
        }

        let mut reports = Vec::with_capacity(tasks.len());
        for (action, task) in tasks {
            let report = match task.await {
                Ok(Ok(reply)) => DispatchReport { action, reply, error: None },
                Ok(Err(e)) => {
                    warn!(action = %action, error = %e, "Action failed");
                    DispatchReport { action, reply: None, error: Some(e.to_string()) }
                }
                Err(e) => {
                    warn!(action = %action, error = %e, "Action task panicked");
                    DispatchReport { action, reply: None, error: Some(e.to_string()) }
                }
            };
            reports.push(report);
        }
        reports
    }
}
