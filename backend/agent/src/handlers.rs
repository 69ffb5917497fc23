//! Built-in action handlers.

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use vox_commands::{ActionContext, ActionDispatcher, ActionHandler};

/// Replies with the command's argument text.
pub struct EchoHandler;

#[async_trait]
impl ActionHandler for EchoHandler {
    async fn handle(&self, ctx: &ActionContext) -> Result<Option<String>> {
        if ctx.argument.is_empty() {
            return Ok(None);
        }
        Ok(Some(ctx.argument.clone()))
    }
}

/// Replies with the `text` parameter, or the argument when none is set.
pub struct SayHandler;

#[async_trait]
impl ActionHandler for SayHandler {
    async fn handle(&self, ctx: &ActionContext) -> Result<Option<String>> {
        if let Some(text) = ctx.parameters.get("text").and_then(|v| v.as_str()) {
            return Ok(Some(text.to_string()));
        }
        if ctx.argument.is_empty() {
            bail!("say needs a 'text' parameter or an argument");
        }
        Ok(Some(ctx.argument.clone()))
    }
}

/// Register `echo` and `say`.
pub fn register_builtin(dispatcher: &mut ActionDispatcher) {
    dispatcher.register("echo", Arc::new(EchoHandler));
    dispatcher.register("say", Arc::new(SayHandler));
}
