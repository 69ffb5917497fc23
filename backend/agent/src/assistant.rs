//! Per-utterance assistant pipeline.
//!
//! The command registry, scenario set and history sit behind one mutex so
//! that requests are resolved strictly one at a time. Matched actions are
//! dispatched after the lock is released.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use vox_commands::{
    load_definitions, ActionContext, ActionDispatcher, ActionHandler, Command, CommandDefinitions,
    CommandRegistry, DispatchReport, Match, Parameters,
};
use vox_config::{AnswersConfig, AssistantConfig, WakeMode};
use vox_core::{tokenize, Event, EventKind, EventLog, VoxError};
use vox_logging::{InteractionEvent, InteractionLogger};
use vox_scenarios::{Scenario, ScenarioSet};

use crate::handlers::register_builtin;

/// Action name that re-runs the previous request instead of reaching a handler.
pub const REPEAT_ACTION: &str = "repeat";

/// Action name carried by the context handed to the no-command handler.
pub const NO_COMMAND_ACTION: &str = "no_command";

/// An owned view of one resolved command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCommand {
    pub keywords: String,
    pub action: String,
    pub parameters: Parameters,
    pub context: String,
    pub continues: bool,
    pub tts: bool,
}

impl From<&Match<'_>> for ResolvedCommand {
    fn from(found: &Match<'_>) -> Self {
        Self {
            keywords: found.command.phrase(),
            action: found.command.action.clone(),
            parameters: found.command.parameters.clone(),
            context: found.context.clone(),
            continues: found.command.continues,
            tts: found.command.tts,
        }
    }
}

/// What the assistant did with one utterance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Outcome {
    /// The request after wake word removal.
    pub request: String,
    pub matches: Vec<ResolvedCommand>,
    pub consumed_scenarios: Vec<String>,
    /// Canned answers first, then handler replies in match order.
    pub replies: Vec<String>,
    pub reports: Vec<DispatchReport>,
}

impl Outcome {
    fn merge(&mut self, other: Outcome) {
        self.matches.extend(other.matches);
        self.consumed_scenarios.extend(other.consumed_scenarios);
        self.replies.extend(other.replies);
        self.reports.extend(other.reports);
    }
}

#[derive(Debug, PartialEq)]
enum Wake {
    /// Not addressed to the assistant.
    Ignored,
    /// Only the wake word was said.
    Bare,
    Request(String),
}

#[derive(Default)]
struct Engines {
    registry: CommandRegistry,
    scenarios: ScenarioSet,
    history: EventLog,
}

/// Result of one locked resolution pass.
struct Resolution {
    outcome: Outcome,
    contexts: Vec<ActionContext>,
    /// Previous request to re-run when a repeat command matched.
    repeat: Option<String>,
    /// Context for the no-command handler when nothing took the request.
    fallback: Option<ActionContext>,
}

pub struct Assistant {
    config: AssistantConfig,
    engines: Mutex<Engines>,
    dispatcher: ActionDispatcher,
    no_command: Option<Arc<dyn ActionHandler>>,
    logger: InteractionLogger,
}

impl Assistant {
    /// An assistant with the built-in handlers and no commands.
    pub fn new(config: AssistantConfig) -> Self {
        let mut dispatcher = ActionDispatcher::new();
        register_builtin(&mut dispatcher);
        let logger = InteractionLogger::new(uuid::Uuid::new_v4().to_string());
        info!(session_id = %logger.session_id(), "Assistant created");
        Self {
            config,
            engines: Mutex::new(Engines::default()),
            dispatcher,
            no_command: None,
            logger,
        }
    }

    /// Build an assistant and register the definitions file named in `config`.
    pub async fn from_config(config: AssistantConfig) -> Result<Self> {
        let definitions = load_definitions(&config.definitions_path).await?;
        let assistant = Self::new(config);
        assistant.load_definitions(definitions).await;
        Ok(assistant)
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        self.logger.session_id()
    }

    pub fn register_handler(&mut self, action: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.dispatcher.register(action, handler);
    }

    /// Handler run when no command matched and no scenario consumed the
    /// request. Its context carries the request as argument; its reply
    /// replaces the canned `no_command` answer.
    pub fn set_no_command_handler(&mut self, handler: Arc<dyn ActionHandler>) {
        self.no_command = Some(handler);
    }

    pub async fn register_command(&self, command: Command) -> Result<(), VoxError> {
        self.engines.lock().await.registry.register(command)
    }

    /// Register every valid entry of a definitions document; returns how many
    /// commands were registered.
    pub async fn load_definitions(&self, definitions: CommandDefinitions) -> usize {
        let mut engines = self.engines.lock().await;
        definitions.register_into(&mut engines.registry)
    }

    pub async fn load_definitions_file(&self, path: &Path) -> Result<usize> {
        let definitions = load_definitions(path).await?;
        Ok(self.load_definitions(definitions).await)
    }

    pub async fn add_scenario(&self, scenario: Scenario) {
        self.engines.lock().await.scenarios.add_scenario(scenario);
    }

    pub async fn remove_scenario(&self, name: &str) -> bool {
        self.engines.lock().await.scenarios.remove_scenario(name).is_some()
    }

    pub async fn active_scenarios(&self) -> Vec<String> {
        let engines = self.engines.lock().await;
        engines.scenarios.active().into_iter().map(String::from).collect()
    }

    pub async fn command_count(&self) -> usize {
        self.engines.lock().await.registry.len()
    }

    pub async fn history(&self) -> Vec<Event> {
        self.engines.lock().await.history.events().to_vec()
    }

    /// Vocabulary for a restricted recognizer: wake words, then command words.
    pub async fn grammar(&self) -> String {
        let commands = self.engines.lock().await.registry.recognizer_text();
        self.config
            .wake
            .words
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(commands.as_str()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Resolve `text` without touching history, scenarios or handlers.
    pub async fn resolve(&self, text: &str) -> Vec<ResolvedCommand> {
        let engines = self.engines.lock().await;
        engines.registry.find(text).iter().map(ResolvedCommand::from).collect()
    }

    /// Handle one utterance. Returns `None` when the utterance was empty or
    /// not addressed to the assistant.
    #[instrument(skip(self), fields(session_id = %self.logger.session_id()))]
    pub async fn handle(&self, text: &str) -> Option<Outcome> {
        let request = match self.strip_wake_word(text) {
            Wake::Ignored => {
                debug!("Request ignored");
                return None;
            }
            Wake::Bare => {
                let replies = pick(&self.config.answers.default).into_iter().collect();
                return Some(Outcome { replies, ..Default::default() });
            }
            Wake::Request(request) => request,
        };

        let (mut outcome, repeat) = self.process(&request).await;
        // A repeated request never triggers another repeat.
        if let Some(previous) = repeat {
            info!(previous = %previous, "Repeating previous request");
            let (again, _) = self.process(&previous).await;
            outcome.merge(again);
        }
        Some(outcome)
    }

    /// One full pass: resolve under the lock, dispatch, record replies.
    async fn process(&self, request: &str) -> (Outcome, Option<String>) {
        let Resolution { mut outcome, contexts, repeat, fallback } = self.resolve_locked(request).await;

        let mut reports = self.dispatcher.dispatch_all(contexts).await;
        if let (Some(handler), Some(ctx)) = (&self.no_command, fallback) {
            reports.push(run_fallback(handler.as_ref(), &ctx).await);
        }
        for report in &reports {
            match (&report.reply, &report.error) {
                (Some(reply), _) => outcome.replies.push(reply.clone()),
                (None, Some(error)) => self.logger.log_event(InteractionEvent::ActionFailed {
                    action: report.action.clone(),
                    error: error.clone(),
                }),
                (None, None) => {}
            }
        }
        outcome.reports = reports;

        if !outcome.replies.is_empty() {
            let mut engines = self.engines.lock().await;
            for reply in &outcome.replies {
                engines
                    .history
                    .record(Event::new(EventKind::Response, json!({ "text": reply })));
            }
            engines.history.trim_to(self.config.max_history_length);
        }

        (outcome, repeat)
    }

    async fn resolve_locked(&self, request: &str) -> Resolution {
        let mut engines = self.engines.lock().await;
        let Engines { registry, scenarios, history } = &mut *engines;

        let previous = history.requests().last().map(|s| s.to_string());
        history.record(Event::request(request));
        history.trim_to(self.config.max_history_length);
        self.logger
            .log_event(InteractionEvent::RequestReceived { text: request.to_string() });

        let consumed_scenarios: Vec<String> = scenarios
            .check_all(request, history.events())
            .into_iter()
            .map(|s| s.name().to_string())
            .collect();
        for name in &consumed_scenarios {
            history.record(Event::new(EventKind::ScenarioConsumed, json!({ "scenario": name })));
            self.logger
                .log_event(InteractionEvent::ScenarioConsumed { scenario: name.clone() });
        }

        let found = registry.find(request);
        let matches: Vec<ResolvedCommand> = found.iter().map(ResolvedCommand::from).collect();

        let mut repeat = None;
        let mut contexts = Vec::with_capacity(found.len());
        for m in &found {
            if m.command.action == REPEAT_ACTION {
                repeat = previous.clone();
                continue;
            }
            contexts.push(ActionContext::from_match(m, request));
        }

        for m in &matches {
            history.record(Event::new(
                EventKind::CommandResolved,
                json!({ "keywords": m.keywords, "action": m.action, "context": m.context }),
            ));
            self.logger.log_event(InteractionEvent::CommandResolved {
                action: m.action.clone(),
                keywords: m.keywords.clone(),
                context: m.context.clone(),
            });
        }

        let unmatched = matches.is_empty() && consumed_scenarios.is_empty();
        if unmatched {
            history.record(Event::new(EventKind::NoCommand, json!({ "request": request })));
            self.logger
                .log_event(InteractionEvent::NoCommand { text: request.to_string() });
        }
        history.trim_to(self.config.max_history_length);

        let fallback = (unmatched && self.no_command.is_some()).then(|| ActionContext {
            action: NO_COMMAND_ACTION.to_string(),
            parameters: Parameters::new(),
            argument: request.to_string(),
            request: request.to_string(),
        });
        let replies = if fallback.is_some() {
            Vec::new()
        } else {
            plan_replies(&found, consumed_scenarios.is_empty(), &self.config.answers)
        };
        info!(
            request = %request,
            matches = matches.len(),
            scenarios = consumed_scenarios.len(),
            "Request resolved"
        );

        Resolution {
            outcome: Outcome {
                request: request.to_string(),
                matches,
                consumed_scenarios,
                replies,
                reports: Vec::new(),
            },
            contexts,
            repeat,
            fallback,
        }
    }

    fn strip_wake_word(&self, text: &str) -> Wake {
        let words = tokenize(text);
        if self.config.wake.mode == WakeMode::Disabled {
            return if words.is_empty() { Wake::Ignored } else { Wake::Request(words.join(" ")) };
        }

        for wake in &self.config.wake.words {
            let wake = tokenize(wake);
            if wake.is_empty() || wake.len() > words.len() {
                continue;
            }
            if let Some(at) = words.windows(wake.len()).position(|w| w == wake.as_slice()) {
                let rest = &words[at + wake.len()..];
                return if rest.is_empty() { Wake::Bare } else { Wake::Request(rest.join(" ")) };
            }
        }
        Wake::Ignored
    }
}

async fn run_fallback(handler: &dyn ActionHandler, ctx: &ActionContext) -> DispatchReport {
    info!(request = %ctx.request, "Running no-command handler");
    match handler.handle(ctx).await {
        Ok(reply) => DispatchReport { action: ctx.action.clone(), reply, error: None },
        Err(e) => DispatchReport {
            action: ctx.action.clone(),
            reply: None,
            error: Some(e.to_string()),
        },
    }
}

/// Canned answers for one resolution, spoken before any handler runs.
fn plan_replies(found: &[Match<'_>], no_scenario: bool, answers: &AnswersConfig) -> Vec<String> {
    match found {
        [] if no_scenario => pick(&answers.no_command).into_iter().collect(),
        [] => Vec::new(),
        [single] => pick(&single.command.responses).into_iter().collect(),
        many if many.iter().all(|m| m.command.tts) => Vec::new(),
        _ => pick(&answers.multi).into_iter().collect(),
    }
}

fn pick(options: &[String]) -> Option<String> {
    options.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_config::WakeConfig;
    use vox_scenarios::{Timeline, Trigger};

    fn config() -> AssistantConfig {
        AssistantConfig {
            answers: AnswersConfig {
                default: vec!["Yes?".into()],
                multi: vec!["On it.".into()],
                no_command: vec!["Sorry?".into()],
            },
            ..Default::default()
        }
    }

    async fn assistant_with(commands: Vec<Command>) -> Assistant {
        let assistant = Assistant::new(config());
        for command in commands {
            assistant.register_command(command).await.unwrap();
        }
        assistant
    }

    #[tokio::test]
    async fn test_single_match_dispatches_and_replies() {
        let assistant = assistant_with(vec![Command::new(["echo"], "echo").continues()]).await;
        let outcome = assistant.handle("Echo hello world").await.unwrap();
        assert_eq!(outcome.request, "echo hello world");
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].context, "hello world");
        assert_eq!(outcome.replies, vec!["hello world"]);
    }

    #[tokio::test]
    async fn test_canned_response_and_unknown_action() {
        let assistant = assistant_with(vec![
            Command::new(["volume", "up"], "volume").with_response("turning it up"),
        ])
        .await;
        let outcome = assistant.handle("volume up").await.unwrap();
        assert_eq!(outcome.replies, vec!["turning it up"]);
        assert_eq!(outcome.reports.len(), 1);
        assert!(outcome.reports[0].error.is_some());
    }

    #[tokio::test]
    async fn test_multi_answer_unless_all_tts() {
        let assistant = assistant_with(vec![
            Command::new(["lights", "on"], "lights").with_response("lights on"),
            Command::new(["music"], "music"),
        ])
        .await;
        let outcome = assistant.handle("lights on and music").await.unwrap();
        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.replies, vec!["On it."]);

        let quiet = assistant_with(vec![
            Command::new(["lights", "on"], "lights").tts(),
            Command::new(["music"], "music").tts(),
        ])
        .await;
        let outcome = quiet.handle("lights on and music").await.unwrap();
        assert!(outcome.replies.is_empty());
    }

    #[tokio::test]
    async fn test_no_command_answer_and_event() {
        let assistant = assistant_with(vec![Command::new(["music"], "music")]).await;
        let outcome = assistant.handle("what is this").await.unwrap();
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.replies, vec!["Sorry?"]);

        let kinds: Vec<EventKind> = assistant.history().await.into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Request, EventKind::NoCommand, EventKind::Response]);
    }

    struct Fallback;

    #[async_trait::async_trait]
    impl ActionHandler for Fallback {
        async fn handle(&self, ctx: &ActionContext) -> Result<Option<String>> {
            Ok(Some(format!("asking elsewhere: {}", ctx.argument)))
        }
    }

    #[tokio::test]
    async fn test_no_command_handler_replaces_canned_answer() {
        let mut assistant = Assistant::new(config());
        assistant.set_no_command_handler(Arc::new(Fallback));
        assistant
            .register_command(Command::new(["music"], "music"))
            .await
            .unwrap();

        let outcome = assistant.handle("What is the capital of France").await.unwrap();
        assert_eq!(outcome.replies, vec!["asking elsewhere: what is the capital of france"]);
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].action, NO_COMMAND_ACTION);

        // A matched command never reaches the handler.
        let outcome = assistant.handle("music").await.unwrap();
        assert!(outcome.reports.iter().all(|r| r.action != NO_COMMAND_ACTION));
    }

    #[tokio::test]
    async fn test_no_command_handler_skipped_when_scenario_consumes() {
        let mut assistant = Assistant::new(config());
        assistant.set_no_command_handler(Arc::new(Fallback));
        assistant
            .add_scenario(Scenario::new(
                "weather",
                Timeline::new([Trigger::new(["weather"]).unwrap(), Trigger::new(["yes"]).unwrap()]),
            ))
            .await;

        let outcome = assistant.handle("weather").await.unwrap();
        assert!(outcome.replies.is_empty());
        assert!(outcome.reports.is_empty());
    }

    #[tokio::test]
    async fn test_consumed_scenario_suppresses_no_command() {
        let assistant = assistant_with(Vec::new()).await;
        assistant
            .add_scenario(Scenario::new(
                "weather",
                Timeline::new([Trigger::new(["weather"]).unwrap(), Trigger::new(["yes"]).unwrap()]),
            ))
            .await;

        let outcome = assistant.handle("how is the weather").await.unwrap();
        assert_eq!(outcome.consumed_scenarios, vec!["weather"]);
        assert!(outcome.replies.is_empty());
        assert_eq!(assistant.active_scenarios().await, vec!["weather"]);

        let outcome = assistant.handle("yes").await.unwrap();
        assert_eq!(outcome.consumed_scenarios, vec!["weather"]);
        assert!(assistant.active_scenarios().await.is_empty());
        assert!(assistant.remove_scenario("weather").await);
    }

    #[tokio::test]
    async fn test_wake_word_handling() {
        let mut config = config();
        config.wake = WakeConfig { mode: WakeMode::Always, words: vec!["jarvis".into()] };
        let assistant = Assistant::new(config);
        assistant
            .register_command(Command::new(["echo"], "echo").continues())
            .await
            .unwrap();

        assert!(assistant.handle("echo hi").await.is_none());
        assert_eq!(assistant.handle("Jarvis").await.unwrap().replies, vec!["Yes?"]);

        let outcome = assistant.handle("hey jarvis echo hi").await.unwrap();
        assert_eq!(outcome.request, "echo hi");
        assert_eq!(outcome.replies, vec!["hi"]);
    }

    #[tokio::test]
    async fn test_empty_request_is_ignored() {
        let assistant = assistant_with(Vec::new()).await;
        assert!(assistant.handle("   ").await.is_none());
        assert!(assistant.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_trimmed() {
        let mut config = config();
        config.max_history_length = 2;
        let assistant = Assistant::new(config);
        for text in ["one", "two", "three"] {
            assistant.handle(text).await;
        }
        let history = assistant.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, EventKind::NoCommand);
        assert_eq!(history[1].kind, EventKind::Response);
    }

    #[tokio::test]
    async fn test_repeat_reruns_previous_request() {
        let assistant = assistant_with(vec![
            Command::new(["echo"], "echo").continues(),
            Command::new(["again"], REPEAT_ACTION),
        ])
        .await;
        assistant.handle("echo one").await;
        let outcome = assistant.handle("again").await.unwrap();
        assert_eq!(outcome.matches[0].action, REPEAT_ACTION);
        assert_eq!(outcome.replies, vec!["one"]);
        assert_eq!(outcome.reports.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_has_no_side_effects() {
        let assistant = assistant_with(vec![Command::new(["volume", "up"], "volume")]).await;
        let resolved = assistant.resolve("please turn volume up now").await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].context, "please turn now");
        assert!(assistant.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_custom_handler_and_grammar() {
        struct Lights;

        #[async_trait::async_trait]
        impl ActionHandler for Lights {
            async fn handle(&self, ctx: &ActionContext) -> Result<Option<String>> {
                Ok(Some(format!("lights {}", ctx.parameters["way"].as_str().unwrap_or("?"))))
            }
        }

        let mut config = config();
        config.wake.words = vec!["jarvis".into()];
        let mut assistant = Assistant::new(config);
        assistant.register_handler("lights", Arc::new(Lights));
        assistant
            .register_command(
                Command::new(["lights", "on"], "lights")
                    .with_synonyms("on", ["up"])
                    .with_parameter("way", json!("on")),
            )
            .await
            .unwrap();

        let outcome = assistant.handle("lights up").await.unwrap();
        assert_eq!(outcome.replies, vec!["lights on"]);
        assert_eq!(assistant.grammar().await, "jarvis lights on up");
        assert_eq!(assistant.command_count().await, 1);
    }

    #[tokio::test]
    async fn test_from_config_loads_definitions() {
        let path = std::env::temp_dir().join(format!("vox-agent-{}.yaml", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            "default:\n  - keywords: [say, goodnight]\n    action: say\n    parameters: { text: good night }\n",
        )
        .await
        .unwrap();
        let mut config = config();
        config.definitions_path = path.clone();

        let assistant = Assistant::from_config(config).await.unwrap();
        let outcome = assistant.handle("say goodnight").await.unwrap();
        assert_eq!(outcome.replies, vec!["good night"]);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
