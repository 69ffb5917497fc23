//! Declarative command definitions loaded from YAML.
//!
//! The document has a `default` section mapping one-to-one onto commands and
//! a `repeat` section expanding one keyword prefix over a table of links.
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};
use vox_core::VoxError;

use crate::registry::CommandRegistry;
use crate::types::{Command, Parameters};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandDefinitions {
    #[serde(default)]
    pub default: Vec<CommandDefinition>,
    #[serde(default)]
    pub repeat: Vec<RepeatDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub keywords: Vec<String>,
    pub action: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub responses: Vec<String>,
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
    /// Kept loosely typed so one malformed entry rejects only its own command.
    #[serde(default)]
    pub equivalents: Vec<serde_json::Value>,
    #[serde(default)]
    pub continues: bool,
    #[serde(default)]
    pub tts: bool,
}

/// `keywords + <link key>` for every link, with `{parameter: <link value>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatDefinition {
    pub keywords: Vec<String>,
    pub action: String,
    pub parameter: String,
    pub links: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub responses: Vec<String>,
    #[serde(default)]
    pub tts: bool,
}

/// Outcome of compiling a definitions document.
#[derive(Debug, Default)]
pub struct CompiledDefinitions {
    pub commands: Vec<Command>,
    pub rejected: Vec<VoxError>,
}

impl CommandDefinitions {
    pub fn from_yaml_str(raw: &str) -> Result<Self, VoxError> {
        serde_yaml::from_str(raw).map_err(|e| VoxError::DefinitionError(e.to_string()))
    }

    /// Turn every entry into a `Command`, collecting per-entry failures.
    pub fn compile(self) -> CompiledDefinitions {
        let mut compiled = CompiledDefinitions::default();

        for def in self.default {
            match def.into_command() {
                Ok(command) => compiled.commands.push(command),
                Err(e) => compiled.rejected.push(e),
            }
        }
        for def in self.repeat {
            compiled.commands.extend(def.expand());
        }
        compiled
    }

    /// Strict variant of [`compile`](Self::compile): fails on the first
    /// rejected entry.
    pub fn into_commands(self) -> Result<Vec<Command>, VoxError> {
        let mut compiled = self.compile();
        if compiled.rejected.is_empty() {
            Ok(compiled.commands)
        } else {
            Err(compiled.rejected.remove(0))
        }
    }

    /// Compile and register into `registry`, logging each rejected entry.
    /// Returns the number of commands registered.
    pub fn register_into(self, registry: &mut CommandRegistry) -> usize {
        let compiled = self.compile();
        for e in &compiled.rejected {
            warn!(error = %e, "Skipping command definition");
        }
        let mut registered = 0;
        for command in compiled.commands {
            match registry.register(command) {
                Ok(()) => registered += 1,
                Err(e) => warn!(error = %e, "Skipping command definition"),
            }
        }
        registered
    }
}

impl CommandDefinition {
    fn into_command(self) -> Result<Command, VoxError> {
        let phrase = self.keywords.join(" ");
        let equivalents = self
            .equivalents
            .iter()
            .map(|value| parse_equivalent(&phrase, value))
            .collect::<Result<Vec<_>, _>>()?;

        let mut command = Command::new(&self.keywords, self.action);
        for (keyword, synonyms) in &self.synonyms {
            command = command.with_synonyms(keyword, synonyms);
        }
        for equivalent in equivalents {
            command = command.with_equivalent(equivalent);
        }
        command.parameters = self.parameters;
        command.responses = self.responses;
        command.continues = self.continues;
        command.tts = self.tts;
        command.validate()?;
        Ok(command)
    }
}

fn parse_equivalent(phrase: &str, value: &serde_json::Value) -> Result<Vec<String>, VoxError> {
    let invalid = |reason: String| VoxError::InvalidEquivalent {
        command: phrase.to_string(),
        reason,
    };
    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("expected a list of words, got {}", value)))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(String::from)
                .ok_or_else(|| invalid(format!("expected a word, got {}", item)))
        })
        .collect()
}

impl RepeatDefinition {
    fn expand(&self) -> Vec<Command> {
        self.links
            .iter()
            .map(|(key, value)| {
                let keywords = self
                    .keywords
                    .iter()
                    .map(String::as_str)
                    .chain(key.split_whitespace());
                let mut command = Command::new(keywords, self.action.clone())
                    .with_parameter(self.parameter.clone(), value.clone());
                for (keyword, synonyms) in &self.synonyms {
                    command = command.with_synonyms(keyword, synonyms);
                }
                command.responses = self.responses.clone();
                command.tts = self.tts;
                command
            })
            .collect()
    }
}

/// Load a definitions file from disk.
///
/// Returns an empty document if the file doesn't exist.
pub async fn load_definitions(path: &Path) -> Result<CommandDefinitions> {
    if !path.exists() {
        warn!(path = %path.display(), "Command definitions file does not exist");
        return Ok(CommandDefinitions::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read command definitions: {}", path.display()))?;
    let defs = CommandDefinitions::from_yaml_str(&raw)
        .with_context(|| format!("Invalid command definitions at: {}", path.display()))?;

    info!(
        path = %path.display(),
        default = defs.default.len(),
        repeat = defs.repeat.len(),
        "Loaded command definitions"
    );
    Ok(defs)
}
