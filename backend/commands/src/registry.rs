/// Voice command registry.
///
/// Rebuilt at startup from declarative definitions; read-only on the request path.
use std::collections::BTreeSet;

use tracing::{debug, warn};
use vox_core::VoxError;

use crate::resolver::{self, Match};
use crate::types::Command;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command and one derived entry per declared equivalent.
    ///
    /// An entry with the same keyword sequence is replaced, never duplicated.
    pub fn register(&mut self, command: Command) -> Result<(), VoxError> {
        command.validate()?;

        let derived: Vec<Command> = command
            .equivalents
            .iter()
            .map(|keywords| command.derive(keywords.clone()))
            .collect();

        debug!(
            phrase = %command.phrase(),
            action = %command.action,
            equivalents = derived.len(),
            "Registering command"
        );
        self.insert(command);
        for entry in derived {
            self.insert(entry);
        }
        Ok(())
    }

    /// Register every command; a rejected command does not stop the others.
    /// Returns the first rejection, if any.
    pub fn register_many<I>(&mut self, commands: I) -> Result<(), VoxError>
    where
        I: IntoIterator<Item = Command>,
    {
        let mut first_error = None;
        for command in commands {
            let phrase = command.phrase();
            if let Err(e) = self.register(command) {
                warn!(phrase = %phrase, error = %e, "Rejected command registration");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn insert(&mut self, command: Command) {
        self.commands.retain(|existing| existing.keywords != command.keywords);
        self.commands.push(command);
    }

    pub fn all(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Find a command by its exact keyword sequence.
    pub fn find_by_keywords(&self, keywords: &[&str]) -> Option<&Command> {
        self.commands
            .iter()
            .find(|c| c.keywords.iter().map(String::as_str).eq(keywords.iter().copied()))
    }

    /// The command an opening word maps to. Shared opening words resolve to
    /// the most recently registered command.
    pub fn lookup_first(&self, word: &str) -> Option<&Command> {
        let word = word.to_lowercase();
        resolver::first_word_index(&self.commands)
            .get(word.as_str())
            .map(|&i| &self.commands[i])
    }

    /// Space-joined vocabulary (keywords and synonyms) for restricting a
    /// speech recognizer.
    pub fn recognizer_text(&self) -> String {
        let mut words = BTreeSet::new();
        for command in &self.commands {
            words.extend(command.keywords.iter().map(String::as_str));
            for synonyms in command.synonyms.values() {
                words.extend(synonyms.iter().map(String::as_str));
            }
        }
        words.into_iter().collect::<Vec<_>>().join(" ")
    }

    /// Resolve an utterance into the commands it contains, left to right.
    pub fn find(&self, request: &str) -> Vec<Match<'_>> {
        resolver::find(&self.commands, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces_identical_keywords() {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new(["volume", "up"], "old")).unwrap();
        registry.register(Command::new(["lights", "on"], "lights")).unwrap();
        registry.register(Command::new(["volume", "up"], "new")).unwrap();

        assert_eq!(registry.len(), 2);
        let cmd = registry.find_by_keywords(&["volume", "up"]).unwrap();
        assert_eq!(cmd.action, "new");
        // The replacement moves to the end of the registry.
        assert_eq!(registry.all()[1].action, "new");
    }

    #[test]
    fn test_equivalents_become_entries() {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                Command::new(["volume", "up"], "volume")
                    .with_synonyms("up", ["higher"])
                    .with_equivalent(["louder"])
                    .with_equivalent(["make", "it", "louder"])
                    .tts(),
            )
            .unwrap();

        assert_eq!(registry.len(), 3);
        let louder = registry.find_by_keywords(&["louder"]).unwrap();
        assert_eq!(louder.action, "volume");
        assert!(louder.tts);
        assert!(louder.synonyms.is_empty());

        let matches = registry.find("louder please");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].command.action, "volume");
        assert_eq!(matches[0].context, "please");
    }

    #[test]
    fn test_invalid_equivalent_rejects_only_that_command() {
        let mut registry = CommandRegistry::new();
        let result = registry.register_many([
            Command::new(["lights", "on"], "lights"),
            Command::new(["volume", "up"], "volume").with_equivalent(Vec::<String>::new()),
            Command::new(["lights", "off"], "lights"),
        ]);
        assert!(matches!(result, Err(VoxError::InvalidEquivalent { .. })));
        assert_eq!(registry.len(), 2);
        assert!(registry.find_by_keywords(&["volume", "up"]).is_none());
    }

    #[test]
    fn test_lookup_first_last_registration_wins() {
        let mut registry = CommandRegistry::new();
        registry
            .register_many([
                Command::new(["play", "music"], "music"),
                Command::new(["play", "video"], "video"),
            ])
            .unwrap();
        assert_eq!(registry.lookup_first("play").unwrap().action, "video");
        assert_eq!(registry.lookup_first("PLAY").unwrap().action, "video");
        assert!(registry.lookup_first("music").is_none());
    }

    #[test]
    fn test_lookup_first_through_synonym() {
        let mut registry = CommandRegistry::new();
        registry
            .register_many([
                Command::new(["lamp", "on"], "lamp").with_synonyms("lamp", ["light"]),
                Command::new(["light", "off"], "light"),
            ])
            .unwrap();
        assert_eq!(registry.lookup_first("light").unwrap().action, "light");
        assert_eq!(registry.lookup_first("lamp").unwrap().action, "lamp");
    }

    #[test]
    fn test_recognizer_text_includes_synonyms() {
        let mut registry = CommandRegistry::new();
        registry
            .register(Command::new(["turn", "on"], "power").with_synonyms("on", ["up"]))
            .unwrap();
        registry.register(Command::new(["turn", "off"], "power")).unwrap();
        assert_eq!(registry.recognizer_text(), "off on turn up");
    }
}
