/// Voice command types.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vox_core::VoxError;

/// Opaque key/value bag handed to an action handler unchanged.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One recognizable phrase bound to an action.
///
/// Keywords must appear in order for the command to match; each keyword may
/// be replaced by any of its synonyms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
    /// Alternative keyword sequences, each registered as its own command.
    #[serde(default)]
    pub equivalents: Vec<Vec<String>>,
    pub action: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub responses: Vec<String>,
    /// Consume the rest of the utterance and override earlier matches.
    #[serde(default)]
    pub continues: bool,
    /// The handler speaks for itself; no generic acknowledgement.
    #[serde(default)]
    pub tts: bool,
}

impl Command {
    pub fn new<I, S>(keywords: I, action: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: lower_all(keywords),
            synonyms: HashMap::new(),
            equivalents: Vec::new(),
            action: action.into(),
            parameters: Parameters::new(),
            responses: Vec::new(),
            continues: false,
            tts: false,
        }
    }

    pub fn with_synonyms<I, S>(mut self, keyword: &str, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.synonyms
            .entry(keyword.to_lowercase())
            .or_default()
            .extend(lower_all(synonyms));
        self
    }

    pub fn with_equivalent<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.equivalents.push(lower_all(keywords));
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.responses.push(response.into());
        self
    }

    pub fn continues(mut self) -> Self {
        self.continues = true;
        self
    }

    pub fn tts(mut self) -> Self {
        self.tts = true;
        self
    }

    /// Human-readable phrase, e.g. "volume up".
    pub fn phrase(&self) -> String {
        self.keywords.join(" ")
    }

    /// Check the construction invariants: non-empty keywords, well-formed equivalents.
    pub fn validate(&self) -> Result<(), VoxError> {
        if self.keywords.is_empty() {
            return Err(VoxError::InvalidCommand(format!(
                "command for action '{}' has no keywords",
                self.action
            )));
        }
        if self.keywords.iter().any(|k| is_blank_word(k)) {
            return Err(VoxError::InvalidCommand(format!(
                "command '{}' contains a blank or multi-word keyword",
                self.phrase()
            )));
        }
        for equivalent in &self.equivalents {
            if equivalent.is_empty() {
                return Err(VoxError::InvalidEquivalent {
                    command: self.phrase(),
                    reason: "empty keyword sequence".into(),
                });
            }
            if equivalent.iter().any(|k| is_blank_word(k)) {
                return Err(VoxError::InvalidEquivalent {
                    command: self.phrase(),
                    reason: format!("blank or multi-word keyword in {:?}", equivalent),
                });
            }
        }
        Ok(())
    }

    /// Whether `word` fills keyword slot `position`, literally or via a synonym.
    pub fn matches_keyword(&self, position: usize, word: &str) -> bool {
        let Some(keyword) = self.keywords.get(position) else {
            return false;
        };
        keyword == word
            || self
                .synonyms
                .get(keyword)
                .is_some_and(|alts| alts.iter().any(|alt| alt == word))
    }

    /// Surface forms that can open this command: its first keyword and that keyword's synonyms.
    pub fn first_words(&self) -> impl Iterator<Item = &str> {
        let first = self.keywords.first();
        first.map(String::as_str).into_iter().chain(
            first
                .and_then(|k| self.synonyms.get(k))
                .into_iter()
                .flatten()
                .map(String::as_str),
        )
    }

    /// Copy of this command bound to another keyword sequence. Synonyms and
    /// equivalents are not carried over.
    pub fn derive(&self, keywords: Vec<String>) -> Self {
        Self {
            keywords,
            synonyms: HashMap::new(),
            equivalents: Vec::new(),
            action: self.action.clone(),
            parameters: self.parameters.clone(),
            responses: self.responses.clone(),
            continues: self.continues,
            tts: self.tts,
        }
    }
}

fn lower_all<I, S>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .collect()
}

fn is_blank_word(word: &str) -> bool {
    word.is_empty() || word.contains(char::is_whitespace)
}
