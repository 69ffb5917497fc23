//! Keyword triggers used by scenario timelines.
//!
//! A trigger precomputes every literal keyword sequence it accepts (each
//! keyword or one of its synonyms, for the main sequence and every
//! equivalent) and compiles one whole-word pattern per keyword.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use tracing::warn;
use vox_core::{normalize, VoxError};

/// Side effect run when a trigger fires; receives the request text.
pub type TriggerCallback = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct Trigger {
    keywords: Vec<String>,
    combinations: Vec<Vec<String>>,
    patterns: Vec<Vec<Regex>>,
    callback: Option<TriggerCallback>,
}

/// Builder for [`Trigger`].
#[derive(Default)]
pub struct TriggerBuilder {
    keywords: Vec<String>,
    synonyms: HashMap<String, Vec<String>>,
    equivalents: Vec<Vec<String>>,
    callback: Option<TriggerCallback>,
}

impl TriggerBuilder {
    pub fn synonyms<I, S>(mut self, keyword: &str, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.synonyms
            .entry(normalize(keyword))
            .or_default()
            .extend(synonyms.into_iter().map(|s| normalize(s.as_ref())));
        self
    }

    pub fn equivalent<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.equivalents
            .push(keywords.into_iter().map(|s| normalize(s.as_ref())).collect());
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<Trigger, VoxError> {
        let phrase = self.keywords.join(" ");
        if self.keywords.is_empty() || self.keywords.iter().any(String::is_empty) {
            return Err(VoxError::InvalidCommand(format!(
                "trigger '{}' needs at least one non-empty keyword",
                phrase
            )));
        }
        if let Some(bad) = self
            .equivalents
            .iter()
            .find(|eq| eq.is_empty() || eq.iter().any(String::is_empty))
        {
            return Err(VoxError::InvalidEquivalent {
                command: phrase,
                reason: format!("malformed keyword sequence {:?}", bad),
            });
        }

        let mut combinations = expand(&self.keywords, &self.synonyms);
        for equivalent in &self.equivalents {
            combinations.extend(expand(equivalent, &self.synonyms));
        }

        let patterns = combinations
            .iter()
            .map(|combination| {
                combination
                    .iter()
                    .map(|kw| whole_word(kw))
                    .collect::<Result<Vec<Regex>>>()
            })
            .collect::<Result<Vec<Vec<Regex>>>>()?;

        Ok(Trigger {
            keywords: self.keywords,
            combinations,
            patterns,
            callback: self.callback,
        })
    }
}

impl Trigger {
    pub fn builder<I, S>(keywords: I) -> TriggerBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        TriggerBuilder {
            keywords: keywords.into_iter().map(|s| normalize(s.as_ref())).collect(),
            ..Default::default()
        }
    }

    /// A trigger with no synonyms, equivalents or callback.
    pub fn new<I, S>(keywords: I) -> Result<Self, VoxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::builder(keywords).build()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Every literal keyword sequence this trigger accepts.
    pub fn keyword_combinations(&self) -> &[Vec<String>] {
        &self.combinations
    }

    /// True if some keyword sequence occurs in `request` as whole words, in
    /// non-decreasing left-to-right order.
    pub fn matches(&self, request: &str) -> bool {
        let request = normalize(request);
        self.patterns.iter().any(|combination| in_order(combination, &request))
    }

    /// Run the callback. A failing callback is logged and otherwise ignored.
    pub fn fire(&self, request: &str) {
        let Some(callback) = &self.callback else {
            return;
        };
        if let Err(e) = callback(request) {
            warn!(trigger = %self.keywords.join(" "), error = %e, "Trigger callback failed");
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("keywords", &self.keywords)
            .field("combinations", &self.combinations)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Cartesian product over positions of "keyword or one of its synonyms".
fn expand(keywords: &[String], synonyms: &HashMap<String, Vec<String>>) -> Vec<Vec<String>> {
    let mut combinations: Vec<Vec<String>> = vec![Vec::with_capacity(keywords.len())];
    for keyword in keywords {
        let choices: Vec<&String> = std::iter::once(keyword)
            .chain(synonyms.get(keyword).into_iter().flatten())
            .collect();
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                choices.iter().map(move |choice| {
                    let mut next = prefix.clone();
                    next.push((*choice).clone());
                    next
                })
            })
            .collect();
    }
    combinations
}

fn whole_word(keyword: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(r"\b{}\b", regex::escape(keyword)))?)
}

fn in_order(patterns: &[Regex], text: &str) -> bool {
    let mut from = 0;
    for pattern in patterns {
        match pattern.find_at(text, from) {
            Some(m) => from = m.start(),
            None => return false,
        }
    }
    true
}
