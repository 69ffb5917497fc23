//! Command resolution: locate registered commands inside a free-form utterance.
//!
//! Candidate start positions are scanned right to left. Each candidate grows
//! the longest keyword sequence it can reach before the right boundary,
//! tolerating filler words between keywords; it may reach past the boundary
//! when that makes it longer than every match it spans. A conflict pass then
//! drops any candidate whose keywords can only be found by reusing words
//! already claimed by a command to its left.
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, trace};
use vox_core::tokenize;

use crate::types::Command;

/// Consecutive non-keyword words tolerated between two keywords.
pub const MAX_FILLER_WORDS: usize = 2;

/// A command found in an utterance with its residual argument text.
#[derive(Debug, Clone, Serialize)]
pub struct Match<'a> {
    pub command: &'a Command,
    pub context: String,
}

#[derive(Debug, Clone)]
struct Candidate {
    command: usize,
    /// Keyword count of the command.
    len: usize,
    /// Word index of the last keyword as found during the scan.
    end: usize,
}

/// Map every opening word (first keyword or one of its synonyms) to a command.
///
/// When two commands share an opening word the one registered later wins.
pub fn first_word_index(commands: &[Command]) -> HashMap<&str, usize> {
    let mut index = HashMap::new();
    for (position, command) in commands.iter().enumerate() {
        for word in command.first_words() {
            index.insert(word, position);
        }
    }
    index
}

/// Resolve `request` against `commands`, returning matches left to right.
pub fn find<'a>(commands: &'a [Command], request: &str) -> Vec<Match<'a>> {
    let words = tokenize(request);
    if words.is_empty() {
        return Vec::new();
    }

    let index = first_word_index(commands);
    let starts: Vec<usize> = (0..words.len())
        .rev()
        .filter(|&i| index.contains_key(words[i].as_str()))
        .collect();

    let results = collect_candidates(commands, &words, &starts);
    let confirmed = resolve_conflicts(commands, &words, results);

    debug!(
        request = %request,
        candidates = starts.len(),
        matched = confirmed.len(),
        "Resolved utterance"
    );

    build_matches(commands, &words, confirmed)
}

/// Right-to-left scan producing start index → candidate command.
fn collect_candidates(
    commands: &[Command],
    words: &[String],
    starts: &[usize],
) -> BTreeMap<usize, Candidate> {
    let mut results = BTreeMap::new();
    let mut boundary = words.len();
    let mut absorbing = false;

    for &start in starts {
        let Some(found) = best_at(commands, words, start, boundary, &results) else {
            continue;
        };
        let command = &commands[found.command];

        // A continues command owns the rest of the utterance; only another
        // continues command further left may replace it.
        if absorbing && !command.continues {
            trace!(start, phrase = %command.phrase(), "Suppressed by continues command");
            continue;
        }
        if command.continues {
            results.clear();
            absorbing = true;
        }

        trace!(start, phrase = %command.phrase(), "Candidate accepted");
        results.insert(start, found);
        // The boundary keeps the accepted start word reachable so that a
        // longer command to the left can still claim it; the conflict pass
        // settles the overlap.
        boundary = start + 1;
    }

    results
}

/// The candidate to accept at `start`.
///
/// Normally the search stops at `boundary`. A longer command that needs
/// words past it is preferred when every accepted match it spans is shorter;
/// the conflict pass then drops the matches whose words it claims.
fn best_at(
    commands: &[Command],
    words: &[String],
    start: usize,
    boundary: usize,
    accepted: &BTreeMap<usize, Candidate>,
) -> Option<Candidate> {
    let tight = longest_at(commands, words, start, boundary);
    if boundary >= words.len() {
        return tight;
    }

    let tight_len = tight.as_ref().map_or(0, |c| c.len);
    let wider = longest_at(commands, words, start, words.len()).filter(|wide| {
        wide.len > tight_len
            && wide.end > start
            && accepted
                .range(start + 1..=wide.end)
                .all(|(_, inner)| inner.len < wide.len)
    });
    if let Some(wide) = &wider {
        trace!(start, end = wide.end, "Longer command reaches past boundary");
    }
    wider.or(tight)
}

/// The longest command that opens at `start` and completes before `boundary`.
/// Equal lengths go to the later registration.
fn longest_at(
    commands: &[Command],
    words: &[String],
    start: usize,
    boundary: usize,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for (position, command) in commands.iter().enumerate() {
        if !command.matches_keyword(0, &words[start]) {
            continue;
        }
        let Some(end) = completion_end(command, words, start, boundary) else {
            continue;
        };
        let len = command.keywords.len();
        if best.as_ref().is_none_or(|b| len >= b.len) {
            best = Some(Candidate { command: position, len, end });
        }
    }
    best
}

/// Index of the last keyword if the command completes before `boundary`.
fn completion_end(command: &Command, words: &[String], start: usize, boundary: usize) -> Option<usize> {
    let mut cursor = start;
    for slot in 1..command.keywords.len() {
        let window_end = (cursor + MAX_FILLER_WORDS + 2).min(boundary);
        cursor = (cursor + 1..window_end).find(|&j| command.matches_keyword(slot, &words[j]))?;
    }
    Some(cursor)
}

/// Ascending pass that keeps only candidates whose keywords can be located
/// without reusing a word claimed by an earlier confirmed command.
fn resolve_conflicts(
    commands: &[Command],
    words: &[String],
    results: BTreeMap<usize, Candidate>,
) -> Vec<(usize, usize, Vec<usize>)> {
    let mut used: HashSet<usize> = HashSet::new();
    let mut confirmed = Vec::new();

    for (start, candidate) in results {
        let command = &commands[candidate.command];
        match locate(command, words, start, &used) {
            Some(claimed) => {
                used.extend(claimed.iter().copied());
                confirmed.push((start, candidate.command, claimed));
            }
            None => {
                trace!(start, phrase = %command.phrase(), "Dropped overlapping candidate");
            }
        }
    }
    confirmed
}

fn locate(command: &Command, words: &[String], start: usize, used: &HashSet<usize>) -> Option<Vec<usize>> {
    if used.contains(&start) || !command.matches_keyword(0, &words[start]) {
        return None;
    }
    let mut claimed = vec![start];
    let mut cursor = start;
    for slot in 1..command.keywords.len() {
        let next = (cursor + 1..words.len())
            .find(|&j| !used.contains(&j) && command.matches_keyword(slot, &words[j]))?;
        claimed.push(next);
        cursor = next;
    }
    Some(claimed)
}

/// Attach argument text to each confirmed command.
///
/// The first match also collects the words in front of it; a continues match
/// only takes what follows its own start. Keyword words of any confirmed
/// command never appear in an argument.
fn build_matches<'a>(
    commands: &'a [Command],
    words: &[String],
    confirmed: Vec<(usize, usize, Vec<usize>)>,
) -> Vec<Match<'a>> {
    let starts: Vec<usize> = confirmed.iter().map(|(start, _, _)| *start).collect();
    let claimed: HashSet<usize> = confirmed
        .iter()
        .flat_map(|(_, _, indices)| indices.iter().copied())
        .collect();

    confirmed
        .iter()
        .enumerate()
        .map(|(order, (start, command, _))| {
            let command = &commands[*command];
            let span_start = if command.continues || order > 0 { *start } else { 0 };
            let span_end = if command.continues {
                words.len()
            } else {
                starts.get(order + 1).copied().unwrap_or(words.len())
            };
            let context = (span_start..span_end)
                .filter(|i| !claimed.contains(i))
                .map(|i| words[i].as_str())
                .collect::<Vec<_>>()
                .join(" ");
            Match { command, context }
        })
        .collect()
}
