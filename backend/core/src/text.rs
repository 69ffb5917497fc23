//! Tokenization helpers shared by the resolver and the scenario engine.

/// Lowercase and trim an utterance.
pub fn normalize(request: &str) -> String {
    request.trim().to_lowercase()
}

/// Normalize an utterance and split it on whitespace.
pub fn tokenize(request: &str) -> Vec<String> {
    normalize(request)
        .split_whitespace()
        .map(String::from)
        .collect()
}
