//! Shared tokenizer used by both corpus indexing (`meridian-storage`) and
//! query normalization (`meridian-normalizer`), so the vocabulary on
//! both sides of a BM25 match is identical.

use std::collections::{BTreeSet, HashMap};

/// Common English stop words excluded from the term set. Filtering
/// these prevents high-frequency words from diluting lexical overlap
/// scores.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "was", "has", "are", "not", "this", "that", "with", "from", "have",
    "you", "can", "its", "will", "but", "they", "all", "been", "also", "into", "more", "than",
    "when", "who", "what", "how", "out", "our", "new", "now", "for", "did", "does", "got",
];

/// Lowercase, strip punctuation, drop stop words and terms shorter than
/// 3 characters.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Same normalization as [`tokenize`] but keeps per-term counts —
/// BM25 needs term frequency, not just a membership set.
pub fn term_frequencies(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for term in text
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
    {
        *counts.entry(term).or_insert(0u32) += 1;
    }
    counts
}
