//! Query Normalizer (spec §4.1): turns a raw query string into the
//! [`QuerySignals`] every downstream component reads from.

use std::sync::OnceLock;

use meridian_core::{text::tokenize, NumericParams, QuerySignals, TemporalSignal};
use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("query is empty or whitespace-only")]
    Empty,
    #[error("query exceeds the maximum supported length of {0} characters")]
    TooLong(usize),
}

const MAX_QUERY_CHARS: usize = 4_000;

/// Closed status vocabulary (Glossary: "foster, homeless youth, DACA,
/// TPS, F-1, veteran, dependent, incarcerated, disabled,
/// mission-deferral, tribal, LDS, etc."). Matched as substrings of the
/// lowercased query rather than the BM25 token set, since several
/// entries are multi-word phrases or contain characters tokenization
/// strips (`bs/md`, `504`).
const STATUS_VOCABULARY: &[&str] = &[
    "foster care",
    "foster",
    "unaccompanied homeless youth",
    "homeless youth",
    "ward of the court",
    "mission deferral",
    "lds",
    "gap year",
    "parent plus",
    "endorser",
    "ada",
    "504",
    "iep",
    "accommodations",
    "vocational rehabilitation",
    "disability",
    "disabled",
    "internal transfer",
    "major gate",
    "capacity",
    "daca",
    "tps",
    "undocumented",
    "ab 540",
    "active duty",
    "gi bill",
    "military dependent",
    "tribal",
    "bia",
    "cdib",
    "navajo",
    "ects",
    "a-level",
    "international baccalaureate",
    "f-1",
    "visa",
    "chapter 7",
    "incarcerated",
    "bankruptcy",
    "professional judgment",
    "ncaa",
    "nil",
    "transfer portal",
    "sabbath",
    "kosher",
    "halal",
    "ap credit",
    "dual enrollment",
    "bs/md",
    "plme",
    "pre-med",
    "wue",
    "in-state",
    "out-of-state",
    "post-9/11",
    "yellow ribbon",
    "veteran",
    "sap",
    "suspension appeal",
    "sanctioned country",
    "ofac",
];

/// Phrases that mark an entity string as an unresolvable placeholder
/// rather than a real institution (spec §4.1).
const UNKNOWN_ENTITY_MARKERS: &[&str] = &["university of xyz", "any school", "some college", "a random university"];

fn subjective_framing_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(should i|which (is|one is) better for me|what should i do|am i better off)\b").unwrap()
    })
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap())
}

fn dollar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\s?([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap())
}

fn gpa_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b([0-4]\.\d{1,2})\s*gpa\b").unwrap())
}

fn test_score_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{3,4})\s*(sat|act)\b").unwrap())
}

fn household_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:household|family) (?:of|size)\s*(\d{1,2})").unwrap())
}

fn in_college_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d{1,2})\s*(?:in college|in school)").unwrap())
}

/// Normalize a raw query into [`QuerySignals`].
///
/// `current_year` is the `CURRENT_YEAR` environment parameter (spec
/// §6) the caller resolved from config — the Normalizer itself has no
/// notion of wall-clock time so it stays a pure function of its
/// inputs.
pub fn normalize(raw_query: &str, current_year: i32) -> Result<QuerySignals, NormalizeError> {
    let trimmed = raw_query.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::Empty);
    }
    if trimmed.chars().count() > MAX_QUERY_CHARS {
        return Err(NormalizeError::TooLong(MAX_QUERY_CHARS));
    }

    let lowered = trimmed.to_lowercase();
    let tokens = tokenize(trimmed);

    let status_terms = STATUS_VOCABULARY
        .iter()
        .filter(|term| lowered.contains(*term))
        .map(|term| term.to_string())
        .collect();

    let temporal = year_re().captures_iter(&lowered).find_map(|caps| {
        let year: i32 = caps.get(0)?.as_str().parse().ok()?;
        if year > current_year {
            Some(TemporalSignal::FutureBounded { year })
        } else if year < current_year {
            Some(TemporalSignal::Historical)
        } else {
            Some(TemporalSignal::Present)
        }
    });

    let unknown_entity = UNKNOWN_ENTITY_MARKERS
        .iter()
        .find(|marker| lowered.contains(*marker))
        .map(|marker| marker.to_string());

    // Subjective framing only fires when the query carries no numeric
    // or status constraints to anchor a cited decision framework
    // around — a bare "should I..." with a GPA or status term attached
    // is answerable as a structured comparison, not a decision being
    // outsourced wholesale.
    let numbers = extract_numbers(&lowered);
    let has_constraints = numbers.gpa.is_some()
        || numbers.income.is_some()
        || numbers.parent_agi.is_some()
        || !status_terms_is_empty(&status_terms);
    let subjective_framing = subjective_framing_re().is_match(&lowered) && !has_constraints;

    Ok(QuerySignals {
        raw_query: trimmed.to_string(),
        tokens,
        entity_candidates: Vec::new(),
        status_terms,
        numbers,
        temporal,
        subjective_framing,
        unknown_entity,
    })
}

fn status_terms_is_empty(terms: &std::collections::BTreeSet<String>) -> bool {
    terms.is_empty()
}

fn extract_numbers(lowered: &str) -> NumericParams {
    let mut numbers = NumericParams::default();

    let dollars: Vec<f64> = dollar_re()
        .captures_iter(lowered)
        .filter_map(|c| c.get(1)?.as_str().replace(',', "").parse().ok())
        .collect();
    // Heuristic ordering: first dollar figure mentioned is taken as
    // parent AGI (the dominant SAI input in these queries); a second
    // is taken as student income. Callers needing precise attribution
    // should prefer structured input over free-text extraction.
    if let Some(&first) = dollars.first() {
        numbers.parent_agi = Some(first);
        numbers.income = Some(first);
    }
    if let Some(&second) = dollars.get(1) {
        numbers.student_income = Some(second);
    }

    if let Some(caps) = gpa_re().captures(lowered) {
        numbers.gpa = caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = test_score_re().captures(lowered) {
        numbers.test_score = caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = household_re().captures(lowered) {
        numbers.household_size = caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = in_college_re().captures(lowered) {
        numbers.number_in_college = caps.get(1).and_then(|m| m.as_str().parse().ok());
    }

    numbers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_out_of_scope() {
        assert!(matches!(normalize("   ", 2026), Err(NormalizeError::Empty)));
    }

    #[test]
    fn overlong_query_is_rejected() {
        let huge = "a".repeat(MAX_QUERY_CHARS + 1);
        assert!(matches!(normalize(&huge, 2026), Err(NormalizeError::TooLong(_))));
    }

    #[test]
    fn detects_future_year_as_temporal_out_of_range() {
        let signals = normalize("what will aid look like in 2031", 2026).unwrap();
        assert_eq!(signals.temporal, Some(TemporalSignal::FutureBounded { year: 2031 }));
    }

    #[test]
    fn detects_unknown_entity_placeholder() {
        let signals = normalize("can I transfer to University of XYZ", 2026).unwrap();
        assert_eq!(signals.unknown_entity.as_deref(), Some("university of xyz"));
    }

    #[test]
    fn bare_subjective_framing_without_constraints_is_flagged() {
        let signals = normalize("which school is better for me", 2026).unwrap();
        assert!(signals.subjective_framing);
    }

    #[test]
    fn subjective_framing_with_a_gpa_constraint_is_not_flagged() {
        let signals = normalize("should I transfer with a 3.2 gpa", 2026).unwrap();
        assert!(!signals.subjective_framing);
    }

    #[test]
    fn extracts_status_terms_from_closed_vocabulary() {
        let signals = normalize("I am a DACA student asking about aid", 2026).unwrap();
        assert!(signals.has_status("daca"));
    }

    #[test]
    fn extracts_gpa_and_household_numbers() {
        let signals =
            normalize("my gpa is 3.5 gpa and household of 4 with $85000 income", 2026).unwrap();
        assert_eq!(signals.numbers.gpa, Some(3.5));
        assert_eq!(signals.numbers.household_size, Some(4));
        assert_eq!(signals.numbers.parent_agi, Some(85_000.0));
    }
}
