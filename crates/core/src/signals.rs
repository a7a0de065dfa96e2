use std::collections::BTreeSet;

/// How the query's time reference relates to the engine's notion of
/// "now" (the `CURRENT_YEAR` environment parameter, spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalSignal {
    Present,
    Historical,
    /// Query names a year strictly greater than `CURRENT_YEAR` — the
    /// abstention trigger of spec §4.1.
    FutureBounded { year: i32 },
}

/// Numeric parameters the Normalizer can pull out of free text — inputs
/// to the Calculators and to handler eligibility thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericParams {
    pub income: Option<f64>,
    pub parent_agi: Option<f64>,
    pub parent_assets: Option<f64>,
    pub student_income: Option<f64>,
    pub gpa: Option<f64>,
    pub test_score: Option<f64>,
    pub household_size: Option<u32>,
    pub number_in_college: Option<u32>,
}

/// Signals extracted once per request by the Query Normalizer (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct QuerySignals {
    pub raw_query: String,
    /// Tokens for BM25 lexical search (lowercased, stop-words removed).
    pub tokens: BTreeSet<String>,
    /// Institution / program candidate strings found in the query,
    /// lowercased, used to cross-check against document entity tags.
    pub entity_candidates: Vec<String>,
    /// Closed-vocabulary status terms recognized in the query (glossary:
    /// foster, homeless youth, DACA, TPS, F-1, veteran, dependent,
    /// incarcerated, disabled, mission-deferral, tribal, LDS, etc).
    /// Interned as lowercase keyword strings rather than a fixed enum so
    /// handler trigger sets can be data, not code.
    pub status_terms: BTreeSet<String>,
    pub numbers: NumericParams,
    pub temporal: Option<TemporalSignal>,
    /// Set when the Normalizer detects first-person decision framing
    /// ("should I...", "which is better for me...") with no accompanying
    /// constraints — validator cross-checks this against the answer body.
    pub subjective_framing: bool,
    /// Set when the query names an entity string that looks like a
    /// placeholder or does not match any known institution
    /// ("University of XYZ", "any school").
    pub unknown_entity: Option<String>,
}

impl QuerySignals {
    pub fn has_status(&self, term: &str) -> bool {
        self.status_terms.contains(term)
    }

    pub fn has_any_status(&self, terms: &[&str]) -> bool {
        terms.iter().any(|t| self.has_status(t))
    }

    pub fn mentions_any_token(&self, terms: &[&str]) -> bool {
        terms.iter().any(|t| self.tokens.contains(*t))
    }
}
