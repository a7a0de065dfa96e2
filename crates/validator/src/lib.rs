//! Validator & Gate (spec §4.6): six ordered checks over a
//! [`HandlerResult`], with a retry/abstain/integrity disposition per
//! check rather than a single pass/fail.
//!
//! This crate depends only on `meridian-core` — it has no opinion on
//! where its thresholds come from (`meridian-config` wires the
//! `CITATION_COVERAGE_FLOOR`/`MIN_AUTHORITATIVE_SOURCES` environment
//! parameters into [`ValidatorThresholds`] at the engine layer).

use std::collections::BTreeSet;

use meridian_core::{
    is_authoritative_url, AbstentionReason, Abstention, CalculationRecord, CandidatePassage,
    CitationKind, HandlerResult,
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// `CITATION_COVERAGE_FLOOR` / `MIN_AUTHORITATIVE_SOURCES` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatorThresholds {
    pub citation_coverage_floor: f32,
    pub min_authoritative_sources: usize,
}

impl Default for ValidatorThresholds {
    fn default() -> Self {
        Self {
            citation_coverage_floor: 0.90,
            min_authoritative_sources: 3,
        }
    }
}

/// What the caller (the engine) should do after a single
/// [`Validator::validate`] call.
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    /// All six checks passed. The result is sealed and ready for the
    /// Formatter.
    Accepted(HandlerResult),
    /// A retryable check failed on a first attempt (`is_retry` was
    /// `false`). The engine should widen retrieval, re-invoke the
    /// handler once, and call [`Validator::validate`] again with
    /// `is_retry: true`.
    Retry { check: FailedCheck, detail: String },
    /// A normal, user-facing refusal (spec §7: "not errors, a normal
    /// outcome").
    Abstained(Abstention),
    /// An integrity failure the engine should surface as a typed
    /// `EngineError`, not a refusal to the user (spec §7 "Fatal to
    /// request": foreign citation URL, or a corrupt handler result
    /// that still fails schema conformance after the one allowed
    /// retry).
    Integrity { check: FailedCheck, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedCheck {
    CitationCoverage,
    Fabrication,
    NumericTraceability,
    AuthorityFloor,
    SchemaConformance,
    SubjectiveRecommendation,
}

pub struct Validator {
    thresholds: ValidatorThresholds,
}

impl Validator {
    pub fn new(thresholds: ValidatorThresholds) -> Self {
        Self { thresholds }
    }

    /// Run the six checks of spec §4.6 in order, stopping at the first
    /// failure. `is_retry` tells checks 1/3/5 (the ones spec phrases as
    /// "retry once; second failure → ...") whether this is the second
    /// attempt, so the disposition can be decided here instead of
    /// threading per-check retry budgets back through the engine.
    pub fn validate(
        &self,
        mut result: HandlerResult,
        candidates: &[CandidatePassage],
        is_retry: bool,
    ) -> ValidationOutcome {
        debug!(handler = result.handler_id.as_str(), is_retry, "validating handler result");

        if let Some(outcome) = self.check_citation_coverage(&result, is_retry) {
            warn!(handler = result.handler_id.as_str(), ?outcome, "citation coverage check failed");
            return outcome;
        }
        if let Some(outcome) = self.check_fabrication(&result, candidates) {
            warn!(handler = result.handler_id.as_str(), ?outcome, "fabrication check failed");
            return outcome;
        }
        if let Some(outcome) = self.check_numeric_traceability(&result, candidates, is_retry) {
            warn!(handler = result.handler_id.as_str(), ?outcome, "numeric traceability check failed");
            return outcome;
        }
        if let Some(outcome) = self.check_authority_floor(&result) {
            warn!(handler = result.handler_id.as_str(), ?outcome, "authority floor check failed");
            return outcome;
        }
        if let Some(outcome) = self.check_schema_conformance(&result, is_retry) {
            warn!(handler = result.handler_id.as_str(), ?outcome, "schema conformance check failed");
            return outcome;
        }
        if let Some(outcome) = self.check_subjective_recommendation(&mut result) {
            warn!(handler = result.handler_id.as_str(), ?outcome, "subjective recommendation check failed");
            return outcome;
        }

        result.seal();
        debug!(handler = result.handler_id.as_str(), "handler result accepted");
        ValidationOutcome::Accepted(result)
    }

    /// Check 1: every factual claim (a paragraph containing a name,
    /// number, date, proper noun, or policy term) carries ≥1 citation.
    /// `#cited claims / #claims ≥ CITATION_COVERAGE_FLOOR`.
    fn check_citation_coverage(
        &self,
        result: &HandlerResult,
        is_retry: bool,
    ) -> Option<ValidationOutcome> {
        let paragraphs: Vec<_> = result.sections.iter().flat_map(|s| &s.paragraphs).collect();
        let claim_paragraphs: Vec<_> = paragraphs
            .iter()
            .filter(|p| is_factual_claim(&p.text))
            .collect();

        if claim_paragraphs.is_empty() {
            return None;
        }

        let cited = claim_paragraphs
            .iter()
            .filter(|p| !p.citations.is_empty())
            .count();
        let coverage = cited as f32 / claim_paragraphs.len() as f32;

        if coverage >= self.thresholds.citation_coverage_floor {
            return None;
        }

        let detail = format!(
            "citation coverage {:.2} is below the floor of {:.2} ({cited}/{} claim paragraphs cited)",
            coverage,
            self.thresholds.citation_coverage_floor,
            claim_paragraphs.len(),
        );
        Some(if is_retry {
            ValidationOutcome::Abstained(Abstention::new(AbstentionReason::InsufficientEvidence, detail))
        } else {
            ValidationOutcome::Retry { check: FailedCheck::CitationCoverage, detail }
        })
    }

    /// Check 2: every citation URL appears in the retrieval set or is
    /// a `formula:` citation from a registered calculator. Fails fast
    /// — an integrity breach, never a retry (spec §7: "foreign URL in
    /// citations").
    fn check_fabrication(
        &self,
        result: &HandlerResult,
        candidates: &[CandidatePassage],
    ) -> Option<ValidationOutcome> {
        let known_urls: BTreeSet<&str> = candidates
            .iter()
            .map(|c| c.document.smallest_citation_url())
            .collect();

        for citation in result.all_citations() {
            let known = match citation.kind {
                CitationKind::Formula => true,
                _ => known_urls.contains(citation.url.as_str()),
            };
            if !known {
                return Some(ValidationOutcome::Integrity {
                    check: FailedCheck::Fabrication,
                    detail: format!(
                        "citation '{}' does not appear in the retrieval set or the formula registry",
                        citation.url
                    ),
                });
            }
        }
        None
    }

    /// Check 3: every number in the answer text appears verbatim in a
    /// cited passage's body or is a calculator output.
    fn check_numeric_traceability(
        &self,
        result: &HandlerResult,
        candidates: &[CandidatePassage],
        is_retry: bool,
    ) -> Option<ValidationOutcome> {
        let candidate_bodies: Vec<&str> = candidates.iter().map(|c| c.document.body.as_str()).collect();
        let calculator_numbers: BTreeSet<String> = result
            .calculations
            .iter()
            .flat_map(|calc| calculator_number_strings(calc))
            .collect();

        for paragraph in result.sections.iter().flat_map(|s| &s.paragraphs) {
            for number in extract_numbers(&paragraph.text) {
                let found_in_passage = candidate_bodies.iter().any(|body| body.contains(&number));
                let found_in_calculation = calculator_numbers.contains(&number)
                    || calculator_numbers.iter().any(|c| numbers_approx_eq(c, &number));
                if !found_in_passage && !found_in_calculation {
                    let detail = format!(
                        "number '{number}' in the answer is not a verbatim quote from a cited passage \
                         nor a calculator output"
                    );
                    return Some(if is_retry {
                        ValidationOutcome::Abstained(Abstention::new(
                            AbstentionReason::InsufficientEvidence,
                            detail,
                        ))
                    } else {
                        ValidationOutcome::Retry {
                            check: FailedCheck::NumericTraceability,
                            detail,
                        }
                    });
                }
            }
        }
        None
    }

    /// Check 4: of the distinct citations used, at least
    /// `MIN_AUTHORITATIVE_SOURCES` come from `.edu`/`.gov` or from
    /// internal curated `cited_answers`.
    fn check_authority_floor(&self, result: &HandlerResult) -> Option<ValidationOutcome> {
        let authoritative = result
            .all_citations()
            .into_iter()
            .filter(|citation| {
                matches!(citation.kind, CitationKind::Internal) || is_authoritative_url(&citation.url)
            })
            .map(|citation| citation.url.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        if authoritative >= self.thresholds.min_authoritative_sources {
            return None;
        }

        Some(ValidationOutcome::Abstained(Abstention::new(
            AbstentionReason::InsufficientEvidence,
            format!(
                "only {authoritative} of the required {} authoritative (.edu/.gov or internal) \
                 citations are present",
                self.thresholds.min_authoritative_sources
            ),
        )))
    }

    /// Check 5: sections are present, non-empty, each with non-empty
    /// paragraphs. A handler is expected to own its section order at
    /// construction time (spec §4.4: "each section header is
    /// handler-owned and fixed"); the Validator re-checks structural
    /// well-formedness rather than re-deriving the canonical order,
    /// since it has no registry access to a handler's declared list.
    fn check_schema_conformance(&self, result: &HandlerResult, is_retry: bool) -> Option<ValidationOutcome> {
        let malformed = result.sections.is_empty()
            || result.sections.iter().any(|s| {
                s.heading.trim().is_empty()
                    || s.paragraphs.is_empty()
                    || s.paragraphs.iter().any(|p| p.text.trim().is_empty())
            });

        if !malformed {
            return None;
        }

        let detail = "handler result has an empty section, a blank heading, or a blank paragraph".to_string();
        Some(if is_retry {
            ValidationOutcome::Integrity {
                check: FailedCheck::SchemaConformance,
                detail,
            }
        } else {
            ValidationOutcome::Retry {
                check: FailedCheck::SchemaConformance,
                detail,
            }
        })
    }

    /// Check 6: strip first-person imperative advocacy sentences
    /// unless the paragraph is framed as a structured decision
    /// framework with cited trade-offs (it carries ≥2 citations or
    /// mentions "trade-off"). If stripping empties a paragraph that
    /// was load-bearing for a section, abstain.
    fn check_subjective_recommendation(&self, result: &mut HandlerResult) -> Option<ValidationOutcome> {
        let mut emptied_a_required_paragraph = false;

        for section in &mut result.sections {
            for paragraph in &mut section.paragraphs {
                if !subjective_advocacy_re().is_match(&paragraph.text) {
                    continue;
                }
                let is_framed_tradeoff =
                    paragraph.citations.len() >= 2 || paragraph.text.to_lowercase().contains("trade-off");
                if is_framed_tradeoff {
                    continue;
                }

                let stripped = strip_advocacy_sentences(&paragraph.text);
                if stripped.trim().is_empty() {
                    emptied_a_required_paragraph = true;
                }
                paragraph.text = stripped;
            }
        }

        if emptied_a_required_paragraph {
            return Some(ValidationOutcome::Abstained(Abstention::new(
                AbstentionReason::SubjectiveDecision,
                "the answer's required content was entirely first-person decision advocacy without a \
                 cited trade-off framework",
            )));
        }
        None
    }
}

fn proper_noun_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S\s+([A-Z][a-z]{2,})").unwrap())
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$?\d[\d,]*(?:\.\d+)?%?").unwrap())
}

fn subjective_advocacy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\byou should (?:pick|choose|go with|prefer) [^.]*(?:over|instead of) [^.]*\.").unwrap()
    })
}

/// Policy/domain terms dense enough in this corpus that their presence
/// alone marks a sentence as a factual claim, even absent a number or
/// a capitalized proper noun (spec §3: "a name, number, date, proper
/// noun, or policy term").
const POLICY_TERMS: &[&str] = &[
    "gpa", "sai", "coa", "fafsa", "ncaa", "nil", "daca", "tps", "sap", "plus", "chafee",
    "mckinney-vento", "ofac", "gi bill", "yellow ribbon", "ects", "a-level", "assist",
];

fn is_factual_claim(text: &str) -> bool {
    number_re().is_match(text)
        || proper_noun_re().is_match(text)
        || POLICY_TERMS.iter().any(|term| text.to_lowercase().contains(term))
}

/// Extract number-like tokens (currency, plain, percentage) from text,
/// normalized by stripping a leading `$` and trailing `%` so they
/// compare cleanly against calculator output strings.
fn extract_numbers(text: &str) -> Vec<String> {
    number_re()
        .find_iter(text)
        .map(|m| m.as_str().trim_start_matches('$').trim_end_matches('%').to_string())
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()))
        .collect()
}

/// Render a calculation record's declared inputs/outputs the same way
/// a handler would quote them in prose (commas for thousands, two
/// decimal places), so a direct string match against `extract_numbers`
/// output is possible.
fn calculator_number_strings(record: &CalculationRecord) -> Vec<String> {
    record
        .inputs
        .values()
        .chain(record.outputs.values())
        .flat_map(|value| {
            vec![
                format!("{value:.2}"),
                format!("{value:.0}"),
                format_with_commas(*value),
            ]
        })
        .collect()
}

fn format_with_commas(value: f64) -> String {
    let rounded = value.round() as i64;
    let negative = rounded < 0;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (idx, ch) in digits.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let grouped: String = grouped.chars().rev().collect();
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Loose fallback comparison for a quoted number against a calculator
/// number string: equal once both are parsed as floats and rounded to
/// cents, so "85000" in prose matches a calculator input of 85000.00.
fn numbers_approx_eq(a: &str, b: &str) -> bool {
    let parse = |s: &str| s.replace(',', "").parse::<f64>().ok();
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => (x - y).abs() < 0.01,
        _ => false,
    }
}

/// Remove sentences matching the subjective-advocacy pattern from a
/// paragraph, keeping the rest intact.
fn strip_advocacy_sentences(text: &str) -> String {
    let stripped = subjective_advocacy_re().replace_all(text, "");
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::{
        Citation, Collection, Document, HandlerResult, Paragraph, ScoreSource, Section,
    };
    use std::collections::BTreeMap;

    fn candidate(id: &str, source_url: &str, body: &str) -> CandidatePassage {
        let mut tags = BTreeMap::new();
        tags.insert("topic".to_string(), "x".to_string());
        CandidatePassage {
            document: Document::new(id, Collection::CitedAnswers, source_url, body, Utc::now(), tags, "hash")
                .unwrap(),
            score: 1.0,
            source: ScoreSource::Lexical,
            rank: 1,
        }
    }

    fn cited(text: &str, url: &str) -> Paragraph {
        Paragraph {
            text: text.to_string(),
            citations: vec![Citation::web(url.to_string(), Utc::now())],
        }
    }

    fn uncited(text: &str) -> Paragraph {
        Paragraph {
            text: text.to_string(),
            citations: vec![],
        }
    }

    fn three_authoritative_candidates() -> Vec<CandidatePassage> {
        vec![
            candidate("d1", "https://a.edu/x", "published GPA threshold is 3.2 for internal transfer"),
            candidate("d2", "https://b.gov/y", "federal policy on DACA eligibility"),
            candidate("d3", "https://c.edu/z", "capacity impacted program notes"),
        ]
    }

    #[test]
    fn accepts_a_fully_compliant_result() {
        let validator = Validator::new(ValidatorThresholds::default());
        let candidates = three_authoritative_candidates();
        let result = HandlerResult::new(
            "test_handler",
            vec![Section {
                heading: "GPA Threshold".to_string(),
                paragraphs: vec![
                    cited("GPA Threshold: published GPA threshold is 3.2 for internal transfer", "https://a.edu/x"),
                    cited("Federal policy on DACA eligibility applies", "https://b.gov/y"),
                    cited("Capacity impacted program notes apply here", "https://c.edu/z"),
                ],
            }],
            0.8,
        );

        match validator.validate(result, &candidates, false) {
            ValidationOutcome::Accepted(sealed) => assert!(sealed.is_sealed()),
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn low_citation_coverage_retries_then_abstains() {
        let validator = Validator::new(ValidatorThresholds::default());
        let candidates = three_authoritative_candidates();
        let result = HandlerResult::new(
            "test_handler",
            vec![Section {
                heading: "GPA Threshold".to_string(),
                paragraphs: vec![
                    uncited("GPA threshold is 3.2 for the CS major this cycle"),
                    uncited("DACA eligibility rules differ by state appropriations"),
                ],
            }],
            0.8,
        );

        match validator.validate(result.clone(), &candidates, false) {
            ValidationOutcome::Retry { check: FailedCheck::CitationCoverage, .. } => {}
            other => panic!("expected a first-attempt retry, got {other:?}"),
        }

        match validator.validate(result, &candidates, true) {
            ValidationOutcome::Abstained(a) => assert_eq!(a.reason, AbstentionReason::InsufficientEvidence),
            other => panic!("expected abstention on retry, got {other:?}"),
        }
    }

    #[test]
    fn foreign_citation_url_is_an_integrity_failure_not_a_retry() {
        let validator = Validator::new(ValidatorThresholds::default());
        let candidates = three_authoritative_candidates();
        let result = HandlerResult::new(
            "test_handler",
            vec![Section {
                heading: "GPA Threshold".to_string(),
                paragraphs: vec![cited("GPA threshold is 3.2", "https://not-retrieved.example.com/x")],
            }],
            0.8,
        );

        match validator.validate(result, &candidates, false) {
            ValidationOutcome::Integrity { check: FailedCheck::Fabrication, .. } => {}
            other => panic!("expected an integrity failure, got {other:?}"),
        }
    }

    #[test]
    fn number_not_present_in_any_cited_passage_fails_traceability() {
        let validator = Validator::new(ValidatorThresholds::default());
        let candidates = three_authoritative_candidates();
        let result = HandlerResult::new(
            "test_handler",
            vec![Section {
                heading: "GPA Threshold".to_string(),
                paragraphs: vec![
                    cited("GPA threshold is 3.2 for the CS major", "https://a.edu/x"),
                    cited("DACA eligibility per federal policy", "https://b.gov/y"),
                    cited("The acceptance rate is 4.7% this cycle", "https://c.edu/z"),
                ],
            }],
            0.8,
        );

        match validator.validate(result, &candidates, false) {
            ValidationOutcome::Retry { check: FailedCheck::NumericTraceability, .. } => {}
            other => panic!("expected a numeric-traceability retry, got {other:?}"),
        }
    }

    #[test]
    fn fewer_than_three_authoritative_citations_abstains() {
        let validator = Validator::new(ValidatorThresholds::default());
        let candidates = vec![candidate("d1", "https://a.com/x", "GPA threshold is 3.2 at this school")];
        let result = HandlerResult::new(
            "test_handler",
            vec![Section {
                heading: "GPA Threshold".to_string(),
                paragraphs: vec![cited("GPA threshold is 3.2 at this school", "https://a.com/x")],
            }],
            0.8,
        );

        match validator.validate(result, &candidates, false) {
            ValidationOutcome::Abstained(a) => assert_eq!(a.reason, AbstentionReason::InsufficientEvidence),
            other => panic!("expected an authority-floor abstention, got {other:?}"),
        }
    }

    /// A well-formed section (three distinct authoritative citations,
    /// all numbers traceable) paired with a malformed empty section —
    /// so checks 1-4 pass and the failure is isolated to schema
    /// conformance (check 5).
    fn result_with_one_malformed_section() -> HandlerResult {
        HandlerResult::new(
            "test_handler",
            vec![
                Section {
                    heading: "GPA Threshold".to_string(),
                    paragraphs: vec![
                        cited("GPA threshold is 3.2 for internal transfer", "https://a.edu/x"),
                        cited("Federal policy on DACA eligibility applies", "https://b.gov/y"),
                        cited("Capacity impacted program notes apply here", "https://c.edu/z"),
                    ],
                },
                Section { heading: "Empty".to_string(), paragraphs: vec![] },
            ],
            0.8,
        )
    }

    #[test]
    fn empty_section_fails_schema_conformance() {
        let validator = Validator::new(ValidatorThresholds::default());
        let candidates = three_authoritative_candidates();

        match validator.validate(result_with_one_malformed_section(), &candidates, false) {
            ValidationOutcome::Retry { check: FailedCheck::SchemaConformance, .. } => {}
            other => panic!("expected a schema-conformance retry, got {other:?}"),
        }
    }

    #[test]
    fn malformed_schema_after_retry_is_an_integrity_failure() {
        let validator = Validator::new(ValidatorThresholds::default());
        let candidates = three_authoritative_candidates();

        match validator.validate(result_with_one_malformed_section(), &candidates, true) {
            ValidationOutcome::Integrity { check: FailedCheck::SchemaConformance, .. } => {}
            other => panic!("expected an integrity failure, got {other:?}"),
        }
    }

    #[test]
    fn strips_unframed_first_person_advocacy() {
        let validator = Validator::new(ValidatorThresholds::default());
        let candidates = three_authoritative_candidates();
        let result = HandlerResult::new(
            "test_handler",
            vec![Section {
                heading: "GPA Threshold".to_string(),
                paragraphs: vec![
                    cited(
                        "Published GPA threshold is 3.2. You should pick School A over School B.",
                        "https://a.edu/x",
                    ),
                    cited("Federal policy on DACA eligibility applies", "https://b.gov/y"),
                    cited("Capacity impacted program notes apply here", "https://c.edu/z"),
                ],
            }],
            0.8,
        );

        match validator.validate(result, &candidates, false) {
            ValidationOutcome::Accepted(sealed) => {
                let text = &sealed.sections[0].paragraphs[0].text;
                assert!(!text.to_lowercase().contains("you should pick"));
                assert!(text.contains("3.2"));
            }
            other => panic!("expected acceptance with advocacy stripped, got {other:?}"),
        }
    }

    #[test]
    fn keeps_advocacy_framed_as_a_cited_tradeoff() {
        let validator = Validator::new(ValidatorThresholds::default());
        let candidates = three_authoritative_candidates();
        let result = HandlerResult::new(
            "test_handler",
            vec![Section {
                heading: "GPA Threshold".to_string(),
                paragraphs: vec![
                    {
                        let mut p = cited(
                            "Published GPA threshold is 3.2. As a cited trade-off, you should pick \
                             School A over School B given the capacity figures above.",
                            "https://a.edu/x",
                        );
                        p.citations.push(Citation::web("https://b.gov/y".to_string(), Utc::now()));
                        p
                    },
                    cited("Federal policy on DACA eligibility applies here", "https://b.gov/y"),
                    cited("Capacity impacted program notes apply here", "https://c.edu/z"),
                ],
            }],
            0.8,
        );

        match validator.validate(result, &candidates, false) {
            ValidationOutcome::Accepted(sealed) => {
                let text = &sealed.sections[0].paragraphs[0].text;
                assert!(text.to_lowercase().contains("you should pick"));
            }
            other => panic!("expected the framed trade-off to survive, got {other:?}"),
        }
    }
}
