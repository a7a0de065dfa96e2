use meridian_core::{CandidatePassage, Collection, HandlerResult, QuerySignals};
use meridian_router::TriggerMatch;

use crate::common::{cited_paragraph, insufficient_evidence, section, CalculatorSuite, Handler, HandlerOutcome};

pub const PRIORITY: u16 = 140;
pub const ID: &str = "cs_internal_transfer";

pub const VOCABULARY: &[&str] = &["cs", "computer science", "internal transfer", "major gate", "capacity"];

/// Fires only when the query's vocabulary matches AND retrieval
/// actually surfaced a `major_gates` document (spec §4.4 table:
/// "terms {...} + major_gates hits ≥1").
pub fn trigger(signals: &QuerySignals, candidates: &[CandidatePassage]) -> Option<TriggerMatch> {
    let matched: Vec<&str> = VOCABULARY
        .iter()
        .copied()
        .filter(|term| signals.has_status(term) || signals.tokens.contains(*term))
        .collect();
    if matched.is_empty() {
        return None;
    }
    let has_major_gate_hit = candidates.iter().any(|c| c.document.collection == Collection::MajorGates);
    has_major_gate_hit.then(|| TriggerMatch::new(matched))
}

pub struct CsInternalTransferHandler;

impl Handler for CsInternalTransferHandler {
    fn id(&self) -> &'static str {
        ID
    }

    fn apply(
        &self,
        _signals: &QuerySignals,
        candidates: &[CandidatePassage],
        _calculators: &dyn CalculatorSuite,
    ) -> HandlerOutcome {
        let gate_candidate = candidates.iter().find(|c| c.document.collection == Collection::MajorGates);
        let Some(gate_candidate) = gate_candidate else {
            return insufficient_evidence("no major_gates document survived retrieval for this institution/major");
        };

        let gpa_threshold = gate_candidate.document.entity_tags.get("gpa_threshold");
        let capacity_flag = gate_candidate.document.entity_tags.get("capacity_flag");

        let gpa_text = match gpa_threshold {
            Some(value) => format!("GPA Threshold: the published internal-transfer threshold is a {value} cumulative GPA."),
            None => return insufficient_evidence("major_gates document is missing a published gpa_threshold tag"),
        };
        let capacity_text = match capacity_flag {
            Some(value) => format!("Capacity Risk Framing: the program reports capacity status '{value}' for this cycle."),
            None => return insufficient_evidence("major_gates document is missing a capacity_flag tag"),
        };

        let mut sections = vec![
            section("GPA Threshold", vec![cited_paragraph(gpa_text, gate_candidate)]),
            section(
                "Course Requirements",
                vec![cited_paragraph(
                    format!(
                        "Course Requirements: {}",
                        first_sentence(&gate_candidate.document.body)
                    ),
                    gate_candidate,
                )],
            ),
            section("Capacity Risk Framing", vec![cited_paragraph(capacity_text, gate_candidate)]),
        ];
        let pool: Vec<&CandidatePassage> = candidates.iter().collect();
        crate::common::corroborate(&mut sections, &pool, crate::common::DEFAULT_MIN_AUTHORITATIVE_SOURCES);

        HandlerOutcome::Answer(HandlerResult::new(ID, sections, 0.8))
    }
}

fn first_sentence(body: &str) -> String {
    body.split(['.', '\n']).next().unwrap_or(body).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DefaultCalculators;
    use chrono::Utc;
    use meridian_core::{Document, QuerySignals, ScoreSource};
    use std::collections::BTreeMap;

    fn signals() -> QuerySignals {
        let mut s = QuerySignals::default();
        s.tokens.insert("computer science".to_string());
        s.tokens.insert("internal transfer".to_string());
        s
    }

    /// Builds the `Document` struct literal directly rather than through
    /// `Document::new`, which enforces the collection's required tags at
    /// construction — these tests deliberately exercise a document that is
    /// missing one, to cover the handler's own defensive tag lookups.
    fn candidate(collection: Collection, tags: BTreeMap<String, String>) -> CandidatePassage {
        CandidatePassage {
            document: Document {
                id: "d1".to_string(),
                collection,
                source_url: "https://a.edu/x".to_string(),
                body: "cs internal transfer gate policy".to_string(),
                last_verified: Utc::now(),
                entity_tags: tags,
                effective_range: None,
                content_hash: "hash".to_string(),
                embedding: None,
            },
            score: 1.0,
            source: ScoreSource::Lexical,
            rank: 1,
        }
    }

    #[test]
    fn does_not_trigger_without_a_major_gates_hit_even_with_matching_vocabulary() {
        let c = candidate(Collection::CitedAnswers, BTreeMap::new());
        assert!(trigger(&signals(), &[c]).is_none());
    }

    #[test]
    fn abstains_when_tags_are_missing() {
        let c = candidate(Collection::MajorGates, BTreeMap::new());
        let handler = CsInternalTransferHandler;
        let outcome = handler.apply(&signals(), &[c], &DefaultCalculators);
        assert!(matches!(outcome, HandlerOutcome::Abstain(_)));
    }

    #[test]
    fn answers_with_gpa_and_capacity_sections_when_tagged() {
        let mut tags = BTreeMap::new();
        tags.insert("gpa_threshold".to_string(), "3.2".to_string());
        tags.insert("capacity_flag".to_string(), "impacted".to_string());
        let c = candidate(Collection::MajorGates, tags);
        let handler = CsInternalTransferHandler;
        let outcome = handler.apply(&signals(), &[c], &DefaultCalculators);
        match outcome {
            HandlerOutcome::Answer(result) => assert_eq!(result.sections.len(), 3),
            HandlerOutcome::Abstain(a) => panic!("expected an answer, got abstention: {a:?}"),
        }
    }
}
