use meridian_core::{CandidatePassage, Collection, HandlerResult, QuerySignals};
use meridian_router::TriggerMatch;

use crate::common::{cited_paragraph, insufficient_evidence, section, CalculatorSuite, Handler, HandlerOutcome};

pub const PRIORITY: u16 = 125;
pub const ID: &str = "cc_to_uc_transfer";

/// Fires purely on `articulation` collection hits (spec §4.4 table:
/// "articulation collection hits ≥1") — there is no separate keyword
/// vocabulary for this handler.
pub fn trigger(_signals: &QuerySignals, candidates: &[CandidatePassage]) -> Option<TriggerMatch> {
    let hits: Vec<&str> = candidates
        .iter()
        .filter(|c| c.document.collection == Collection::Articulation)
        .map(|_| "articulation_hit")
        .collect();
    if hits.is_empty() {
        None
    } else {
        Some(TriggerMatch::new(hits))
    }
}

pub struct CcToUcTransferHandler;

impl Handler for CcToUcTransferHandler {
    fn id(&self) -> &'static str {
        ID
    }

    fn apply(
        &self,
        _signals: &QuerySignals,
        candidates: &[CandidatePassage],
        _calculators: &dyn CalculatorSuite,
    ) -> HandlerOutcome {
        let articulated: Vec<&CandidatePassage> = candidates
            .iter()
            .filter(|c| c.document.collection == Collection::Articulation)
            .collect();
        let Some(primary) = articulated.first().copied() else {
            return insufficient_evidence("no articulation document survived retrieval for this course sequence");
        };

        let course_equivalence = primary.document.entity_tags.get("course_equivalence");
        let Some(course_equivalence) = course_equivalence else {
            return insufficient_evidence("articulation document is missing a course_equivalence tag");
        };

        let mut sections = vec![
            section(
                "Articulated Course Sequence",
                vec![cited_paragraph(
                    format!("Articulated Course Sequence: {course_equivalence}"),
                    primary,
                )],
            ),
            section(
                "Unit Caps",
                vec![cited_paragraph(
                    format!("Unit Caps: {}", first_sentence(&primary.document.body)),
                    primary,
                )],
            ),
            section(
                "Transfer Admission Guarantee",
                vec![cited_paragraph(
                    format!(
                        "Transfer Admission Guarantee: {}",
                        first_sentence(&primary.document.body)
                    ),
                    primary,
                )],
            ),
        ];
        crate::common::corroborate(&mut sections, &articulated, crate::common::DEFAULT_MIN_AUTHORITATIVE_SOURCES);

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
    use meridian_core::{Document, ScoreSource};
    use std::collections::BTreeMap;

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
                body: "articulated course sequence details".to_string(),
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
    fn trigger_requires_an_articulation_collection_hit() {
        let non_articulation = candidate(Collection::CitedAnswers, BTreeMap::new());
        assert!(trigger(&QuerySignals::default(), &[non_articulation]).is_none());
    }

    #[test]
    fn abstains_without_a_course_equivalence_tag() {
        let c = candidate(Collection::Articulation, BTreeMap::new());
        let handler = CcToUcTransferHandler;
        let outcome = handler.apply(&QuerySignals::default(), &[c], &DefaultCalculators);
        assert!(matches!(outcome, HandlerOutcome::Abstain(_)));
    }

    #[test]
    fn answers_with_three_fixed_sections_when_tagged() {
        let mut tags = BTreeMap::new();
        tags.insert("course_equivalence".to_string(), "CS 1A -> CSE 8A".to_string());
        let c = candidate(Collection::Articulation, tags);
        let handler = CcToUcTransferHandler;
        let outcome = handler.apply(&QuerySignals::default(), &[c], &DefaultCalculators);
        match outcome {
            HandlerOutcome::Answer(result) => assert_eq!(result.sections.len(), 3),
            HandlerOutcome::Abstain(a) => panic!("expected an answer, got abstention: {a:?}"),
        }
    }
}
