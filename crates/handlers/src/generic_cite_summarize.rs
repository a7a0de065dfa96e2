use meridian_core::{CandidatePassage, HandlerResult, QuerySignals};

use crate::common::{cited_paragraph, insufficient_evidence, section, CalculatorSuite, Handler, HandlerOutcome};

pub const PRIORITY: u16 = 50;
pub const ID: &str = "generic_cite_summarize";

/// The fallback handler (spec §4.3: "If no handler fires but retrieval
/// returned ≥3 candidates, the Router falls back to a generic
/// cite-and-summarize handler"). It has no firing predicate of its
/// own — the Router selects it explicitly — so it isn't registered
/// with a trigger in [`crate::registry`].
pub struct GenericCiteSummarizeHandler;

impl Handler for GenericCiteSummarizeHandler {
    fn id(&self) -> &'static str {
        ID
    }

    fn apply(
        &self,
        _signals: &QuerySignals,
        candidates: &[CandidatePassage],
        _calculators: &dyn CalculatorSuite,
    ) -> HandlerOutcome {
        if candidates.is_empty() {
            return insufficient_evidence("no candidates survived retrieval to summarize");
        }

        let paragraphs = candidates
            .iter()
            .map(|c| {
                cited_paragraph(
                    first_sentence(&c.document.body).to_string(),
                    c,
                )
            })
            .collect();

        let sections = vec![section("Summary", paragraphs)];
        HandlerOutcome::Answer(HandlerResult::new(ID, sections, 0.55))
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
    use meridian_core::{Collection, Document, ScoreSource};
    use std::collections::BTreeMap;

    fn candidate(id: &str) -> CandidatePassage {
        let mut tags = BTreeMap::new();
        tags.insert("topic".to_string(), "x".to_string());
        CandidatePassage {
            document: Document::new(id, Collection::CitedAnswers, "https://a.edu/x", "some policy text", Utc::now(), tags, "hash").unwrap(),
            score: 1.0,
            source: ScoreSource::Lexical,
            rank: 1,
        }
    }

    #[test]
    fn abstains_when_no_candidates_survived_retrieval() {
        let handler = GenericCiteSummarizeHandler;
        let outcome = handler.apply(&QuerySignals::default(), &[], &DefaultCalculators);
        assert!(matches!(outcome, HandlerOutcome::Abstain(_)));
    }

    #[test]
    fn summarizes_one_paragraph_per_candidate() {
        let candidates = vec![candidate("d1"), candidate("d2"), candidate("d3")];
        let handler = GenericCiteSummarizeHandler;
        let outcome = handler.apply(&QuerySignals::default(), &candidates, &DefaultCalculators);
        match outcome {
            HandlerOutcome::Answer(result) => {
                assert_eq!(result.sections.len(), 1);
                assert_eq!(result.sections[0].paragraphs.len(), 3);
            }
            HandlerOutcome::Abstain(a) => panic!("expected an answer, got abstention: {a:?}"),
        }
    }
}
