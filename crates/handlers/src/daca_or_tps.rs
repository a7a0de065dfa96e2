use meridian_core::{CandidatePassage, HandlerResult, QuerySignals};
use meridian_router::TriggerMatch;

use crate::common::{
    cited_paragraph, insufficient_evidence, section, status_or_token_match, topic_candidates,
    CalculatorSuite, Handler, HandlerOutcome,
};

pub const PRIORITY: u16 = 140;
pub const ID: &str = "daca_or_tps";

pub const VOCABULARY: &[&str] = &["daca", "tps", "undocumented", "ab 540"];

pub fn trigger(signals: &QuerySignals, _candidates: &[CandidatePassage]) -> Option<TriggerMatch> {
    status_or_token_match(signals, VOCABULARY)
}

pub struct DacaOrTpsHandler;

impl Handler for DacaOrTpsHandler {
    fn id(&self) -> &'static str {
        ID
    }

    fn apply(
        &self,
        _signals: &QuerySignals,
        candidates: &[CandidatePassage],
        _calculators: &dyn CalculatorSuite,
    ) -> HandlerOutcome {
        let matches = topic_candidates(candidates, VOCABULARY);
        if matches.is_empty() {
            return insufficient_evidence("no retrieved passage addresses DACA/TPS aid eligibility");
        }
        let primary = matches[0];
        let state_aid = matches.get(1).copied().unwrap_or(primary);
        let private_list = matches.last().copied().unwrap_or(primary);

        let mut sections = vec![
            section(
                "Federal Aid Ineligibility",
                vec![cited_paragraph(
                    format!("Federal Aid Ineligibility: {}", first_sentence(&primary.document.body)),
                    primary,
                )],
            ),
            section(
                "State-Level Aid",
                vec![cited_paragraph(
                    format!("State-Level Aid: {}", first_sentence(&state_aid.document.body)),
                    state_aid,
                )],
            ),
            section(
                "Meets-Need Private List",
                vec![cited_paragraph(
                    format!(
                        "Meets-Need Private List: {}",
                        first_sentence(&private_list.document.body)
                    ),
                    private_list,
                )],
            ),
        ];
        crate::common::corroborate(&mut sections, &matches, crate::common::DEFAULT_MIN_AUTHORITATIVE_SOURCES);

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
    use meridian_core::{Collection, Document, ScoreSource};
    use std::collections::BTreeMap;

    fn candidate(id: &str, body: &str) -> CandidatePassage {
        let mut tags = BTreeMap::new();
        tags.insert("topic".to_string(), "x".to_string());
        CandidatePassage {
            document: Document::new(id, Collection::CitedAnswers, "https://a.edu/x", body, Utc::now(), tags, "hash").unwrap(),
            score: 1.0,
            source: ScoreSource::Lexical,
            rank: 1,
        }
    }

    #[test]
    fn abstains_when_nothing_addresses_daca_or_tps() {
        let candidates = vec![candidate("d1", "unrelated housing text")];
        let handler = DacaOrTpsHandler;
        let outcome = handler.apply(&QuerySignals::default(), &candidates, &DefaultCalculators);
        assert!(matches!(outcome, HandlerOutcome::Abstain(_)));
    }

    #[test]
    fn answers_with_three_fixed_sections() {
        let candidates = vec![candidate("d1", "daca students are not eligible for federal aid")];
        let handler = DacaOrTpsHandler;
        let outcome = handler.apply(&QuerySignals::default(), &candidates, &DefaultCalculators);
        match outcome {
            HandlerOutcome::Answer(result) => {
                assert_eq!(result.sections.len(), 3);
                assert_eq!(result.sections[0].heading, "Federal Aid Ineligibility");
            }
            HandlerOutcome::Abstain(a) => panic!("expected an answer, got abstention: {a:?}"),
        }
    }
}
