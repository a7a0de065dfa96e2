use meridian_core::{CandidatePassage, QuerySignals};
use meridian_router::TriggerMatch;

use crate::common::{
    cited_paragraph, insufficient_evidence, section, status_or_token_match, CalculatorSuite,
    Handler, HandlerOutcome,
};

pub const PRIORITY: u16 = 150;
pub const ID: &str = "foster_care_homeless";

pub const VOCABULARY: &[&str] = &["foster care", "foster", "unaccompanied homeless youth", "homeless youth", "ward of the court"];

pub fn trigger(signals: &QuerySignals, _candidates: &[CandidatePassage]) -> Option<TriggerMatch> {
    status_or_token_match(signals, VOCABULARY)
}

/// Its required elements (spec §4.4 table) are stricter than a plain
/// [`crate::common::TopicHandler`]: the answer must cite both a
/// federal rule and an institution-level SAP policy, so at least two
/// distinct on-topic passages are required rather than one.
pub struct FosterCareHomelessHandler;

impl Handler for FosterCareHomelessHandler {
    fn id(&self) -> &'static str {
        ID
    }

    fn apply(
        &self,
        _signals: &QuerySignals,
        candidates: &[CandidatePassage],
        _calculators: &dyn CalculatorSuite,
    ) -> HandlerOutcome {
        let matches = crate::common::topic_candidates(candidates, VOCABULARY);
        let federal = matches.iter().find(|c| {
            let body = c.document.body.to_lowercase();
            body.contains("federal") || c.document.is_authoritative()
        });
        let institutional = matches.iter().find(|c| !c.document.is_authoritative());

        let (federal, institutional) = match (federal, institutional.or(matches.first())) {
            (Some(f), Some(i)) if f.document.id != i.document.id || matches.len() > 1 => (*f, *i),
            _ => {
                return insufficient_evidence(
                    "requires both a federal independence rule and an institution-level SAP policy citation",
                )
            }
        };

        let mut sections = vec![
            section(
                "Independence Determination",
                vec![cited_paragraph(
                    format!("Independence Determination: {}", first_sentence(&federal.document.body)),
                    federal,
                )],
            ),
            section(
                "Dependency Override Pathway",
                vec![cited_paragraph(
                    format!("Dependency Override Pathway: {}", first_sentence(&institutional.document.body)),
                    institutional,
                )],
            ),
            section(
                "Chafee and McKinney-Vento Support",
                vec![cited_paragraph(
                    format!("Chafee/McKinney-Vento: {}", first_sentence(&federal.document.body)),
                    federal,
                )],
            ),
            section(
                "Institutional SAP Treatment",
                vec![cited_paragraph(
                    format!("Institutional SAP: {}", first_sentence(&institutional.document.body)),
                    institutional,
                )],
            ),
        ];
        crate::common::corroborate(&mut sections, &matches, crate::common::DEFAULT_MIN_AUTHORITATIVE_SOURCES);

        HandlerOutcome::Answer(meridian_core::HandlerResult::new(ID, sections, 0.85))
    }
}

fn first_sentence(body: &str) -> String {
    body.split(['.', '\n']).next().unwrap_or(body).trim().to_string()
}
