use meridian_core::{AbstentionReason, Abstention, CandidatePassage, QuerySignals};
use meridian_router::TriggerMatch;

use crate::common::{status_or_token_match, CalculatorSuite, Handler, HandlerOutcome};

pub const PRIORITY: u16 = 100;
pub const ID: &str = "ofac_sanctions";

pub const VOCABULARY: &[&str] = &["ofac", "sanctioned country", "sanctions", "embargoed", "cuba", "iran", "north korea", "syria"];

pub fn trigger(signals: &QuerySignals, _candidates: &[CandidatePassage]) -> Option<TriggerMatch> {
    status_or_token_match(signals, VOCABULARY)
}

/// Never produces an answer: a query naming an OFAC-sanctioned
/// jurisdiction is always routed to a compliance abstention with
/// pointers, never a synthesized answer (spec §4.4 table: "compliance
/// abstention with pointers").
pub struct OfacSanctionsHandler;

impl Handler for OfacSanctionsHandler {
    fn id(&self) -> &'static str {
        ID
    }

    fn apply(
        &self,
        _signals: &QuerySignals,
        _candidates: &[CandidatePassage],
        _calculators: &dyn CalculatorSuite,
    ) -> HandlerOutcome {
        HandlerOutcome::Abstain(
            Abstention::new(
                AbstentionReason::OutOfScope,
                "Questions involving sanctioned or embargoed jurisdictions require institutional \
                 export-control and OFAC compliance review; this engine does not synthesize eligibility \
                 determinations for them.",
            )
            .with_retrieval_plan(
                "Route to the institution's export-control/compliance office and, for payment or \
                 enrollment specifics, the U.S. Treasury OFAC sanctions list for the named jurisdiction.",
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DefaultCalculators;

    #[test]
    fn always_abstains_as_out_of_scope() {
        let handler = OfacSanctionsHandler;
        let outcome = handler.apply(&QuerySignals::default(), &[], &DefaultCalculators);
        match outcome {
            HandlerOutcome::Abstain(a) => assert_eq!(a.reason, AbstentionReason::OutOfScope),
            HandlerOutcome::Answer(_) => panic!("this handler must never answer"),
        }
    }
}
