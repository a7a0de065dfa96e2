use meridian_calculators::SaiInputs;
use meridian_core::{CandidatePassage, HandlerResult, QuerySignals};
use meridian_router::TriggerMatch;

use crate::common::{
    calculation_paragraph, cited_paragraph, insufficient_evidence, section, status_or_token_match,
    CalculatorSuite, Handler, HandlerOutcome,
};

pub const PRIORITY: u16 = 145;
pub const ID: &str = "parent_plus_denial";

pub const VOCABULARY: &[&str] = &["parent plus", "endorser", "denied"];

pub fn trigger(signals: &QuerySignals, _candidates: &[CandidatePassage]) -> Option<TriggerMatch> {
    status_or_token_match(signals, VOCABULARY)
}

/// Consults the SAI calculator to frame the additional unsubsidized
/// loan eligibility a PLUS denial unlocks, and is careful never to
/// state that the denial changes the student's FAFSA dependency status
/// (spec §4.4 table: "must NOT state the student becomes independent").
pub struct ParentPlusDenialHandler;

impl Handler for ParentPlusDenialHandler {
    fn id(&self) -> &'static str {
        ID
    }

    fn apply(
        &self,
        signals: &QuerySignals,
        candidates: &[CandidatePassage],
        calculators: &dyn CalculatorSuite,
    ) -> HandlerOutcome {
        let matches = crate::common::topic_candidates(candidates, VOCABULARY);
        let Some(policy_candidate) = matches.first().copied() else {
            return insufficient_evidence("no retrieved passage addresses Parent PLUS denial policy");
        };

        // Sizing the added unsubsidized eligibility with the SAI
        // calculator is a bonus when the query carries household
        // figures, not a requirement to answer the core pathway
        // question (spec §8 scenario 1 expects an answer with no
        // calculator invocation for a bare denial question).
        let numbers = &signals.numbers;
        let sai_record = match (numbers.parent_agi, numbers.household_size, numbers.number_in_college) {
            (Some(parent_agi), Some(household_size), Some(number_in_college)) => {
                let sai_inputs = SaiInputs {
                    parent_agi,
                    parent_assets: numbers.parent_assets.unwrap_or(0.0),
                    student_income: numbers.student_income.unwrap_or(0.0),
                    household_size,
                    number_in_college,
                };
                calculators.sai(sai_inputs).ok().map(|sai| sai.into_record(&sai_inputs))
            }
            _ => None,
        };

        let mut pathway_paragraphs = vec![cited_paragraph(
            format!(
                "Pathway to Additional Unsubsidized Loans: {}",
                first_sentence(&policy_candidate.document.body)
            ),
            policy_candidate,
        )];
        let mut calculations = Vec::new();
        if let Some(record) = sai_record {
            pathway_paragraphs.push(calculation_paragraph(
                format!(
                    "With a Student Aid Index of {:.2} ({}), the student's loan servicer \
                     determines the added unsubsidized eligibility once a PLUS denial is on file.",
                    record.outputs.get("sai").copied().unwrap_or(0.0),
                    record.version
                ),
                &record,
            ));
            calculations.push(record);
        }

        let mut sections = vec![
            section("Pathway to Additional Unsubsidized Loans", pathway_paragraphs),
            section(
                "Dependency Status Is Unchanged",
                vec![cited_paragraph(
                    "Dependency Status Is Unchanged: a PLUS credit denial does not reclassify the \
                     student as independent for FAFSA purposes; the parent remains a required contributor \
                     on all future applications."
                        .to_string(),
                    policy_candidate,
                )],
            ),
        ];
        crate::common::corroborate(&mut sections, &matches, crate::common::DEFAULT_MIN_AUTHORITATIVE_SOURCES);

        HandlerOutcome::Answer(HandlerResult::new(ID, sections, 0.8).with_calculations(calculations))
    }
}

fn first_sentence(body: &str) -> String {
    body.split(['.', '\n']).next().unwrap_or(body).trim().to_string()
}
