use meridian_calculators::{CoaInputs, HousingType, ResidencyStatus};
use meridian_core::{CandidatePassage, Collection, HandlerResult, QuerySignals};
use meridian_router::TriggerMatch;

use crate::common::{
    calculation_paragraph, cited_paragraph, insufficient_evidence, section, status_or_token_match,
    CalculatorSuite, Handler, HandlerOutcome,
};

pub const PRIORITY: u16 = 145;
pub const ID: &str = "disability_504";

pub const VOCABULARY: &[&str] = &["ada", "504", "iep", "accommodations", "vocational rehabilitation", "disability", "disabled"];

pub fn trigger(signals: &QuerySignals, _candidates: &[CandidatePassage]) -> Option<TriggerMatch> {
    status_or_token_match(signals, VOCABULARY)
}

/// Runs the COA calculator over an institution's published per-term
/// components to frame the accommodation-driven cost adjustment (spec
/// §4.4 table: "COA adjustment, reduced load still full-time").
/// Published components arrive as `cds_data` entity tags rather than
/// free text, matching how `meridian-storage` documents carry them.
pub struct Disability504Handler;

impl Handler for Disability504Handler {
    fn id(&self) -> &'static str {
        ID
    }

    fn apply(
        &self,
        _signals: &QuerySignals,
        candidates: &[CandidatePassage],
        calculators: &dyn CalculatorSuite,
    ) -> HandlerOutcome {
        let matches = crate::common::topic_candidates(candidates, VOCABULARY);
        let Some(policy_candidate) = matches.first().copied() else {
            return insufficient_evidence("no retrieved passage addresses 504/ADA accommodation policy");
        };

        let cds_candidate = candidates.iter().find(|c| c.document.collection == Collection::CdsData);

        let coa_section = match cds_candidate.and_then(|c| coa_inputs_from_tags(c)) {
            Some(inputs) => match calculators.coa(inputs.clone()) {
                Ok(result) => {
                    let record = result.clone().into_record(&inputs);
                    Some(section(
                        "Cost of Attendance Adjustment",
                        vec![calculation_paragraph(
                            format!(
                                "Cost of Attendance Adjustment: published components sum to ${:.2}, as published by {}; \
                                 a reduced course load for documented accommodations does not change full-time status for aid purposes.",
                                result.total, inputs.institution
                            ),
                            &record,
                        )],
                    ))
                }
                Err(_) => None,
            },
            None => None,
        };

        let mut sections = vec![section(
            "Accommodation Policy",
            vec![cited_paragraph(
                format!("Accommodation Policy: {}", first_sentence(&policy_candidate.document.body)),
                policy_candidate,
            )],
        )];
        if let Some(coa_section) = coa_section {
            sections.push(coa_section);
        }
        sections.push(section(
            "Professional Judgment Review",
            vec![cited_paragraph(
                format!(
                    "Professional Judgment Review: {}",
                    first_sentence(&policy_candidate.document.body)
                ),
                policy_candidate,
            )],
        ));
        crate::common::corroborate(&mut sections, &matches, crate::common::DEFAULT_MIN_AUTHORITATIVE_SOURCES);

        HandlerOutcome::Answer(HandlerResult::new(ID, sections, 0.75))
    }
}

fn coa_inputs_from_tags(candidate: &CandidatePassage) -> Option<CoaInputs> {
    let tags = &candidate.document.entity_tags;
    Some(CoaInputs {
        institution: tags.get("institution")?.clone(),
        academic_year: tags.get("academic_year")?.clone(),
        residency: ResidencyStatus::InState,
        housing: HousingType::OnCampus,
        tuition: tags.get("tuition")?.parse().ok()?,
        fees: tags.get("fees")?.parse().ok()?,
        housing_cost: tags.get("housing_cost")?.parse().ok()?,
        food: tags.get("food")?.parse().ok()?,
        books: tags.get("books")?.parse().ok()?,
        transportation: tags.get("transportation")?.parse().ok()?,
        source_url: candidate.document.source_url.clone(),
        last_verified: candidate.document.last_verified,
    })
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

    fn policy_candidate(id: &str, source_url: &str, body: &str) -> CandidatePassage {
        let mut tags = BTreeMap::new();
        tags.insert("topic".to_string(), "x".to_string());
        CandidatePassage {
            document: Document::new(id, Collection::CitedAnswers, source_url, body, Utc::now(), tags, "hash").unwrap(),
            score: 1.0,
            source: ScoreSource::Lexical,
            rank: 1,
        }
    }

    fn cds_candidate(id: &str, source_url: &str) -> CandidatePassage {
        let mut tags = BTreeMap::new();
        tags.insert("institution".to_string(), "Example University".to_string());
        tags.insert("academic_year".to_string(), "2024-25".to_string());
        tags.insert("metric_kind".to_string(), "cost_of_attendance".to_string());
        tags.insert("tuition".to_string(), "12000".to_string());
        tags.insert("fees".to_string(), "1500".to_string());
        tags.insert("housing_cost".to_string(), "14000".to_string());
        tags.insert("food".to_string(), "5500".to_string());
        tags.insert("books".to_string(), "1200".to_string());
        tags.insert("transportation".to_string(), "900".to_string());
        CandidatePassage {
            document: Document::new(
                id,
                Collection::CdsData,
                source_url,
                "published cost of attendance components",
                Utc::now(),
                tags,
                "hash",
            )
            .unwrap(),
            score: 1.0,
            source: ScoreSource::Lexical,
            rank: 1,
        }
    }

    #[test]
    fn abstains_when_nothing_addresses_504_ada_accommodation_policy() {
        let candidates = vec![policy_candidate("d1", "https://a.edu/x", "unrelated housing text")];
        let handler = Disability504Handler;
        let outcome = handler.apply(&QuerySignals::default(), &candidates, &DefaultCalculators);
        assert!(matches!(outcome, HandlerOutcome::Abstain(_)));
    }

    #[test]
    fn answers_with_cost_of_attendance_adjustment_when_a_cds_data_candidate_is_present() {
        let candidates = vec![
            policy_candidate("policy", "https://a.edu/504", "504 accommodations and iep policy for reduced course load"),
            cds_candidate("cds", "https://a.edu/cost"),
        ];
        let handler = Disability504Handler;
        let outcome = handler.apply(&QuerySignals::default(), &candidates, &DefaultCalculators);
        match outcome {
            HandlerOutcome::Answer(result) => {
                assert_eq!(result.sections.len(), 3);
                assert_eq!(result.sections[0].heading, "Accommodation Policy");
                assert_eq!(result.sections[1].heading, "Cost of Attendance Adjustment");
                assert_eq!(result.sections[2].heading, "Professional Judgment Review");
            }
            HandlerOutcome::Abstain(a) => panic!("expected an answer, got abstention: {a:?}"),
        }
    }

    #[test]
    fn answers_without_the_coa_section_when_no_cds_data_candidate_is_present() {
        let candidates = vec![policy_candidate(
            "policy",
            "https://a.edu/504",
            "504 accommodations and iep policy for reduced course load",
        )];
        let handler = Disability504Handler;
        let outcome = handler.apply(&QuerySignals::default(), &candidates, &DefaultCalculators);
        match outcome {
            HandlerOutcome::Answer(result) => {
                assert_eq!(result.sections.len(), 2);
                assert_eq!(result.sections[0].heading, "Accommodation Policy");
                assert_eq!(result.sections[1].heading, "Professional Judgment Review");
            }
            HandlerOutcome::Abstain(a) => panic!("expected an answer, got abstention: {a:?}"),
        }
    }

    /// Regression test for the COA calculator citation defect: a
    /// decorated (non-bare) citation URL would fall through
    /// `check_fabrication`'s `_` arm and be rejected as a foreign
    /// citation even though it came from this engine's own calculator.
    /// Running the handler's output through the real `Validator` here
    /// (rather than only asserting section shape) is what catches that.
    #[test]
    fn coa_section_survives_the_real_validator() {
        use meridian_validator::{ValidationOutcome, Validator, ValidatorThresholds};

        let candidates = vec![
            policy_candidate("policy-1", "https://a.edu/504", "504 accommodations and iep policy for reduced course load"),
            policy_candidate("policy-2", "https://b.edu/504-appeals", "ada vocational rehabilitation accommodations guidance"),
            policy_candidate("policy-3", "https://c.gov/504-federal", "federal disability accommodations guidance for 504 plans"),
            cds_candidate("cds", "https://d.edu/cost"),
        ];
        let handler = Disability504Handler;
        let outcome = handler.apply(&QuerySignals::default(), &candidates, &DefaultCalculators);
        let result = match outcome {
            HandlerOutcome::Answer(result) => result,
            HandlerOutcome::Abstain(a) => panic!("expected an answer, got abstention: {a:?}"),
        };

        let validator = Validator::new(ValidatorThresholds::default());
        match validator.validate(result, &candidates, false) {
            ValidationOutcome::Accepted(_) => {}
            other => panic!("expected the validator to accept the COA-bearing result, got {other:?}"),
        }
    }
}
