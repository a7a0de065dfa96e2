//! The Formatter interface of spec §6 — the generative reformatting
//! LLM is an external collaborator (spec §1), so this crate defines
//! only the contract it must honor plus a conformance-checked
//! reference implementation, [`PassthroughFormatter`], that performs
//! prose smoothing that is a structural no-op: it never adds or drops
//! a number, citation URL, or section.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use meridian_core::{CalculationRecord, Outcome, Response};
use regex::Regex;

/// What the core emits downstream of validation: prose text plus the
/// exact set of citation URLs and numbers it drew from, so a
/// conformance check can verify the Formatter didn't invent anything
/// (spec §6: "A conformance test over its output compares the set of
/// numbers and citations against the input").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub body: String,
    pub citation_urls: BTreeSet<String>,
    pub numbers: BTreeSet<String>,
}

pub trait Formatter {
    fn format(&self, response: &Response) -> RenderedResponse;
}

/// Reference implementation: converts the sealed, structured
/// [`Response`] into prose with numbered citation markers, performing
/// no rephrasing beyond joining paragraphs and headings into readable
/// text. A real generative reformatter (out of scope, spec §1) would
/// replace this while honoring the same contract; this type exists so
/// the rest of the workspace — and its tests — has something to call,
/// and so [`check_round_trip`] has a known-good baseline to validate
/// against.
pub struct PassthroughFormatter;

impl Formatter for PassthroughFormatter {
    fn format(&self, response: &Response) -> RenderedResponse {
        match &response.outcome {
            Outcome::Answered(answer) => {
                let mut body = String::new();
                let mut citation_urls = BTreeSet::new();
                let mut numbers = BTreeSet::new();
                let mut marker = 1usize;

                for section in &answer.sections {
                    body.push_str(&format!("## {}\n\n", section.heading));
                    for paragraph in &section.paragraphs {
                        body.push_str(paragraph.text.trim());
                        let mut markers = Vec::new();
                        for citation in &paragraph.citations {
                            citation_urls.insert(citation.url.clone());
                            markers.push(format!("[{marker}]"));
                            marker += 1;
                        }
                        if !markers.is_empty() {
                            body.push(' ');
                            body.push_str(&markers.join(""));
                        }
                        body.push_str("\n\n");
                        numbers.extend(extract_numbers(&paragraph.text));
                    }
                }

                for calc in &response.calculations {
                    numbers.extend(calculation_numbers(calc));
                    citation_urls.insert(calc.citation.url.clone());
                }

                RenderedResponse { body, citation_urls, numbers }
            }
            Outcome::Abstained(abstention) => {
                let mut body = format!("Unable to answer ({}): {}", abstention.reason.as_str(), abstention.message);
                if let Some(plan) = &abstention.retrieval_plan {
                    body.push_str(&format!("\n\nWhat would help: {plan}"));
                }
                RenderedResponse {
                    body,
                    citation_urls: BTreeSet::new(),
                    numbers: BTreeSet::new(),
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConformanceViolation {
    #[error("rendered output drops citation(s) present in the input: {0:?}")]
    MissingCitations(BTreeSet<String>),
    #[error("rendered output introduces citation(s) absent from the input: {0:?}")]
    FabricatedCitations(BTreeSet<String>),
    #[error("rendered output drops number(s) present in the input: {0:?}")]
    MissingNumbers(BTreeSet<String>),
    #[error("rendered output introduces number(s) absent from the input: {0:?}")]
    FabricatedNumbers(BTreeSet<String>),
}

/// Verify the round-trip invariant of spec §6 / §8 (testable property
/// 4): the Formatter's output contains exactly the set of citation
/// URLs and exactly the set of numbers the input carried — no more, no
/// fewer. Applied as a post-hoc check over any `Formatter`
/// implementation, not just [`PassthroughFormatter`].
pub fn check_round_trip(response: &Response, rendered: &RenderedResponse) -> Result<(), ConformanceViolation> {
    let expected_citations = expected_citation_urls(response);
    let missing_citations: BTreeSet<_> = expected_citations.difference(&rendered.citation_urls).cloned().collect();
    if !missing_citations.is_empty() {
        return Err(ConformanceViolation::MissingCitations(missing_citations));
    }
    let fabricated_citations: BTreeSet<_> = rendered.citation_urls.difference(&expected_citations).cloned().collect();
    if !fabricated_citations.is_empty() {
        return Err(ConformanceViolation::FabricatedCitations(fabricated_citations));
    }

    let expected_numbers = expected_numbers(response);
    let missing_numbers: BTreeSet<_> = expected_numbers.difference(&rendered.numbers).cloned().collect();
    if !missing_numbers.is_empty() {
        return Err(ConformanceViolation::MissingNumbers(missing_numbers));
    }
    let fabricated_numbers: BTreeSet<_> = rendered.numbers.difference(&expected_numbers).cloned().collect();
    if !fabricated_numbers.is_empty() {
        return Err(ConformanceViolation::FabricatedNumbers(fabricated_numbers));
    }

    Ok(())
}

fn expected_citation_urls(response: &Response) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();
    if let Outcome::Answered(answer) = &response.outcome {
        for section in &answer.sections {
            for paragraph in &section.paragraphs {
                for citation in &paragraph.citations {
                    urls.insert(citation.url.clone());
                }
            }
        }
    }
    for calc in &response.calculations {
        urls.insert(calc.citation.url.clone());
    }
    urls
}

fn expected_numbers(response: &Response) -> BTreeSet<String> {
    let mut numbers = BTreeSet::new();
    if let Outcome::Answered(answer) = &response.outcome {
        for section in &answer.sections {
            for paragraph in &section.paragraphs {
                numbers.extend(extract_numbers(&paragraph.text));
            }
        }
    }
    for calc in &response.calculations {
        numbers.extend(calculation_numbers(calc));
    }
    numbers
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$?\d[\d,]*(?:\.\d+)?%?").unwrap())
}

fn extract_numbers(text: &str) -> Vec<String> {
    number_re()
        .find_iter(text)
        .map(|m| m.as_str().trim_start_matches('$').trim_end_matches('%').to_string())
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()))
        .collect()
}

fn calculation_numbers(record: &CalculationRecord) -> Vec<String> {
    record
        .inputs
        .values()
        .chain(record.outputs.values())
        .map(|v| format!("{v:.2}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::{
        Abstention, AbstentionReason, Answer, Citation, Paragraph, Section,
    };

    fn sample_response() -> Response {
        Response {
            outcome: Outcome::Answered(Answer {
                handler_id: "cs_internal_transfer".to_string(),
                sections: vec![Section {
                    heading: "GPA Threshold".to_string(),
                    paragraphs: vec![Paragraph {
                        text: "The published internal-transfer threshold is a 3.2 cumulative GPA.".to_string(),
                        citations: vec![Citation::web("https://cs.washington.edu/transfer".to_string(), Utc::now())],
                    }],
                }],
                confidence: 0.8,
            }),
            calculations: vec![],
        }
    }

    #[test]
    fn passthrough_preserves_every_citation_and_number() {
        let response = sample_response();
        let rendered = PassthroughFormatter.format(&response);
        assert!(check_round_trip(&response, &rendered).is_ok());
    }

    #[test]
    fn passthrough_includes_section_heading_in_body() {
        let response = sample_response();
        let rendered = PassthroughFormatter.format(&response);
        assert!(rendered.body.contains("GPA Threshold"));
        assert!(rendered.body.contains("[1]"));
    }

    #[test]
    fn round_trip_catches_a_fabricated_number() {
        let response = sample_response();
        let mut rendered = PassthroughFormatter.format(&response);
        rendered.numbers.insert("4.0".to_string());
        assert_eq!(
            check_round_trip(&response, &rendered),
            Err(ConformanceViolation::FabricatedNumbers(BTreeSet::from(["4.0".to_string()])))
        );
    }

    #[test]
    fn round_trip_catches_a_dropped_citation() {
        let response = sample_response();
        let mut rendered = PassthroughFormatter.format(&response);
        rendered.citation_urls.clear();
        match check_round_trip(&response, &rendered) {
            Err(ConformanceViolation::MissingCitations(_)) => {}
            other => panic!("expected missing-citations violation, got {other:?}"),
        }
    }

    #[test]
    fn abstention_renders_reason_and_retrieval_plan() {
        let response = Response::abstained(
            Abstention::new(AbstentionReason::TemporalOutOfRange, "cannot predict future admit rates")
                .with_retrieval_plan("historical cds_data is the available substitute"),
        );
        let rendered = PassthroughFormatter.format(&response);
        assert!(rendered.body.contains("TEMPORAL_OUT_OF_RANGE"));
        assert!(rendered.body.contains("historical cds_data"));
        assert!(rendered.citation_urls.is_empty());
    }
}
