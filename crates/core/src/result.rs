use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    Web,
    Formula,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub kind: CitationKind,
    pub last_verified: Option<DateTime<Utc>>,
}

impl Citation {
    pub fn web(url: impl Into<String>, last_verified: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            kind: CitationKind::Web,
            last_verified: Some(last_verified),
        }
    }

    pub fn formula(name: impl Into<String>) -> Self {
        Self {
            url: format!("formula:{}", name.into()),
            kind: CitationKind::Formula,
            last_verified: None,
        }
    }

    pub fn internal(url: impl Into<String>, last_verified: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            kind: CitationKind::Internal,
            last_verified: Some(last_verified),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub paragraphs: Vec<Paragraph>,
}

/// A calculator invocation echoed alongside the answer, per spec §4.5:
/// "Formula version string is returned alongside the number."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRecord {
    pub name: String,
    pub version: String,
    pub inputs: BTreeMap<String, f64>,
    pub outputs: BTreeMap<String, f64>,
    pub citation: Citation,
}

/// The structured object a `Handler` returns before validation (spec §3,
/// "Handler Result"). Becomes immutable ("sealed") once the Validator
/// accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerResult {
    pub handler_id: String,
    pub sections: Vec<Section>,
    pub confidence: f32,
    pub calculations: Vec<CalculationRecord>,
    sealed: bool,
}

impl HandlerResult {
    pub fn new(handler_id: impl Into<String>, sections: Vec<Section>, confidence: f32) -> Self {
        Self {
            handler_id: handler_id.into(),
            sections,
            confidence: confidence.clamp(0.0, 1.0),
            calculations: Vec::new(),
            sealed: false,
        }
    }

    pub fn with_calculations(mut self, calculations: Vec<CalculationRecord>) -> Self {
        self.calculations = calculations;
        self
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Marks the result immutable. Only the Validator, upon acceptance,
    /// is meant to call this (spec §4.6: "the Validator seals the
    /// Result").
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// All citations across all paragraphs, in section/paragraph order.
    pub fn all_citations(&self) -> Vec<&Citation> {
        self.sections
            .iter()
            .flat_map(|s| s.paragraphs.iter())
            .flat_map(|p| p.citations.iter())
            .collect()
    }

    /// Distinct citation URLs used anywhere in the result.
    pub fn distinct_citation_urls(&self) -> Vec<&str> {
        let mut seen = std::collections::BTreeSet::new();
        for c in self.all_citations() {
            seen.insert(c.url.as_str());
        }
        seen.into_iter().collect()
    }
}

/// Public, post-validation answer shape (spec §6 public answer schema,
/// `answer:` block).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub handler_id: String,
    pub sections: Vec<Section>,
    pub confidence: f32,
}

impl From<&HandlerResult> for Answer {
    fn from(result: &HandlerResult) -> Self {
        Self {
            handler_id: result.handler_id.clone(),
            sections: result.sections.clone(),
            confidence: result.confidence,
        }
    }
}

use crate::abstention::Abstention;

/// Mutually exclusive outcome of a request, matching spec §6's
/// `answer:` / `abstention:` pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Outcome {
    Answered(Answer),
    Abstained(Abstention),
}

/// The full pre-Formatter response (spec §6 public answer schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub outcome: Outcome,
    pub calculations: Vec<CalculationRecord>,
}

impl Response {
    pub fn answered(result: &HandlerResult) -> Self {
        Self {
            outcome: Outcome::Answered(Answer::from(result)),
            calculations: result.calculations.clone(),
        }
    }

    pub fn abstained(abstention: Abstention) -> Self {
        Self {
            outcome: Outcome::Abstained(abstention),
            calculations: Vec::new(),
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self.outcome, Outcome::Answered(_))
    }
}
