//! Shared domain types for the admissions/financial-aid QA engine.
//!
//! This crate has no pipeline logic — it is the vocabulary every other
//! crate in the workspace speaks: the corpus data model (`Document`,
//! `Collection`), the per-request signals and candidates that flow
//! between stages, the sealed result types a `Handler` produces, and
//! the abstention/error taxonomy the `Validator` and `Engine` enforce.

mod abstention;
mod document;
mod error;
mod result;
mod signals;
pub mod text;

pub use abstention::{Abstention, AbstentionReason};
pub use document::{is_authoritative_url, Collection, Document, DocumentError};
pub use error::EngineError;
pub use result::{
    Answer, CalculationRecord, Citation, CitationKind, HandlerResult, Outcome, Paragraph,
    Response, Section,
};
pub use signals::{NumericParams, QuerySignals, TemporalSignal};

/// A `Candidate Passage` as defined by the spec's data model: a scored
/// document, tagged with which retrieval method produced the score and
/// its rank under that method. Transient — never persisted past a
/// single request.
#[derive(Debug, Clone)]
pub struct CandidatePassage {
    pub document: Document,
    /// Final score after RRF fusion and authority boost (§4.2).
    pub score: f32,
    pub source: ScoreSource,
    /// Rank (1-based) under whichever method(s) contributed to `source`.
    pub rank: usize,
}

/// Which retrieval arm(s) contributed to a candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    Lexical,
    Dense,
    /// Appeared in both the lexical and dense top-k lists.
    Fused,
}
