use serde::{Deserialize, Serialize};

/// Reason codes for a structured refusal (spec §3, §7). These are
/// normal outcomes, not errors — the engine's typed-error boundary
/// (`EngineError`) is reserved for infrastructure failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbstentionReason {
    TemporalOutOfRange,
    UnknownEntity,
    SubjectiveDecision,
    InsufficientEvidence,
    OutOfScope,
}

impl AbstentionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbstentionReason::TemporalOutOfRange => "TEMPORAL_OUT_OF_RANGE",
            AbstentionReason::UnknownEntity => "UNKNOWN_ENTITY",
            AbstentionReason::SubjectiveDecision => "SUBJECTIVE_DECISION",
            AbstentionReason::InsufficientEvidence => "INSUFFICIENT_EVIDENCE",
            AbstentionReason::OutOfScope => "OUT_OF_SCOPE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Abstention {
    pub reason: AbstentionReason,
    pub message: String,
    pub retrieval_plan: Option<String>,
}

impl Abstention {
    pub fn new(reason: AbstentionReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            retrieval_plan: None,
        }
    }

    pub fn with_retrieval_plan(mut self, plan: impl Into<String>) -> Self {
        self.retrieval_plan = Some(plan.into());
        self
    }
}
