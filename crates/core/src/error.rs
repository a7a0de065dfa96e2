/// Typed errors at the engine's public boundary (spec §7, "Fatal to
/// request"). Distinct from `Abstention`, which is a normal,
/// user-facing outcome — these are bugs or infrastructure failures the
/// caller should treat as a 5xx, not a refusal to answer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("storage backend unreachable: {0}")]
    StorageUnreachable(String),

    #[error("handler result missing required schema fields after retry: {0}")]
    CorruptHandlerResult(String),

    #[error("citation url '{0}' does not appear in the retrieval set or formula registry")]
    ForeignCitation(String),

    #[error("unknown document id: {0}")]
    UnknownDocument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
