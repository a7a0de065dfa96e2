//! Hybrid Retriever (spec §4.2): BM25 + dense fusion with an authority
//! boost and a deterministic tie-break, run over the [`Storage`]
//! contract rather than against a concrete corpus type.

use std::collections::HashMap;

use anyhow::Result;
use meridian_config::RetrievalConfig;
use meridian_core::{CandidatePassage, Collection, Document, QuerySignals, ScoreSource};
use meridian_storage::Storage;

/// Result of a retrieval pass: the surviving candidates plus whether
/// Stage C collapsed below the minimum evidence threshold (spec §4.2:
/// "If fewer than 3 survive, the Retriever reports
/// `INSUFFICIENT_EVIDENCE` to the caller").
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub candidates: Vec<CandidatePassage>,
    pub insufficient_evidence: bool,
}

pub struct Retriever<'s> {
    storage: &'s dyn Storage,
    config: RetrievalConfig,
}

impl<'s> Retriever<'s> {
    pub fn new(storage: &'s dyn Storage, config: RetrievalConfig) -> Self {
        Self { storage, config }
    }

    /// Run all three stages for one request.
    ///
    /// `query_embedding` is produced upstream by an embedding model —
    /// out of scope for this workspace (spec §1) — so it arrives as an
    /// already-computed, L2-normalized vector. Its absence is not an
    /// error: the dense arm simply contributes nothing and lexical
    /// results alone decide the outcome (spec §7's recoverable "empty
    /// lexical or dense branch" case).
    pub async fn retrieve(
        &self,
        signals: &QuerySignals,
        query_embedding: Option<&[f32]>,
        collection: Option<Collection>,
    ) -> Result<RetrievalOutcome> {
        let tokens: Vec<String> = signals.tokens.iter().cloned().collect();

        let (lexical, dense) = tokio::join!(
            self.storage.search_lexical(&tokens, collection, self.config.k),
            async {
                match query_embedding {
                    Some(embedding) => {
                        self.storage.search_dense(embedding, collection, self.config.k).await
                    }
                    None => Ok(Vec::new()),
                }
            }
        );
        let lexical = lexical?;
        let dense = dense?;

        let fused = fuse(&lexical, &dense, self.config.fusion_c);

        let mut scored_docs = Vec::with_capacity(fused.len());
        for (doc_id, score, source) in fused {
            let document = self.storage.get_document(&doc_id).await?;
            let boosted = if document.is_authoritative() {
                score * self.config.authority_boost
            } else {
                score
            };
            scored_docs.push((document, boosted, source));
        }

        scored_docs.retain(|(_, score, _)| *score >= self.config.score_floor);
        scored_docs.sort_by(|(doc_a, score_a, _), (doc_b, score_b, _)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| doc_b.is_authoritative().cmp(&doc_a.is_authoritative()))
                .then_with(|| doc_b.last_verified.cmp(&doc_a.last_verified))
                .then_with(|| doc_a.id.cmp(&doc_b.id))
        });
        scored_docs.truncate(self.config.top_n);

        let insufficient_evidence = scored_docs.len() < 3;

        let candidates = scored_docs
            .into_iter()
            .enumerate()
            .map(|(idx, (document, score, source))| CandidatePassage {
                document,
                score,
                source,
                rank: idx + 1,
            })
            .collect();

        Ok(RetrievalOutcome { candidates, insufficient_evidence })
    }
}

/// Reciprocal Rank Fusion (spec §4.2 Stage B): `score(d) = Σ 1/(c +
/// rank_method(d))`, summed across whichever of the two lists the
/// document appears in.
fn fuse(
    lexical: &[(String, f32)],
    dense: &[(String, f32)],
    c: f32,
) -> Vec<(String, f32, ScoreSource)> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    let mut in_lexical: HashMap<String, bool> = HashMap::new();
    let mut in_dense: HashMap<String, bool> = HashMap::new();

    for (rank, (doc_id, _)) in lexical.iter().enumerate() {
        *scores.entry(doc_id.clone()).or_insert(0.0) += 1.0 / (c + (rank as f32 + 1.0));
        in_lexical.insert(doc_id.clone(), true);
    }
    for (rank, (doc_id, _)) in dense.iter().enumerate() {
        *scores.entry(doc_id.clone()).or_insert(0.0) += 1.0 / (c + (rank as f32 + 1.0));
        in_dense.insert(doc_id.clone(), true);
    }

    scores
        .into_iter()
        .map(|(doc_id, score)| {
            let source = match (in_lexical.get(&doc_id).copied().unwrap_or(false), in_dense.get(&doc_id).copied().unwrap_or(false)) {
                (true, true) => ScoreSource::Fused,
                (true, false) => ScoreSource::Lexical,
                (false, true) => ScoreSource::Dense,
                (false, false) => unreachable!("doc_id came from one of the two lists"),
            };
            (doc_id, score, source)
        })
        .collect()
}
