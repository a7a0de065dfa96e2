use anyhow::Result;
use async_trait::async_trait;
use meridian_core::{Collection, Document};

/// Storage interface consumed by the Hybrid Retriever (spec §6).
///
/// Contract: both search methods are deterministic under a fixed
/// corpus build; a query that matches zero documents returns an empty
/// `Vec`, never an error. `get_document` raises (returns `Err`) for an
/// unknown id — it is never used to discover whether a document
/// exists.
#[async_trait]
pub trait Storage: Send + Sync {
    /// BM25 lexical search. `query_tokens` are already normalized
    /// (lowercased, stop-words removed) by the caller.
    async fn search_lexical(
        &self,
        query_tokens: &[String],
        collection: Option<Collection>,
        k: usize,
    ) -> Result<Vec<(String, f32)>>;

    /// Cosine similarity over L2-normalized dense embeddings.
    async fn search_dense(
        &self,
        query_embedding: &[f32],
        collection: Option<Collection>,
        k: usize,
    ) -> Result<Vec<(String, f32)>>;

    async fn get_document(&self, doc_id: &str) -> Result<Document>;

    /// `(collection, document count)` for every recognized collection —
    /// used at startup/health-check time.
    fn list_collections(&self) -> Vec<(Collection, usize)>;
}
