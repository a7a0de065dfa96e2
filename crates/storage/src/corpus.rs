use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use meridian_core::{Collection, Document};
use sha2::{Digest, Sha256};

use crate::lexical::LexicalIndex;
use crate::traits::Storage;

/// Content hash for a document body, hex-encoded SHA-256. Exposed so
/// callers assembling a corpus (fixtures, ingestion adapters) can
/// populate `Document::content_hash` without each reimplementing it.
pub fn content_hash(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusBuildError {
    #[error("duplicate document id '{0}' in corpus build")]
    DuplicateId(String),
    #[error("document '{0}' in collection {1} is missing required tag '{2}'")]
    MissingTag(String, Collection, &'static str),
}

/// An immutable snapshot of the corpus at a point in time (spec §5:
/// "replaced atomically... readers see either the old or the new
/// build, never a mix"). Built once by [`CorpusBuilder`], then shared
/// behind an `Arc` so a swap only ever changes which `Arc` the
/// [`InMemoryCorpus`] handle points at.
#[derive(Debug)]
struct CorpusBuild {
    documents: BTreeMap<String, Document>,
    by_collection: BTreeMap<Collection, Vec<String>>,
    lexical: LexicalIndex,
}

impl CorpusBuild {
    fn search_dense(
        &self,
        query_embedding: &[f32],
        collection: Option<Collection>,
        k: usize,
    ) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = self
            .documents
            .values()
            .filter(|doc| collection.map(|c| c == doc.collection).unwrap_or(true))
            .filter_map(|doc| {
                let embedding = doc.embedding.as_ref()?;
                Some((doc.id.clone(), cosine(query_embedding, embedding)))
            })
            .collect();

        scored.sort_by(|(a_id, a_score), (b_id, b_score)| {
            b_score.total_cmp(a_score).then_with(|| a_id.cmp(b_id))
        });
        scored.truncate(k);
        scored
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Validates and assembles a batch of [`Document`]s into a
/// [`CorpusBuild`]. Mirrors the teacher's indexed-entry assembly step:
/// tag-schema checks happen once here, not per query.
#[derive(Default)]
pub struct CorpusBuilder {
    documents: Vec<Document>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, document: Document) -> Self {
        self.documents.push(document);
        self
    }

    pub fn add_all(mut self, documents: impl IntoIterator<Item = Document>) -> Self {
        self.documents.extend(documents);
        self
    }

    fn build(self) -> Result<CorpusBuild, CorpusBuildError> {
        let mut documents = BTreeMap::new();
        let mut by_collection: BTreeMap<Collection, Vec<String>> = BTreeMap::new();

        for doc in self.documents {
            for tag in doc.collection.required_tags() {
                if !doc.entity_tags.contains_key(*tag) {
                    return Err(CorpusBuildError::MissingTag(doc.id, doc.collection, tag));
                }
            }
            if documents.contains_key(&doc.id) {
                return Err(CorpusBuildError::DuplicateId(doc.id));
            }
            by_collection.entry(doc.collection).or_default().push(doc.id.clone());
            documents.insert(doc.id.clone(), doc);
        }

        let lexical = LexicalIndex::build(
            documents.values().map(|d| (d.id.as_str(), d.body.as_str())),
        );

        Ok(CorpusBuild {
            documents,
            by_collection,
            lexical,
        })
    }

    /// Build and wrap immediately in a fresh [`InMemoryCorpus`] handle.
    pub fn finish(self) -> Result<InMemoryCorpus, CorpusBuildError> {
        let build = self.build()?;
        Ok(InMemoryCorpus {
            current: RwLock::new(Arc::new(build)),
        })
    }
}

/// Reference [`Storage`] implementation: an in-memory, swappable corpus
/// snapshot. A single writer calls [`InMemoryCorpus::replace`] with a
/// freshly built [`CorpusBuild`]; readers always observe a complete,
/// internally-consistent build (spec §5's single-writer/atomic-swap
/// shared-resource policy).
pub struct InMemoryCorpus {
    current: RwLock<Arc<CorpusBuild>>,
}

impl InMemoryCorpus {
    /// Atomically swap in a new corpus build assembled by a
    /// [`CorpusBuilder`]. In-flight readers holding the previous `Arc`
    /// keep seeing the old snapshot to completion.
    pub fn replace(&self, builder: CorpusBuilder) -> Result<(), CorpusBuildError> {
        let build = builder.build()?;
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(build);
        Ok(())
    }

    fn snapshot(&self) -> Arc<CorpusBuild> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Storage for InMemoryCorpus {
    async fn search_lexical(
        &self,
        query_tokens: &[String],
        collection: Option<Collection>,
        k: usize,
    ) -> Result<Vec<(String, f32)>> {
        let snapshot = self.snapshot();
        // Lexical index is built over the whole corpus; filter by
        // collection after scoring since postings don't partition by it.
        let results = snapshot.lexical.search(query_tokens, snapshot.documents.len().max(k));
        let filtered = results
            .into_iter()
            .filter(|(id, _)| {
                collection
                    .map(|c| snapshot.documents.get(id).map(|d| d.collection == c).unwrap_or(false))
                    .unwrap_or(true)
            })
            .take(k)
            .collect();
        Ok(filtered)
    }

    async fn search_dense(
        &self,
        query_embedding: &[f32],
        collection: Option<Collection>,
        k: usize,
    ) -> Result<Vec<(String, f32)>> {
        let snapshot = self.snapshot();
        Ok(snapshot.search_dense(query_embedding, collection, k))
    }

    async fn get_document(&self, doc_id: &str) -> Result<Document> {
        let snapshot = self.snapshot();
        snapshot
            .documents
            .get(doc_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown document id '{doc_id}'"))
    }

    fn list_collections(&self) -> Vec<(Collection, usize)> {
        let snapshot = self.snapshot();
        Collection::all()
            .into_iter()
            .map(|c| {
                let count = snapshot.by_collection.get(&c).map(|v| v.len()).unwrap_or(0);
                (c, count)
            })
            .collect()
    }
}
