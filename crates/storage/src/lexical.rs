//! BM25 lexical index (spec §4.2 Stage A: "k1≈1.2, b≈0.75").
//!
//! Deliberately hand-rolled rather than pulled from an external search
//! crate: the reference `InMemoryCorpus` is a small, fully in-memory
//! fixture (ingestion and large-scale indexing are the out-of-scope
//! collector subsystem, spec §1), so a few hundred postings lists are
//! plenty.

use std::collections::{BTreeMap, HashMap};

use meridian_core::text::term_frequencies;

const K1: f32 = 1.2;
const B: f32 = 0.75;

#[derive(Debug, Default)]
pub struct LexicalIndex {
    /// term -> (doc_id -> term frequency in that doc)
    postings: HashMap<String, BTreeMap<String, u32>>,
    doc_len: HashMap<String, u32>,
    avg_doc_len: f32,
    doc_count: usize,
}

impl LexicalIndex {
    pub fn build<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut index = LexicalIndex::default();
        let mut total_len: u64 = 0;

        for (doc_id, body) in documents {
            let freqs = term_frequencies(body);
            let len: u32 = freqs.values().sum();
            index.doc_len.insert(doc_id.to_string(), len);
            total_len += len as u64;
            index.doc_count += 1;

            for (term, freq) in freqs {
                index
                    .postings
                    .entry(term)
                    .or_default()
                    .insert(doc_id.to_string(), freq);
            }
        }

        index.avg_doc_len = if index.doc_count > 0 {
            total_len as f32 / index.doc_count as f32
        } else {
            0.0
        };

        index
    }

    /// Score every document containing at least one query term, return
    /// up to `k` results sorted by descending BM25 score, ties broken
    /// by document id for determinism (spec §4.2 tie-break rules apply
    /// only after fusion, but a stable order here keeps the whole
    /// pipeline reproducible for the same query).
    pub fn search(&self, query_terms: &[String], k: usize) -> Vec<(String, f32)> {
        if self.doc_count == 0 {
            return Vec::new();
        }

        let mut scores: HashMap<String, f32> = HashMap::new();
        for term in query_terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let n_t = postings.len() as f32;
            let idf = ((self.doc_count as f32 - n_t + 0.5) / (n_t + 0.5) + 1.0).ln();

            for (doc_id, &freq) in postings {
                let doc_len = *self.doc_len.get(doc_id).unwrap_or(&0) as f32;
                let freq = freq as f32;
                let denom = freq + K1 * (1.0 - B + B * doc_len / self.avg_doc_len.max(1.0));
                let score = idf * (freq * (K1 + 1.0)) / denom.max(f32::EPSILON);
                *scores.entry(doc_id.clone()).or_insert(0.0) += score;
            }
        }

        let max_score = scores.values().cloned().fold(0.0_f32, f32::max);
        let mut ranked: Vec<(String, f32)> = scores
            .into_iter()
            .map(|(doc_id, score)| {
                let normalized = if max_score > 0.0 { score / max_score } else { 0.0 };
                (doc_id, normalized)
            })
            .collect();

        ranked.sort_by(|(a_id, a_score), (b_id, b_score)| {
            b_score
                .total_cmp(a_score)
                .then_with(|| a_id.cmp(b_id))
        });
        ranked.truncate(k);
        ranked
    }
}
