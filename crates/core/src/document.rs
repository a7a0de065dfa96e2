use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The collections the engine recognizes, each with its own required
/// tag schema (spec §3). Ingestion (populating a `Collection` with
/// `Document`s) is an external concern; this crate only names the
/// collections and the tags their documents must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Collection {
    AidPolicies,
    MajorGates,
    CdsData,
    Articulation,
    CitedAnswers,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::AidPolicies => "aid_policies",
            Collection::MajorGates => "major_gates",
            Collection::CdsData => "cds_data",
            Collection::Articulation => "articulation",
            Collection::CitedAnswers => "cited_answers",
        }
    }

    /// Tag keys that every `Document` in this collection must carry
    /// (spec §3's per-collection schema). Checked by the storage
    /// reference implementation at build time, not re-checked per
    /// request.
    pub fn required_tags(&self) -> &'static [&'static str] {
        match self {
            Collection::AidPolicies => &["institution", "policy_topic"],
            Collection::MajorGates => &["institution", "major", "gpa_threshold", "capacity_flag"],
            Collection::CdsData => &["institution", "academic_year", "metric_kind"],
            Collection::Articulation => {
                &["origin_institution", "destination_institution", "course_equivalence"]
            }
            Collection::CitedAnswers => &["topic"],
        }
    }

    pub fn all() -> [Collection; 5] {
        [
            Collection::AidPolicies,
            Collection::MajorGates,
            Collection::CdsData,
            Collection::Articulation,
            Collection::CitedAnswers,
        ]
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document id must not be empty")]
    EmptyId,
    #[error("document source_url must not be empty")]
    EmptySourceUrl,
    #[error("document in collection {collection} is missing required tag '{tag}'")]
    MissingTag {
        collection: Collection,
        tag: &'static str,
    },
}

/// A single unit of the curated corpus (spec §3).
///
/// Immutable once constructed — an upstream change to a document is
/// modeled as a new `Document` with a new `id`, never a mutation of an
/// existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub collection: Collection,
    pub source_url: String,
    pub body: String,
    pub last_verified: DateTime<Utc>,
    /// institution name, program, policy topic, etc. — collection-specific,
    /// see [`Collection::required_tags`].
    pub entity_tags: BTreeMap<String, String>,
    /// Nullable effective date range (e.g. "policy applies 2023-24 through 2024-25").
    pub effective_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub content_hash: String,
    /// Dense embedding, L2-normalized, fixed dimension across the build.
    /// Absent for documents the caller only wants lexically indexed.
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        collection: Collection,
        source_url: impl Into<String>,
        body: impl Into<String>,
        last_verified: DateTime<Utc>,
        entity_tags: BTreeMap<String, String>,
        content_hash: impl Into<String>,
    ) -> Result<Self, DocumentError> {
        let id = id.into();
        let source_url = source_url.into();
        if id.trim().is_empty() {
            return Err(DocumentError::EmptyId);
        }
        if source_url.trim().is_empty() {
            return Err(DocumentError::EmptySourceUrl);
        }
        for tag in collection.required_tags() {
            if !entity_tags.contains_key(*tag) {
                return Err(DocumentError::MissingTag { collection, tag });
            }
        }
        Ok(Self {
            id,
            collection,
            source_url,
            body: body.into(),
            last_verified,
            entity_tags,
            effective_range: None,
            content_hash: content_hash.into(),
            embedding: None,
        })
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_effective_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.effective_range = Some((start, end));
        self
    }

    /// True when the source URL's host ends in `.edu` or `.gov` — the
    /// authority boost trigger of spec §4.2.
    pub fn is_authoritative(&self) -> bool {
        is_authoritative_url(&self.source_url)
    }

    /// The smallest citing sub-URL available. A `Document` carries only
    /// a single `source_url`, so this is always the bare URL (spec
    /// §4.4 construction policy: "attaches the smallest citing sub-URL
    /// available"); ingestion is expected to populate `source_url`
    /// with the narrowest anchor it can resolve rather than this
    /// accessor narrowing it after the fact.
    pub fn smallest_citation_url(&self) -> &str {
        &self.source_url
    }
}

/// Extract the host component from a `scheme://host[:port][/path]` URL
/// without pulling in a full URL-parsing dependency — the engine only
/// ever needs the host to check `.edu`/`.gov` suffixes.
fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let host_and_port = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = host_and_port.split(':').next().unwrap_or(host_and_port);
    if host.is_empty() { None } else { Some(host) }
}

/// Free-function form of [`Document::is_authoritative`], usable by
/// callers (e.g. the Validator's authority-floor check, spec §4.6)
/// that only have a citation URL on hand, not a full `Document`.
pub fn is_authoritative_url(url: &str) -> bool {
    host_of(url)
        .map(|host| host.ends_with(".edu") || host.ends_with(".gov"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source_url: &str) -> Document {
        let mut tags = BTreeMap::new();
        tags.insert("institution".to_string(), "Example University".to_string());
        tags.insert("policy_topic".to_string(), "ncp waiver".to_string());
        Document::new(
            "doc-1",
            Collection::AidPolicies,
            source_url,
            "body text",
            Utc::now(),
            tags,
            "hash",
        )
        .unwrap()
    }

    #[test]
    fn edu_host_is_authoritative() {
        assert!(doc("https://financialaid.washington.edu/plus-loans").is_authoritative());
    }

    #[test]
    fn gov_host_is_authoritative() {
        assert!(doc("https://studentaid.gov/understand-aid/types/loans").is_authoritative());
    }

    #[test]
    fn com_host_is_not_authoritative() {
        assert!(!doc("https://www.nitrocollege.com/articles/parent-plus").is_authoritative());
    }

    #[test]
    fn missing_required_tag_is_rejected() {
        let err = Document::new(
            "doc-2",
            Collection::MajorGates,
            "https://cs.washington.edu/admissions",
            "body",
            Utc::now(),
            BTreeMap::new(),
            "hash",
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::MissingTag { .. }));
    }

    #[test]
    fn empty_source_url_is_rejected() {
        let err = Document::new(
            "doc-3",
            Collection::CitedAnswers,
            "",
            "body",
            Utc::now(),
            BTreeMap::from([("topic".to_string(), "x".to_string())]),
            "hash",
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::EmptySourceUrl));
    }
}
