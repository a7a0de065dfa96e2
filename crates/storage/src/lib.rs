//! The Storage interface of spec §6 — consumed, not owned, by this
//! workspace in production (corpus acquisition and embedding ingestion
//! are external collaborators per spec §1). This crate defines the
//! trait every other crate programs against, plus `InMemoryCorpus`, a
//! reference implementation fed a pre-built set of `Document`s so the
//! rest of the pipeline (and its tests) has something to run.

mod corpus;
mod lexical;
mod traits;

pub use corpus::{content_hash, CorpusBuildError, CorpusBuilder, InMemoryCorpus};
pub use traits::Storage;
