//! Indexing orchestration
//!
//! The pieces above the crawler:
//! - [`LemmaIndexWriter`]: serialized, batched persistence of lemma
//!   frequencies and page→lemma index entries, shared by the crawler and
//!   the single-page re-indexer
//! - [`PageReindexer`]: re-index one URL, adjusting lemma frequencies
//! - [`IndexingCoordinator`]: run lifecycle — start/stop, per-site tasks,
//!   cache clearing, error aggregation
//! - [`ErrorsSink`]: append-only log of errors observed during a run

mod coordinator;
mod errors;
mod reindex;
mod writer;

pub use coordinator::IndexingCoordinator;
pub use errors::{ErrorEntry, ErrorsSink};
pub use reindex::PageReindexer;
pub use writer::LemmaIndexWriter;
