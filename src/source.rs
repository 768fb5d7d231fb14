//! The chunked-source capability consumed by a chain.
//!
//! A [`ChunkSource`] is the external collaborator holding the raw columns:
//! the chain only ever asks it to stream chunks for an explicit list of
//! column names. File readers implement this trait; [`MemorySource`] is the
//! in-memory reference implementation used by tests and embedders.

pub mod memory;

use std::sync::Arc;

use anyhow::Result;

use crate::column::Chunk;

pub use memory::MemorySource;

/// A lazy, finite stream of chunks. Consumed once; a new traversal requests
/// a new stream.
pub type ChunkStream = Box<dyn Iterator<Item = Result<Chunk>> + Send>;

/// Thread pool a source may use to parallelize its reads. Passed through
/// opaquely; sources are free to ignore it.
pub type ReadExecutor = Arc<rayon::ThreadPool>;

/// Per-traversal read configuration.
#[derive(Clone)]
pub struct ReadOptions {
    /// Entries per chunk.
    pub chunk_size: usize,
    /// First entry to read.
    pub entry_start: u64,
    /// One past the last entry to read; `None` reads to the end. Bounds
    /// beyond the available entries clamp rather than error.
    pub entry_stop: Option<u64>,
    pub read_executor: Option<ReadExecutor>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            chunk_size: 100_000,
            entry_start: 0,
            entry_stop: None,
            read_executor: None,
        }
    }
}

/// A columnar data source that can stream slices of its columns.
pub trait ChunkSource: Send + Sync {
    /// Total number of entries in the source.
    fn num_entries(&self) -> u64;

    /// Whether the source carries a raw column with this name.
    fn has_column(&self, name: &str) -> bool;

    /// Stream chunks carrying exactly `columns`, in that order, covering the
    /// configured entry range in ascending chunks of `options.chunk_size`
    /// entries (the final chunk may be shorter).
    fn stream(&self, columns: &[String], options: &ReadOptions) -> Result<ChunkStream>;
}
