//! The terminal chain step: maps requirements to source columns and streams
//! chunks.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use super::error::{ChainError, ChainResult};
use super::resolve::Requirements;
use super::{ChainStep, FetchFn, NoSpecializer, Specializer};
use crate::column::{Array, Chunk, Datum};
use crate::expr::ExprCache;
use crate::source::{ChunkSource, ChunkStream, ReadExecutor, ReadOptions};

/// Configuration of a chain, fixed at construction.
#[derive(Clone)]
pub struct ChainOptions {
    /// Entries per streamed chunk.
    pub chunk_size: usize,
    /// First entry of every traversal.
    pub entry_start: u64,
    /// One past the last entry; `None` reads to the end. Clamped to the
    /// source's entries.
    pub entry_stop: Option<u64>,
    /// Requirement name → raw column name overrides, applied at the source.
    pub aliases: HashMap<String, String>,
    /// Reserved requirement name that yields the synthetic per-entry index
    /// column instead of a fetched one. `None` reserves nothing.
    pub entry_var: Option<String>,
    /// Optional compile hook for leaf and composed evaluators.
    pub specializer: Arc<dyn Specializer>,
    /// Passed through to the source's `stream`.
    pub read_executor: Option<ReadExecutor>,
}

impl Default for ChainOptions {
    fn default() -> Self {
        ChainOptions {
            chunk_size: 100_000,
            entry_start: 0,
            entry_stop: None,
            aliases: HashMap::new(),
            entry_var: None,
            specializer: Arc::new(NoSpecializer),
            read_executor: None,
        }
    }
}

/// The leaf/root of every chain. Resolves requirements to column positions
/// (applying aliases and the entry-index name) and requests chunks from the
/// external source.
pub struct ChainSource {
    source: Arc<dyn ChunkSource>,
    options: ChainOptions,
    cache: ExprCache,
}

impl ChainSource {
    pub(crate) fn new(source: Arc<dyn ChunkSource>, options: ChainOptions) -> Self {
        ChainSource {
            source,
            options,
            cache: ExprCache::new(),
        }
    }

    pub(crate) fn cache(&self) -> &ExprCache {
        &self.cache
    }

    pub(crate) fn specializer(&self) -> &Arc<dyn Specializer> {
        &self.options.specializer
    }

    fn is_entry_var(&self, name: &str) -> bool {
        self.options.entry_var.as_deref() == Some(name)
    }

    fn raw_name<'a>(&'a self, requirement: &'a str) -> &'a str {
        self.options
            .aliases
            .get(requirement)
            .map(String::as_str)
            .unwrap_or(requirement)
    }

    /// Stream the chunks of one traversal, validating the column-count
    /// contract and appending the entry-index array when demanded.
    pub(crate) fn stream(&self, requirements: &Requirements) -> ChainResult<SourceStream> {
        let options = ReadOptions {
            chunk_size: self.options.chunk_size,
            entry_start: self.options.entry_start,
            entry_stop: self.options.entry_stop,
            read_executor: self.options.read_executor.clone(),
        };
        let inner = self.source.stream(requirements.columns(), &options)?;
        Ok(SourceStream {
            inner,
            expected_columns: requirements.columns().len(),
            append_entry_index: requirements.needs_entry_index(),
        })
    }
}

impl ChainStep for ChainSource {
    fn resolve(&self, requirement: &str, requirements: &mut Requirements) -> ChainResult<()> {
        if self.is_entry_var(requirement) {
            requirements.mark_entry_index();
            return Ok(());
        }
        let raw = self.raw_name(requirement);
        if !self.source.has_column(raw) {
            return Err(ChainError::UnresolvedRequirement {
                name: requirement.to_string(),
            });
        }
        requirements.add_column(raw);
        Ok(())
    }

    fn fetcher(&self, requirement: &str, requirements: &Requirements) -> ChainResult<FetchFn> {
        let position = if self.is_entry_var(requirement) {
            requirements.entry_index_position()
        } else {
            let raw = self.raw_name(requirement);
            requirements
                .position(raw)
                .ok_or_else(|| ChainError::UnresolvedRequirement {
                    name: requirement.to_string(),
                })?
        };
        let fetch: FetchFn = Arc::new(move |chunk: &Chunk| {
            chunk.array(position).map(|array| Datum::Array(array.clone()))
        });
        Ok(self.options.specializer.compile_fetch(fetch))
    }

    fn root(&self) -> &ChainSource {
        self
    }
}

/// Chunk stream of one traversal, with per-chunk validation and the
/// synthetic entry-index array appended when requested.
pub(crate) struct SourceStream {
    inner: ChunkStream,
    expected_columns: usize,
    append_entry_index: bool,
}

impl Iterator for SourceStream {
    type Item = ChainResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = match self.inner.next()? {
            Ok(chunk) => chunk,
            Err(e) => return Some(Err(ChainError::Source(e))),
        };
        if chunk.arrays.len() != self.expected_columns {
            return Some(Err(ChainError::ChunkColumns {
                expected: self.expected_columns,
                got: chunk.arrays.len(),
            }));
        }
        trace!(
            "streamed chunk [{}, {}) with {} columns",
            chunk.entry_start,
            chunk.entry_stop,
            chunk.arrays.len()
        );
        if self.append_entry_index {
            let index = (chunk.entry_start..chunk.entry_stop)
                .map(|entry| entry as i64)
                .collect::<Vec<_>>();
            chunk.arrays.push(Array::from(index));
        }
        Some(Ok(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn chain_source(options: ChainOptions) -> ChainSource {
        let source = MemorySource::new([
            ("x", Array::from((0..25).collect::<Vec<i64>>())),
            ("track_pt", Array::from(vec![0.5f64; 25])),
        ])
        .unwrap();
        ChainSource::new(Arc::new(source), options)
    }

    #[test]
    fn test_resolve_known_column() {
        let source = chain_source(ChainOptions::default());
        let mut requirements = Requirements::new();
        source.resolve("x", &mut requirements).unwrap();
        source.resolve("x", &mut requirements).unwrap();
        assert_eq!(requirements.columns(), ["x"]);
    }

    #[test]
    fn test_resolve_unknown_column() {
        let source = chain_source(ChainOptions::default());
        let mut requirements = Requirements::new();
        assert!(matches!(
            source.resolve("nope", &mut requirements),
            Err(ChainError::UnresolvedRequirement { name }) if name == "nope"
        ));
    }

    #[test]
    fn test_alias_maps_to_raw_column() {
        let mut options = ChainOptions::default();
        options.aliases.insert("pt".to_string(), "track_pt".to_string());
        let source = chain_source(options);
        let mut requirements = Requirements::new();
        source.resolve("pt", &mut requirements).unwrap();
        assert_eq!(requirements.columns(), ["track_pt"]);
    }

    #[test]
    fn test_entry_var_is_not_a_column() {
        let options = ChainOptions {
            entry_var: Some("entry".to_string()),
            ..ChainOptions::default()
        };
        let source = chain_source(options);
        let mut requirements = Requirements::new();
        source.resolve("entry", &mut requirements).unwrap();
        assert!(requirements.needs_entry_index());
        assert!(requirements.columns().is_empty());
    }

    #[test]
    fn test_stream_appends_entry_index() {
        let options = ChainOptions {
            chunk_size: 10,
            entry_var: Some("entry".to_string()),
            ..ChainOptions::default()
        };
        let source = chain_source(options);
        let mut requirements = Requirements::new();
        source.resolve("x", &mut requirements).unwrap();
        source.resolve("entry", &mut requirements).unwrap();

        let chunks = source
            .stream(&requirements)
            .unwrap()
            .collect::<ChainResult<Vec<_>>>()
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].arrays.len(), 2);
        assert_eq!(
            chunks[1].arrays[1],
            Array::from((10..20).collect::<Vec<i64>>())
        );

        let fetch = source.fetcher("entry", &requirements).unwrap();
        let value = fetch(&chunks[2]).unwrap();
        assert_eq!(
            value,
            Datum::Array(Array::from((20..25).collect::<Vec<i64>>()))
        );
    }

    #[test]
    fn test_leaf_fetcher_position() {
        let source = chain_source(ChainOptions::default());
        let mut requirements = Requirements::new();
        source.resolve("track_pt", &mut requirements).unwrap();
        source.resolve("x", &mut requirements).unwrap();

        let chunk = source
            .stream(&requirements)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let fetch = source.fetcher("x", &requirements).unwrap();
        assert_eq!(
            fetch(&chunk).unwrap(),
            Datum::Array(Array::from((0..25).collect::<Vec<i64>>()))
        );
    }
}
