//! In-memory chunk source.

use anyhow::{bail, Result};
use indexmap::IndexMap;

use super::{ChunkSource, ChunkStream, ReadOptions};
use crate::column::{Array, Chunk};

/// A [`ChunkSource`] over fully materialized columns. The reference
/// implementation for tests and small embedded datasets.
pub struct MemorySource {
    columns: IndexMap<String, Array>,
    num_entries: u64,
}

impl MemorySource {
    /// Build a source from named columns. All columns must have the same
    /// length.
    pub fn new<N: Into<String>>(columns: impl IntoIterator<Item = (N, Array)>) -> Result<Self> {
        let columns: IndexMap<String, Array> = columns
            .into_iter()
            .map(|(name, array)| (name.into(), array))
            .collect();
        let mut num_entries = None;
        for (name, array) in &columns {
            match num_entries {
                None => num_entries = Some(array.len()),
                Some(expected) if expected != array.len() => {
                    bail!(
                        "column {} has {} entries but {} were expected",
                        name,
                        array.len(),
                        expected
                    );
                }
                Some(_) => {}
            }
        }
        Ok(MemorySource {
            columns,
            num_entries: num_entries.unwrap_or(0) as u64,
        })
    }
}

impl ChunkSource for MemorySource {
    fn num_entries(&self) -> u64 {
        self.num_entries
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    fn stream(&self, columns: &[String], options: &ReadOptions) -> Result<ChunkStream> {
        if options.chunk_size == 0 {
            bail!("chunk size must be positive");
        }
        let arrays = columns
            .iter()
            .map(|name| {
                self.columns
                    .get(name)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no such column: {}", name))
            })
            .collect::<Result<Vec<_>>>()?;

        let entry_start = options.entry_start.min(self.num_entries);
        let entry_stop = options
            .entry_stop
            .unwrap_or(self.num_entries)
            .min(self.num_entries)
            .max(entry_start);

        Ok(Box::new(MemoryStream {
            arrays,
            position: entry_start,
            entry_stop,
            chunk_size: options.chunk_size as u64,
        }))
    }
}

struct MemoryStream {
    arrays: Vec<Array>,
    position: u64,
    entry_stop: u64,
    chunk_size: u64,
}

impl Iterator for MemoryStream {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.entry_stop {
            return None;
        }
        let start = self.position;
        let stop = (start + self.chunk_size).min(self.entry_stop);
        self.position = stop;
        let arrays = self
            .arrays
            .iter()
            .map(|array| array.slice(start as usize, stop as usize))
            .collect();
        Some(Ok(Chunk::new(start, stop, arrays)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MemorySource {
        MemorySource::new([
            ("x", Array::from((0..25).collect::<Vec<i64>>())),
            ("y", Array::from((0..25).map(|v| v as f64 / 2.0).collect::<Vec<f64>>())),
        ])
        .unwrap()
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = MemorySource::new([
            ("a", Array::from(vec![1i64, 2])),
            ("b", Array::from(vec![1i64])),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_stepping() {
        let source = source();
        let options = ReadOptions {
            chunk_size: 10,
            ..ReadOptions::default()
        };
        let chunks = source
            .stream(&["x".to_string()], &options)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(Chunk::num_entries).collect::<Vec<_>>(),
            vec![10, 10, 5]
        );
        assert_eq!(chunks[1].entry_start, 10);
        assert_eq!(chunks[1].arrays[0], Array::from((10..20).collect::<Vec<i64>>()));
    }

    #[test]
    fn test_column_order_honored() {
        let source = source();
        let options = ReadOptions {
            chunk_size: 25,
            ..ReadOptions::default()
        };
        let chunks = source
            .stream(&["y".to_string(), "x".to_string()], &options)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(chunks[0].arrays[1], Array::from((0..25).collect::<Vec<i64>>()));
    }

    #[test]
    fn test_bounds_clamp() {
        let source = source();
        let options = ReadOptions {
            chunk_size: 10,
            entry_start: 20,
            entry_stop: Some(1000),
            ..ReadOptions::default()
        };
        let chunks = source
            .stream(&["x".to_string()], &options)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].entry_start, chunks[0].entry_stop), (20, 25));
    }

    #[test]
    fn test_empty_range() {
        let source = source();
        let options = ReadOptions {
            chunk_size: 10,
            entry_start: 30,
            ..ReadOptions::default()
        };
        let mut stream = source.stream(&["x".to_string()], &options).unwrap();
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_missing_column() {
        let source = source();
        assert!(!source.has_column("nope"));
        assert!(source
            .stream(&["nope".to_string()], &ReadOptions::default())
            .is_err());
    }
}
