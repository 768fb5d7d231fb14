use crate::column::array::Array;
use crate::column::error::{EvalError, EvalResult};

/// A contiguous range of entries read from a source, one array per requested
/// column.
///
/// Arrays appear in the order the columns were requested, and every array has
/// exactly `entry_stop - entry_start` elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub entry_start: u64,
    pub entry_stop: u64,
    pub arrays: Vec<Array>,
}

impl Chunk {
    pub fn new(entry_start: u64, entry_stop: u64, arrays: Vec<Array>) -> Self {
        Chunk {
            entry_start,
            entry_stop,
            arrays,
        }
    }

    pub fn num_entries(&self) -> usize {
        (self.entry_stop - self.entry_start) as usize
    }

    pub fn array(&self, index: usize) -> EvalResult<&Array> {
        self.arrays.get(index).ok_or(EvalError::ColumnOutOfRange {
            index,
            count: self.arrays.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_num_entries() {
        let chunk = Chunk::new(100, 150, vec![Array::from(vec![0i64; 50])]);
        assert_eq!(chunk.num_entries(), 50);
    }

    #[test]
    fn test_chunk_array_lookup() {
        let chunk = Chunk::new(
            0,
            2,
            vec![Array::from(vec![1i64, 2]), Array::from(vec![true, false])],
        );
        assert_eq!(chunk.array(1).unwrap(), &Array::from(vec![true, false]));
        assert!(matches!(
            chunk.array(2),
            Err(EvalError::ColumnOutOfRange { index: 2, count: 2 })
        ));
    }
}
