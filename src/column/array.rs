//! Column value model.
//!
//! A [`Chunk`](crate::column::Chunk) carries one [`Array`] per requested
//! column. Expression evaluation is vectorized: every intermediate value is a
//! [`Datum`], either a whole-chunk array or a scalar that broadcasts against
//! arrays of any length.

use std::sync::Arc;

/// Element type of an [`Array`] or [`Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bool,
    Int64,
    Float64,
}

/// An immutable typed buffer holding one column's values for one chunk.
///
/// Buffers are reference counted, so cloning an `Array` never copies data.
/// This is what lets one fetched column feed several output expressions that
/// may run on different threads.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Bool(Arc<[bool]>),
    Int64(Arc<[i64]>),
    Float64(Arc<[f64]>),
}

impl Array {
    pub fn len(&self) -> usize {
        match self {
            Array::Bool(values) => values.len(),
            Array::Int64(values) => values.len(),
            Array::Float64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Array::Bool(_) => DataType::Bool,
            Array::Int64(_) => DataType::Int64,
            Array::Float64(_) => DataType::Float64,
        }
    }

    /// Copies the half-open range `[start, stop)` into a fresh array.
    ///
    /// Panics if the range is out of bounds or inverted.
    pub fn slice(&self, start: usize, stop: usize) -> Array {
        match self {
            Array::Bool(values) => Array::from(values[start..stop].to_vec()),
            Array::Int64(values) => Array::from(values[start..stop].to_vec()),
            Array::Float64(values) => Array::from(values[start..stop].to_vec()),
        }
    }
}

impl From<Vec<bool>> for Array {
    fn from(values: Vec<bool>) -> Self {
        Array::Bool(values.into())
    }
}

impl From<Vec<i64>> for Array {
    fn from(values: Vec<i64>) -> Self {
        Array::Int64(values.into())
    }
}

impl From<Vec<f64>> for Array {
    fn from(values: Vec<f64>) -> Self {
        Array::Float64(values.into())
    }
}

/// A single value. Scalars broadcast against arrays during evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int64(i64),
    Float64(f64),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Bool(_) => DataType::Bool,
            Scalar::Int64(_) => DataType::Int64,
            Scalar::Float64(_) => DataType::Float64,
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int64(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float64(value)
    }
}

/// The value of an expression over one chunk: a column-shaped array or a
/// broadcastable scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Scalar(Scalar),
    Array(Array),
}

impl Datum {
    pub fn data_type(&self) -> DataType {
        match self {
            Datum::Scalar(scalar) => scalar.data_type(),
            Datum::Array(array) => array.data_type(),
        }
    }

    /// Number of elements, or `None` for a scalar.
    pub fn len(&self) -> Option<usize> {
        match self {
            Datum::Scalar(_) => None,
            Datum::Array(array) => Some(array.len()),
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Datum::Array(array) => Some(array),
            Datum::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Datum::Scalar(scalar) => Some(*scalar),
            Datum::Array(_) => None,
        }
    }
}

impl From<Scalar> for Datum {
    fn from(scalar: Scalar) -> Self {
        Datum::Scalar(scalar)
    }
}

impl From<Array> for Datum {
    fn from(array: Array) -> Self {
        Datum::Array(array)
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Scalar(Scalar::Int64(value))
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Scalar(Scalar::Float64(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_len_and_type() {
        let array = Array::from(vec![1i64, 2, 3]);
        assert_eq!(array.len(), 3);
        assert!(!array.is_empty());
        assert_eq!(array.data_type(), DataType::Int64);

        let array = Array::from(Vec::<f64>::new());
        assert!(array.is_empty());
        assert_eq!(array.data_type(), DataType::Float64);
    }

    #[test]
    fn test_array_slice() {
        let array = Array::from(vec![10i64, 20, 30, 40, 50]);
        let sliced = array.slice(1, 4);
        assert_eq!(sliced, Array::from(vec![20i64, 30, 40]));

        let empty = array.slice(2, 2);
        assert_eq!(empty.len(), 0);
    }

    #[test]
    fn test_array_clone_shares_buffer() {
        let array = Array::from(vec![1.5f64, 2.5]);
        let clone = array.clone();
        match (&array, &clone) {
            (Array::Float64(a), Array::Float64(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("unexpected variants"),
        }
    }

    #[test]
    fn test_datum_len() {
        assert_eq!(Datum::from(1i64).len(), None);
        assert_eq!(Datum::from(Array::from(vec![true, false])).len(), Some(2));
    }

    #[test]
    fn test_datum_accessors() {
        let datum = Datum::from(2.5f64);
        assert_eq!(datum.as_scalar(), Some(Scalar::Float64(2.5)));
        assert!(datum.as_array().is_none());
        assert_eq!(datum.data_type(), DataType::Float64);
    }
}
