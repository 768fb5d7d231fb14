//! Columnar value model and elementwise evaluation kernels.
//!
//! Everything the expression engine computes is a [`Datum`]: either a typed
//! [`Array`] covering one chunk of entries or a broadcastable [`Scalar`].
//! The [`ops`] module holds the kernels that binary and unary operators in
//! compiled expressions bottom out in.

pub mod array;
pub mod chunk;
pub mod error;
pub mod ops;

pub use array::{Array, DataType, Datum, Scalar};
pub use chunk::Chunk;
pub use error::{EvalError, EvalResult};
pub use ops::{BinaryOperator, UnaryOperator};
