//! colchain - lazy expression chains over chunked columnar sources.
//!
//! A [`Chain`] wraps a [`ChunkSource`] with named, lazily evaluated
//! expressions. `define` introduces derived columns without materializing
//! anything; `iterate` resolves the requested outputs to the minimal set of
//! raw columns, streams the source in fixed-size chunks, and yields one
//! aggregate record per chunk.

pub mod chain;
pub mod column;
pub mod exec;
pub mod expr;
pub mod source;

pub use chain::{
    Chain, ChainError, ChainOptions, ChainResult, NoSpecializer, OutputType, Record, RecordIter,
    Records, Specializer,
};
pub use column::{Array, Chunk, DataType, Datum, EvalError, Scalar};
pub use exec::{CalcExecutor, SerialExecutor, ThreadPoolExecutor};
pub use expr::{ExprError, ExprSpec, NativeExpr, Outputs};
pub use source::{ChunkSource, MemorySource, ReadOptions};
