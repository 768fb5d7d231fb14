//! The expression chain: a linked sequence of resolver steps terminating in
//! a source.
//!
//! Each step either answers a requirement name locally or delegates to the
//! previous step; the terminal [`source::ChainSource`] maps what is left to
//! raw source columns. [`Chain`] is the public facade: `define` extends the
//! chain with named intermediate expressions, `iterate` drives one chunked
//! traversal.

pub mod define;
pub mod error;
pub mod iterate;
pub mod resolve;
pub mod source;

use std::sync::Arc;

use crate::column::{Chunk, Datum, EvalResult};
use crate::exec::CalcExecutor;
use crate::expr::{EvalFn, ExprSpec, Outputs};
use crate::source::ChunkSource;

use define::DefineStep;
use source::ChainSource;

pub use error::{ChainError, ChainResult};
pub use iterate::{OutputType, Record, RecordIter, Records};
pub use resolve::Requirements;
pub use source::ChainOptions;

/// A compiled accessor from one chunk to one requirement's value.
pub type FetchFn = Arc<dyn Fn(&Chunk) -> EvalResult<Datum> + Send + Sync>;

/// Optional compile-time specialization hook.
///
/// An embedder with a JIT backend can rewrite leaf fetchers and composed
/// evaluators into faster forms; the default is identity, so absence of the
/// capability degrades to no acceleration, never to a failure.
pub trait Specializer: Send + Sync {
    fn compile_eval(&self, eval: EvalFn) -> EvalFn {
        eval
    }

    fn compile_fetch(&self, fetch: FetchFn) -> FetchFn {
        fetch
    }
}

/// The identity specializer used when none is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpecializer;

impl Specializer for NoSpecializer {}

/// One link in a chain. Implemented by the terminal source step and the
/// define step.
///
/// `resolve` and `fetcher` are consistent: any requirement `resolve`
/// accepts is satisfiable by `fetcher` against the same accumulator.
pub(crate) trait ChainStep: Send + Sync {
    /// Ensure every raw input needed to compute `requirement` is present in
    /// the accumulator, delegating unresolved names to the previous step.
    fn resolve(&self, requirement: &str, requirements: &mut Requirements) -> ChainResult<()>;

    /// Build a function mapping one chunk to the requirement's value, using
    /// the positions recorded during `resolve`.
    fn fetcher(&self, requirement: &str, requirements: &Requirements) -> ChainResult<FetchFn>;

    /// The terminal source step of the chain.
    fn root(&self) -> &ChainSource;
}

/// A columnar source wrapped with zero or more layers of named, lazily
/// evaluated expressions.
///
/// Ownership is linear: each step owns its previous step, so requirement
/// expansion always walks toward the source and cannot cycle. Compiled text
/// is memoized per chain; every `iterate` call resolves fresh and streams
/// from scratch.
pub struct Chain {
    step: Box<dyn ChainStep>,
}

impl Chain {
    pub fn new(source: Arc<dyn ChunkSource>, options: ChainOptions) -> Self {
        Chain {
            step: Box::new(ChainSource::new(source, options)),
        }
    }

    /// Extend the chain with new named expressions without iterating.
    ///
    /// Every name must be a legal identifier. Definitions see the names of
    /// previous `define` calls and the source's columns; siblings within one
    /// call do not see each other.
    pub fn define<N, E>(self, defs: impl IntoIterator<Item = (N, E)>) -> ChainResult<Chain>
    where
        N: Into<String>,
        E: Into<ExprSpec>,
    {
        let defs = defs
            .into_iter()
            .map(|(name, spec)| (name.into(), spec.into()))
            .collect::<Vec<_>>();
        let step = DefineStep::new(self.step, defs)?;
        Ok(Chain {
            step: Box::new(step),
        })
    }

    /// Drive one chunked traversal, yielding one record per chunk.
    ///
    /// `outputs` accepts a single text or native expression, named pairs
    /// ([`Outputs::named`]), or an ordered list ([`Outputs::list`]). Tasks
    /// for one chunk's outputs run on `executor`, sequentially in-process
    /// when `None`.
    pub fn iterate(
        &self,
        outputs: impl Into<Outputs>,
        output_type: OutputType,
        executor: Option<Arc<dyn CalcExecutor>>,
    ) -> ChainResult<RecordIter> {
        iterate::build(self.step.as_ref(), outputs.into(), output_type, executor)
    }
}
