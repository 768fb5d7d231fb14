//! Chain-level error types.

use thiserror::Error;

use crate::column::EvalError;
use crate::expr::ExprError;

/// Errors raised while building or driving a chain.
#[derive(Error, Debug)]
pub enum ChainError {
    /// A definition failed to compile.
    #[error(transparent)]
    Expr(#[from] ExprError),

    /// An output's evaluation failed for one chunk.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A requirement name that no chain step defines and that is not a raw
    /// source column.
    #[error("unresolved requirement: {name} is not defined by any chain step and is not a source column")]
    UnresolvedRequirement { name: String },

    /// An output in a named container carries no display name.
    #[error("output {index} has no name; this output container requires one")]
    UnnamedOutput { index: usize },

    /// A record field name that is not a legal identifier.
    #[error("{name} is not a legal field name")]
    InvalidFieldName { name: String },

    /// The source yielded a chunk violating the requested-column contract.
    #[error("source yielded {got} columns but {expected} were requested")]
    ChunkColumns { expected: usize, got: usize },

    /// The source failed to produce a chunk.
    #[error("source error: {0}")]
    Source(#[from] anyhow::Error),
}

pub type ChainResult<T> = Result<T, ChainError>;
