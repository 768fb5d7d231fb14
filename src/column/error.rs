use thiserror::Error;

use crate::column::array::DataType;

/// Error raised while evaluating a compiled expression over a chunk.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("operator {operator} does not accept {left:?} and {right:?}")]
    InvalidOperands {
        operator: &'static str,
        left: DataType,
        right: DataType,
    },
    #[error("operator {operator} does not accept {operand:?}")]
    InvalidUnaryOperand {
        operator: &'static str,
        operand: DataType,
    },
    #[error("function {function} does not accept {operand:?}")]
    InvalidArgument {
        function: &'static str,
        operand: DataType,
    },
    #[error("array length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("integer division or modulo by zero")]
    DivisionByZero,
    #[error("expression takes {expected} arguments but {actual} were passed")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("column index {index} out of range for chunk with {count} columns")]
    ColumnOutOfRange { index: usize, count: usize },
    #[error("evaluation failed: {message}")]
    Failed { message: String },
}

impl EvalError {
    /// Free-form failure, for expression bodies supplied as native closures.
    pub fn failed(message: impl Into<String>) -> Self {
        EvalError::Failed {
            message: message.into(),
        }
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
