//! Expression definition error types.

use thiserror::Error;

/// Errors raised while lexing, parsing, or binding an expression definition.
///
/// All of these are synchronous: they surface from `define` or `iterate`
/// before any chunk is fetched.
#[derive(Error, Debug)]
pub enum ExprError {
    #[error("unexpected character {ch:?} at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("invalid numeric literal: {literal}")]
    InvalidNumber { literal: String },

    #[error("unexpected token: {found}")]
    UnexpectedToken { found: String },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("nested definitions are not allowed")]
    NestedDefinition,

    #[error("expression text contains no statements")]
    EmptyExpression,

    #[error("expression text must end with an expression, not an assignment")]
    NoResult,

    #[error("unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("{name} is a built-in function, not a value")]
    BuiltinAsValue { name: String },

    #[error("function {function} takes {expected} arguments but {actual} were given")]
    FunctionArity {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("names must be identifiers: {name}")]
    InvalidName { name: String },
}

pub type ExprResult<T> = Result<T, ExprError>;
