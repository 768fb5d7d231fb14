//! The expression compiler.
//!
//! Turns a textual definition into a compiled evaluator together with its
//! statically-extracted requirement names (the free variables of the text),
//! or wraps a [`NativeExpr`] whose declared parameters are its requirements.
//! The pipeline is lexer → parser → free-variable collection → slot binding;
//! compiled programs are memoized per chain in an [`ExprCache`].

pub mod ast;
pub mod builtins;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod token;

pub use error::{ExprError, ExprResult};
pub use program::{
    compile, compile_native, compile_text, CacheKey, CompiledExpr, EvalFn, ExprCache, ExprSpec,
    NativeExpr, Outputs, Program,
};
pub use token::is_identifier;
