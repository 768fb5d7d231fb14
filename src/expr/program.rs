//! Compilation of expression definitions.
//!
//! A text definition is parsed once into a [`Program`]: parameters are the
//! sorted free names, every statement's value lands in a numbered slot, and
//! name references are bound to slot indices or built-ins up front so that
//! per-chunk evaluation does no name lookups. Identical text shares one
//! program through the chain's [`ExprCache`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use super::ast::{self, Expr, Stmt};
use super::builtins::{self, Builtin};
use super::error::{ExprError, ExprResult};
use super::parser::Parser;
use crate::column::array::{Datum, Scalar};
use crate::column::error::{EvalError, EvalResult};
use crate::column::ops;

/// A compiled evaluator: positional arguments in requirement order in, one
/// datum out.
pub type EvalFn = Arc<dyn Fn(&[Datum]) -> EvalResult<Datum> + Send + Sync>;

/// Identity of a compiled expression, used for memoization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Identical text shares one compiled form.
    Text(String),
    /// Native expressions are identified by the address of their body.
    Native(usize),
}

/// A user-supplied expression body with an explicit parameter list, the
/// typed-language counterpart of a text definition.
#[derive(Clone)]
pub struct NativeExpr {
    name: Option<String>,
    parameters: Vec<String>,
    body: Arc<dyn Fn(&[Datum]) -> EvalResult<Datum> + Send + Sync>,
}

impl NativeExpr {
    pub fn new<P: Into<String>>(
        parameters: impl IntoIterator<Item = P>,
        body: impl Fn(&[Datum]) -> EvalResult<Datum> + Send + Sync + 'static,
    ) -> Self {
        NativeExpr {
            name: None,
            parameters: parameters.into_iter().map(Into::into).collect(),
            body: Arc::new(body),
        }
    }

    /// Like [`NativeExpr::new`], with a declared name used as the default
    /// display name.
    pub fn named<P: Into<String>>(
        name: impl Into<String>,
        parameters: impl IntoIterator<Item = P>,
        body: impl Fn(&[Datum]) -> EvalResult<Datum> + Send + Sync + 'static,
    ) -> Self {
        NativeExpr {
            name: Some(name.into()),
            parameters: parameters.into_iter().map(Into::into).collect(),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

impl fmt::Debug for NativeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeExpr")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// One expression definition: text to compile or a native function.
#[derive(Debug, Clone)]
pub enum ExprSpec {
    Text(String),
    Native(NativeExpr),
}

impl From<&str> for ExprSpec {
    fn from(text: &str) -> Self {
        ExprSpec::Text(text.to_string())
    }
}

impl From<String> for ExprSpec {
    fn from(text: String) -> Self {
        ExprSpec::Text(text)
    }
}

impl From<NativeExpr> for ExprSpec {
    fn from(expr: NativeExpr) -> Self {
        ExprSpec::Native(expr)
    }
}

/// The output expressions of one `iterate` call, in declaration order, each
/// with an optional caller-supplied name.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    items: Vec<(Option<String>, ExprSpec)>,
}

impl Outputs {
    /// Name → expression pairs, e.g. for map or record output.
    pub fn named<N, E>(pairs: impl IntoIterator<Item = (N, E)>) -> Self
    where
        N: Into<String>,
        E: Into<ExprSpec>,
    {
        Outputs {
            items: pairs
                .into_iter()
                .map(|(name, expr)| (Some(name.into()), expr.into()))
                .collect(),
        }
    }

    /// Unnamed expressions in order.
    pub fn list<E: Into<ExprSpec>>(items: impl IntoIterator<Item = E>) -> Self {
        Outputs {
            items: items.into_iter().map(|expr| (None, expr.into())).collect(),
        }
    }

    pub fn items(&self) -> &[(Option<String>, ExprSpec)] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&str> for Outputs {
    fn from(text: &str) -> Self {
        Outputs {
            items: vec![(None, text.into())],
        }
    }
}

impl From<String> for Outputs {
    fn from(text: String) -> Self {
        Outputs {
            items: vec![(None, text.into())],
        }
    }
}

impl From<NativeExpr> for Outputs {
    fn from(expr: NativeExpr) -> Self {
        Outputs {
            items: vec![(None, expr.into())],
        }
    }
}

/// The result of compiling one definition: evaluator, ordered requirement
/// names, memo key, and default display name.
#[derive(Clone)]
pub struct CompiledExpr {
    pub eval: EvalFn,
    pub requirements: Vec<String>,
    pub cache_key: CacheKey,
    pub name: Option<String>,
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("requirements", &self.requirements)
            .field("cache_key", &self.cache_key)
            .field("name", &self.name)
            .finish()
    }
}

/// Compile a definition, going through the cache for text.
pub fn compile(spec: &ExprSpec, cache: &ExprCache) -> ExprResult<CompiledExpr> {
    match spec {
        ExprSpec::Text(text) => compile_text(text, cache),
        ExprSpec::Native(expr) => Ok(compile_native(expr)),
    }
}

/// Compile a text definition. Identical text reuses the same [`Program`].
pub fn compile_text(text: &str, cache: &ExprCache) -> ExprResult<CompiledExpr> {
    let program = cache.get_or_parse(text)?;
    let requirements = program.parameters().to_vec();
    let eval: EvalFn = {
        let program = Arc::clone(&program);
        Arc::new(move |args| program.eval(args))
    };
    Ok(CompiledExpr {
        eval,
        requirements,
        cache_key: CacheKey::Text(text.to_string()),
        name: Some(text.to_string()),
    })
}

/// Wrap a native expression. Its declared parameter names are its
/// requirements, in declaration order.
pub fn compile_native(expr: &NativeExpr) -> CompiledExpr {
    let expected = expr.parameters.len();
    let body = Arc::clone(&expr.body);
    let eval: EvalFn = Arc::new(move |args: &[Datum]| {
        if args.len() != expected {
            return Err(EvalError::ArgumentCount {
                expected,
                actual: args.len(),
            });
        }
        body(args)
    });
    CompiledExpr {
        eval,
        requirements: expr.parameters.clone(),
        cache_key: CacheKey::Native(Arc::as_ptr(&expr.body) as *const () as usize),
        name: expr.name.clone(),
    }
}

/// Chain-level memo of parsed and bound text expressions.
#[derive(Debug, Default)]
pub struct ExprCache {
    programs: DashMap<String, Arc<Program>>,
}

impl ExprCache {
    pub fn new() -> Self {
        ExprCache::default()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    fn get_or_parse(&self, text: &str) -> ExprResult<Arc<Program>> {
        if let Some(program) = self.programs.get(text) {
            return Ok(Arc::clone(&program));
        }
        let program = Arc::new(Program::parse(text)?);
        // Two threads may parse concurrently; the entry API keeps one.
        Ok(Arc::clone(
            &self
                .programs
                .entry(text.to_string())
                .or_insert(program),
        ))
    }
}

/// A parsed and bound text expression.
#[derive(Debug)]
pub struct Program {
    parameters: Vec<String>,
    statements: Vec<BoundExpr>,
    result: BoundExpr,
}

impl Program {
    /// Parse and bind expression text.
    ///
    /// Parameters are the free names in sorted order, occupying slots
    /// `0..parameters.len()`. Every statement (assignment or discarded
    /// expression) pushes one more slot in order, so a bound slot reference
    /// is always to an already-computed value.
    pub fn parse(text: &str) -> ExprResult<Program> {
        let statements = Parser::new(text)?.parse()?;

        let mut parameters = ast::free_names(&statements);
        parameters.sort();

        let mut slots: HashMap<String, usize> = parameters
            .iter()
            .enumerate()
            .map(|(slot, name)| (name.clone(), slot))
            .collect();
        let mut next_slot = parameters.len();

        let mut bound_statements = Vec::new();
        let mut result = None;
        let last = statements.len() - 1;
        for (index, stmt) in statements.iter().enumerate() {
            match stmt {
                Stmt::Assign { name, value } => {
                    if index == last {
                        return Err(ExprError::NoResult);
                    }
                    let bound = bind(value, &slots)?;
                    bound_statements.push(bound);
                    slots.insert(name.clone(), next_slot);
                    next_slot += 1;
                }
                Stmt::Expr(expr) => {
                    let bound = bind(expr, &slots)?;
                    if index == last {
                        result = Some(bound);
                    } else {
                        // A non-final expression statement is evaluated for
                        // its errors and its value discarded.
                        bound_statements.push(bound);
                        next_slot += 1;
                    }
                }
            }
        }
        let result = result.ok_or(ExprError::EmptyExpression)?;

        Ok(Program {
            parameters,
            statements: bound_statements,
            result,
        })
    }

    /// Free names of the text, sorted: the evaluator's positional parameters.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn eval(&self, args: &[Datum]) -> EvalResult<Datum> {
        if args.len() != self.parameters.len() {
            return Err(EvalError::ArgumentCount {
                expected: self.parameters.len(),
                actual: args.len(),
            });
        }
        let mut slots: Vec<Datum> = args.to_vec();
        for statement in &self.statements {
            let value = eval_bound(statement, &slots)?;
            slots.push(value);
        }
        eval_bound(&self.result, &slots)
    }
}

/// An expression with every name resolved to a slot, constant, or built-in.
#[derive(Debug)]
enum BoundExpr {
    Const(Scalar),
    Slot(usize),
    Unary {
        op: ops::UnaryOperator,
        operand: Box<BoundExpr>,
    },
    Binary {
        op: ops::BinaryOperator,
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
    },
    Call {
        function: &'static Builtin,
        args: Vec<BoundExpr>,
    },
}

fn bind(expr: &Expr, slots: &HashMap<String, usize>) -> ExprResult<BoundExpr> {
    match expr {
        Expr::Int(value) => Ok(BoundExpr::Const(Scalar::Int64(*value))),
        Expr::Float(value) => Ok(BoundExpr::Const(Scalar::Float64(*value))),
        Expr::Bool(value) => Ok(BoundExpr::Const(Scalar::Bool(*value))),
        Expr::Name(name) => {
            if let Some(&slot) = slots.get(name) {
                Ok(BoundExpr::Slot(slot))
            } else if let Some(value) = builtins::constant(name) {
                Ok(BoundExpr::Const(value))
            } else if builtins::function(name).is_some() {
                Err(ExprError::BuiltinAsValue { name: name.clone() })
            } else {
                // Free-name collection and binding share the built-in rules,
                // so every other name was collected as a parameter.
                unreachable!("name {} has no slot", name)
            }
        }
        Expr::Unary { op, operand } => Ok(BoundExpr::Unary {
            op: *op,
            operand: Box::new(bind(operand, slots)?),
        }),
        Expr::Binary { op, left, right } => Ok(BoundExpr::Binary {
            op: *op,
            left: Box::new(bind(left, slots)?),
            right: Box::new(bind(right, slots)?),
        }),
        Expr::Call { function, args } => {
            let builtin = builtins::function(function).ok_or_else(|| ExprError::UnknownFunction {
                name: function.clone(),
            })?;
            if args.len() != builtin.arity {
                return Err(ExprError::FunctionArity {
                    function: function.clone(),
                    expected: builtin.arity,
                    actual: args.len(),
                });
            }
            let args = args
                .iter()
                .map(|arg| bind(arg, slots))
                .collect::<ExprResult<Vec<_>>>()?;
            Ok(BoundExpr::Call {
                function: builtin,
                args,
            })
        }
    }
}

fn eval_bound(expr: &BoundExpr, slots: &[Datum]) -> EvalResult<Datum> {
    match expr {
        BoundExpr::Const(value) => Ok(Datum::Scalar(*value)),
        BoundExpr::Slot(slot) => Ok(slots[*slot].clone()),
        BoundExpr::Unary { op, operand } => {
            let value = eval_bound(operand, slots)?;
            ops::unary(*op, &value)
        }
        BoundExpr::Binary { op, left, right } => {
            let left = eval_bound(left, slots)?;
            let right = eval_bound(right, slots)?;
            ops::binary(*op, &left, &right)
        }
        BoundExpr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval_bound(arg, slots))
                .collect::<EvalResult<Vec<_>>>()?;
            (function.eval)(&values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::array::Array;

    #[test]
    fn test_simple_sum() {
        let program = Program::parse("a + b").unwrap();
        assert_eq!(program.parameters(), ["a", "b"]);
        let result = program
            .eval(&[Datum::from(2i64), Datum::from(3i64)])
            .unwrap();
        assert_eq!(result, Datum::from(5i64));
    }

    #[test]
    fn test_parameters_sorted() {
        let program = Program::parse("c + a + b").unwrap();
        assert_eq!(program.parameters(), ["a", "b", "c"]);
    }

    #[test]
    fn test_local_assignment() {
        let program = Program::parse("x = 2\nx + 1").unwrap();
        assert!(program.parameters().is_empty());
        assert_eq!(program.eval(&[]).unwrap(), Datum::from(3i64));
    }

    #[test]
    fn test_rebinding_reads_outer_value() {
        let program = Program::parse("x = x + 1\nx * 2").unwrap();
        assert_eq!(program.parameters(), ["x"]);
        assert_eq!(program.eval(&[Datum::from(4i64)]).unwrap(), Datum::from(10i64));
    }

    #[test]
    fn test_builtin_call_and_constant() {
        let program = Program::parse("sqrt(x) + pi").unwrap();
        assert_eq!(program.parameters(), ["x"]);
        let result = program.eval(&[Datum::from(4.0f64)]).unwrap();
        assert_eq!(result, Datum::from(2.0 + std::f64::consts::PI));
    }

    #[test]
    fn test_vectorized_eval() {
        let program = Program::parse("x * x").unwrap();
        let result = program
            .eval(&[Datum::from(Array::from(vec![1i64, 2, 3]))])
            .unwrap();
        assert_eq!(result, Datum::Array(Array::from(vec![1i64, 4, 9])));
    }

    #[test]
    fn test_final_assignment_has_no_result() {
        assert!(matches!(
            Program::parse("x = 2"),
            Err(ExprError::NoResult)
        ));
    }

    #[test]
    fn test_unknown_function() {
        assert!(matches!(
            Program::parse("frobnicate(x)"),
            Err(ExprError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn test_unknown_names_become_parameters() {
        // A name that matches nothing built-in is a requirement, never a
        // binding error.
        let program = Program::parse("totally_unknown + 1").unwrap();
        assert_eq!(program.parameters(), ["totally_unknown"]);
    }

    #[test]
    fn test_builtin_as_value() {
        assert!(matches!(
            Program::parse("sqrt + 1"),
            Err(ExprError::BuiltinAsValue { .. })
        ));
    }

    #[test]
    fn test_function_arity() {
        assert!(matches!(
            Program::parse("sqrt(x, y)"),
            Err(ExprError::FunctionArity {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_wrong_argument_count_at_eval() {
        let program = Program::parse("a + b").unwrap();
        assert!(matches!(
            program.eval(&[Datum::from(1i64)]),
            Err(EvalError::ArgumentCount {
                expected: 2,
                actual: 1,
            })
        ));
    }

    #[test]
    fn test_cache_reuses_programs() {
        let cache = ExprCache::new();
        let first = compile_text("a + b", &cache).unwrap();
        let second = compile_text("a + b", &cache).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(first.cache_key, second.cache_key);
        compile_text("a - b", &cache).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_compile_text_display_name() {
        let cache = ExprCache::new();
        let compiled = compile_text("a + b", &cache).unwrap();
        assert_eq!(compiled.name.as_deref(), Some("a + b"));
    }

    #[test]
    fn test_native_expr() {
        let expr = NativeExpr::named("double", ["x"], |args| {
            crate::column::ops::binary(
                crate::column::ops::BinaryOperator::Add,
                &args[0],
                &args[0],
            )
        });
        let compiled = compile_native(&expr);
        assert_eq!(compiled.requirements, ["x"]);
        assert_eq!(compiled.name.as_deref(), Some("double"));
        let result = (compiled.eval)(&[Datum::from(21i64)]).unwrap();
        assert_eq!(result, Datum::from(42i64));
        assert!(matches!(
            (compiled.eval)(&[]),
            Err(EvalError::ArgumentCount { expected: 1, actual: 0 })
        ));
    }

    #[test]
    fn test_native_cache_key_is_identity() {
        let a = NativeExpr::new(["x"], |args| Ok(args[0].clone()));
        let b = NativeExpr::new(["x"], |args| Ok(args[0].clone()));
        assert_ne!(compile_native(&a).cache_key, compile_native(&b).cache_key);
        assert_eq!(compile_native(&a).cache_key, compile_native(&a).cache_key);
    }
}
