//! Built-in math functions and constants.
//!
//! Compiled expressions evaluate in an environment seeded with these names.
//! Built-in names are never requirements: a source column can only collide
//! with one through an alias mapping a different requirement name onto it.

use crate::column::array::{Array, Datum, Scalar};
use crate::column::error::{EvalError, EvalResult};

/// One built-in function: a name, a fixed arity, and an elementwise kernel.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub eval: fn(&[Datum]) -> EvalResult<Datum>,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin { name: "sqrt", arity: 1, eval: sqrt },
    Builtin { name: "abs", arity: 1, eval: abs },
    Builtin { name: "sin", arity: 1, eval: sin },
    Builtin { name: "cos", arity: 1, eval: cos },
    Builtin { name: "tan", arity: 1, eval: tan },
    Builtin { name: "asin", arity: 1, eval: asin },
    Builtin { name: "acos", arity: 1, eval: acos },
    Builtin { name: "atan", arity: 1, eval: atan },
    Builtin { name: "atan2", arity: 2, eval: atan2 },
    Builtin { name: "exp", arity: 1, eval: exp },
    Builtin { name: "log", arity: 1, eval: log },
    Builtin { name: "log10", arity: 1, eval: log10 },
    Builtin { name: "floor", arity: 1, eval: floor },
    Builtin { name: "ceil", arity: 1, eval: ceil },
    Builtin { name: "minimum", arity: 2, eval: minimum },
    Builtin { name: "maximum", arity: 2, eval: maximum },
];

/// Look up a built-in function by name.
pub fn function(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

/// Look up a built-in constant by name.
pub fn constant(name: &str) -> Option<Scalar> {
    match name {
        "pi" => Some(Scalar::Float64(std::f64::consts::PI)),
        "e" => Some(Scalar::Float64(std::f64::consts::E)),
        _ => None,
    }
}

/// Whether a name is claimed by the built-in environment (function or
/// constant).
pub fn is_builtin(name: &str) -> bool {
    function(name).is_some() || constant(name).is_some()
}

/// Float view of one argument: integers promote, booleans are rejected.
enum FloatArg {
    Scalar(f64),
    Array(Vec<f64>),
}

fn float_arg(function: &'static str, datum: &Datum) -> EvalResult<FloatArg> {
    match datum {
        Datum::Scalar(Scalar::Int64(v)) => Ok(FloatArg::Scalar(*v as f64)),
        Datum::Scalar(Scalar::Float64(v)) => Ok(FloatArg::Scalar(*v)),
        Datum::Array(Array::Int64(values)) => {
            Ok(FloatArg::Array(values.iter().map(|&v| v as f64).collect()))
        }
        Datum::Array(Array::Float64(values)) => Ok(FloatArg::Array(values.to_vec())),
        other => Err(EvalError::InvalidArgument {
            function,
            operand: other.data_type(),
        }),
    }
}

fn map1(function: &'static str, args: &[Datum], f: fn(f64) -> f64) -> EvalResult<Datum> {
    match float_arg(function, &args[0])? {
        FloatArg::Scalar(v) => Ok(Datum::from(f(v))),
        FloatArg::Array(values) => Ok(Datum::Array(Array::from(
            values.into_iter().map(f).collect::<Vec<_>>(),
        ))),
    }
}

fn map2(function: &'static str, args: &[Datum], f: fn(f64, f64) -> f64) -> EvalResult<Datum> {
    let left = float_arg(function, &args[0])?;
    let right = float_arg(function, &args[1])?;
    match (left, right) {
        (FloatArg::Scalar(a), FloatArg::Scalar(b)) => Ok(Datum::from(f(a, b))),
        (FloatArg::Scalar(a), FloatArg::Array(bs)) => Ok(Datum::Array(Array::from(
            bs.into_iter().map(|b| f(a, b)).collect::<Vec<_>>(),
        ))),
        (FloatArg::Array(asv), FloatArg::Scalar(b)) => Ok(Datum::Array(Array::from(
            asv.into_iter().map(|a| f(a, b)).collect::<Vec<_>>(),
        ))),
        (FloatArg::Array(asv), FloatArg::Array(bs)) => {
            if asv.len() != bs.len() {
                return Err(EvalError::LengthMismatch {
                    left: asv.len(),
                    right: bs.len(),
                });
            }
            Ok(Datum::Array(Array::from(
                asv.into_iter()
                    .zip(bs)
                    .map(|(a, b)| f(a, b))
                    .collect::<Vec<_>>(),
            )))
        }
    }
}

fn sqrt(args: &[Datum]) -> EvalResult<Datum> {
    map1("sqrt", args, f64::sqrt)
}

/// `abs` preserves integer arguments instead of promoting them.
fn abs(args: &[Datum]) -> EvalResult<Datum> {
    match &args[0] {
        Datum::Scalar(Scalar::Int64(v)) => Ok(Datum::from(v.wrapping_abs())),
        Datum::Array(Array::Int64(values)) => Ok(Datum::Array(Array::from(
            values.iter().map(|v| v.wrapping_abs()).collect::<Vec<_>>(),
        ))),
        _ => map1("abs", args, f64::abs),
    }
}

fn sin(args: &[Datum]) -> EvalResult<Datum> {
    map1("sin", args, f64::sin)
}

fn cos(args: &[Datum]) -> EvalResult<Datum> {
    map1("cos", args, f64::cos)
}

fn tan(args: &[Datum]) -> EvalResult<Datum> {
    map1("tan", args, f64::tan)
}

fn asin(args: &[Datum]) -> EvalResult<Datum> {
    map1("asin", args, f64::asin)
}

fn acos(args: &[Datum]) -> EvalResult<Datum> {
    map1("acos", args, f64::acos)
}

fn atan(args: &[Datum]) -> EvalResult<Datum> {
    map1("atan", args, f64::atan)
}

fn atan2(args: &[Datum]) -> EvalResult<Datum> {
    map2("atan2", args, f64::atan2)
}

fn exp(args: &[Datum]) -> EvalResult<Datum> {
    map1("exp", args, f64::exp)
}

fn log(args: &[Datum]) -> EvalResult<Datum> {
    map1("log", args, f64::ln)
}

fn log10(args: &[Datum]) -> EvalResult<Datum> {
    map1("log10", args, f64::log10)
}

fn floor(args: &[Datum]) -> EvalResult<Datum> {
    map1("floor", args, f64::floor)
}

fn ceil(args: &[Datum]) -> EvalResult<Datum> {
    map1("ceil", args, f64::ceil)
}

fn minimum(args: &[Datum]) -> EvalResult<Datum> {
    map2("minimum", args, f64::min)
}

fn maximum(args: &[Datum]) -> EvalResult<Datum> {
    map2("maximum", args, f64::max)
}
