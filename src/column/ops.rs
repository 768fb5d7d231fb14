//! Elementwise evaluation kernels.
//!
//! Operators are vectorized over [`Datum`] operands: scalars broadcast against
//! arrays, arrays must agree in length, and integer operands promote to
//! `Float64` whenever a float is involved. Division and exponentiation always
//! produce `Float64`.

use crate::column::array::{Array, Datum, Scalar};
use crate::column::error::{EvalError, EvalResult};

/// Binary operators of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }
}

/// Unary operators of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "not",
        }
    }
}

/// Apply a binary operator to two datums.
pub fn binary(op: BinaryOperator, left: &Datum, right: &Datum) -> EvalResult<Datum> {
    match op {
        BinaryOperator::Add => numeric_binary(op, left, right, int_add, |a, b| a + b),
        BinaryOperator::Subtract => numeric_binary(op, left, right, int_sub, |a, b| a - b),
        BinaryOperator::Multiply => numeric_binary(op, left, right, int_mul, |a, b| a * b),
        BinaryOperator::Modulo => numeric_binary(op, left, right, int_mod, |a, b| a % b),
        BinaryOperator::Divide => float_binary_op(op, left, right, |a, b| a / b),
        BinaryOperator::Power => float_binary_op(op, left, right, f64::powf),
        BinaryOperator::Equal => equality(op, left, right, false),
        BinaryOperator::NotEqual => equality(op, left, right, true),
        BinaryOperator::Less => comparison(op, left, right, |a, b| a < b),
        BinaryOperator::LessEqual => comparison(op, left, right, |a, b| a <= b),
        BinaryOperator::Greater => comparison(op, left, right, |a, b| a > b),
        BinaryOperator::GreaterEqual => comparison(op, left, right, |a, b| a >= b),
        BinaryOperator::And => logical(op, left, right, |a, b| a && b),
        BinaryOperator::Or => logical(op, left, right, |a, b| a || b),
    }
}

/// Apply a unary operator to a datum.
pub fn unary(op: UnaryOperator, operand: &Datum) -> EvalResult<Datum> {
    let invalid = || EvalError::InvalidUnaryOperand {
        operator: op.as_str(),
        operand: operand.data_type(),
    };
    match op {
        UnaryOperator::Negate => match operand {
            Datum::Scalar(Scalar::Int64(v)) => Ok(Datum::from(v.wrapping_neg())),
            Datum::Scalar(Scalar::Float64(v)) => Ok(Datum::from(-v)),
            Datum::Array(Array::Int64(values)) => Ok(Datum::Array(Array::from(
                values.iter().map(|v| v.wrapping_neg()).collect::<Vec<_>>(),
            ))),
            Datum::Array(Array::Float64(values)) => Ok(Datum::Array(Array::from(
                values.iter().map(|v| -v).collect::<Vec<_>>(),
            ))),
            _ => Err(invalid()),
        },
        UnaryOperator::Not => match operand {
            Datum::Scalar(Scalar::Bool(v)) => Ok(Datum::from(!v)),
            Datum::Array(Array::Bool(values)) => Ok(Datum::Array(Array::from(
                values.iter().map(|v| !v).collect::<Vec<_>>(),
            ))),
            _ => Err(invalid()),
        },
    }
}

fn invalid_operands(op: BinaryOperator, left: &Datum, right: &Datum) -> EvalError {
    EvalError::InvalidOperands {
        operator: op.as_str(),
        left: left.data_type(),
        right: right.data_type(),
    }
}

fn int_add(a: i64, b: i64) -> EvalResult<i64> {
    Ok(a.wrapping_add(b))
}

fn int_sub(a: i64, b: i64) -> EvalResult<i64> {
    Ok(a.wrapping_sub(b))
}

fn int_mul(a: i64, b: i64) -> EvalResult<i64> {
    Ok(a.wrapping_mul(b))
}

fn int_mod(a: i64, b: i64) -> EvalResult<i64> {
    if b == 0 {
        Err(EvalError::DivisionByZero)
    } else {
        Ok(a.wrapping_rem(b))
    }
}

/// Integer view of a datum. Only `Int64` datums have one.
enum IntOperand<'a> {
    Scalar(i64),
    Array(&'a [i64]),
}

impl IntOperand<'_> {
    fn len(&self) -> Option<usize> {
        match self {
            IntOperand::Scalar(_) => None,
            IntOperand::Array(values) => Some(values.len()),
        }
    }

    fn get(&self, index: usize) -> i64 {
        match self {
            IntOperand::Scalar(v) => *v,
            IntOperand::Array(values) => values[index],
        }
    }
}

fn int_operand(datum: &Datum) -> Option<IntOperand> {
    match datum {
        Datum::Scalar(Scalar::Int64(v)) => Some(IntOperand::Scalar(*v)),
        Datum::Array(Array::Int64(values)) => Some(IntOperand::Array(values)),
        _ => None,
    }
}

/// Float view of a datum. Integer values promote; booleans have none.
enum FloatOperand<'a> {
    Scalar(f64),
    IntArray(&'a [i64]),
    FloatArray(&'a [f64]),
}

impl FloatOperand<'_> {
    fn len(&self) -> Option<usize> {
        match self {
            FloatOperand::Scalar(_) => None,
            FloatOperand::IntArray(values) => Some(values.len()),
            FloatOperand::FloatArray(values) => Some(values.len()),
        }
    }

    fn get(&self, index: usize) -> f64 {
        match self {
            FloatOperand::Scalar(v) => *v,
            FloatOperand::IntArray(values) => values[index] as f64,
            FloatOperand::FloatArray(values) => values[index],
        }
    }
}

fn float_operand(datum: &Datum) -> Option<FloatOperand> {
    match datum {
        Datum::Scalar(Scalar::Int64(v)) => Some(FloatOperand::Scalar(*v as f64)),
        Datum::Scalar(Scalar::Float64(v)) => Some(FloatOperand::Scalar(*v)),
        Datum::Array(Array::Int64(values)) => Some(FloatOperand::IntArray(values)),
        Datum::Array(Array::Float64(values)) => Some(FloatOperand::FloatArray(values)),
        _ => None,
    }
}

/// Boolean view of a datum.
enum BoolOperand<'a> {
    Scalar(bool),
    Array(&'a [bool]),
}

impl BoolOperand<'_> {
    fn len(&self) -> Option<usize> {
        match self {
            BoolOperand::Scalar(_) => None,
            BoolOperand::Array(values) => Some(values.len()),
        }
    }

    fn get(&self, index: usize) -> bool {
        match self {
            BoolOperand::Scalar(v) => *v,
            BoolOperand::Array(values) => values[index],
        }
    }
}

fn bool_operand(datum: &Datum) -> Option<BoolOperand> {
    match datum {
        Datum::Scalar(Scalar::Bool(v)) => Some(BoolOperand::Scalar(*v)),
        Datum::Array(Array::Bool(values)) => Some(BoolOperand::Array(values)),
        _ => None,
    }
}

fn broadcast_len(left: Option<usize>, right: Option<usize>) -> EvalResult<Option<usize>> {
    match (left, right) {
        (None, None) => Ok(None),
        (Some(n), None) | (None, Some(n)) => Ok(Some(n)),
        (Some(n), Some(m)) => {
            if n == m {
                Ok(Some(n))
            } else {
                Err(EvalError::LengthMismatch { left: n, right: m })
            }
        }
    }
}

/// Arithmetic with int preservation: both-int operands stay `Int64`,
/// anything else runs in `Float64`.
fn numeric_binary(
    op: BinaryOperator,
    left: &Datum,
    right: &Datum,
    int_op: fn(i64, i64) -> EvalResult<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Datum> {
    if let (Some(l), Some(r)) = (int_operand(left), int_operand(right)) {
        return match broadcast_len(l.len(), r.len())? {
            None => int_op(l.get(0), r.get(0)).map(Datum::from),
            Some(n) => {
                let values = (0..n)
                    .map(|i| int_op(l.get(i), r.get(i)))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Datum::Array(Array::from(values)))
            }
        };
    }
    float_binary_op(op, left, right, float_op)
}

fn float_binary_op(
    op: BinaryOperator,
    left: &Datum,
    right: &Datum,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Datum> {
    let (l, r) = match (float_operand(left), float_operand(right)) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(invalid_operands(op, left, right)),
    };
    match broadcast_len(l.len(), r.len())? {
        None => Ok(Datum::from(float_op(l.get(0), r.get(0)))),
        Some(n) => {
            let values = (0..n).map(|i| float_op(l.get(i), r.get(i))).collect::<Vec<_>>();
            Ok(Datum::Array(Array::from(values)))
        }
    }
}

fn comparison(
    op: BinaryOperator,
    left: &Datum,
    right: &Datum,
    compare: fn(f64, f64) -> bool,
) -> EvalResult<Datum> {
    let (l, r) = match (float_operand(left), float_operand(right)) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(invalid_operands(op, left, right)),
    };
    match broadcast_len(l.len(), r.len())? {
        None => Ok(Datum::from(compare(l.get(0), r.get(0)))),
        Some(n) => {
            let values = (0..n).map(|i| compare(l.get(i), r.get(i))).collect::<Vec<_>>();
            Ok(Datum::Array(Array::from(values)))
        }
    }
}

/// Equality also covers boolean operands; everything else compares
/// numerically.
fn equality(op: BinaryOperator, left: &Datum, right: &Datum, negate: bool) -> EvalResult<Datum> {
    if let (Some(l), Some(r)) = (bool_operand(left), bool_operand(right)) {
        return bool_zip(l, r, move |a, b| (a == b) != negate);
    }
    if negate {
        comparison(op, left, right, |a, b| a != b)
    } else {
        comparison(op, left, right, |a, b| a == b)
    }
}

fn logical(
    op: BinaryOperator,
    left: &Datum,
    right: &Datum,
    combine: fn(bool, bool) -> bool,
) -> EvalResult<Datum> {
    let (l, r) = match (bool_operand(left), bool_operand(right)) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(invalid_operands(op, left, right)),
    };
    bool_zip(l, r, combine)
}

fn bool_zip(
    l: BoolOperand,
    r: BoolOperand,
    combine: impl Fn(bool, bool) -> bool,
) -> EvalResult<Datum> {
    match broadcast_len(l.len(), r.len())? {
        None => Ok(Datum::from(combine(l.get(0), r.get(0)))),
        Some(n) => {
            let values = (0..n).map(|i| combine(l.get(i), r.get(i))).collect::<Vec<_>>();
            Ok(Datum::Array(Array::from(values)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::array::DataType;

    #[test]
    fn test_int_arithmetic_stays_int() {
        let left = Datum::from(Array::from(vec![1i64, 2, 3]));
        let right = Datum::from(Array::from(vec![10i64, 20, 30]));
        let result = binary(BinaryOperator::Add, &left, &right).unwrap();
        assert_eq!(result, Datum::Array(Array::from(vec![11i64, 22, 33])));
    }

    #[test]
    fn test_mixed_arithmetic_promotes() {
        let left = Datum::from(Array::from(vec![1i64, 2]));
        let right = Datum::from(0.5f64);
        let result = binary(BinaryOperator::Add, &left, &right).unwrap();
        assert_eq!(result, Datum::Array(Array::from(vec![1.5f64, 2.5])));
    }

    #[test]
    fn test_division_is_float() {
        let left = Datum::from(Array::from(vec![1i64, 3]));
        let right = Datum::from(2i64);
        let result = binary(BinaryOperator::Divide, &left, &right).unwrap();
        assert_eq!(result, Datum::Array(Array::from(vec![0.5f64, 1.5])));
    }

    #[test]
    fn test_scalar_broadcast() {
        let left = Datum::from(10i64);
        let right = Datum::from(Array::from(vec![1i64, 2]));
        let result = binary(BinaryOperator::Subtract, &left, &right).unwrap();
        assert_eq!(result, Datum::Array(Array::from(vec![9i64, 8])));
    }

    #[test]
    fn test_length_mismatch() {
        let left = Datum::from(Array::from(vec![1i64, 2]));
        let right = Datum::from(Array::from(vec![1i64, 2, 3]));
        assert!(matches!(
            binary(BinaryOperator::Add, &left, &right),
            Err(EvalError::LengthMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn test_integer_modulo_by_zero() {
        let left = Datum::from(Array::from(vec![1i64, 2]));
        let right = Datum::from(0i64);
        assert!(matches!(
            binary(BinaryOperator::Modulo, &left, &right),
            Err(EvalError::DivisionByZero)
        ));
        // Float modulo follows IEEE instead of erroring.
        let result = binary(BinaryOperator::Modulo, &Datum::from(1.0f64), &Datum::from(0.0f64));
        match result.unwrap() {
            Datum::Scalar(Scalar::Float64(v)) => assert!(v.is_nan()),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_comparison_yields_bool() {
        let left = Datum::from(Array::from(vec![1i64, 5, 3]));
        let right = Datum::from(3i64);
        let result = binary(BinaryOperator::Less, &left, &right).unwrap();
        assert_eq!(result, Datum::Array(Array::from(vec![true, false, false])));
    }

    #[test]
    fn test_bool_equality() {
        let left = Datum::from(Array::from(vec![true, false]));
        let right = Datum::from(true);
        let result = binary(BinaryOperator::Equal, &left, &right).unwrap();
        assert_eq!(result, Datum::Array(Array::from(vec![true, false])));
    }

    #[test]
    fn test_logical_requires_bool() {
        let result = binary(
            BinaryOperator::And,
            &Datum::from(1i64),
            &Datum::from(true),
        );
        assert!(matches!(
            result,
            Err(EvalError::InvalidOperands {
                operator: "and",
                left: DataType::Int64,
                right: DataType::Bool,
            })
        ));
    }

    #[test]
    fn test_power_is_float() {
        let result = binary(BinaryOperator::Power, &Datum::from(2i64), &Datum::from(3i64));
        assert_eq!(result.unwrap(), Datum::from(8.0f64));
    }

    #[test]
    fn test_unary_negate_and_not() {
        let negated = unary(UnaryOperator::Negate, &Datum::from(Array::from(vec![1i64, -2]))).unwrap();
        assert_eq!(negated, Datum::Array(Array::from(vec![-1i64, 2])));

        let inverted = unary(UnaryOperator::Not, &Datum::from(false)).unwrap();
        assert_eq!(inverted, Datum::from(true));

        assert!(matches!(
            unary(UnaryOperator::Not, &Datum::from(1i64)),
            Err(EvalError::InvalidUnaryOperand { operator: "not", .. })
        ));
    }
}
