// Expression AST and free-variable collection.

use std::collections::HashSet;

use super::builtins;
use crate::column::ops::{BinaryOperator, UnaryOperator};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Name(String),
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

/// One statement of an expression text: an assignment or a bare expression.
/// The final statement must be a bare expression and is the produced value.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { name: String, value: Expr },
    Expr(Expr),
}

/// Collect the free names of a statement sequence in first-read order.
///
/// A name is free if it is read before being assigned within the same text
/// and is not a built-in. Assignment targets bind from the statement after
/// the assignment onward (`x = x + 1` reads the outer `x`). Function names
/// in call position are not reads; they must name built-ins.
pub fn free_names(statements: &[Stmt]) -> Vec<String> {
    let mut bound = HashSet::new();
    let mut free = Vec::new();
    for stmt in statements {
        match stmt {
            Stmt::Assign { name, value } => {
                collect(value, &bound, &mut free);
                bound.insert(name.clone());
            }
            Stmt::Expr(expr) => collect(expr, &bound, &mut free),
        }
    }
    free
}

fn collect(expr: &Expr, bound: &HashSet<String>, free: &mut Vec<String>) {
    match expr {
        Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) => {}
        Expr::Name(name) => {
            if !bound.contains(name)
                && !builtins::is_builtin(name)
                && !free.iter().any(|f| f == name)
            {
                free.push(name.clone());
            }
        }
        Expr::Unary { operand, .. } => collect(operand, bound, free),
        Expr::Binary { left, right, .. } => {
            collect(left, bound, free);
            collect(right, bound, free);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect(arg, bound, free);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::Parser;

    fn parse(text: &str) -> Vec<Stmt> {
        Parser::new(text).unwrap().parse().unwrap()
    }

    #[test]
    fn test_free_names_simple() {
        assert_eq!(free_names(&parse("a + b")), vec!["a", "b"]);
    }

    #[test]
    fn test_free_names_dedup_first_read_order() {
        assert_eq!(free_names(&parse("b + a + b")), vec!["b", "a"]);
    }

    #[test]
    fn test_assignment_binds_locally() {
        assert_eq!(free_names(&parse("x = 2\nx + 1")), Vec::<String>::new());
        // The assignment's right-hand side still reads the outer name.
        assert_eq!(free_names(&parse("x = x + 1\nx")), vec!["x"]);
    }

    #[test]
    fn test_builtins_are_not_free() {
        assert_eq!(free_names(&parse("sqrt(x) + pi")), vec!["x"]);
    }

    #[test]
    fn test_call_arguments_are_reads() {
        assert_eq!(free_names(&parse("atan2(py, px)")), vec!["py", "px"]);
    }
}
