// Expression parser - converts tokens to statements.
//
// Precedence, loosest first: or, and, not, comparison, additive,
// multiplicative, unary sign, power, call/primary. Power is
// right-associative and binds tighter than unary minus on its left
// (`-x ** 2` is `-(x ** 2)`).

use super::ast::{Expr, Stmt};
use super::error::{ExprError, ExprResult};
use super::lexer::Lexer;
use super::token::Token;
use crate::column::ops::{BinaryOperator, UnaryOperator};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(text: &str) -> ExprResult<Self> {
        let tokens = Lexer::new(text).tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
        })
    }

    /// Parse the full token stream as a statement sequence.
    pub fn parse(&mut self) -> ExprResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.check(&Token::Eof) {
            statements.push(self.parse_statement()?);
            if !self.check(&Token::Eof) {
                self.expect_separator()?;
                self.skip_separators();
            }
        }
        if statements.is_empty() {
            return Err(ExprError::EmptyExpression);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ExprResult<Stmt> {
        if self.check(&Token::Def) {
            return Err(ExprError::NestedDefinition);
        }
        if let Token::Identifier(name) = self.current() {
            if self.peek() == &Token::Assign {
                let name = name.clone();
                self.advance(); // identifier
                self.advance(); // `=`
                let value = self.parse_expression()?;
                return Ok(Stmt::Assign { name, value });
            }
        }
        Ok(Stmt::Expr(self.parse_expression()?))
    }

    fn parse_expression(&mut self) -> ExprResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_and()?;
        while self.match_token(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_not()?;
        while self.match_token(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinaryOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ExprResult<Expr> {
        if self.match_token(&Token::Not) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ExprResult<Expr> {
        let left = self.parse_additive()?;
        let op = match self.current() {
            Token::Equal => BinaryOperator::Equal,
            Token::NotEqual => BinaryOperator::NotEqual,
            Token::Less => BinaryOperator::Less,
            Token::LessEqual => BinaryOperator::LessEqual,
            Token::Greater => BinaryOperator::Greater,
            Token::GreaterEqual => BinaryOperator::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        match self.current() {
            Token::Plus => {
                // Unary plus is the identity.
                self.advance();
                self.parse_unary()
            }
            Token::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> ExprResult<Expr> {
        let base = self.parse_primary()?;
        if self.match_token(&Token::DoubleStar) {
            self.advance();
            // Right-associative; a signed exponent is allowed.
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinaryOperator::Power,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        match self.current().clone() {
            Token::Int(value) => {
                self.advance();
                Ok(Expr::Int(value))
            }
            Token::Float(value) => {
                self.advance();
                Ok(Expr::Float(value))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Token::Identifier(name) => {
                self.advance();
                if self.match_token(&Token::LeftParen) {
                    self.advance();
                    let args = self.parse_call_args()?;
                    Ok(Expr::Call {
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_token(Token::RightParen)?;
                Ok(expr)
            }
            Token::Def => Err(ExprError::NestedDefinition),
            Token::Eof => Err(ExprError::UnexpectedEnd),
            other => Err(ExprError::UnexpectedToken {
                found: other.to_string(),
            }),
        }
    }

    fn parse_call_args(&mut self) -> ExprResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.match_token(&Token::RightParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.match_token(&Token::Comma) {
                self.advance();
                continue;
            }
            self.expect_token(Token::RightParen)?;
            return Ok(args);
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position + 1).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn check(&self, token: &Token) -> bool {
        self.current() == token
    }

    fn match_token(&self, token: &Token) -> bool {
        self.current() == token
    }

    fn expect_token(&mut self, expected: Token) -> ExprResult<()> {
        if self.current() == &expected {
            self.advance();
            Ok(())
        } else if self.check(&Token::Eof) {
            Err(ExprError::UnexpectedEnd)
        } else {
            Err(ExprError::UnexpectedToken {
                found: self.current().to_string(),
            })
        }
    }

    fn expect_separator(&mut self) -> ExprResult<()> {
        match self.current() {
            Token::Newline | Token::Semicolon => {
                self.advance();
                Ok(())
            }
            Token::Eof => Ok(()),
            other => Err(ExprError::UnexpectedToken {
                found: other.to_string(),
            }),
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.current(), Token::Newline | Token::Semicolon) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ExprResult<Vec<Stmt>> {
        Parser::new(text)?.parse()
    }

    #[test]
    fn test_precedence() {
        let statements = parse("a + b * c").unwrap();
        assert_eq!(
            statements,
            vec![Stmt::Expr(Expr::Binary {
                op: BinaryOperator::Add,
                left: Box::new(Expr::Name("a".to_string())),
                right: Box::new(Expr::Binary {
                    op: BinaryOperator::Multiply,
                    left: Box::new(Expr::Name("b".to_string())),
                    right: Box::new(Expr::Name("c".to_string())),
                }),
            })]
        );
    }

    #[test]
    fn test_power_binds_tighter_than_negation() {
        let statements = parse("-x ** 2").unwrap();
        assert_eq!(
            statements,
            vec![Stmt::Expr(Expr::Unary {
                op: UnaryOperator::Negate,
                operand: Box::new(Expr::Binary {
                    op: BinaryOperator::Power,
                    left: Box::new(Expr::Name("x".to_string())),
                    right: Box::new(Expr::Int(2)),
                }),
            })]
        );
    }

    #[test]
    fn test_power_right_associative() {
        let statements = parse("a ** b ** c").unwrap();
        match &statements[0] {
            Stmt::Expr(Expr::Binary {
                op: BinaryOperator::Power,
                right,
                ..
            }) => assert!(matches!(
                right.as_ref(),
                Expr::Binary {
                    op: BinaryOperator::Power,
                    ..
                }
            )),
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_assignment_statements() {
        let statements = parse("r2 = x*x + y*y\nsqrt(r2)").unwrap();
        assert_eq!(statements.len(), 2);
        assert!(matches!(&statements[0], Stmt::Assign { name, .. } if name == "r2"));
        assert!(matches!(
            &statements[1],
            Stmt::Expr(Expr::Call { function, .. }) if function == "sqrt"
        ));
    }

    #[test]
    fn test_empty_text() {
        assert!(matches!(parse(""), Err(ExprError::EmptyExpression)));
        assert!(matches!(parse("\n\n"), Err(ExprError::EmptyExpression)));
    }

    #[test]
    fn test_nested_definition_rejected() {
        assert!(matches!(
            parse("def f(): pass"),
            Err(ExprError::NestedDefinition)
        ));
        assert!(matches!(
            parse("x = 1\ndef g(): pass"),
            Err(ExprError::NestedDefinition)
        ));
    }

    #[test]
    fn test_boolean_operators() {
        let statements = parse("not a and b or c > 1").unwrap();
        assert!(matches!(
            &statements[0],
            Stmt::Expr(Expr::Binary {
                op: BinaryOperator::Or,
                ..
            })
        ));
    }

    #[test]
    fn test_call_with_multiple_args() {
        let statements = parse("atan2(py, px)").unwrap();
        match &statements[0] {
            Stmt::Expr(Expr::Call { function, args }) => {
                assert_eq!(function, "atan2");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_trailing_token() {
        assert!(matches!(
            parse("a b"),
            Err(ExprError::UnexpectedToken { .. })
        ));
        assert!(matches!(parse("(a + b"), Err(ExprError::UnexpectedEnd)));
    }
}
