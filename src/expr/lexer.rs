// Expression lexer - tokenizes expression text.
//
// Newlines and semicolons are statement separators and are emitted as
// tokens; all other whitespace is skipped. `#` starts a comment running to
// the end of the line.

use super::error::{ExprError, ExprResult};
use super::token::Token;

pub struct Lexer {
    chars: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input, ending with `Token::Eof`.
    pub fn tokenize(&mut self) -> ExprResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                return Ok(tokens);
            }
            tokens.push(token);
        }
    }

    fn next_token(&mut self) -> ExprResult<Token> {
        self.skip_whitespace();

        let ch = match self.current() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        let token = match ch {
            '\n' => {
                self.advance();
                Token::Newline
            }
            '#' => {
                self.skip_comment();
                return self.next_token();
            }
            '+' => {
                self.advance();
                Token::Plus
            }
            '-' => {
                self.advance();
                Token::Minus
            }
            '*' => {
                self.advance();
                if self.current() == Some('*') {
                    self.advance();
                    Token::DoubleStar
                } else {
                    Token::Star
                }
            }
            '/' => {
                self.advance();
                Token::Slash
            }
            '%' => {
                self.advance();
                Token::Percent
            }
            '=' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Token::Equal
                } else {
                    Token::Assign
                }
            }
            '!' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Token::NotEqual
                } else {
                    return Err(ExprError::UnexpectedChar {
                        ch: '!',
                        position: self.position - 1,
                    });
                }
            }
            '<' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Token::LessEqual
                } else {
                    Token::Less
                }
            }
            '>' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Token::GreaterEqual
                } else {
                    Token::Greater
                }
            }
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            ':' => {
                self.advance();
                Token::Colon
            }
            ';' => {
                self.advance();
                Token::Semicolon
            }
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number()?,
            c => {
                return Err(ExprError::UnexpectedChar {
                    ch: c,
                    position: self.position,
                });
            }
        };

        Ok(token)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Skip whitespace, except newlines, which are statement separators.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() && ch != '\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::keyword_from_str(&identifier).unwrap_or(Token::Identifier(identifier))
    }

    /// Read an integer or float literal, with optional fraction and exponent.
    fn read_number(&mut self) -> ExprResult<Token> {
        let mut literal = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                literal.push(ch);
                self.advance();
            } else if ch == '.' && !is_float && self.peek().map_or(false, |c| c.is_ascii_digit()) {
                is_float = true;
                literal.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E') && !literal.is_empty() {
                is_float = true;
                literal.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current() {
                    literal.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float {
            literal
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| ExprError::InvalidNumber { literal })
        } else {
            literal
                .parse::<i64>()
                .map(Token::Int)
                .map_err(|_| ExprError::InvalidNumber { literal })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokens() {
        let tokens = Lexer::new("a + b * 2").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("a".to_string()),
                Token::Plus,
                Token::Identifier("b".to_string()),
                Token::Star,
                Token::Int(2),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens = Lexer::new("** == != <= >= < > = % /").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::DoubleStar,
                Token::Equal,
                Token::NotEqual,
                Token::LessEqual,
                Token::GreaterEqual,
                Token::Less,
                Token::Greater,
                Token::Assign,
                Token::Percent,
                Token::Slash,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("123 4.5 1e3 2.5e-2").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Int(123),
                Token::Float(4.5),
                Token::Float(1000.0),
                Token::Float(0.025),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_newlines_and_semicolons() {
        let tokens = Lexer::new("x = 2\nx + 1; x").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("x".to_string()),
                Token::Assign,
                Token::Int(2),
                Token::Newline,
                Token::Identifier("x".to_string()),
                Token::Plus,
                Token::Int(1),
                Token::Semicolon,
                Token::Identifier("x".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        let tokens = Lexer::new("a and not True def").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("a".to_string()),
                Token::And,
                Token::Not,
                Token::True,
                Token::Def,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = Lexer::new("a # trailing comment\n+ b").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("a".to_string()),
                Token::Newline,
                Token::Plus,
                Token::Identifier("b".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_char() {
        assert!(matches!(
            Lexer::new("a @ b").tokenize(),
            Err(ExprError::UnexpectedChar { ch: '@', position: 2 })
        ));
        assert!(matches!(
            Lexer::new("a ! b").tokenize(),
            Err(ExprError::UnexpectedChar { ch: '!', .. })
        ));
    }
}
