// Tokens of the expression language.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Identifier(String),
    Int(i64),
    Float(f64),

    // Keywords
    And,
    Or,
    Not,
    True,
    False,
    Def,

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    Percent,
    Assign,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,
    Colon,
    Newline,
    Semicolon,

    // Special
    Eof,
}

impl Token {
    /// Convert a string to a keyword token if it matches. Keywords are
    /// case-sensitive.
    pub fn keyword_from_str(s: &str) -> Option<Token> {
        match s {
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "not" => Some(Token::Not),
            "True" => Some(Token::True),
            "False" => Some(Token::False),
            "def" => Some(Token::Def),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Int(value) => write!(f, "{}", value),
            Token::Float(value) => write!(f, "{}", value),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::True => write!(f, "True"),
            Token::False => write!(f, "False"),
            Token::Def => write!(f, "def"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::DoubleStar => write!(f, "**"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Assign => write!(f, "="),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Newline => write!(f, "newline"),
            Token::Semicolon => write!(f, ";"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Check whether a string is a legal identifier: an alphabetic or underscore
/// first character, alphanumeric or underscore rest, and not a keyword.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_') && Token::keyword_from_str(name).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_from_str() {
        assert_eq!(Token::keyword_from_str("and"), Some(Token::And));
        assert_eq!(Token::keyword_from_str("def"), Some(Token::Def));
        assert_eq!(Token::keyword_from_str("True"), Some(Token::True));
        // Keywords are case-sensitive.
        assert_eq!(Token::keyword_from_str("AND"), None);
        assert_eq!(Token::keyword_from_str("x"), None);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("x"));
        assert!(is_identifier("_tmp"));
        assert!(is_identifier("pt2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2pt"));
        assert!(!is_identifier("x + 1"));
        assert!(!is_identifier("def"));
        assert!(!is_identifier("not"));
    }
}
