use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    Bang,

    EqualEqual,
    BangEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,

    /// `\`, introduces a lambda
    Backslash,
    /// `->`
    Arrow,
    /// `|`, separates head and tail in list patterns
    Pipe,

    // Delimiters
    Comma,
    Semicolon,
    Colon,

    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,

    // Identifiers & Literals
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),

    // Keywords
    True,
    False,
    Nil,
    Fn,
    Let,
    If,
    Then,
    Else,
    While,
    Match,
    Try,
    As,

    // Special
    Newline,
    Eof,
}

impl Token {
    /// Get the Token for the given keyword, if valid.
    pub fn lookup_keyword(word: &str) -> Option<Token> {
        use Token::*;

        let keyword = match word {
            "true" => True,
            "false" => False,
            "nil" => Nil,
            "fn" => Fn,
            "let" => Let,
            "if" => If,
            "then" => Then,
            "else" => Else,
            "while" => While,
            "match" => Match,
            "try" => Try,
            "as" => As,
            _ => return None,
        };
        Some(keyword)
    }

    /// Whether the token ends a statement.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Token::Newline | Token::Semicolon)
    }

    /// How the token is spelled in source, or its category for literals.
    pub fn symbol(&self) -> &'static str {
        use Token::*;

        match self {
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Equal => "=",
            Bang => "!",
            EqualEqual => "==",
            BangEqual => "!=",
            LessThan => "<",
            GreaterThan => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            Backslash => "\\",
            Arrow => "->",
            Pipe => "|",

            Comma => ",",
            Semicolon => ";",
            Colon => ":",
            LeftParen => "(",
            RightParen => ")",
            LeftBrace => "{",
            RightBrace => "}",
            LeftBracket => "[",
            RightBracket => "]",

            Identifier(_) => "identifier",
            Integer(_) => "integer",
            Float(_) => "float",
            String(_) => "string",

            True => "true",
            False => "false",
            Nil => "nil",
            Fn => "fn",
            Let => "let",
            If => "if",
            Then => "then",
            Else => "else",
            While => "while",
            Match => "match",
            Try => "try",
            As => "as",

            Newline => "newline",
            Eof => "EOF",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => f.write_str(name),
            Token::Integer(value) => write!(f, "{value}"),
            // Keep the decimal point, 1.0 rather than 1
            Token::Float(value) if value.fract() == 0.0 => write!(f, "{value:.1}"),
            Token::Float(value) => write!(f, "{value}"),
            Token::String(value) => write!(f, "\"{value}\""),
            fixed => f.write_str(fixed.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::token::Token;

    #[test]
    fn display() {
        let tests = vec![
            (Token::Float(12345.0), "12345.0"),
            (Token::Float(0.25), "0.25"),
            (Token::Integer(7), "7"),
            (Token::String("hi".into()), "\"hi\""),
            (Token::LeftBrace, "{"),
            (Token::Backslash, "\\"),
            (Token::Arrow, "->"),
            (Token::Eof, "EOF"),
        ];

        for (token, expected) in tests {
            assert_eq!(token.to_string(), expected);
        }
    }

    #[test]
    fn keyword_lookup() {
        assert_eq!(Token::lookup_keyword("then"), Some(Token::Then));
        assert_eq!(Token::lookup_keyword("match"), Some(Token::Match));
        assert_eq!(Token::lookup_keyword("as"), Some(Token::As));
        assert_eq!(Token::lookup_keyword("thenx"), None);
    }
}
