use std::iter::Peekable;
use std::num::{ParseFloatError, ParseIntError};
use std::str::Chars;

use thiserror::Error;

use crate::span::{BytePos, Span, WithSpan};
use crate::token::Token;

#[derive(Debug, Error, PartialEq)]
pub enum LexError {
    #[error("Illegal character '{ch}' (line {line})")]
    UnexpectedChar { ch: char, line: usize },
    #[error("Expected closing {quote} of string literal but reached EOF (line {line})")]
    StringNotClosed { quote: char, line: usize },
    #[error("Invalid escape sequence \\{ch} (line {line})")]
    InvalidEscape { ch: char, line: usize },
    #[error("Invalid float: {0}")]
    InvalidFloat(ParseFloatError),
    #[error("Invalid integer: {0}")]
    InvalidInt(ParseIntError),
}

type LexResult<T> = Result<T, LexError>;

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    pos: BytePos,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            chars: input.chars().peekable(),
            pos: BytePos::new(0),
            line: 1,
        }
    }

    /// Read the whole input into a token sequence that always ends with `Token::Eof`.
    pub fn tokenize(mut self) -> LexResult<Vec<WithSpan<Token>>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let at_end = token.value == Token::Eof;
            tokens.push(token);
            if at_end {
                return Ok(tokens);
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos = self.pos.shift(c);
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Consume the next character only if it is `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Append characters to `buf` for as long as `accept` holds.
    fn take_while(&mut self, buf: &mut String, accept: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !accept(c) {
                break;
            }
            buf.push(c);
            self.bump();
        }
    }

    // Newlines are tokens, so they are not trivia.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some('#') => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.bump();
                    }
                }
                Some(c) if c != '\n' && c.is_whitespace() => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn string(&mut self, quote: char) -> LexResult<Token> {
        let start_line = self.line;
        let unclosed = LexError::StringNotClosed {
            quote,
            line: start_line,
        };

        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(unclosed),
                Some(c) if c == quote => return Ok(Token::String(text)),
                Some('\\') => match self.bump() {
                    None => return Err(unclosed),
                    Some(c) => text.push(self.escape(c)?),
                },
                Some(c) => text.push(c),
            }
        }
    }

    /// The character produced by the escape sequence `\c`.
    fn escape(&self, c: char) -> LexResult<char> {
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' | '"' | '\'' => c,
            _ => return Err(LexError::InvalidEscape { ch: c, line: self.line }),
        })
    }

    fn number(&mut self, first: char) -> LexResult<Token> {
        let mut digits = String::from(first);
        let mut is_float = false;

        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => digits.push(c),
                '.' if !is_float => {
                    is_float = true;
                    digits.push(c);
                }
                // 1_000
                '_' => {}
                _ => break,
            }
            self.bump();
        }

        if is_float {
            digits.parse().map(Token::Float).map_err(LexError::InvalidFloat)
        } else {
            digits.parse().map(Token::Integer).map_err(LexError::InvalidInt)
        }
    }

    fn word(&mut self, first: char) -> Token {
        let mut name = String::from(first);
        self.take_while(&mut name, |c| starts_identifier(c) || c.is_ascii_digit());

        match Token::lookup_keyword(&name) {
            Some(keyword) => keyword,
            None => Token::Identifier(name),
        }
    }

    /// Lex one token, with the span and line it started on.
    pub fn next_token(&mut self) -> LexResult<WithSpan<Token>> {
        self.skip_trivia();

        let start = self.pos;
        let line = self.line;

        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(WithSpan::new(Token::Eof, Span::new(start, start, line))),
        };

        let token = match c {
            '\n' => Token::Newline,
            '"' | '\'' => self.string(c)?,
            '0'..='9' => self.number(c)?,
            c if starts_identifier(c) => self.word(c),

            '-' if self.eat('>') => Token::Arrow,
            '=' if self.eat('=') => Token::EqualEqual,
            '!' if self.eat('=') => Token::BangEqual,
            '<' if self.eat('=') => Token::LessEqual,
            '>' if self.eat('=') => Token::GreaterEqual,

            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '=' => Token::Equal,
            '!' => Token::Bang,
            '<' => Token::LessThan,
            '>' => Token::GreaterThan,
            '\\' => Token::Backslash,
            '|' => Token::Pipe,

            ',' => Token::Comma,
            ';' => Token::Semicolon,
            ':' => Token::Colon,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,

            ch => return Err(LexError::UnexpectedChar { ch, line }),
        };

        Ok(WithSpan::new(token, Span::new(start, self.pos, line)))
    }
}

fn starts_identifier(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}
