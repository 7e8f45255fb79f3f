pub mod ast;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

use ast::Program;
use lexer::Lexer;
use parser::{ParseError, Parser};

/// Tokenize and parse a complete unit of source text.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}
