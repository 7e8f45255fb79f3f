use std::mem;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{
    Block, CallExpression, Expression, IdentifierLiteral, IfExpression, IndexExpression,
    InfixExpression, LambdaLiteral, ListLiteral, MapLiteral, MatchArm, MatchExpression, Pattern,
    PrefixExpression, Program, Statement, TryExpression,
};
use crate::lexer::LexError;
use crate::span::{BytePos, Span, WithSpan};
use crate::token::Token;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Expected {expected}, got {} at token {position}", .found.at_str())]
    Expected {
        expected: String,
        found: WithSpan<Token>,
        /// Index of the offending token in the token sequence
        position: usize,
    },
    #[error("Unexpected token {} at token {position}", .found.at_str())]
    Unexpected {
        found: WithSpan<Token>,
        position: usize,
    },
    #[error("Nesting deeper than {limit} levels at {} (token {position})", .found.at_str())]
    TooDeep {
        limit: usize,
        found: WithSpan<Token>,
        position: usize,
    },
    #[error(transparent)]
    Lex(#[from] LexError),
}

type ParseResult<T> = Result<T, ParseError>;

/// How many expressions and blocks may enclose one another.
pub const MAX_NESTING: usize = 64;

/// Recursive descent parser over a complete token sequence.
///
/// Looks at most one token ahead of the current one.
pub struct Parser {
    tokens: Vec<WithSpan<Token>>,
    position: usize,
    nesting: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<WithSpan<Token>>) -> Parser {
        if tokens.last().map(|t| &t.value) != Some(&Token::Eof) {
            let span = tokens
                .last()
                .map(|t| Span::new(t.span.end, t.span.end, t.span.line))
                .unwrap_or_else(|| Span::new(BytePos::new(0), BytePos::new(0), 1));
            tokens.push(WithSpan::new(Token::Eof, span));
        }

        Parser {
            tokens,
            position: 0,
            nesting: 0,
        }
    }

    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut program = Program::new();

        self.skip_terminators();
        while !self.current_token_is(&Token::Eof) {
            program.statements.push(self.parse_statement()?);
            self.expect_end_of_statement(&Token::Eof)?;
            self.skip_terminators();
        }

        Ok(program)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current_token() {
            Token::Let => self.parse_let_statement(),
            Token::If => self.parse_if_statement(),
            Token::While => self.parse_while_statement(),
            Token::Fn => self.parse_function_statement(),
            Token::Identifier(_) if self.peek_token() == &Token::Equal => {
                self.parse_assignment_statement()
            }
            _ => Ok(Statement::Expression {
                expression: self.parse_expression()?,
            }),
        }
    }

    fn parse_let_statement(&mut self) -> ParseResult<Statement> {
        // Consume the `let` token
        self.next_token();
        self.parse_assignment_statement()
    }

    fn parse_assignment_statement(&mut self) -> ParseResult<Statement> {
        let name = self.expect_identifier()?.name;
        self.expect(Token::Equal)?;
        self.skip_newlines();

        Ok(Statement::Let {
            name,
            value: self.parse_expression()?,
        })
    }

    fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        // Consume the `if` token
        self.next_token();
        let condition = self.parse_expression()?;

        // `if c then a else b` at the start of a statement is the expression form
        if self.current_token_is(&Token::Then) {
            return Ok(Statement::Expression {
                expression: self.parse_ternary(condition)?,
            });
        }

        let consequence = self.parse_block()?;

        // Allow `}` and `else` to be split over two lines
        if self.current_token_is(&Token::Newline) && self.peek_token() == &Token::Else {
            self.next_token();
        }

        let alternative = if self.current_token_is(&Token::Else) {
            self.next_token();
            if self.current_token_is(&Token::If) {
                Some(Block {
                    statements: vec![self.parse_if_statement()?],
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            consequence,
            alternative,
        })
    }

    fn parse_while_statement(&mut self) -> ParseResult<Statement> {
        // Consume the `while` token
        self.next_token();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;

        Ok(Statement::While { condition, body })
    }

    fn parse_function_statement(&mut self) -> ParseResult<Statement> {
        // Consume the `fn` token
        self.next_token();
        let name = self.expect_identifier()?.name;
        let parameters = self.parse_parameters()?;
        let body = Rc::new(self.parse_block()?);

        Ok(Statement::Function {
            name,
            parameters,
            body,
        })
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<IdentifierLiteral>> {
        self.expect(Token::LeftParen)?;
        self.skip_newlines();

        let mut parameters = Vec::new();
        while !self.current_token_is(&Token::RightParen) {
            parameters.push(self.expect_identifier()?);
            self.skip_newlines();
            if self.current_token_is(&Token::Comma) {
                self.next_token();
                self.skip_newlines();
            } else if !self.current_token_is(&Token::RightParen) {
                return Err(self.expected("`,` or `)`"));
            }
        }
        self.next_token();

        Ok(parameters)
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        self.nested(Self::parse_block_body)
    }

    fn parse_block_body(&mut self) -> ParseResult<Block> {
        self.expect(Token::LeftBrace)?;

        let mut statements = Vec::new();
        self.skip_terminators();
        while !self.current_token_is(&Token::RightBrace) {
            if self.current_token_is(&Token::Eof) {
                return Err(self.expected(format!("`{}`", Token::RightBrace)));
            }
            statements.push(self.parse_statement()?);
            self.expect_end_of_statement(&Token::RightBrace)?;
            self.skip_terminators();
        }
        self.next_token();

        Ok(Block { statements })
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.nested(Self::parse_comparison)
    }

    /// Run `parse` one nesting level deeper, failing once `MAX_NESTING` is passed.
    fn nested<T>(&mut self, parse: fn(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.nesting >= MAX_NESTING {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
                found: self.current().clone(),
                position: self.position,
            });
        }

        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive()?;
        while matches!(
            self.current_token(),
            Token::EqualEqual
                | Token::BangEqual
                | Token::LessThan
                | Token::GreaterThan
                | Token::LessEqual
                | Token::GreaterEqual
        ) {
            left = self.parse_infix(left, Self::parse_additive)?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative()?;
        while matches!(self.current_token(), Token::Plus | Token::Minus) {
            left = self.parse_infix(left, Self::parse_multiplicative)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_prefix()?;
        while matches!(
            self.current_token(),
            Token::Star | Token::Slash | Token::Percent
        ) {
            left = self.parse_infix(left, Self::parse_prefix)?;
        }
        Ok(left)
    }

    /// Consume the current operator and fold `left` and the next operand into one node.
    fn parse_infix(
        &mut self,
        left: Expression,
        parse_operand: fn(&mut Self) -> ParseResult<Expression>,
    ) -> ParseResult<Expression> {
        let operator = self.current_token().clone();
        self.next_token();
        self.skip_newlines();
        let right = parse_operand(self)?;

        Ok(Expression::Infix(Box::new(InfixExpression {
            left,
            operator,
            right,
        })))
    }

    fn parse_prefix(&mut self) -> ParseResult<Expression> {
        match self.current_token() {
            Token::Minus | Token::Bang => {
                let operator = self.current_token().clone();
                self.next_token();
                let right = self.nested(Self::parse_prefix)?;
                Ok(Expression::Prefix(Box::new(PrefixExpression {
                    operator,
                    right,
                })))
            }
            _ => self.parse_postfix(),
        }
    }

    /// Calls and indexing, which may be chained: `f(x)(y)`, `grid[0][1]`
    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_primary()?;

        loop {
            match self.current_token() {
                Token::LeftParen => {
                    self.next_token();
                    let arguments = self.parse_expression_list(Token::RightParen)?;
                    expression = Expression::Call(Box::new(CallExpression {
                        function: expression,
                        arguments,
                    }));
                }
                Token::LeftBracket => {
                    self.next_token();
                    self.skip_newlines();
                    let index = self.parse_expression()?;
                    self.skip_newlines();
                    self.expect(Token::RightBracket)?;
                    expression = Expression::Index(Box::new(IndexExpression {
                        left: expression,
                        index,
                    }));
                }
                _ => return Ok(expression),
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let expression = match self.current_token() {
            Token::Integer(value) => Expression::Integer(*value),
            Token::Float(value) => Expression::Float(*value),
            Token::String(value) => Expression::String(value.clone()),
            Token::True => Expression::Boolean(true),
            Token::False => Expression::Boolean(false),
            Token::Nil => Expression::Nil,
            Token::Identifier(name) => Expression::Identifier(IdentifierLiteral::from(name.as_str())),

            Token::LeftParen => return self.parse_grouped_expression(),
            Token::LeftBracket => {
                self.next_token();
                let elements = self.parse_expression_list(Token::RightBracket)?;
                return Ok(Expression::List(Box::new(ListLiteral { elements })));
            }
            Token::LeftBrace => return self.parse_map_literal(),
            Token::Backslash => return self.parse_lambda(),
            Token::If => {
                self.next_token();
                let condition = self.parse_expression()?;
                return self.parse_ternary(condition);
            }
            Token::Match => return self.parse_match(),
            Token::Try => return self.parse_try(),

            _ => return Err(self.unexpected()),
        };

        self.next_token();
        Ok(expression)
    }

    fn parse_grouped_expression(&mut self) -> ParseResult<Expression> {
        // Consume the `(` token
        self.next_token();
        self.skip_newlines();
        let expression = self.parse_expression()?;
        self.skip_newlines();
        self.expect(Token::RightParen)?;
        Ok(expression)
    }

    /// Comma separated expressions up to (and including) `closing`, which allows a trailing comma.
    fn parse_expression_list(&mut self, closing: Token) -> ParseResult<Vec<Expression>> {
        let mut list = Vec::new();

        self.skip_newlines();
        while !self.current_token_is(&closing) {
            list.push(self.parse_expression()?);
            self.skip_newlines();
            if self.current_token_is(&Token::Comma) {
                self.next_token();
                self.skip_newlines();
            } else if !self.current_token_is(&closing) {
                return Err(self.expected(format!("`,` or `{}`", closing)));
            }
        }
        self.next_token();

        Ok(list)
    }

    fn parse_map_literal(&mut self) -> ParseResult<Expression> {
        // Consume the `{` token
        self.next_token();

        let mut pairs = Vec::new();
        self.skip_newlines();
        while !self.current_token_is(&Token::RightBrace) {
            let key = self.parse_expression()?;
            self.expect(Token::Colon)?;
            self.skip_newlines();
            let value = self.parse_expression()?;
            pairs.push((key, value));

            self.skip_newlines();
            if self.current_token_is(&Token::Comma) {
                self.next_token();
                self.skip_newlines();
            } else if !self.current_token_is(&Token::RightBrace) {
                return Err(self.expected("`,` or `}`"));
            }
        }
        self.next_token();

        Ok(Expression::Map(Box::new(MapLiteral { pairs })))
    }

    fn parse_lambda(&mut self) -> ParseResult<Expression> {
        // Consume the `\` token
        self.next_token();
        let parameter = self.expect_identifier()?;
        self.expect(Token::Arrow)?;
        self.skip_newlines();
        let body = self.parse_expression()?;

        Ok(Expression::Lambda(Box::new(LambdaLiteral {
            parameter,
            body: Rc::new(body),
        })))
    }

    /// The `then a else b` part of an `if` expression, once the condition is parsed
    fn parse_ternary(&mut self, condition: Expression) -> ParseResult<Expression> {
        self.expect(Token::Then)?;
        self.skip_newlines();
        let consequence = self.parse_expression()?;
        self.skip_newlines();
        self.expect(Token::Else)?;
        self.skip_newlines();
        let alternative = self.parse_expression()?;

        Ok(Expression::If(Box::new(IfExpression {
            condition,
            consequence,
            alternative,
        })))
    }

    fn parse_match(&mut self) -> ParseResult<Expression> {
        // Consume the `match` token
        self.next_token();
        let subject = self.parse_expression()?;
        self.expect(Token::LeftBrace)?;

        let mut arms = Vec::new();
        self.skip_newlines();
        while !self.current_token_is(&Token::RightBrace) {
            let pattern = self.parse_pattern()?;
            self.expect(Token::Arrow)?;
            self.skip_newlines();
            let body = self.parse_expression()?;
            arms.push(MatchArm { pattern, body });

            // Arms are separated by a comma, a newline, or both
            let separated = matches!(self.current_token(), Token::Comma | Token::Newline);
            if separated {
                self.next_token();
            }
            self.skip_newlines();
            if !separated && !self.current_token_is(&Token::RightBrace) {
                return Err(self.expected("`,` or `}`"));
            }
        }
        self.next_token();

        Ok(Expression::Match(Box::new(MatchExpression { subject, arms })))
    }

    fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        let pattern = match self.current_token() {
            Token::Identifier(name) if name == "_" => Pattern::Wildcard,
            Token::Identifier(name) => Pattern::Binding(IdentifierLiteral::from(name.as_str())),
            Token::Integer(_)
            | Token::Float(_)
            | Token::String(_)
            | Token::True
            | Token::False
            | Token::Nil => return Ok(Pattern::Literal(self.parse_primary()?)),
            Token::Minus => {
                self.next_token();
                if !matches!(self.current_token(), Token::Integer(_) | Token::Float(_)) {
                    return Err(self.expected("number"));
                }
                let right = self.parse_primary()?;
                return Ok(Pattern::Literal(Expression::Prefix(Box::new(
                    PrefixExpression {
                        operator: Token::Minus,
                        right,
                    },
                ))));
            }
            Token::LeftBracket => {
                self.next_token();
                if self.current_token_is(&Token::RightBracket) {
                    Pattern::EmptyList
                } else {
                    let head = self.expect_identifier()?;
                    self.expect(Token::Pipe)?;
                    let tail = self.expect_identifier()?;
                    if !self.current_token_is(&Token::RightBracket) {
                        return Err(self.expected(format!("`{}`", Token::RightBracket)));
                    }
                    Pattern::HeadTail { head, tail }
                }
            }
            _ => return Err(self.unexpected()),
        };

        self.next_token();
        Ok(pattern)
    }

    fn parse_try(&mut self) -> ParseResult<Expression> {
        // Consume the `try` token
        self.next_token();
        let body = self.parse_expression()?;
        self.expect(Token::As)?;
        let binding = self.expect_identifier()?;
        self.expect(Token::LeftBrace)?;
        self.skip_newlines();
        let recovery = self.parse_expression()?;
        self.skip_newlines();
        self.expect(Token::RightBrace)?;

        Ok(Expression::Try(Box::new(TryExpression {
            body,
            binding,
            recovery,
        })))
    }

    fn current(&self) -> &WithSpan<Token> {
        // `new` guarantees the sequence is never empty
        &self.tokens[self.position]
    }

    fn current_token(&self) -> &Token {
        &self.current().value
    }

    fn peek_token(&self) -> &Token {
        match self.tokens.get(self.position + 1) {
            Some(token) => &token.value,
            None => &Token::Eof,
        }
    }

    /// Move to the next token, staying on `Eof` once it is reached
    fn next_token(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Compare token kinds, ignoring literal payloads
    fn current_token_is(&self, token: &Token) -> bool {
        mem::discriminant(token) == mem::discriminant(self.current_token())
    }

    fn skip_newlines(&mut self) {
        while self.current_token_is(&Token::Newline) {
            self.next_token();
        }
    }

    fn skip_terminators(&mut self) {
        while self.current_token().is_terminator() {
            self.next_token();
        }
    }

    /// A statement ends at a terminator, the closing token of its block, or the end of input.
    fn expect_end_of_statement(&self, closing: &Token) -> ParseResult<()> {
        if self.current_token().is_terminator()
            || self.current_token_is(closing)
            || self.current_token_is(&Token::Eof)
        {
            Ok(())
        } else {
            Err(self.expected("newline or `;`"))
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.current_token_is(&token) {
            self.next_token();
            Ok(())
        } else {
            Err(self.expected(format!("`{}`", token)))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<IdentifierLiteral> {
        let identifier = match self.current_token() {
            Token::Identifier(name) => IdentifierLiteral::from(name.as_str()),
            _ => return Err(self.expected("identifier")),
        };

        self.next_token();
        Ok(identifier)
    }

    fn expected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::Expected {
            expected: expected.into(),
            found: self.current().clone(),
            position: self.position,
        }
    }

    fn unexpected(&self) -> ParseError {
        ParseError::Unexpected {
            found: self.current().clone(),
            position: self.position,
        }
    }
}
