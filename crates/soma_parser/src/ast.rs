use crate::token::Token;
use std::{fmt::Display, rc::Rc};

#[derive(Debug, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new() -> Program {
        Program {
            statements: Vec::new(),
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", join(&self.statements, "; "))
    }
}

#[derive(Debug, PartialEq)]
pub enum Statement {
    /// Both `let x = 1` and `x = 1`
    Let {
        /// The name/identifier of the variable
        name: String,
        /// The value being assigned
        value: Expression,
    },
    /// Block form of `if`, each branch runs in its own scope
    If {
        condition: Expression,
        consequence: Block,
        /// `else if` chains are stored as a block holding a single nested `If`
        alternative: Option<Block>,
    },
    While {
        condition: Expression,
        body: Block,
    },
    /// Named function declaration, e.g. `fn add(a, b) { a + b }`
    Function {
        name: String,
        parameters: Vec<IdentifierLiteral>,
        body: Rc<Block>,
    },
    Expression {
        /// The expression for this statement
        expression: Expression,
    },
}

impl Statement {
    /// Declarations bind names and have no value worth showing to the user.
    pub fn is_declaration(&self) -> bool {
        matches!(self, Statement::Let { .. } | Statement::Function { .. })
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Statement::*;

        match self {
            Let { name, value } => write!(
                f,
                "{tok} {ident} = {val}",
                tok = Token::Let,
                ident = name,
                val = value
            ),
            If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "{} {} {}", Token::If, condition, consequence)?;
                if let Some(alt) = alternative {
                    write!(f, " {} {}", Token::Else, alt)?;
                }
                Ok(())
            }
            While { condition, body } => write!(f, "{} {} {}", Token::While, condition, body),
            Function {
                name,
                parameters,
                body,
            } => write!(
                f,
                "{} {}({}) {}",
                Token::Fn,
                name,
                join(parameters, ", "),
                body
            ),
            Expression { expression } => write!(f, "{}", expression),
        }
    }
}

/// A braced sequence of statements
#[derive(Debug, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.statements.is_empty() {
            write!(f, "{{ }}")
        } else {
            write!(f, "{{ {} }}", join(&self.statements, "; "))
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Expression {
    // Literal
    Identifier(IdentifierLiteral),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Nil,

    // Complex
    Prefix(Box<PrefixExpression>),
    Infix(Box<InfixExpression>),
    If(Box<IfExpression>),
    Lambda(Box<LambdaLiteral>),
    Call(Box<CallExpression>),
    List(Box<ListLiteral>),
    Map(Box<MapLiteral>),
    Index(Box<IndexExpression>),
    Match(Box<MatchExpression>),
    Try(Box<TryExpression>),
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Expression::*;

        match self {
            Identifier(name) => write!(f, "{}", name),
            Integer(value) => write!(f, "{}", value),
            // Keep a decimal point so the printed form reads back as a float
            Float(value) if value.fract() == 0.0 => write!(f, "{:.1}", value),
            Float(value) => write!(f, "{}", value),
            Boolean(value) => write!(f, "{}", value),
            String(value) => write!(f, "\"{}\"", escape(value)),
            Nil => write!(f, "nil"),

            Prefix(prefix) => write!(f, "{}", prefix),
            Infix(infix) => write!(f, "{}", infix),
            If(if_exp) => write!(f, "{}", if_exp),
            Lambda(lambda) => write!(f, "{}", lambda),
            Call(call) => write!(f, "{}", call),
            List(list) => write!(f, "{}", list),
            Map(map) => write!(f, "{}", map),
            Index(index) => write!(f, "{}", index),
            Match(match_exp) => write!(f, "{}", match_exp),
            Try(try_exp) => write!(f, "{}", try_exp),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct IdentifierLiteral {
    pub name: String,
}

impl IdentifierLiteral {
    /// `_` never binds anything
    pub fn is_wildcard(&self) -> bool {
        self.name == "_"
    }
}

impl Display for IdentifierLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for IdentifierLiteral {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }
}

impl From<String> for IdentifierLiteral {
    fn from(name: String) -> Self {
        Self { name }
    }
}

#[derive(Debug, PartialEq)]
pub struct PrefixExpression {
    pub operator: Token,
    pub right: Expression,
}

impl Display for PrefixExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({op}{r})", op = self.operator, r = self.right)
    }
}

#[derive(Debug, PartialEq)]
pub struct InfixExpression {
    pub left: Expression,
    pub operator: Token,
    pub right: Expression,
}

impl Display for InfixExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({l} {op} {r})",
            l = self.left,
            op = self.operator,
            r = self.right
        )
    }
}

/// `if c then a else b`, both branches required
#[derive(Debug, PartialEq)]
pub struct IfExpression {
    pub condition: Expression,
    pub consequence: Expression,
    pub alternative: Expression,
}

impl Display for IfExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(if {} then {} else {})",
            self.condition, self.consequence, self.alternative
        )
    }
}

/// `\x -> body`
#[derive(Debug, PartialEq)]
pub struct LambdaLiteral {
    pub parameter: IdentifierLiteral,
    pub body: Rc<Expression>,
}

impl Display for LambdaLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(\\{} -> {})", self.parameter, self.body)
    }
}

#[derive(Debug, PartialEq)]
pub struct CallExpression {
    pub function: Expression,
    pub arguments: Vec<Expression>,
}

impl Display for CallExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.function, join(&self.arguments, ", "))
    }
}

#[derive(Debug, PartialEq)]
pub struct ListLiteral {
    pub elements: Vec<Expression>,
}

impl Display for ListLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", join(&self.elements, ", "))
    }
}

#[derive(Debug, PartialEq)]
pub struct MapLiteral {
    /// Key/value pairs in source order
    pub pairs: Vec<(Expression, Expression)>,
}

impl Display for MapLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self
            .pairs
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

#[derive(Debug, PartialEq)]
pub struct IndexExpression {
    pub left: Expression,
    pub index: Expression,
}

impl Display for IndexExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}[{}])", self.left, self.index)
    }
}

#[derive(Debug, PartialEq)]
pub struct MatchExpression {
    pub subject: Expression,
    pub arms: Vec<MatchArm>,
}

impl Display for MatchExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {{ {} }}",
            Token::Match,
            self.subject,
            join(&self.arms, ", ")
        )
    }
}

#[derive(Debug, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Expression,
}

impl Display for MatchArm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.pattern, self.body)
    }
}

#[derive(Debug, PartialEq)]
pub enum Pattern {
    /// `_`
    Wildcard,
    /// A literal expression compared by value, e.g. `0`, `"a"`, `-1`
    Literal(Expression),
    /// A bare name, binds the whole subject
    Binding(IdentifierLiteral),
    /// `[]`
    EmptyList,
    /// `[head | tail]`
    HeadTail {
        head: IdentifierLiteral,
        tail: IdentifierLiteral,
    },
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Wildcard => write!(f, "_"),
            Pattern::Literal(value) => write!(f, "{}", value),
            Pattern::Binding(name) => write!(f, "{}", name),
            Pattern::EmptyList => write!(f, "[]"),
            Pattern::HeadTail { head, tail } => write!(f, "[{} | {}]", head, tail),
        }
    }
}

/// `try body as name { recovery }`
#[derive(Debug, PartialEq)]
pub struct TryExpression {
    pub body: Expression,
    pub binding: IdentifierLiteral,
    pub recovery: Expression,
}

impl Display for TryExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {{ {} }}",
            Token::Try,
            self.body,
            Token::As,
            self.binding,
            self.recovery
        )
    }
}

fn join<T: Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<String>>()
        .join(separator)
}

/// Escape a string so that it lexes back to the same value
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\0' => escaped.push_str("\\0"),
            ch => escaped.push(ch),
        }
    }
    escaped
}
