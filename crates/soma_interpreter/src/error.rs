use std::rc::Rc;

use thiserror::Error;

use crate::{builtin::Builtin, object::Object};
use soma_parser::token::Token;

#[derive(Debug, Error, PartialEq)]
pub enum RuntimeError {
    /// When referencing a variable that has not been defined in any enclosing scope
    #[error("Undefined variable: '{0}'")]
    UndefinedVariable(String),
    /// When calling a name that is neither a variable, a declared function nor a builtin
    #[error("Undefined function: '{0}'")]
    UndefinedFunction(String),
    /// When a call's argument count does not match the function's parameter count
    #[error("expected {expected} argument(s) but got {got}")]
    BadArity { expected: usize, got: usize },
    #[error("`{}` ({}) is not callable", .0.typename(), .0.to_code_string())]
    NotCallable(Rc<Object>),

    /// When attempting a prefix operation on an invalid type (e.g. -"a")
    #[error(
        "unsupported operand type for {} operator: `{}` ({})",
        .0,
        .1.typename(),
        .1.to_code_string()
    )]
    InvalidPrefixOperandType(Token, Rc<Object>),
    /// When attempting an infix operation on incompatible types (e.g. 1 + true)
    #[error(
        "unsupported operand type(s) for {} operator: `{}` ({}) and `{}` ({})",
        .0,
        .1.typename(),
        .1.to_code_string(),
        .2.typename(),
        .2.to_code_string()
    )]
    InvalidInfixOperandType(Token, Rc<Object>, Rc<Object>),
    /// When a builtin receives an argument of a type it can't handle
    #[error(
        "unsupported argument type for {} function: `{}` ({})",
        .0.name(),
        .1.typename(),
        .1.to_code_string()
    )]
    InvalidArgumentType(Builtin, Rc<Object>),

    /// When indexing something that isn't a list or a map (e.g. `1[0]`)
    #[error("index operator not supported for `{}` ({})", .0.typename(), .0.to_code_string())]
    IndexNotSupported(Rc<Object>),
    /// When indexing a list with something other than an integer
    #[error("unsupported index operand type: `{}` ({})", .0.typename(), .0.to_code_string())]
    InvalidIndexOperandType(Rc<Object>),
    #[error("index {index} out of bounds for list {list}")]
    IndexOutOfBounds { list: Rc<Object>, index: i64 },
    #[error("key {} not found in map", .0.to_code_string())]
    KeyNotFound(Rc<Object>),
    /// When a float, list, map or function is used as a map key
    #[error("unhashable map key: `{}` ({})", .0.typename(), .0.to_code_string())]
    NonHashableKey(Rc<Object>),

    #[error("Division by zero")]
    DivisionByZero,
    #[error("integer overflow in {0} operation")]
    IntegerOverflow(Token),

    /// When no arm of a match expression accepts the subject
    #[error("no pattern matched {}", .0.to_code_string())]
    NoMatch(Rc<Object>),
    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
    /// When `print` fails to write to its output
    #[error("failed to write output: {0}")]
    Output(String),
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{error::RuntimeError, object::Object};
    use soma_parser::token::Token;

    #[test]
    fn test_messages() {
        let tests = vec![
            (
                RuntimeError::UndefinedVariable("y".into()),
                "Undefined variable: 'y'",
            ),
            (
                RuntimeError::InvalidInfixOperandType(
                    Token::Plus,
                    Rc::new(Object::Integer(1)),
                    Rc::new(Object::Boolean(true)),
                ),
                "unsupported operand type(s) for + operator: `integer` (1) and `boolean` (true)",
            ),
            (
                RuntimeError::NotCallable(Rc::new(Object::String("a".into()))),
                "`string` (\"a\") is not callable",
            ),
            (RuntimeError::DivisionByZero, "Division by zero"),
            (
                RuntimeError::BadArity {
                    expected: 1,
                    got: 2,
                },
                "expected 1 argument(s) but got 2",
            ),
        ];

        for (err, expected) in tests {
            assert_eq!(err.to_string(), expected);
        }
    }
}
