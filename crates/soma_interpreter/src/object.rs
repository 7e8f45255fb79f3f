use std::{cell::RefCell, collections::BTreeMap, fmt, fmt::Display, rc::Rc};

use crate::{builtin::Builtin, environment::Environment};

use soma_parser::ast::{Block, Expression, IdentifierLiteral};

#[derive(Debug)]
pub enum Object {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    /// The unit value, produced by statements with nothing to show
    Nil,
    List(List),
    Map(Map),
    Callable(Callable),
}

impl Object {
    pub fn typename(&self) -> String {
        use Object::*;

        match self {
            Integer(_) => "integer".into(),
            Float(_) => "float".into(),
            Boolean(_) => "boolean".into(),
            String(_) => "string".into(),
            Nil => "nil".into(),
            List(_) => "list".into(),
            Map(_) => "map".into(),
            Callable(self::Callable::User(_)) => "function".into(),
            Callable(self::Callable::Builtin(_)) => "builtin".into(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// `false`, `nil`, zero and empty collections are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        use Object::*;

        match self {
            Boolean(value) => *value,
            Nil => false,
            Integer(value) => *value != 0,
            Float(value) => *value != 0.0,
            String(value) => !value.is_empty(),
            List(list) => !list.elements.is_empty(),
            Map(map) => !map.entries.is_empty(),
            Callable(_) => true,
        }
    }

    /// Converts the given value to a string (in the format of a code object).
    ///
    /// Use this anywhere a programmer expects to see the code-version of an object (e.g. in the REPL).
    /// # Examples
    /// ```rust
    /// use soma_interpreter::object::Object;
    ///
    /// let obj = Object::String("hello world".to_string());
    ///
    /// assert_eq!(obj.to_code_string(), "\"hello world\"");
    /// ```
    pub fn to_code_string(&self) -> String {
        match self {
            Object::String(value) => format!("\"{}\"", value),
            value => value.to_string(),
        }
    }
}

impl Display for Object {
    /// Form used by `print` and the file runner
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Object::*;

        match self {
            Integer(value) => write!(f, "{}", value),
            Float(value) => write!(f, "{}", ryu::Buffer::new().format(*value)),
            Boolean(value) => write!(f, "{}", value),
            String(value) => write!(f, "{}", value),
            Nil => write!(f, "nil"),
            List(list) => write!(f, "{}", list),
            Map(map) => write!(f, "{}", map),
            Callable(callable) => write!(f, "{}", callable),
        }
    }
}

impl PartialEq for Object {
    /// Structural equality, as used by `==` and literal patterns.
    /// Integers and floats compare by numeric value.
    fn eq(&self, other: &Object) -> bool {
        use Object::*;

        match (self, other) {
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Integer(a), Float(b)) | (Float(b), Integer(a)) => *a as f64 == *b,
            (Boolean(a), Boolean(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Nil, Nil) => true,
            (List(a), List(b)) => a.elements == b.elements,
            (Map(a), Map(b)) => a.entries == b.entries,
            (Callable(a), Callable(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, PartialEq, Default)]
pub struct List {
    pub elements: Vec<Rc<Object>>,
}

impl Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elements: Vec<String> = self.elements.iter().map(|e| e.to_code_string()).collect();
        write!(f, "[{}]", elements.join(", "))
    }
}

/// Map keys, ordered so that maps always print the same way
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashKey {
    Nil,
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl HashKey {
    /// Floats, collections and callables can't be used as keys.
    pub fn from_object(obj: &Object) -> Option<HashKey> {
        match obj {
            Object::Nil => Some(HashKey::Nil),
            Object::Boolean(value) => Some(HashKey::Boolean(*value)),
            Object::Integer(value) => Some(HashKey::Integer(*value)),
            Object::String(value) => Some(HashKey::String(value.clone())),
            _ => None,
        }
    }

    pub fn to_object(&self) -> Object {
        match self {
            HashKey::Nil => Object::Nil,
            HashKey::Boolean(value) => Object::Boolean(*value),
            HashKey::Integer(value) => Object::Integer(*value),
            HashKey::String(value) => Object::String(value.clone()),
        }
    }
}

#[derive(Debug, PartialEq, Default)]
pub struct Map {
    pub entries: BTreeMap<HashKey, Rc<Object>>,
}

impl Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .entries
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}: {}",
                    key.to_object().to_code_string(),
                    value.to_code_string()
                )
            })
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}

/// Anything that can appear on the left of a call
#[derive(Debug)]
pub enum Callable {
    User(Rc<UserFunction>),
    Builtin(Builtin),
}

impl PartialEq for Callable {
    /// A function is only ever equal to itself
    fn eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::User(a), Callable::User(b)) => Rc::ptr_eq(a, b),
            (Callable::Builtin(a), Callable::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::User(func) => write!(f, "{}", func),
            Callable::Builtin(builtin) => write!(f, "{}", builtin),
        }
    }
}

/// A lambda or a declared function, together with the scope it was created in
pub struct UserFunction {
    /// `None` for lambdas
    pub name: Option<String>,
    pub parameters: Vec<IdentifierLiteral>,
    pub body: FunctionBody,
    pub env: Rc<RefCell<Environment>>,
}

impl UserFunction {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<lambda>")
    }
}

pub enum FunctionBody {
    Expression(Rc<Expression>),
    Block(Rc<Block>),
}

// The captured environment is left out, it may well contain this very function
impl fmt::Debug for UserFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFunction")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl Display for UserFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(|p| p.to_string()).collect();

        match (&self.name, &self.body) {
            (None, FunctionBody::Expression(body)) => write!(f, "\\{} -> {}", params.join(", "), body),
            (name, _) => write!(
                f,
                "fn {}({})",
                name.as_deref().unwrap_or_default(),
                params.join(", ")
            ),
        }
    }
}
