use std::{fmt::Display, io::Write, rc::Rc};

use crate::{error::RuntimeError, object::Object};

/// Functions provided by the interpreter itself. They live outside every scope,
/// so a variable or a declared function of the same name takes precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Typeof,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "print" => Some(Builtin::Print),
            "len" => Some(Builtin::Len),
            "typeof" => Some(Builtin::Typeof),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Builtin::Print => "print".into(),
            Builtin::Len => "len".into(),
            Builtin::Typeof => "typeof".into(),
        }
    }

    pub fn apply(
        &self,
        args: Vec<Rc<Object>>,
        output: &mut dyn Write,
    ) -> Result<Rc<Object>, RuntimeError> {
        match self {
            // Writes its arguments separated by spaces and gives back the last one
            Builtin::Print => {
                let line: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
                writeln!(output, "{}", line.join(" "))
                    .and_then(|_| output.flush())
                    .map_err(|err| RuntimeError::Output(err.to_string()))?;

                Ok(args
                    .last()
                    .map(Rc::clone)
                    .unwrap_or_else(|| Rc::new(Object::Nil)))
            }
            Builtin::Len => {
                let arg = single_argument(args)?;
                let length = match arg.as_ref() {
                    Object::String(str) => str.chars().count(),
                    Object::List(list) => list.elements.len(),
                    Object::Map(map) => map.entries.len(),
                    _ => return Err(RuntimeError::InvalidArgumentType(Builtin::Len, arg)),
                };
                Ok(Rc::new(Object::Integer(length as i64)))
            }
            Builtin::Typeof => {
                let arg = single_argument(args)?;
                Ok(Rc::new(Object::String(arg.typename())))
            }
        }
    }
}

fn single_argument(args: Vec<Rc<Object>>) -> Result<Rc<Object>, RuntimeError> {
    match <[Rc<Object>; 1]>::try_from(args) {
        Ok([arg]) => Ok(arg),
        Err(args) => Err(RuntimeError::BadArity {
            expected: 1,
            got: args.len(),
        }),
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "builtin function {}", self.name())
    }
}
