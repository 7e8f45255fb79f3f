use std::io;

use tracing::debug;

use soma_interpreter::{Evaluator, InterpreterConfig, Output};
use soma_parser::parse;

/// What the shell should do after a line has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// The state of one interactive session: a single evaluator whose bindings and
/// declared functions persist from line to line.
pub struct Session {
    evaluator: Evaluator,
    out: Output,
}

impl Session {
    pub fn new(config: InterpreterConfig, out: Output) -> Self {
        let evaluator = Evaluator::new()
            .with_config(config)
            .with_output(out.clone());

        Session { evaluator, out }
    }

    /// Handle one line of input.
    ///
    /// Every statement on the line is evaluated in turn. Values of non-declaration
    /// statements are echoed as `=> value` unless they are `nil`. The first error is
    /// reported as `Error: message` and the rest of the line is dropped.
    pub fn feed(&mut self, line: &str) -> io::Result<Control> {
        let input = line.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            return Ok(Control::Exit);
        }
        if input.is_empty() {
            return Ok(Control::Continue);
        }

        debug!(line = input, "evaluating shell input");

        let program = match parse(input) {
            Ok(program) => program,
            Err(err) => {
                self.report(&err)?;
                return Ok(Control::Continue);
            }
        };

        for stmt in &program.statements {
            match self.evaluator.eval_statement(stmt) {
                Ok(value) if stmt.is_declaration() || value.is_nil() => {}
                Ok(value) => writeln!(self.out.borrow_mut(), "=> {}", value.to_code_string())?,
                Err(err) => {
                    self.report(&err)?;
                    break;
                }
            }
        }

        Ok(Control::Continue)
    }

    fn report(&self, err: &dyn std::error::Error) -> io::Result<()> {
        writeln!(self.out.borrow_mut(), "Error: {}", err)
    }
}
