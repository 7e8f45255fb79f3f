use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use soma_interpreter::{InterpreterConfig, Output};

use crate::session::{Control, Session};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the interactive shell until the user quits.
pub fn repl(config: InterpreterConfig) -> Result<(), ReadlineError> {
    println!("Soma v{}", VERSION);
    println!("Type 'exit' or 'quit' to leave.");

    let out: Output = Rc::new(RefCell::new(io::stdout()));
    let mut session = Session::new(config, out);

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("soma> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    rl.add_history_entry(line.as_str())?;
                }

                if session.feed(&line)? == Control::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
