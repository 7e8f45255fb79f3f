use std::{
    cell::RefCell,
    fs, io,
    io::Write,
    path::{Path, PathBuf},
    rc::Rc,
};

use thiserror::Error;
use tracing::debug;

use soma_interpreter::{object::Object, Evaluator, InterpreterConfig, Output, RuntimeError};
use soma_parser::{parse, parser::ParseError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Parse `source` as one program and evaluate it, giving back the value of its last statement.
pub fn run_source(
    source: &str,
    config: InterpreterConfig,
    out: Output,
) -> Result<Rc<Object>, RunError> {
    let program = parse(source)?;
    debug!(statements = program.statements.len(), "running program");

    let mut evaluator = Evaluator::new().with_config(config).with_output(out);
    Ok(evaluator.eval(&program)?)
}

/// Run a script file, printing its final value (unless `nil`) once it has finished.
pub fn run_file(path: &Path, config: InterpreterConfig) -> Result<(), RunError> {
    let source = fs::read_to_string(path).map_err(|source| RunError::Read {
        path: path.to_owned(),
        source,
    })?;
    debug!(path = %path.display(), "loaded script");

    let stdout: Output = Rc::new(RefCell::new(io::stdout()));
    let result = run_source(&source, config, stdout)?;

    if !result.is_nil() {
        writeln!(io::stdout(), "{}", result)?;
    }

    Ok(())
}
