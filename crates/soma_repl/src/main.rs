use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use soma_interpreter::InterpreterConfig;
use soma_repl::{repl::repl, run_file, with_interpreter_stack};

#[derive(Parser)]
#[command(
    name = "soma",
    about = "Interpreter for the Soma expression language",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Script to run; starts the interactive shell when omitted
    file: Option<PathBuf>,

    /// Maximum number of nested function calls
    #[arg(long, default_value_t = InterpreterConfig::DEFAULT_MAX_CALL_DEPTH)]
    max_depth: usize,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = InterpreterConfig::default().with_max_call_depth(cli.max_depth);

    let task_config = config.clone();
    let result = with_interpreter_stack(&config, move || match cli.file {
        Some(path) => run_file(&path, task_config).map_err(|err| err.to_string()),
        None => repl(task_config).map_err(|err| err.to_string()),
    })
    .unwrap_or_else(|err| Err(format!("could not start interpreter thread: {}", err)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}
