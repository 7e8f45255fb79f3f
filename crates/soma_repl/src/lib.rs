//! The `soma` shell and file runner.

pub mod repl;
pub mod runner;
pub mod session;
pub mod stack;

pub use runner::{run_file, run_source, RunError};
pub use session::{Control, Session};
pub use stack::with_interpreter_stack;
