//! Tree-walking evaluator for Soma programs parsed by `soma_parser`.

mod builtin;
mod config;
mod environment;
mod error;
mod evaluator;
pub mod object;

pub use builtin::Builtin;
pub use config::InterpreterConfig;
pub use environment::Environment;
pub use error::RuntimeError;
pub use evaluator::{EvalResult, Evaluator, Output};
