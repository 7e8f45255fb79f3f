use std::{io, panic, thread};

use soma_interpreter::InterpreterConfig;

/// Stack reserved per permitted user call. Each Soma call passes through a
/// dozen evaluator frames, which are large in unoptimized builds.
pub const STACK_PER_CALL: usize = 256 * 1024;

/// Never hand the interpreter less than this.
const MIN_STACK: usize = 64 * 1024 * 1024;

/// Stack size that lets `config.max_call_depth` nested calls fail with
/// `CallDepthExceeded` instead of overflowing the thread.
pub fn stack_size(config: &InterpreterConfig) -> usize {
    config
        .max_call_depth
        .saturating_add(1)
        .saturating_mul(STACK_PER_CALL)
        .max(MIN_STACK)
}

/// Run `task` on a dedicated thread sized by [`stack_size`] and wait for its result.
///
/// Parsing and evaluation should happen inside `task`, since interpreter values
/// cannot cross threads.
pub fn with_interpreter_stack<T, F>(config: &InterpreterConfig, task: F) -> io::Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = thread::Builder::new()
        .name("soma-interpreter".into())
        .stack_size(stack_size(config))
        .spawn(task)?;

    match handle.join() {
        Ok(value) => Ok(value),
        Err(payload) => panic::resume_unwind(payload),
    }
}
