/// Limits applied while evaluating a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// How many user function calls may be active at once before evaluation fails
    pub max_call_depth: usize,
}

impl InterpreterConfig {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
        }
    }
}
