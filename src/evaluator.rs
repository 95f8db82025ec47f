use reedline::Completer;

use crate::error::EvalError;
use crate::pretty::PrettyPrinter;

/// Values backing the helper bindings `h()`, `config()` and `y(obj)`
#[derive(Debug, Clone)]
pub struct Helpers {
    pub help_text: String,
    /// YAML document of the active configuration
    pub config_document: String,
    pub printer: PrettyPrinter,
}

/// Capability to run source code in one shared interactive namespace
pub trait Evaluator {
    /// Run a startup statement
    fn run(&self, statement: &str) -> Result<(), EvalError>;

    /// Run a statement typed at the prompt, echoing expression results
    fn run_interactive(&self, statement: &str) -> Result<(), EvalError> {
        self.run(statement)
    }

    /// Whether `source` is a complete statement or needs more lines
    fn is_complete(&self, source: &str) -> bool;

    /// Bind the helper functions into the namespace
    fn define_helpers(&self, helpers: &Helpers) -> Result<(), EvalError>;

    /// Consume an interrupt that arrived while no code was running
    fn take_interrupt(&self) -> bool {
        false
    }

    /// Tab-completion source over the namespace, if the evaluator has one
    fn completer(&self) -> Option<Box<dyn Completer>> {
        None
    }
}
