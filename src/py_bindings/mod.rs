pub mod completion;
pub mod helpers;

use pyo3::exceptions::{PyKeyboardInterrupt, PySystemExit};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use reedline::Completer;
use tracing::debug;

use crate::error::EvalError;
use crate::evaluator::{Evaluator, Helpers};
use crate::paths::SearchPath;
use completion::PyCompleter;

/// Initialize the embedded Python interpreter
pub fn initialize_runtime() {
    Python::initialize();
}

/// Evaluator backed by the embedded interpreter.
///
/// Owns the interactive namespace: a fresh dict holding only `__builtins__`,
/// `__name__` and whatever the session binds into it.
pub struct PyEvaluator {
    namespace: Py<PyDict>,
}

impl PyEvaluator {
    pub fn new() -> PyResult<Self> {
        Python::attach(|py| {
            let namespace = PyDict::new(py);
            namespace.set_item("__builtins__", py.import("builtins")?)?;
            namespace.set_item("__name__", "__main__")?;
            namespace.set_item("__doc__", py.None())?;

            // Match `python -i`: an argv and the working directory on the path
            let sys = py.import("sys")?;
            if !sys.hasattr("argv")? {
                sys.setattr("argv", vec![""])?;
            }
            let path = sys.getattr("path")?;
            if !path.contains("")? {
                path.call_method1("insert", (0, ""))?;
            }

            Ok(Self {
                namespace: namespace.unbind(),
            })
        })
    }

    /// Route SIGINT to `KeyboardInterrupt` while Python code is running.
    /// Must be called from the main thread.
    pub fn install_interrupt_handler(&self) -> PyResult<()> {
        Python::attach(|py| {
            let signal = py.import("signal")?;
            signal.call_method1(
                "signal",
                (
                    signal.getattr("SIGINT")?,
                    signal.getattr("default_int_handler")?,
                ),
            )?;
            Ok(())
        })
    }

    fn execute(&self, source: &str, mode: &str) -> Result<(), EvalError> {
        Python::attach(|py| {
            let result = exec_in(py, self.namespace.bind(py), source, mode);
            flush_std_streams(py);
            result.map_err(|err| eval_error(py, err))
        })
    }
}

impl Evaluator for PyEvaluator {
    fn run(&self, statement: &str) -> Result<(), EvalError> {
        self.execute(statement, "exec")
    }

    fn run_interactive(&self, statement: &str) -> Result<(), EvalError> {
        // `single` mode sends expression results through sys.displayhook
        self.execute(&format!("{statement}\n"), "single")
    }

    fn is_complete(&self, source: &str) -> bool {
        Python::attach(|py| {
            let result = py
                .import("codeop")
                .and_then(|codeop| codeop.getattr("compile_command"))
                .and_then(|compile_cmd| compile_cmd.call1((source,)));

            match result {
                Ok(obj) if obj.is_none() => false, // None = incomplete
                Ok(_) => true,                     // Code object = complete
                Err(_) => true,                    // Syntax error = let Python report it
            }
        })
    }

    fn define_helpers(&self, helpers: &Helpers) -> Result<(), EvalError> {
        Python::attach(|py| {
            helpers::bind(py, self.namespace.bind(py), helpers).map_err(|err| eval_error(py, err))
        })
    }

    fn take_interrupt(&self) -> bool {
        Python::attach(|py| match py.check_signals() {
            Ok(()) => false,
            Err(err) if err.is_instance_of::<PyKeyboardInterrupt>(py) => true,
            Err(err) => {
                debug!(error = %err, "signal handler raised at the prompt");
                false
            }
        })
    }

    fn completer(&self) -> Option<Box<dyn Completer>> {
        let namespace = Python::attach(|py| self.namespace.clone_ref(py));
        Some(Box::new(PyCompleter::new(namespace)))
    }
}

impl SearchPath for PyEvaluator {
    fn insert_front(&mut self, entry: &str) -> anyhow::Result<()> {
        Python::attach(|py| {
            py.import("sys")?
                .getattr("path")?
                .call_method1("insert", (0, entry))?;
            Ok(())
        })
    }
}

fn exec_in(py: Python<'_>, namespace: &Bound<'_, PyDict>, source: &str, mode: &str) -> PyResult<()> {
    let builtins = py.import("builtins")?;
    let code = builtins
        .getattr("compile")?
        .call1((source, "<stdin>", mode))?;
    builtins.getattr("exec")?.call1((code, namespace))?;
    Ok(())
}

fn flush_std_streams(py: Python<'_>) {
    let Ok(sys) = py.import("sys") else {
        return;
    };
    for stream in ["stdout", "stderr"] {
        if let Ok(stream) = sys.getattr(stream) {
            let _ = stream.call_method0("flush");
        }
    }
}

/// Convert a raised exception, treating `SystemExit` as an exit request
fn eval_error(py: Python<'_>, err: PyErr) -> EvalError {
    if err.is_instance_of::<PySystemExit>(py) {
        return EvalError::Exit(exit_status(py, &err));
    }
    EvalError::raised(format_traceback(py, &err))
}

/// Status carried by a `SystemExit`: `None` is 0, an int is itself, anything
/// else is printed and becomes 1
fn exit_status(py: Python<'_>, err: &PyErr) -> i32 {
    let Ok(code) = err.value(py).getattr("code") else {
        return 1;
    };
    if code.is_none() {
        return 0;
    }
    match code.extract::<i32>() {
        Ok(status) => status,
        Err(_) => {
            if let Ok(message) = code.str() {
                eprintln!("{message}");
            }
            1
        }
    }
}

fn format_traceback(py: Python<'_>, err: &PyErr) -> String {
    let formatted = py.import("traceback").and_then(|traceback| {
        traceback
            .getattr("format_exception")?
            .call1((err.get_type(py), err.value(py), err.traceback(py)))?
            .extract::<Vec<String>>()
    });

    match formatted {
        Ok(lines) => lines.concat(),
        Err(_) => format!("{err}\n"),
    }
}
