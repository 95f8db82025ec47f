use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use pyplay::config::ConfigDirs;
use pyplay::error::EvalError;
use pyplay::modules::launch_arguments;
use pyplay::py_bindings::{self, PyEvaluator};
use pyplay::{Session, repl};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter
const LOG_VAR: &str = "PYPLAY_LOG";

fn init_logging() {
    // Logs go to stderr so they stay out of the session transcript
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    init_logging();

    let session = Session::new(ConfigDirs::from_env(), &launch_arguments())?;

    py_bindings::initialize_runtime();
    let mut evaluator = PyEvaluator::new().context("failed to set up the interpreter")?;
    evaluator
        .install_interrupt_handler()
        .context("failed to install the SIGINT handler")?;

    let reader = {
        let mut stdout = io::stdout().lock();
        let started = session.start(&mut evaluator, &mut stdout);
        stdout.flush()?;
        match started {
            Ok(reader) => reader,
            Err(err) => match err.downcast_ref::<EvalError>() {
                Some(EvalError::Exit(status)) => return Ok(exit_code(*status)),
                _ => return Err(err),
            },
        }
    };

    let status = repl::run(&evaluator, reader)?;
    Ok(exit_code(status))
}

fn exit_code(status: i32) -> ExitCode {
    ExitCode::from(repl::process_status(status))
}
