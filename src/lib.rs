//! Python interactive playground.
//!
//! Loads an optional YAML config, puts the config directories and configured
//! entries on `sys.path`, pre-imports a module list, and hands over to an
//! interactive loop running in an embedded interpreter with the `h()`,
//! `config()` and `y(obj)` helpers bound.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod modules;
pub mod paths;
pub mod pretty;
pub mod py_bindings;
pub mod repl;
pub mod session;

pub use config::{Config, ConfigDirs, EnvConfigDir};
pub use error::{ConfigError, EvalError, LineEditingUnavailable};
pub use evaluator::{Evaluator, Helpers};
pub use paths::SearchPath;
pub use session::Session;
