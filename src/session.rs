use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::{Config, ConfigDirs, EnvConfigDir};
use crate::error::ConfigError;
use crate::evaluator::{Evaluator, Helpers};
use crate::modules::ModuleList;
use crate::paths::{self, SearchPath};
use crate::pretty::{self, PrettyPrinter};
use crate::repl::{self, LineReader};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const NO_CONFIG_FILE: &str = "None found. See PyPlay documentation.";

/// Resolved directories plus the loaded configuration, with the module
/// imports already placed ahead of the configured commands
#[derive(Debug, Clone)]
pub struct Session {
    pub dirs: ConfigDirs,
    pub config: Config,
}

impl Session {
    pub fn new(dirs: ConfigDirs, argv: &str) -> Result<Self, ConfigError> {
        let mut config = Config::load(&dirs)?;

        let mut modules = ModuleList::from_defaults(&config.modules);
        modules.apply_all(argv);
        modules.prepend_to(&mut config.commands);
        debug!(commands = ?config.commands, "startup commands");

        Ok(Self { dirs, config })
    }

    /// Bootstrap the evaluator and return the reader the interactive loop
    /// should use. Stops at the first failing command.
    pub fn start<E>(&self, evaluator: &mut E, out: &mut dyn Write) -> Result<LineReader>
    where
        E: Evaluator + SearchPath,
    {
        paths::install(evaluator, &self.dirs, &self.config)
            .context("failed to install the module search path")?;

        self.banner(out)?;

        let reader = if self.config.readline {
            writeln!(out, "*** PyPlay tab completion enabled")?;
            repl::install_line_editing(evaluator.completer(), out)?
        } else {
            LineReader::plain()
        };

        evaluator.define_helpers(&self.helpers()?)?;

        for command in &self.config.commands {
            writeln!(out, ">>> {command}")?;
            out.flush()?;
            info!(command = %command, "running startup command");
            evaluator
                .run(command)
                .with_context(|| format!("startup command `{command}` failed"))?;
        }

        Ok(reader)
    }

    pub fn banner(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "*** Welcome to PyPlay version {VERSION} -- Type h() for help."
        )?;
        if let Some(file) = self.dirs.config_file() {
            writeln!(out, "*** PyPlay config file: '{}'", file.display())?;
        }
        Ok(())
    }

    pub fn helpers(&self) -> Result<Helpers> {
        let config_document =
            pretty::to_document(&self.config).context("failed to serialize the configuration")?;
        Ok(Helpers {
            help_text: self.help_text(),
            config_document,
            printer: PrettyPrinter::new(self.config.highlight_yaml.clone()),
        })
    }

    /// Text printed by `h()`
    pub fn help_text(&self) -> String {
        let env_dir = match &self.dirs.env {
            EnvConfigDir::Unset | EnvConfigDir::Missing(_) => "None".to_string(),
            EnvConfigDir::Disabled => "'' (config lookup disabled)".to_string(),
            EnvConfigDir::Present(dir) => dir.display().to_string(),
        };
        let config_dir = self
            .dirs
            .config_dir()
            .map_or_else(|| "None".to_string(), |dir| dir.display().to_string());
        let config_file = self
            .dirs
            .config_file()
            .map_or_else(|| NO_CONFIG_FILE.to_string(), |file| file.display().to_string());

        format!(
            "
Welcome to PyPlay version {VERSION}.

PYPLAY_CONFIG_DIR:  {env_dir}
Config directory:   {config_dir}
Config file:        {config_file}
Commands:
    * h()           -- Help screen.
    * config()      -- Print a YAML dump of the PyPlay configuration.
    * y(...)        -- Print a YAML dump of any object.
                       For example, try: y(__builtins__.__dict__)

Tips and Tricks:
    * Use the tab key to complete a word or see what options are
      available in any given context.
    * Use <ctl>-L to clear the screen.

Full documentation: http://pypi.python.org/pypi/pyplay/
"
        )
    }
}
