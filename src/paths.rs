use anyhow::Result;
use tracing::debug;

use crate::config::{Config, ConfigDirs};

/// A module search path that entries can be pushed onto the front of
pub trait SearchPath {
    fn insert_front(&mut self, entry: &str) -> Result<()>;
}

impl SearchPath for Vec<String> {
    fn insert_front(&mut self, entry: &str) -> Result<()> {
        self.insert(0, entry.to_string());
        Ok(())
    }
}

/// Prepend the config directories and then the configured `pythonpath`.
///
/// The directory block is skipped when `PYPLAY_CONFIG_DIR` is set to the
/// empty string. Every insert goes to the front, so the resulting order is
/// `pythonpath..., env, local, home, <previous entries>`. Not idempotent.
pub fn install<P: SearchPath + ?Sized>(
    search_path: &mut P,
    dirs: &ConfigDirs,
    config: &Config,
) -> Result<()> {
    if !dirs.lookup_disabled() {
        let candidates = [dirs.home.as_deref(), dirs.local.as_deref(), dirs.env_dir()];
        for dir in candidates.into_iter().flatten() {
            let entry = dir.to_string_lossy();
            debug!(entry = %entry, "adding config directory to search path");
            search_path.insert_front(&entry)?;
        }
    }

    for entry in config.pythonpath.iter().rev() {
        debug!(entry = %entry, "adding configured entry to search path");
        search_path.insert_front(entry)?;
    }

    Ok(())
}
