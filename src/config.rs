use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Environment variable naming an override config directory
pub const CONFIG_DIR_VAR: &str = "PYPLAY_CONFIG_DIR";

/// Directory under `$HOME`
pub const HOME_DIR_NAME: &str = ".pyplay";

/// Directory relative to the working directory
pub const LOCAL_DIR: &str = "./pyplay";

pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// State of the `PYPLAY_CONFIG_DIR` override
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvConfigDir {
    /// Variable not set
    Unset,
    /// Variable set to the empty string: all config lookup is off
    Disabled,
    /// Variable names a directory that does not exist; treated as absent
    Missing(PathBuf),
    Present(PathBuf),
}

/// The candidate config directories, each kept only if it exists on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDirs {
    pub home: Option<PathBuf>,
    pub local: Option<PathBuf>,
    pub env: EnvConfigDir,
}

impl ConfigDirs {
    /// Resolve directories from the process environment
    pub fn from_env() -> Self {
        let home = home::home_dir()
            .filter(|path| !path.as_os_str().is_empty())
            .map(|path| path.join(HOME_DIR_NAME));
        Self::resolve(home, PathBuf::from(LOCAL_DIR), env::var_os(CONFIG_DIR_VAR))
    }

    /// Resolve directories from explicit candidates
    pub fn resolve(home: Option<PathBuf>, local: PathBuf, env_value: Option<OsString>) -> Self {
        let home = home.filter(|dir| dir.exists());
        let local = Some(local).filter(|dir| dir.exists());
        let env = match env_value {
            None => EnvConfigDir::Unset,
            Some(value) if value.is_empty() => EnvConfigDir::Disabled,
            Some(value) => {
                let dir = PathBuf::from(value);
                if dir.exists() {
                    EnvConfigDir::Present(dir)
                } else {
                    EnvConfigDir::Missing(dir)
                }
            }
        };

        let dirs = Self { home, local, env };
        debug!(?dirs, "resolved config directories");
        dirs
    }

    pub fn lookup_disabled(&self) -> bool {
        self.env == EnvConfigDir::Disabled
    }

    /// The override directory, if it exists
    pub fn env_dir(&self) -> Option<&Path> {
        match &self.env {
            EnvConfigDir::Present(dir) => Some(dir.as_path()),
            _ => None,
        }
    }

    /// The config directory by priority: environment, then local, then home
    pub fn config_dir(&self) -> Option<&Path> {
        if self.lookup_disabled() {
            return None;
        }
        self.env_dir()
            .or(self.local.as_deref())
            .or(self.home.as_deref())
    }

    /// Path of the config file, if one exists in the config directory
    pub fn config_file(&self) -> Option<PathBuf> {
        self.config_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|file| file.exists())
    }
}

/// Launcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub readline: bool,
    pub commands: Vec<String>,
    pub pythonpath: Vec<String>,
    pub modules: Vec<String>,
    pub highlight_yaml: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            readline: true,
            commands: Vec::new(),
            pythonpath: vec!["lib".to_string()],
            modules: vec!["os".to_string(), "sys".to_string(), "re".to_string()],
            highlight_yaml: None,
        }
    }
}

/// On-disk form: every key optional, anything unrecognized collected separately
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default, deserialize_with = "yaml11_bool")]
    readline: Option<bool>,
    commands: Option<Vec<String>>,
    pythonpath: Option<Vec<String>>,
    modules: Option<Vec<String>>,
    highlight_yaml: Option<String>,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_yaml::Value>,
}

/// Boolean that also accepts the YAML 1.1 words `yes/no/on/off`, in any case
fn yaml11_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::Bool(value)) => Ok(Some(value)),
        Some(serde_yaml::Value::String(word)) => match word.to_ascii_lowercase().as_str() {
            "yes" | "on" | "true" => Ok(Some(true)),
            "no" | "off" | "false" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!(
                "invalid boolean \"{word}\", expected true/false, yes/no or on/off"
            ))),
        },
        Some(other) => Err(de::Error::custom(format!(
            "invalid type: {other:?}, expected a boolean"
        ))),
    }
}

impl Config {
    /// Load defaults, overridden by the config file in `dirs` if there is one
    pub fn load(dirs: &ConfigDirs) -> Result<Self, ConfigError> {
        let Some(path) = dirs.config_file() else {
            debug!("no config file found, using defaults");
            return Ok(Self::default());
        };

        debug!(path = %path.display(), "loading config file");
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Apply the keys of a YAML document over the defaults
    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        let mut config = Self::default();
        if contents.trim().is_empty() {
            return Ok(config);
        }

        let document: serde_yaml::Value = serde_yaml::from_str(contents)?;
        if document.is_null() {
            return Ok(config);
        }
        let file: ConfigFile = serde_yaml::from_value(document)?;
        config.apply(file);
        Ok(config)
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(readline) = file.readline {
            self.readline = readline;
        }
        if let Some(commands) = file.commands {
            self.commands = commands;
        }
        if let Some(pythonpath) = file.pythonpath {
            self.pythonpath = pythonpath;
        }
        if let Some(modules) = file.modules {
            self.modules = modules;
        }
        if file.highlight_yaml.is_some() {
            self.highlight_yaml = file.highlight_yaml;
        }
        for key in file.unknown.keys() {
            warn!(key = %key, "ignoring unknown config key");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs_in(root: &Path, env_value: Option<&str>) -> ConfigDirs {
        ConfigDirs::resolve(
            Some(root.join("home")),
            root.join("local"),
            env_value.map(OsString::from),
        )
    }

    #[test]
    fn missing_directories_are_absent() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs_in(root.path(), None);
        assert_eq!(dirs.home, None);
        assert_eq!(dirs.local, None);
        assert_eq!(dirs.env, EnvConfigDir::Unset);
        assert_eq!(dirs.config_dir(), None);
        assert_eq!(dirs.config_file(), None);
    }

    #[test]
    fn env_dir_wins_over_local_and_home() {
        let root = tempfile::tempdir().unwrap();
        for name in ["home", "local", "env"] {
            fs::create_dir(root.path().join(name)).unwrap();
        }
        let env_dir = root.path().join("env");
        let dirs = dirs_in(root.path(), env_dir.to_str());
        assert_eq!(dirs.config_dir(), Some(env_dir.as_path()));
    }

    #[test]
    fn local_wins_over_home() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("home")).unwrap();
        fs::create_dir(root.path().join("local")).unwrap();
        let dirs = dirs_in(root.path(), None);
        assert_eq!(dirs.config_dir(), Some(root.path().join("local").as_path()));
    }

    #[test]
    fn nonexistent_env_dir_falls_back() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("home")).unwrap();
        let missing = root.path().join("nowhere");
        let dirs = dirs_in(root.path(), missing.to_str());
        assert_eq!(dirs.env, EnvConfigDir::Missing(missing));
        assert_eq!(dirs.env_dir(), None);
        assert_eq!(dirs.config_dir(), Some(root.path().join("home").as_path()));
    }

    #[test]
    fn empty_env_value_disables_lookup() {
        let root = tempfile::tempdir().unwrap();
        for name in ["home", "local"] {
            let dir = root.path().join(name);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join(CONFIG_FILE_NAME), "readline: false\n").unwrap();
        }
        let dirs = dirs_in(root.path(), Some(""));
        assert!(dirs.lookup_disabled());
        assert_eq!(dirs.config_file(), None);
        assert_eq!(Config::load(&dirs).unwrap(), Config::default());
    }

    #[test]
    fn config_file_requires_the_file_to_exist() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("home")).unwrap();
        let dirs = dirs_in(root.path(), None);
        assert_eq!(dirs.config_file(), None);

        let file = root.path().join("home").join(CONFIG_FILE_NAME);
        fs::write(&file, "{}\n").unwrap();
        assert_eq!(dirs.config_file(), Some(file));
    }

    #[test]
    fn single_key_overrides_only_that_field() {
        let config = Config::from_yaml_str("{readline: false}").unwrap();
        let defaults = Config::default();
        assert!(!config.readline);
        assert_eq!(config.modules, defaults.modules);
        assert_eq!(config.pythonpath, defaults.pythonpath);
        assert_eq!(config.commands, defaults.commands);
        assert_eq!(config.highlight_yaml, defaults.highlight_yaml);
    }

    #[test]
    fn readline_accepts_yaml_1_1_words() {
        for (text, expected) in [
            ("readline: no\n", false),
            ("readline: Off\n", false),
            ("readline: YES\n", true),
            ("readline: on\n", true),
            ("readline: 'false'\n", false),
        ] {
            assert_eq!(Config::from_yaml_str(text).unwrap().readline, expected, "{text}");
        }
        assert!(Config::from_yaml_str("readline: ~\n").unwrap().readline);
        assert!(Config::from_yaml_str("readline: maybe\n").is_err());
    }

    #[test]
    fn every_known_key_is_applied() {
        let config = Config::from_yaml_str(
            "readline: false\n\
             commands: ['x = 1']\n\
             pythonpath: [lib, ext]\n\
             modules: [json]\n\
             highlight_yaml: pygmentize -l yaml\n",
        )
        .unwrap();
        assert_eq!(
            config,
            Config {
                readline: false,
                commands: vec!["x = 1".to_string()],
                pythonpath: vec!["lib".to_string(), "ext".to_string()],
                modules: vec!["json".to_string()],
                highlight_yaml: Some("pygmentize -l yaml".to_string()),
            }
        );
    }

    #[test]
    fn empty_documents_keep_defaults() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml_str("~\n").unwrap(), Config::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = Config::from_yaml_str("colour: blue\nreadline: false\n").unwrap();
        assert!(!config.readline);
    }

    #[test]
    fn wrongly_typed_values_are_rejected() {
        assert!(Config::from_yaml_str("commands: 5\n").is_err());
        assert!(Config::from_yaml_str("readline: [yes]\n").is_err());
        assert!(Config::from_yaml_str("- just\n- a list\n").is_err());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let root = tempfile::tempdir().unwrap();
        let home = root.path().join("home");
        fs::create_dir(&home).unwrap();
        fs::write(home.join(CONFIG_FILE_NAME), "readline: [unclosed\n").unwrap();

        let err = Config::load(&dirs_in(root.path(), None)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }
}
