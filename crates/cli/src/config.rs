//! User configuration.
//!
//! A small optional TOML file, `~/.siew.toml`, can preset the diagnostic
//! flags and move the REPL history file. Command-line flags always win over
//! the file; a missing or unreadable file just means defaults.
//!
//! ```toml
//! trace = false
//! dump-bytecode = true
//! history = "/tmp/siew_history"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = ".siew.toml";
const HISTORY_FILE_NAME: &str = ".siew_history";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CliConfig {
    /// Trace VM execution for every run.
    pub trace: bool,
    /// Dump compiled bytecode before running.
    pub dump_bytecode: bool,
    /// REPL history file; defaults to `~/.siew_history`.
    pub history: Option<PathBuf>,
}

impl CliConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load `~/.siew.toml` if it exists. A malformed file is reported and
    /// ignored rather than aborting the run.
    pub fn load() -> Self {
        let Some(path) = home::home_dir().map(|dir| dir.join(CONFIG_FILE_NAME)) else {
            return Self::default();
        };
        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };
        match Self::from_toml(&content) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Warning: ignoring {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Where the REPL should persist its history, if anywhere.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history
            .clone()
            .or_else(|| home::home_dir().map(|dir| dir.join(HISTORY_FILE_NAME)))
    }
}
