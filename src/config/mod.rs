//! Configuration management
//!
//! The command line names the two hosts and picks the policy; an optional
//! TOML settings file tunes logging, timers and defaults.

mod cli;
mod types;
mod validation;

pub use cli::Cli;
pub use types::*;
pub use validation::{validate, ValidationResult};

use crate::{Error, Result};
use std::path::Path;

/// Load the settings file
pub fn load<P: AsRef<Path>>(path: P) -> Result<SettingsFile> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Parse settings file contents
pub fn parse(content: &str) -> Result<SettingsFile> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}
