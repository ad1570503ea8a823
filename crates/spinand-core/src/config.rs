//! Driver configuration
//!
//! Timeouts and command selection for a [`NandDevice`](crate::flash::NandDevice).
//! With the `std` feature the configuration can be loaded from TOML:
//!
//! ```toml
//! erase_timeout_ms = 500
//! program_timeout_ms = 100
//! read_timeout_ms = 100
//! quad_load = false
//! read_command = "fast"
//! ```
//!
//! Missing keys keep their defaults.

use crate::protocol::ReadCommand;
use crate::spi::IoMode;

/// Default bound on a block erase (tBERS max is 10 ms)
pub const DEFAULT_ERASE_TIMEOUT_MS: u32 = 500;
/// Default bound on a program execute
pub const DEFAULT_PROGRAM_TIMEOUT_MS: u32 = 100;
/// Default bound on a page data read
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 100;
/// Default bound on a device reset
pub const DEFAULT_RESET_TIMEOUT_MS: u32 = 100;

/// Tunables of the orchestrators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct NandConfig {
    /// Busy-poll bound for block erase
    pub erase_timeout_ms: u32,
    /// Busy-poll bound for program execute
    pub program_timeout_ms: u32,
    /// Busy-poll bound for page data read
    pub read_timeout_ms: u32,
    /// Busy-poll bound after a reset
    pub reset_timeout_ms: u32,
    /// Clear block protection before each erase
    pub unlock_before_erase: bool,
    /// Use the x4 program load opcodes
    pub quad_load: bool,
    /// Cache read command
    pub read_command: ReadCommand,
}

impl Default for NandConfig {
    fn default() -> Self {
        Self {
            erase_timeout_ms: DEFAULT_ERASE_TIMEOUT_MS,
            program_timeout_ms: DEFAULT_PROGRAM_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT_MS,
            unlock_before_erase: true,
            quad_load: false,
            read_command: ReadCommand::Read,
        }
    }
}

impl NandConfig {
    /// Configuration with datasheet-derived defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the erase timeout
    pub fn with_erase_timeout(mut self, ms: u32) -> Self {
        self.erase_timeout_ms = ms;
        self
    }

    /// Set the program timeout
    pub fn with_program_timeout(mut self, ms: u32) -> Self {
        self.program_timeout_ms = ms;
        self
    }

    /// Set the page read timeout
    pub fn with_read_timeout(mut self, ms: u32) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    /// Set the reset timeout
    pub fn with_reset_timeout(mut self, ms: u32) -> Self {
        self.reset_timeout_ms = ms;
        self
    }

    /// Enable or skip the unlock step before erase
    pub fn with_unlock_before_erase(mut self, unlock: bool) -> Self {
        self.unlock_before_erase = unlock;
        self
    }

    /// Use x4 program loads
    pub fn with_quad_load(mut self, quad: bool) -> Self {
        self.quad_load = quad;
        self
    }

    /// Select the cache read command
    pub fn with_read_command(mut self, command: ReadCommand) -> Self {
        self.read_command = command;
        self
    }

    /// Data phase width for program loads
    pub fn load_io_mode(&self) -> IoMode {
        if self.quad_load {
            IoMode::QuadOut
        } else {
            IoMode::Single
        }
    }
}

/// Errors loading a configuration file
#[cfg(feature = "std")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was opened
        path: std::string::String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// File is not valid TOML for [`NandConfig`]
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(feature = "std")]
impl NandConfig {
    /// Parse a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        use std::string::ToString;

        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let cfg = NandConfig::new().with_quad_load(true).with_erase_timeout(3);
        assert_eq!(cfg.load_io_mode(), IoMode::QuadOut);
        assert_eq!(cfg.erase_timeout_ms, 3);
        assert_eq!(NandConfig::default().load_io_mode(), IoMode::Single);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = NandConfig::from_toml_str("erase_timeout_ms = 20\nread_command = \"fast-quad\"\n")
            .unwrap();
        assert_eq!(cfg.erase_timeout_ms, 20);
        assert_eq!(cfg.read_command, ReadCommand::FastQuad);
        assert_eq!(cfg.program_timeout_ms, DEFAULT_PROGRAM_TIMEOUT_MS);
        assert!(cfg.unlock_before_erase);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_rejects_unknown_read_command() {
        assert!(NandConfig::from_toml_str("read_command = \"dual\"").is_err());
    }
}
