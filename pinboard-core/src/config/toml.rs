//! TOML board description loader
//!
//! Example document:
//!
//! ```toml
//! [[output]]
//! pin = "!D5"
//!
//! [[input]]
//! pin = "^D4"
//!
//! [[analog]]
//! pin = "A0"
//! width = 12
//! attenuation = "11dB"
//!
//! [[interrupt]]
//! pin = "D2"
//! trigger = "falling"
//! ```

use super::board::{BoardConfig, ConfigError};

impl BoardConfig {
    /// Parse and validate a TOML board description
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: BoardConfig = ::toml::from_str(input).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }
}
