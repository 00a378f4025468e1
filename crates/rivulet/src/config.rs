//! Server configuration, read from `rivulet.toml` in the working directory.
//!
//! A missing file is not an error: the defaults are written back so the
//! operator has something concrete to edit.

use rivulet_transport::consts::{DEFAULT_LOSS_PROBABILITY, SERVER_PORT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "rivulet.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub loss: LossConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LossConfig {
    /// Probability of silently dropping an inbound datagram. Demo knob;
    /// production deployments set 0.0.
    pub probability: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { address: format!("127.0.0.1:{SERVER_PORT}") }
    }
}

impl Default for LossConfig {
    fn default() -> Self {
        Self { probability: DEFAULT_LOSS_PROBABILITY }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            loss: LossConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if SocketAddr::from_str(&self.network.address).is_err() {
            return Err(ConfigError::Validation(format!(
                "invalid network address format: '{}'. Expected format like 'IP:PORT'.",
                self.network.address
            )));
        }

        if !(0.0..=1.0).contains(&self.loss.probability) {
            return Err(ConfigError::Validation(format!(
                "loss probability must lie in [0, 1], got {}",
                self.loss.probability
            )));
        }

        Ok(())
    }
}

pub fn handle() -> Result<Config> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    if config_path.exists() {
        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    } else {
        let config = Config::default();
        save(&config, &config_path)?;
        Ok(config)
    }
}

fn save(config: &Config, path: &Path) -> Result<()> {
    let config_content = toml::to_string_pretty(config)?;
    let mut file = fs::File::create(path)?;
    file.write_all(config_content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.address, "127.0.0.1:5005");
        assert_eq!(config.loss.probability, DEFAULT_LOSS_PROBABILITY);
    }

    #[test]
    fn bad_address_fails_validation() {
        let config = Config {
            network: NetworkConfig { address: "not-an-address".into() },
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn out_of_range_probability_fails_validation() {
        let config = Config {
            loss: LossConfig { probability: 1.5 },
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("[loss]\nprobability = 0.0\n").unwrap();
        assert_eq!(config.loss.probability, 0.0);
        assert_eq!(config.network.address, "127.0.0.1:5005");
    }
}
