//! CLI-specific configuration structures for TOML-based configuration.

use chimera_core::config::{ModemConfig, SimulationConfig};
use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete CLI configuration bundle: the link parameters both peers must
/// agree on, the channel-simulation knobs, and the terminal harness's own
/// output/logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub modem: ModemConfig,

    #[serde(default)]
    pub simulation: UserSimulationConfig,

    #[serde(default)]
    pub terminal: TerminalConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            modem: ModemConfig::default(),
            simulation: UserSimulationConfig::default(),
            terminal: TerminalConfig::default(),
        }
    }
}

/// The subset of [`SimulationConfig`] plus the plaintext source that the CLI
/// exposes directly in its TOML files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSimulationConfig {
    #[serde(default = "default_plaintext")]
    pub plaintext_source: String,

    #[serde(flatten)]
    pub channel: SimulationConfig,
}

fn default_plaintext() -> String {
    "Hello, Chimera!".to_string()
}

impl Default for UserSimulationConfig {
    fn default() -> Self {
        Self {
            plaintext_source: default_plaintext(),
            channel: SimulationConfig::default(),
        }
    }
}

/// Terminal interface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default)]
    pub wav_output: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_secs: f64,
}

fn default_telemetry_interval() -> f64 {
    1.0
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            wav_output: None,
            logging: LoggingConfig::default(),
            telemetry_interval_secs: default_telemetry_interval(),
        }
    }
}

/// Logging output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_target")]
    pub target: LogTarget,

    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

fn default_log_target() -> LogTarget {
    LogTarget::Stdout
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            target: default_log_target(),
            file_path: None,
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn to_core_log_config(&self) -> chimera_core::logging::LogConfig {
        use chimera_core::logging::{LogConfig as CoreLogConfig, LogLevel as CoreLogLevel};

        let level = match self.level {
            LogLevel::Debug => CoreLogLevel::Debug,
            LogLevel::Info => CoreLogLevel::Info,
            LogLevel::Warn => CoreLogLevel::Warn,
            LogLevel::Error => CoreLogLevel::Error,
        };

        CoreLogConfig {
            level,
            enable_sync: true,
            enable_framing: true,
            enable_fec: true,
            max_entries: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Logfmt,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl CliConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig =
            toml::from_str(&content).wrap_err("Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses_from_empty_toml() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.modem, ModemConfig::default());
    }
}
