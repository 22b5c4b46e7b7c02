//! Typed configuration for the visualization server.
//!
//! The canonical configuration lives in `arenaviz.yaml` next to the
//! binary. Every field has a default matching the documented option
//! table, so an absent file (or an empty one) yields a working server on
//! port 3000 broadcasting at 10 Hz.
//!
//! Validation is fatal: a port or frequency outside its stated range
//! refuses to start the process rather than running in an undefined
//! state.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its permitted range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VizConfig {
    /// TCP port for websocket and HTTP traffic. Range [1,65535].
    #[serde(default = "default_port")]
    pub port: u16,

    /// Broadcast frequency in Hertz. Range [1,1000].
    #[serde(default = "default_broadcast_frequency")]
    pub broadcast_frequency: u16,

    /// Engine steps per broadcast in fast-forward mode. Range [1,1000].
    #[serde(default = "default_ff_draw_frames_every")]
    pub ff_draw_frames_every: u16,

    /// Start playing immediately at startup.
    #[serde(default)]
    pub autoplay: bool,

    /// Transport encryption; enabled when any file path is set.
    #[serde(default)]
    pub tls: TlsConfig,
}

/// TLS file paths. Presence of any non-empty value switches the
/// transport to encrypted mode (`wss`/`https`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    /// Private key file (PEM).
    #[serde(default)]
    pub key_file: String,

    /// Certificate chain file (PEM).
    #[serde(default)]
    pub cert_file: String,

    /// Optional CA bundle for client verification.
    #[serde(default)]
    pub ca_file: String,
}

impl TlsConfig {
    /// Whether any TLS path is configured.
    pub fn enabled(&self) -> bool {
        !self.key_file.is_empty() || !self.cert_file.is_empty() || !self.ca_file.is_empty()
    }
}

const fn default_port() -> u16 {
    3000
}

const fn default_broadcast_frequency() -> u16 {
    10
}

const fn default_ff_draw_frames_every() -> u16 {
    2
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            broadcast_frequency: default_broadcast_frequency(),
            ff_draw_frames_every: default_ff_draw_frames_every(),
            autoplay: false,
            tls: TlsConfig::default(),
        }
    }
}

impl VizConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Validate every field against its stated range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field; the
    /// process should refuse to start on any error from here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                reason: String::from("port set in configuration is out of range [1,65535]"),
            });
        }
        if !(1..=1000).contains(&self.broadcast_frequency) {
            return Err(ConfigError::Invalid {
                reason: String::from(
                    "broadcast_frequency set in configuration is out of range [1,1000]",
                ),
            });
        }
        if !(1..=1000).contains(&self.ff_draw_frames_every) {
            return Err(ConfigError::Invalid {
                reason: String::from(
                    "ff_draw_frames_every set in configuration is out of range [1,1000]",
                ),
            });
        }
        if self.tls.enabled() && (self.tls.key_file.is_empty() || self.tls.cert_file.is_empty()) {
            return Err(ConfigError::Invalid {
                reason: String::from(
                    "tls requires both key_file and cert_file when any tls path is set",
                ),
            });
        }
        Ok(())
    }

    /// The broadcast period derived from the configured frequency.
    pub fn broadcast_period(&self) -> Duration {
        // Validated: broadcast_frequency >= 1.
        let millis = 1000_u64
            .checked_div(u64::from(self.broadcast_frequency))
            .unwrap_or(1000);
        Duration::from_millis(millis.max(1))
    }
}
