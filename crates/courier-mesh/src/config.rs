//! Agent configuration: file loading, defaults, validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use cmn_types::{AgentId, Coordinate, TokenAmount};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "COURIER_CONFIG";

/// Errors raised while loading or validating the agent configuration.
/// All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("no config path given, {0} unset, and no home directory found")]
    NoPath(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime parameters of one courier agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Marketplace account this device bids and reports as.
    pub agent_id: String,

    /// Home/base latitude in degrees.
    pub home_lat: f64,

    /// Home/base longitude in degrees.
    pub home_lon: f64,

    /// Cruise speed in miles per hour.
    #[serde(default = "default_speed_mph")]
    pub speed_mph: f64,

    /// Longest acceptable round trip in kilometers.
    #[serde(default = "default_max_trip_km")]
    pub max_trip_km: f64,

    /// Price charged per kilometer, in atomic token units.
    #[serde(default = "default_rate_per_km")]
    pub rate_per_km: TokenAmount,

    /// Seconds between marketplace scans.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Seconds between proposal status checks.
    #[serde(default = "default_proposal_interval_secs")]
    pub proposal_interval_secs: u64,

    /// Seconds between status reports.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Loading/unloading pause at pickup and dropoff, in seconds.
    #[serde(default = "default_dwell_secs")]
    pub dwell_secs: u64,
}

fn default_speed_mph() -> f64 {
    30.0
}

fn default_max_trip_km() -> f64 {
    20.0
}

fn default_rate_per_km() -> TokenAmount {
    // 0.1 token per kilometer
    cmn_types::ATTO_PER_TOKEN / 10
}

fn default_scan_interval_secs() -> u64 {
    5
}

fn default_proposal_interval_secs() -> u64 {
    5
}

fn default_heartbeat_interval_secs() -> u64 {
    10
}

fn default_dwell_secs() -> u64 {
    2
}

impl AgentConfig {
    /// Load from `path`, falling back to `$COURIER_CONFIG`, then to
    /// `~/.cmn/config.toml`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var(CONFIG_PATH_ENV) {
                Ok(p) => PathBuf::from(p),
                Err(_) => default_path().ok_or(ConfigError::NoPath(CONFIG_PATH_ENV))?,
            },
        };
        Self::load_file(&path)
    }

    /// Load and validate one specific TOML file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AgentConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the loops cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_id.is_empty() {
            return Err(ConfigError::Invalid("agent_id must not be empty".into()));
        }
        if !(-90.0..=90.0).contains(&self.home_lat) {
            return Err(ConfigError::Invalid(format!(
                "home_lat {} out of range",
                self.home_lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.home_lon) {
            return Err(ConfigError::Invalid(format!(
                "home_lon {} out of range",
                self.home_lon
            )));
        }
        if self.speed_mph <= 0.0 {
            return Err(ConfigError::Invalid("speed_mph must be positive".into()));
        }
        if self.max_trip_km <= 0.0 {
            return Err(ConfigError::Invalid("max_trip_km must be positive".into()));
        }
        if self.rate_per_km == 0 {
            return Err(ConfigError::Invalid("rate_per_km must be positive".into()));
        }
        for (name, value) in [
            ("scan_interval_secs", self.scan_interval_secs),
            ("proposal_interval_secs", self.proposal_interval_secs),
            ("heartbeat_interval_secs", self.heartbeat_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    pub fn agent(&self) -> AgentId {
        AgentId::new(self.agent_id.clone())
    }

    pub fn home(&self) -> Coordinate {
        Coordinate::from_degrees(self.home_lat, self.home_lon)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn proposal_interval(&self) -> Duration {
        Duration::from_secs(self.proposal_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_secs(self.dwell_secs)
    }
}

/// Returns ~/.cmn/config.toml, if a home directory exists.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cmn").join("config.toml"))
}
