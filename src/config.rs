//! Process configuration from environment variables.

use crate::models::DEFAULT_HALF_TIME_MINUTES;
use chrono::Datelike;
use std::path::PathBuf;

/// Server and storage settings. Every value has a default so the binary runs unconfigured.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppConfig {
    /// HOST (default 0.0.0.0, reachable via DNS on a VPS).
    pub host: String,
    /// PORT (default 8080).
    pub port: u16,
    /// DATA_DIR: where `tournament_<year>.json` snapshots are kept (default `data`).
    pub data_dir: PathBuf,
    /// TOURNAMENT_YEAR: the one tournament this process serves (default current year).
    pub year: i32,
    /// HALF_TIME_MINUTES: half length when neither config nor command gives one.
    pub half_time_minutes: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            data_dir: PathBuf::from("data"),
            year: chrono::Utc::now().year(),
            half_time_minutes: DEFAULT_HALF_TIME_MINUTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            year: lookup("TOURNAMENT_YEAR")
                .and_then(|y| y.parse().ok())
                .unwrap_or(defaults.year),
            half_time_minutes: lookup("HALF_TIME_MINUTES")
                .and_then(|m| m.parse().ok())
                .filter(|&m| m > 0)
                .unwrap_or(defaults.half_time_minutes),
        }
    }
}
