// weather_pusher - Push temperature readings from weather APIs to a Prometheus Pushgateway
//
// Copyright 2023 weather_pusher authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::provider::DEFAULT_TIMEOUT_MILLIS;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::WARN;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {0}: {1}")]
    Io(PathBuf, #[source] io::Error),
    #[error("unable to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

/// Top-level configuration read from a TOML file.
///
/// ```toml
/// [settings]
/// log_level = "info"
/// pushgateway = "http://localhost:9091"
/// check_interval_minutes = 15
///
/// [api_keys]
/// openweathermap = "..."
///
/// [[locations]]
/// service = "weather.gov"
/// location_code = "BOX/71,90"
/// name = "Boston"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub settings: Settings,
    pub api_keys: HashMap<String, String>,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub pushgateway: String,
    pub check_interval_minutes: u64,
    #[serde(default = "default_timeout_millis")]
    pub timeout_millis: u64,
}

/// A place to fetch the temperature for and which source to ask.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Location {
    /// Registry name of the source, e.g. "weather.gov"
    pub service: String,
    /// Source specific location identifier
    pub location_code: String,
    /// Display name, used as the `location` label
    pub name: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_owned(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_owned(), e))
    }
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl Settings {
    /// Configured log level. Accepts the usual level names in any case as well
    /// as "warning" and "fatal". Missing or unknown levels fall back to WARN.
    pub fn log_level(&self) -> Level {
        match self.log_level.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("WARNING") => Level::WARN,
            Some("FATAL") => Level::ERROR,
            Some(s) => Level::from_str(s).unwrap_or(DEFAULT_LOG_LEVEL),
            None => DEFAULT_LOG_LEVEL,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }
}

fn default_timeout_millis() -> u64 {
    DEFAULT_TIMEOUT_MILLIS
}
