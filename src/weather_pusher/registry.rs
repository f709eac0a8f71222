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

use crate::provider::WeatherProvider;
use crate::source::{
    OpenWeatherMapSource, WeatherBitSource, WeatherGovSource, WeatherSource, OPEN_WEATHER_MAP, WEATHER_BIT,
    WEATHER_GOV,
};
use std::collections::HashMap;
use thiserror::Error;

/// Name of the provider that may be replaced and is created on first use.
pub const DEFAULT_PROVIDER: &str = "default";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{0} is already registered")]
    DuplicateName(String),
    #[error("unknown weather source {0}")]
    UnknownSource(String),
    #[error("unknown weather provider {0}")]
    UnknownProvider(String),
}

/// Named `WeatherSource` and `WeatherProvider` instances.
///
/// Sources and providers are separate namespaces: the same name may be used
/// for one of each. Names must be unique within a namespace with one exception,
/// the `DEFAULT_PROVIDER` may be registered again to replace it.
#[derive(Debug, Default)]
pub struct Registry {
    sources: HashMap<String, Box<dyn WeatherSource>>,
    providers: HashMap<String, WeatherProvider>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in sources that have been configured.
    ///
    /// api.weather.gov doesn't need a key so it is always registered. The other
    /// sources are only registered when there is a key for them in `api_keys`.
    pub fn from_api_keys(api_keys: &HashMap<String, String>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        let key = |name: &str| api_keys.get(name).cloned();

        registry.register_source(WEATHER_GOV, Box::new(WeatherGovSource::new(key(WEATHER_GOV).unwrap_or_default())))?;
        if let Some(k) = key(OPEN_WEATHER_MAP) {
            registry.register_source(OPEN_WEATHER_MAP, Box::new(OpenWeatherMapSource::new(k)))?;
        }
        if let Some(k) = key(WEATHER_BIT) {
            registry.register_source(WEATHER_BIT, Box::new(WeatherBitSource::new(k)))?;
        }

        Ok(registry)
    }

    pub fn register_source<S: Into<String>>(&mut self, name: S, source: Box<dyn WeatherSource>) -> Result<(), RegistryError> {
        let name = name.into();
        if self.sources.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        tracing::debug!(message = "registered weather source", name = %name, source = source.name());
        self.sources.insert(name, source);
        Ok(())
    }

    pub fn deregister_source(&mut self, name: &str) {
        self.sources.remove(name);
    }

    pub fn source(&self, name: &str) -> Result<&dyn WeatherSource, RegistryError> {
        self.sources
            .get(name)
            .map(|s| s.as_ref())
            .ok_or_else(|| RegistryError::UnknownSource(name.to_owned()))
    }

    /// Names of all registered sources, in no particular order.
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(|k| k.as_str())
    }

    pub fn register_provider<S: Into<String>>(&mut self, name: S, provider: WeatherProvider) -> Result<(), RegistryError> {
        let name = name.into();
        if name != DEFAULT_PROVIDER && self.providers.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        self.providers.insert(name, provider);
        Ok(())
    }

    pub fn deregister_provider(&mut self, name: &str) {
        self.providers.remove(name);
    }

    /// Look up a provider by name, creating the `DEFAULT_PROVIDER` if it hasn't
    /// been registered yet.
    pub fn provider(&mut self, name: &str) -> Result<&WeatherProvider, RegistryError> {
        if name == DEFAULT_PROVIDER {
            return Ok(self.providers.entry(name.to_owned()).or_default());
        }

        self.providers
            .get(name)
            .ok_or_else(|| RegistryError::UnknownProvider(name.to_owned()))
    }
}
