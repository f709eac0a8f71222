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

use crate::source::{SourceError, WeatherSource};
use crate::temperature::{Temperature, TemperatureError, TemperatureUnit};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Internal(#[source] reqwest::Error),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("request refused with status {0} for {1}")]
    ClientRequest(StatusCode, String),
    #[error("server failed with status {0} for {1}")]
    ServerProcessing(StatusCode, String),
    #[error("unexpected status {0} for {1}")]
    UnexpectedStatus(StatusCode, String),
    #[error(transparent)]
    Temperature(#[from] TemperatureError),
}

impl ProviderError {
    /// True if the request may succeed when tried again later: the API had a
    /// server side failure or couldn't be reached at all.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerProcessing(_, _) | Self::Internal(_))
    }
}

/// Fetches temperatures from any `WeatherSource`.
///
/// Holds only a `reqwest::Client` (a shared connection pool), so it's cheap to
/// clone and the same provider can be used for every source.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
}

impl WeatherProvider {
    const USER_AGENT: &'static str = concat!("weather_pusher/", env!("CARGO_PKG_VERSION"));
    const JSON_RESPONSE: &'static str = "application/geo+json, application/json";

    pub fn new(client: Client) -> Self {
        WeatherProvider { client }
    }

    /// Fetch the current temperature for a location from a source, in whatever
    /// unit the source reports it, rounded to two decimal places.
    pub async fn temperature(&self, source: &dyn WeatherSource, location_code: &str) -> Result<Temperature, ProviderError> {
        let url = source.request_url(location_code)?;
        let display_url = source.redacted_url(&url);
        tracing::debug!(message = "making temperature request", source = source.name(), url = %display_url);

        let res = self
            .client
            .get(url)
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(|e| ProviderError::Internal(e.without_url()))?;

        check_status(res.status(), &display_url)?;

        let body = res
            .bytes()
            .await
            .map_err(|e| ProviderError::Internal(e.without_url()))?;
        let temperature = source.extract_temperature(&body)?;
        Ok(temperature.rounded())
    }

    pub async fn temperature_celsius(&self, source: &dyn WeatherSource, location_code: &str) -> Result<Temperature, ProviderError> {
        let t = self.temperature(source, location_code).await?;
        Ok(t.convert(TemperatureUnit::Celsius)?)
    }

    pub async fn temperature_fahrenheit(
        &self,
        source: &dyn WeatherSource,
        location_code: &str,
    ) -> Result<Temperature, ProviderError> {
        let t = self.temperature(source, location_code).await?;
        Ok(t.convert(TemperatureUnit::Fahrenheit)?)
    }
}

impl Default for WeatherProvider {
    fn default() -> Self {
        let client = http_client(Duration::from_millis(DEFAULT_TIMEOUT_MILLIS)).unwrap_or_else(|_| Client::new());
        Self::new(client)
    }
}

/// Build the HTTP client used for both weather APIs and the push gateway.
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Sort a response status into success or the kind of failure it represents.
///
/// 4xx and 5xx are checked first. Of the rest, only registered 2xx and 3xx
/// codes are treated as success.
pub fn check_status(status: StatusCode, url: &str) -> Result<(), ProviderError> {
    match status.as_u16() {
        400..=499 => Err(ProviderError::ClientRequest(status, url.to_owned())),
        500..=599 => Err(ProviderError::ServerProcessing(status, url.to_owned())),
        200..=399 if status.canonical_reason().is_some() => Ok(()),
        _ => Err(ProviderError::UnexpectedStatus(status, url.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::{check_status, ProviderError};
    use reqwest::StatusCode;

    const URL: &str = "https://api.weather.gov/gridpoints/BOX/71,90/forecast";

    fn status(code: u16) -> Result<(), ProviderError> {
        check_status(StatusCode::from_u16(code).unwrap(), URL)
    }

    #[test]
    fn test_check_status_success() {
        assert!(status(200).is_ok());
        assert!(status(201).is_ok());
        assert!(status(304).is_ok());
    }

    #[test]
    fn test_check_status_client_error() {
        assert!(matches!(status(400), Err(ProviderError::ClientRequest(_, _))));
        assert!(matches!(status(404), Err(ProviderError::ClientRequest(_, _))));
        assert!(matches!(status(499), Err(ProviderError::ClientRequest(_, _))));
    }

    #[test]
    fn test_check_status_server_error() {
        assert!(matches!(status(500), Err(ProviderError::ServerProcessing(_, _))));
        assert!(matches!(status(503), Err(ProviderError::ServerProcessing(_, _))));
        assert!(matches!(status(599), Err(ProviderError::ServerProcessing(_, _))));
    }

    #[test]
    fn test_check_status_unexpected() {
        assert!(matches!(status(101), Err(ProviderError::UnexpectedStatus(_, _))));
        assert!(matches!(status(299), Err(ProviderError::UnexpectedStatus(_, _))));
        assert!(matches!(status(600), Err(ProviderError::UnexpectedStatus(_, _))));
    }

    #[test]
    fn test_error_includes_url() {
        let err = status(404).unwrap_err();
        assert!(err.to_string().contains(URL));
    }

    #[test]
    fn test_is_retryable() {
        assert!(status(503).unwrap_err().is_retryable());
        assert!(!status(404).unwrap_err().is_retryable());
        assert!(!status(299).unwrap_err().is_retryable());
    }
}
