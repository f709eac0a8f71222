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

use crate::config::Location;
use crate::metrics::PushGateway;
use crate::provider::{ProviderError, WeatherProvider};
use crate::registry::{Registry, RegistryError, DEFAULT_PROVIDER};
use crate::temperature::TemperatureUnit;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("unable to fetch temperature for {location}: {source}")]
    Provider { location: String, source: ProviderError },
}

/// Minutes to wait before the next cycle after a cycle with a retryable failure:
/// half the interval, rounded half to even. An interval of one minute backs
/// off to zero, so the next cycle starts right away.
pub fn backoff_minutes(interval_minutes: u64) -> u64 {
    (interval_minutes as f64 / 2.0).round_ties_even() as u64
}

/// Fetches the temperature for each configured location, one at a time, and
/// pushes each reading to a Prometheus Pushgateway.
///
/// A location whose API refuses the request (4xx) is skipped until the next
/// cycle. A location whose API fails (5xx) or can't be reached is skipped too,
/// and the wait before the next cycle is cut in half. Anything else points to a
/// configuration problem and stops polling.
#[derive(Debug)]
pub struct Poller {
    registry: Registry,
    provider: WeatherProvider,
    gateway: PushGateway,
    locations: Vec<Location>,
    interval_minutes: u64,
}

impl Poller {
    pub fn new(
        mut registry: Registry,
        gateway: PushGateway,
        locations: Vec<Location>,
        interval_minutes: u64,
    ) -> Result<Self, RegistryError> {
        let provider = registry.provider(DEFAULT_PROVIDER)?.clone();

        Ok(Poller {
            registry,
            provider,
            gateway,
            locations,
            interval_minutes,
        })
    }

    /// Run a single cycle over every location, returning how long to wait
    /// before the next one.
    pub async fn poll_once(&self) -> Result<Duration, PollError> {
        tracing::info!(message = "gathering temperatures", locations = self.locations.len());
        let mut sleep_minutes = self.interval_minutes;

        for location in &self.locations {
            let source = self.registry.source(&location.service)?;

            match self.provider.temperature(source, &location.location_code).await {
                Ok(temperature) => {
                    tracing::debug!(
                        message = "fetched temperature",
                        source = source.name(),
                        location = %location.name,
                        temperature = %temperature.convert(TemperatureUnit::Fahrenheit).unwrap_or(temperature),
                    );

                    if let Err(e) = self.gateway.push(temperature, &location.service, &location.name).await {
                        tracing::error!(
                            message = "failed to push temperature",
                            source = %location.service,
                            location = %location.name,
                            error = %e,
                        );
                    }
                }
                Err(e @ ProviderError::ClientRequest(_, _)) => {
                    tracing::warn!(
                        message = "temperature request refused",
                        source = source.name(),
                        location = %location.name,
                        error = %e,
                    );
                }
                Err(e) if e.is_retryable() => {
                    sleep_minutes = backoff_minutes(self.interval_minutes);
                    tracing::warn!(
                        message = "temperature request failed, shortening next wait",
                        source = source.name(),
                        location = %location.name,
                        sleep_minutes = sleep_minutes,
                        error = %e,
                    );
                }
                Err(e) => {
                    return Err(PollError::Provider {
                        location: location.name.clone(),
                        source: e,
                    });
                }
            }
        }

        Ok(Duration::from_secs(sleep_minutes * 60))
    }

    /// Poll forever, only returning if a cycle fails in a way that can't be
    /// recovered from.
    pub async fn run(&self) -> Result<(), PollError> {
        loop {
            let sleep = self.poll_once().await?;
            tracing::info!(message = "sleeping", minutes = sleep.as_secs() / 60);
            tokio::time::sleep(sleep).await;
        }
    }
}
