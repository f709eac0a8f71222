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

use crate::temperature::{Temperature, TemperatureError, TemperatureUnit};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::{Registry, Unit};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use std::fmt;
use std::sync::atomic::AtomicU64;
use thiserror::Error;

const NAMESPACE: &str = "weather";
const JOB: &str = "weather";
const LABEL_SOURCE: &str = "source";
const LABEL_LOCATION: &str = "location";
const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("missing push gateway URL")]
    MissingGatewayUrl,
    #[error("invalid push gateway URL {0}")]
    InvalidGatewayUrl(String),
    #[error("unable to encode metrics: {0}")]
    Encoding(#[from] fmt::Error),
    #[error(transparent)]
    Temperature(#[from] TemperatureError),
    #[error("{0}")]
    Internal(#[source] reqwest::Error),
    #[error("unexpected status {0} for {1}")]
    Unexpected(StatusCode, String),
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct TemperatureLabels {
    source: String,
    location: String,
}

/// Gauges for a temperature reading in celsius and fahrenheit.
///
/// Both metrics are created and registered upon call to `TemperatureMetrics::new()`
/// and are labeled with the name of the source and the location the reading is for.
#[derive(Debug)]
pub struct TemperatureMetrics {
    celsius: Family<TemperatureLabels, Gauge<f64, AtomicU64>>,
    fahrenheit: Family<TemperatureLabels, Gauge<f64, AtomicU64>>,
}

impl TemperatureMetrics {
    pub fn new(reg: &mut Registry) -> Self {
        let celsius = Family::<TemperatureLabels, Gauge<f64, AtomicU64>>::default();
        let fahrenheit = Family::<TemperatureLabels, Gauge<f64, AtomicU64>>::default();

        reg.register_with_unit(
            "temperature",
            "Temperature reading from weather service",
            Unit::Celsius,
            celsius.clone(),
        );
        reg.register_with_unit(
            "temperature",
            "Temperature reading from weather service",
            Unit::Other("fahrenheit".to_owned()),
            fahrenheit.clone(),
        );

        Self { celsius, fahrenheit }
    }

    /// Set both gauges for a source and location from a temperature in any unit.
    pub fn observe(&self, temperature: Temperature, source: &str, location: &str) -> Result<(), TemperatureError> {
        let labels = TemperatureLabels {
            source: source.to_owned(),
            location: location.to_owned(),
        };

        let c = temperature.convert(TemperatureUnit::Celsius)?;
        let f = temperature.convert(TemperatureUnit::Fahrenheit)?;
        self.celsius.get_or_create(&labels).set(c.value);
        self.fahrenheit.get_or_create(&labels).set(f.value);
        Ok(())
    }
}

/// Render a single temperature reading in the OpenMetrics text format.
pub fn encode_temperature(temperature: Temperature, source: &str, location: &str) -> Result<String, MetricsError> {
    let mut registry = Registry::with_prefix(NAMESPACE);
    let metrics = TemperatureMetrics::new(&mut registry);
    metrics.observe(temperature, source, location)?;

    let mut buf = String::new();
    encode(&mut buf, &registry)?;
    Ok(buf)
}

/// Client for a Prometheus Pushgateway.
///
/// Each reading is pushed as its own group, keyed by source and location, under
/// the `weather` job. Pushing replaces any metrics previously pushed for the group.
#[derive(Debug, Clone)]
pub struct PushGateway {
    client: Client,
    base_url: String,
}

impl PushGateway {
    pub fn new(client: Client, gateway_url: &str) -> Result<Self, MetricsError> {
        let gateway_url = gateway_url.trim();
        if gateway_url.is_empty() {
            return Err(MetricsError::MissingGatewayUrl);
        }

        Url::parse(gateway_url).map_err(|e| MetricsError::InvalidGatewayUrl(format!("{}: {}", gateway_url, e)))?;
        Ok(PushGateway {
            client,
            base_url: gateway_url.trim_end_matches('/').to_owned(),
        })
    }

    /// URL of the group for a source and location.
    pub fn push_url(&self, source: &str, location: &str) -> String {
        format!(
            "{}/metrics/job/{}/{}/{}",
            self.base_url,
            JOB,
            grouping_key(LABEL_SOURCE, source),
            grouping_key(LABEL_LOCATION, location)
        )
    }

    pub async fn push(&self, temperature: Temperature, source: &str, location: &str) -> Result<(), MetricsError> {
        let body = encode_temperature(temperature, source, location)?;
        let url = self.push_url(source, location);
        tracing::debug!(message = "pushing temperature metrics", url = %url, num_bytes = body.len());

        let res = self
            .client
            .put(url.as_str())
            .header(CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(MetricsError::Internal)?;

        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(MetricsError::Unexpected(status, url))
        }
    }
}

/// Path segments for one label of a grouping key. Empty values and values
/// containing `/` can't be expressed as a single path segment and use the
/// URL-safe base64 form of the gateway API.
fn grouping_key(label: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{}@base64/=", label)
    } else if value.contains('/') {
        format!("{}@base64/{}", label, URL_SAFE.encode(value))
    } else {
        format!("{}/{}", label, utf8_percent_encode(value, NON_ALPHANUMERIC))
    }
}
