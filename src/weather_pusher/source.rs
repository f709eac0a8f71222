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
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::iter;
use thiserror::Error;

/// Registry name of the api.weather.gov source.
pub const WEATHER_GOV: &str = "weather.gov";
/// Registry name of the openweathermap.org source.
pub const OPEN_WEATHER_MAP: &str = "openweathermap";
/// Registry name of the weatherbit.io source.
pub const WEATHER_BIT: &str = "weatherbit";

const REDACTED: &str = "REDACTED";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid URL {0}")]
    InvalidUrl(String),
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response did not contain a reading at {0}")]
    MissingReading(&'static str),
    #[error(transparent)]
    Temperature(#[from] TemperatureError),
}

/// A weather API that can report the current temperature for a location.
///
/// Each implementation knows how to build a request URL for a location code
/// specific to the API (a grid point, a city ID, etc.) and how to pull a
/// temperature out of the JSON body the API sends back. Making the request
/// itself is left to the `WeatherProvider`.
pub trait WeatherSource: fmt::Debug + Send + Sync {
    /// Human readable name of the API. Never includes credentials.
    fn name(&self) -> &str;

    /// Full URL to request the current temperature for a location.
    fn request_url(&self, location_code: &str) -> Result<Url, SourceError>;

    /// Parse the temperature out of a successful response body.
    fn extract_temperature(&self, body: &[u8]) -> Result<Temperature, SourceError>;

    /// Query parameters of the request URL that hold credentials.
    fn secret_params(&self) -> &'static [&'static str] {
        &[]
    }

    /// Render a request URL with credentials masked, suitable for logs and errors.
    fn redacted_url(&self, url: &Url) -> String {
        let secrets = self.secret_params();
        if secrets.is_empty() || url.query().is_none() {
            return url.to_string();
        }

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if secrets.iter().any(|s| *s == k) {
                    REDACTED.to_owned()
                } else {
                    v.into_owned()
                };
                (k.into_owned(), v)
            })
            .collect();

        let mut redacted = url.clone();
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
        redacted.to_string()
    }
}

/// Source for the forecast endpoint of api.weather.gov.
///
/// Location codes are grid points in the form `OFFICE/X,Y`, e.g. `BOX/71,90`.
/// The API doesn't require a key; one may be supplied anyway and is kept but
/// not sent.
pub struct WeatherGovSource {
    api_key: String,
    base_url: Url,
}

impl WeatherGovSource {
    const NAME: &'static str = "Weather.gov";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.weather.gov/";

    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self::with_base_url(api_key, Self::DEFAULT_BASE_URL).expect("default weather.gov URL must be valid")
    }

    pub fn with_base_url<S: Into<String>>(api_key: S, base_url: &str) -> Result<Self, SourceError> {
        Ok(WeatherGovSource {
            api_key: api_key.into(),
            base_url: parse_base_url(base_url)?,
        })
    }
}

impl WeatherSource for WeatherGovSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn request_url(&self, location_code: &str) -> Result<Url, SourceError> {
        let segments = iter::once("gridpoints")
            .chain(location_code.split('/'))
            .chain(iter::once("forecast"));
        url_with_path(&self.base_url, segments)
    }

    fn extract_temperature(&self, body: &[u8]) -> Result<Temperature, SourceError> {
        let forecast: GovForecast = serde_json::from_slice(body)?;
        let period = forecast
            .properties
            .periods
            .first()
            .ok_or(SourceError::MissingReading("properties.periods[0]"))?;

        let unit: TemperatureUnit = period.temperature_unit.parse()?;
        Ok(Temperature::new(period.temperature, unit))
    }
}

impl fmt::Debug for WeatherGovSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherGovSource")
            .field("api_key", &key_hint(&self.api_key))
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

/// Source for the five day forecast endpoint of openweathermap.org.
///
/// Location codes are OpenWeatherMap city IDs. Temperatures are always reported
/// in kelvin since no `units` parameter is sent.
pub struct OpenWeatherMapSource {
    api_key: String,
    base_url: Url,
}

impl OpenWeatherMapSource {
    const NAME: &'static str = "OpenWeatherMap";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openweathermap.org/";

    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self::with_base_url(api_key, Self::DEFAULT_BASE_URL).expect("default openweathermap URL must be valid")
    }

    pub fn with_base_url<S: Into<String>>(api_key: S, base_url: &str) -> Result<Self, SourceError> {
        Ok(OpenWeatherMapSource {
            api_key: api_key.into(),
            base_url: parse_base_url(base_url)?,
        })
    }
}

impl WeatherSource for OpenWeatherMapSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn request_url(&self, location_code: &str) -> Result<Url, SourceError> {
        let mut url = url_with_path(&self.base_url, ["data", "2.5", "forecast"])?;
        url.query_pairs_mut()
            .append_pair("id", location_code)
            .append_pair("appid", &self.api_key);
        Ok(url)
    }

    fn extract_temperature(&self, body: &[u8]) -> Result<Temperature, SourceError> {
        let forecast: OwmForecast = serde_json::from_slice(body)?;
        let entry = forecast.list.first().ok_or(SourceError::MissingReading("list[0]"))?;
        Ok(Temperature::kelvin(entry.main.temp))
    }

    fn secret_params(&self) -> &'static [&'static str] {
        &["appid"]
    }
}

impl fmt::Debug for OpenWeatherMapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherMapSource")
            .field("api_key", &key_hint(&self.api_key))
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

/// Source for the current conditions endpoint of weatherbit.io.
///
/// Location codes are Weatherbit city IDs. Temperatures are reported in celsius,
/// the API default.
pub struct WeatherBitSource {
    api_key: String,
    base_url: Url,
}

impl WeatherBitSource {
    const NAME: &'static str = "Weatherbit";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.weatherbit.io/";

    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self::with_base_url(api_key, Self::DEFAULT_BASE_URL).expect("default weatherbit URL must be valid")
    }

    pub fn with_base_url<S: Into<String>>(api_key: S, base_url: &str) -> Result<Self, SourceError> {
        Ok(WeatherBitSource {
            api_key: api_key.into(),
            base_url: parse_base_url(base_url)?,
        })
    }
}

impl WeatherSource for WeatherBitSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn request_url(&self, location_code: &str) -> Result<Url, SourceError> {
        let mut url = url_with_path(&self.base_url, ["v2.0", "current"])?;
        url.query_pairs_mut()
            .append_pair("city_id", location_code)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    fn extract_temperature(&self, body: &[u8]) -> Result<Temperature, SourceError> {
        let current: BitCurrent = serde_json::from_slice(body)?;
        let entry = current.data.first().ok_or(SourceError::MissingReading("data[0]"))?;
        Ok(Temperature::celsius(entry.temp))
    }

    fn secret_params(&self) -> &'static [&'static str] {
        &["key"]
    }
}

impl fmt::Debug for WeatherBitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherBitSource")
            .field("api_key", &key_hint(&self.api_key))
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, SourceError> {
    let url = Url::parse(base_url).map_err(|e| SourceError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(SourceError::InvalidUrl(base_url.to_owned()));
    }

    Ok(url)
}

fn url_with_path<'a, I>(base_url: &Url, segments: I) -> Result<Url, SourceError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map(|mut p| {
            p.pop_if_empty().extend(segments);
        })
        .map_err(|_| SourceError::InvalidUrl(base_url.to_string()))?;

    Ok(url)
}

fn key_hint(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[derive(Deserialize, Debug)]
struct GovForecast {
    properties: GovForecastProperties,
}

#[derive(Deserialize, Debug)]
struct GovForecastProperties {
    periods: Vec<GovForecastPeriod>,
}

#[derive(Deserialize, Debug)]
struct GovForecastPeriod {
    temperature: f64,
    #[serde(alias = "temperatureUnit")]
    temperature_unit: String,
}

#[derive(Deserialize, Debug)]
struct OwmForecast {
    list: Vec<OwmForecastEntry>,
}

#[derive(Deserialize, Debug)]
struct OwmForecastEntry {
    main: OwmMain,
}

#[derive(Deserialize, Debug)]
struct OwmMain {
    temp: f64,
}

#[derive(Deserialize, Debug)]
struct BitCurrent {
    data: Vec<BitObservation>,
}

#[derive(Deserialize, Debug)]
struct BitObservation {
    temp: f64,
}

#[cfg(test)]
mod tests {
    use super::{OpenWeatherMapSource, SourceError, WeatherBitSource, WeatherGovSource, WeatherSource};
    use crate::temperature::{Temperature, TemperatureError};

    const GOV_FORECAST: &str = r#"{
        "properties": {
            "updated": "2023-01-14T19:46:58+00:00",
            "periods": [
                {"number": 1, "name": "This Afternoon", "temperature": 34, "temperatureUnit": "F"},
                {"number": 2, "name": "Tonight", "temperature": 27, "temperatureUnit": "F"}
            ]
        }
    }"#;

    #[test]
    fn test_weather_gov_request_url() {
        let source = WeatherGovSource::new("abc");
        let url = source.request_url("TOP/31,80").unwrap();
        assert_eq!("https://api.weather.gov/gridpoints/TOP/31,80/forecast", url.as_str());
    }

    #[test]
    fn test_weather_gov_request_url_base_with_path() {
        let source = WeatherGovSource::with_base_url("", "http://localhost:8080/mirror/").unwrap();
        let url = source.request_url("BOX/71,90").unwrap();
        assert_eq!("http://localhost:8080/mirror/gridpoints/BOX/71,90/forecast", url.as_str());
    }

    #[test]
    fn test_invalid_base_url() {
        let res = WeatherGovSource::with_base_url("", "not a url");
        assert!(matches!(res, Err(SourceError::InvalidUrl(_))));
    }

    #[test]
    fn test_weather_gov_extract() {
        let source = WeatherGovSource::new("");
        let t = source.extract_temperature(GOV_FORECAST.as_bytes()).unwrap();
        assert_eq!(Temperature::fahrenheit(34.0), t);
    }

    #[test]
    fn test_weather_gov_extract_celsius() {
        let source = WeatherGovSource::new("");
        let body = r#"{"properties": {"periods": [{"temperature": 1.5, "temperatureUnit": "C"}]}}"#;
        let t = source.extract_temperature(body.as_bytes()).unwrap();
        assert_eq!(Temperature::celsius(1.5), t);
    }

    #[test]
    fn test_weather_gov_extract_unknown_unit() {
        let source = WeatherGovSource::new("");
        let body = r#"{"properties": {"periods": [{"temperature": 491, "temperatureUnit": "R"}]}}"#;
        let err = source.extract_temperature(body.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            SourceError::Temperature(TemperatureError::UnknownUnit(u)) if u == "R"
        ));
    }

    #[test]
    fn test_weather_gov_extract_no_periods() {
        let source = WeatherGovSource::new("");
        let body = r#"{"properties": {"periods": []}}"#;
        let err = source.extract_temperature(body.as_bytes()).unwrap_err();
        assert!(matches!(err, SourceError::MissingReading(_)));
    }

    #[test]
    fn test_open_weather_map_request_url() {
        let source = OpenWeatherMapSource::new("abc");
        let url = source.request_url("4930956").unwrap();
        assert_eq!(
            "https://api.openweathermap.org/data/2.5/forecast?id=4930956&appid=abc",
            url.as_str()
        );
    }

    #[test]
    fn test_open_weather_map_extract() {
        let source = OpenWeatherMapSource::new("abc");
        let body = r#"{"cod": "200", "list": [{"dt": 1673730000, "main": {"temp": 274.26, "humidity": 80}}]}"#;
        let t = source.extract_temperature(body.as_bytes()).unwrap();
        assert_eq!(Temperature::kelvin(274.26), t);
    }

    #[test]
    fn test_open_weather_map_extract_malformed() {
        let source = OpenWeatherMapSource::new("abc");
        let err = source.extract_temperature(b"{\"list\": [{\"main\": {}}]}").unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn test_weather_bit_request_url() {
        let source = WeatherBitSource::new("abc");
        let url = source.request_url("4930956").unwrap();
        assert_eq!("https://api.weatherbit.io/v2.0/current?city_id=4930956&key=abc", url.as_str());
    }

    #[test]
    fn test_weather_bit_extract() {
        let source = WeatherBitSource::new("abc");
        let body = r#"{"count": 1, "data": [{"city_name": "Boston", "temp": -1.2}]}"#;
        let t = source.extract_temperature(body.as_bytes()).unwrap();
        assert_eq!(Temperature::celsius(-1.2), t);
    }

    #[test]
    fn test_weather_bit_extract_empty() {
        let source = WeatherBitSource::new("abc");
        let err = source.extract_temperature(br#"{"data": []}"#).unwrap_err();
        assert!(matches!(err, SourceError::MissingReading("data[0]")));
    }

    #[test]
    fn test_redacted_url_hides_key() {
        let source = WeatherBitSource::new("secret-key");
        let url = source.request_url("4930956").unwrap();
        let redacted = source.redacted_url(&url);
        assert!(!redacted.contains("secret-key"));
        assert!(redacted.contains("city_id=4930956"));
        assert!(redacted.contains("key=REDACTED"));
    }

    #[test]
    fn test_redacted_url_without_secrets() {
        let source = WeatherGovSource::new("secret-key");
        let url = source.request_url("BOX/71,90").unwrap();
        assert_eq!(url.as_str(), source.redacted_url(&url));
    }

    #[test]
    fn test_debug_and_name_hide_key() {
        let sources: Vec<Box<dyn WeatherSource>> = vec![
            Box::new(WeatherGovSource::new("secret-key")),
            Box::new(OpenWeatherMapSource::new("secret-key")),
            Box::new(WeatherBitSource::new("secret-key")),
        ];

        for source in sources {
            assert!(!format!("{:?}", source).contains("secret-key"));
            assert!(!source.name().contains("secret-key"));
        }
    }
}
