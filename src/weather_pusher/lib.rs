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

//! Push temperature readings from weather APIs to a Prometheus Pushgateway
//!
//! ## Features
//!
//! `weather_pusher` fetches the current temperature for a list of locations from one or more
//! weather APIs, converts each reading to celsius and fahrenheit, and pushes the results to a
//! [Prometheus Pushgateway]. The following APIs are supported.
//!
//! * `weather.gov` - The [api.weather.gov] forecast for a grid point, e.g. `BOX/71,90`. No API key needed.
//! * `openweathermap` - The [OpenWeatherMap] five day forecast for a city ID, e.g. `4930956`.
//! * `weatherbit` - The [Weatherbit] current conditions for a city ID, e.g. `4930956`.
//!
//! Each reading is pushed under the job `weather` grouped by `source` and `location`. The
//! following metrics are emitted.
//!
//! * `weather_temperature_celsius{source=$SOURCE, location=$LOCATION}` - Temperature, in degrees celsius.
//! * `weather_temperature_fahrenheit{source=$SOURCE, location=$LOCATION}` - Temperature, in degrees fahrenheit.
//!
//! [Prometheus Pushgateway]: https://github.com/prometheus/pushgateway
//! [api.weather.gov]: https://www.weather.gov/documentation/services-web-api
//! [OpenWeatherMap]: https://openweathermap.org/forecast5
//! [Weatherbit]: https://www.weatherbit.io/api/weather-current
//!
//! ## Build
//!
//! `weather_pusher` is a Rust program and must be built from source using a [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ### Configuration
//!
//! `weather_pusher` reads a TOML configuration file, `config.toml` in the current directory
//! unless `--config` is given. A sample is provided in [ext/config.toml](ext/config.toml).
//!
//! ```toml
//! [settings]
//! log_level = "info"
//! pushgateway = "http://localhost:9091"
//! check_interval_minutes = 15
//!
//! [api_keys]
//! openweathermap = "YOUR_KEY"
//!
//! [[locations]]
//! service = "weather.gov"
//! location_code = "BOX/71,90"
//! name = "Boston"
//!
//! [[locations]]
//! service = "openweathermap"
//! location_code = "4930956"
//! name = "Boston"
//! ```
//!
//! Grid points for api.weather.gov can be found using the API itself, for example
//! `curl -sS 'https://api.weather.gov/points/42.36,-71.06' | jq .properties.forecast`.
//!
//! ### Run
//!
//! ```text
//! ./weather_pusher --config /etc/weather_pusher/config.toml
//! ```
//!
//! Temperatures are fetched for every location once per `check_interval_minutes`. If any
//! API fails with a server error during a cycle, the wait before the next cycle is cut in half.
//!

pub mod config;
pub mod metrics;
pub mod poller;
pub mod provider;
pub mod registry;
pub mod source;
pub mod temperature;
