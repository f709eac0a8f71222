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

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemperatureError {
    #[error("unknown temperature unit {0:?}")]
    UnknownUnit(String),
    #[error("unsupported temperature conversion {from} -> {to}")]
    UnsupportedConversion { from: TemperatureUnit, to: TemperatureUnit },
}

/// Units a temperature reading may be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemperatureUnit {
    Fahrenheit,
    Celsius,
    Kelvin,
}

impl TemperatureUnit {
    pub const fn all() -> &'static [TemperatureUnit] {
        &[
            TemperatureUnit::Fahrenheit,
            TemperatureUnit::Celsius,
            TemperatureUnit::Kelvin,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "F",
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Kelvin => "K",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemperatureUnit {
    type Err = TemperatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemperatureUnit::all()
            .iter()
            .copied()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| TemperatureError::UnknownUnit(s.to_owned()))
    }
}

/// A single temperature value along with the unit it is measured in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    pub value: f64,
    pub unit: TemperatureUnit,
}

impl Temperature {
    pub fn new(value: f64, unit: TemperatureUnit) -> Self {
        Temperature { value, unit }
    }

    pub fn celsius(value: f64) -> Self {
        Self::new(value, TemperatureUnit::Celsius)
    }

    pub fn fahrenheit(value: f64) -> Self {
        Self::new(value, TemperatureUnit::Fahrenheit)
    }

    pub fn kelvin(value: f64) -> Self {
        Self::new(value, TemperatureUnit::Kelvin)
    }

    /// Copy of this temperature with the value rounded to two decimal places.
    pub fn rounded(self) -> Self {
        Self::new(round2(self.value), self.unit)
    }

    /// Convert this temperature to another unit.
    ///
    /// Converting to the unit the temperature is already in returns it unchanged,
    /// without rounding. Any other conversion is rounded to two decimal places.
    pub fn convert(self, to: TemperatureUnit) -> Result<Temperature, TemperatureError> {
        if self.unit == to {
            return Ok(self);
        }

        let v = self.value;
        let converted = match (self.unit, to) {
            (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => v * 1.8 + 32.0,
            (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => (v - 32.0) / 1.8,
            (TemperatureUnit::Celsius, TemperatureUnit::Kelvin) => v + 273.15,
            (TemperatureUnit::Kelvin, TemperatureUnit::Celsius) => v - 273.15,
            (TemperatureUnit::Fahrenheit, TemperatureUnit::Kelvin) => (v + 459.67) / 1.8,
            (TemperatureUnit::Kelvin, TemperatureUnit::Fahrenheit) => (v * 1.8) - 459.67,
            (from, to) => return Err(TemperatureError::UnsupportedConversion { from, to }),
        };

        Ok(Temperature::new(round2(converted), to))
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}
