use anyhow::anyhow;
use chrono::{DateTime, Local, Timelike, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    Config,
    error::ParseError,
    model::{Coordinate, Forecast, ForecastPoint, WeatherCondition, is_night_hour},
};

use super::WeatherDataSource;

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/";
pub const DEFAULT_API_VERSION: &str = "2.5";
pub const DEFAULT_LANGUAGE: &str = "en";

const CURRENT_WEATHER_OPERATION: &str = "/weather";
const FORECAST_OPERATION: &str = "/forecast";

/// Unit system requested from OpenWeather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

/// Decides whether a slot time counts as night for condition classification.
pub type NightRule = fn(DateTime<Utc>) -> bool;

/// Fixed-hour rule evaluated in the local time zone.
pub fn local_fixed_hour_night(time: DateTime<Utc>) -> bool {
    is_night_hour(time.with_timezone(&Local).hour())
}

/// OpenWeather 2.5 API: request targets and response parsing.
#[derive(Debug, Clone)]
pub struct OpenWeatherDataSource {
    base_url: String,
    api_version: String,
    api_key: String,
    language: String,
    units: Units,
    night: NightRule,
}

impl OpenWeatherDataSource {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key,
            language: DEFAULT_LANGUAGE.to_string(),
            units: Units::Metric,
            night: local_fixed_hour_night,
        }
    }

    /// Build from stored configuration; fails when no API key is configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::from_config_with_key(config, config.api_key())
    }

    fn from_config_with_key(config: &Config, api_key: Option<String>) -> anyhow::Result<Self> {
        let api_key = api_key.ok_or_else(|| {
            anyhow!(
                "No OpenWeather API key configured.\n\
                 Hint: run `umbrella configure` and enter your API key."
            )
        })?;

        Ok(Self::new(api_key)
            .with_base_url(config.base_url.clone())
            .with_api_version(config.api_version.clone()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn with_night_rule(mut self, night: NightRule) -> Self {
        self.night = night;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn units(&self) -> Units {
        self.units
    }

    fn request_url(&self, operation: &str, coordinate: Coordinate) -> String {
        debug_assert!(coordinate.is_valid(), "coordinate out of range: {coordinate:?}");

        // `{:?}` keeps the trailing ".0" on integral degrees.
        format!(
            "{}{}{}?lat={:?}&lon={:?}&APPID={}&lang={}&units={}",
            self.base_url,
            self.api_version,
            operation,
            coordinate.latitude,
            coordinate.longitude,
            self.api_key,
            self.language,
            self.units.as_str(),
        )
    }

    /// Convert one weather section (a `list` entry, or a current-weather document).
    pub fn parse_point(&self, section: &Value) -> Result<ForecastPoint, ParseError> {
        let section = OwSection::deserialize(section)
            .map_err(|e| ParseError::malformed(format!("weather section: {e}")))?;

        let time = section
            .dt
            .and_then(unix_to_utc)
            .ok_or_else(|| ParseError::malformed("dt"))?;

        let temperature = section.main.and_then(|main| main.temp);

        let (description, condition) = match section.weather.into_iter().next() {
            Some(weather) => {
                let night = (self.night)(time);
                let condition = weather.id.and_then(|id| WeatherCondition::from_code(id, night));
                (weather.description, condition)
            }
            None => (None, None),
        };

        match (temperature, condition, description) {
            (Some(temperature), Some(condition), Some(description)) => Ok(ForecastPoint {
                location_name: None,
                time,
                condition,
                description,
                temperature,
            }),
            (temperature, condition, description) => {
                let missing: Vec<&str> = [
                    temperature.is_none().then_some("main.temp"),
                    condition.is_none().then_some("weather[0].id"),
                    description.is_none().then_some("weather[0].description"),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(ParseError::malformed(missing.join(", ")))
            }
        }
    }
}

impl WeatherDataSource for OpenWeatherDataSource {
    fn current_weather_url(&self, coordinate: Coordinate) -> String {
        self.request_url(CURRENT_WEATHER_OPERATION, coordinate)
    }

    fn forecast_url(&self, coordinate: Coordinate) -> String {
        self.request_url(FORECAST_OPERATION, coordinate)
    }

    fn parse_current(&self, response: &Value) -> Result<ForecastPoint, ParseError> {
        let mut point = self.parse_point(response)?;
        point.location_name = response.get("name").and_then(Value::as_str).map(str::to_string);
        Ok(point)
    }

    fn parse_forecast(&self, response: &Value, entries: usize) -> Result<Forecast, ParseError> {
        debug_assert!(entries > 0, "at least one forecast entry must be requested");

        let parsed = OwForecastResponse::deserialize(response)
            .map_err(|e| ParseError::malformed(format!("forecast response: {e}")))?;

        let city = parsed
            .city
            .and_then(|city| city.name)
            .ok_or_else(|| ParseError::malformed("city.name"))?;

        // A count that is not an integer is ignored; the list length still decides.
        if let Some(declared) = parsed.cnt.as_ref().and_then(Value::as_i64) {
            if declared < entries as i64 {
                return Err(ParseError::InsufficientData {
                    available: usize::try_from(declared).unwrap_or(0),
                    requested: entries,
                });
            }
        }

        let sections = parsed.list.ok_or_else(|| ParseError::malformed("list"))?;

        let mut points = sections
            .iter()
            .take(entries)
            .map(|section| self.parse_point(section))
            .collect::<Result<Vec<_>, _>>()?;

        if points.len() < entries {
            return Err(ParseError::InsufficientData {
                available: points.len(),
                requested: entries,
            });
        }

        if let Some(first) = points.first_mut() {
            first.location_name = Some(city);
        }

        Ok(Forecast::new(points))
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwSection {
    dt: Option<f64>,
    main: Option<OwMain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: Option<OwCity>,
    cnt: Option<Value>,
    // Sections stay untyped so trailing entries past the requested count are never inspected.
    list: Option<Vec<Value>>,
}

fn unix_to_utc(ts: f64) -> Option<DateTime<Utc>> {
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.trunc() as i64;
    let nanos = (ts.fract().abs() * 1e9) as u32;
    DateTime::from_timestamp(secs, nanos)
}
