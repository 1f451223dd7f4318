use serde_json::Value;
use std::fmt::Debug;

use crate::{
    error::ParseError,
    model::{Coordinate, Forecast, ForecastPoint},
};

pub mod openweather;

/// A weather service: where to send requests and how to read the replies.
///
/// Implementations are pure; no I/O happens here.
pub trait WeatherDataSource: Send + Sync + Debug {
    fn current_weather_url(&self, coordinate: Coordinate) -> String;

    fn forecast_url(&self, coordinate: Coordinate) -> String;

    fn parse_current(&self, response: &Value) -> Result<ForecastPoint, ParseError>;

    /// Exactly `entries` points on success, in the provider's order.
    fn parse_forecast(&self, response: &Value, entries: usize) -> Result<Forecast, ParseError>;
}
