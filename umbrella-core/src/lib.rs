//! Core library for the `umbrella` weather tool.
//!
//! This crate defines:
//! - Location permission handling and debounced position updates
//! - OpenWeather request building and response parsing
//! - Asynchronous forecast fetching with retry after failures
//! - Configuration & credentials handling
//!
//! It is used by `umbrella-cli`, but a GUI front end only needs to supply a
//! [`LocationSensor`] and a [`Presenter`].

pub mod app;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod location;
pub mod model;
pub mod provider;

pub use app::{Action, Presenter, RETRY_DELAY, Umbrella, UmbrellaHandle};
pub use config::Config;
pub use error::{FetchError, ParseError};
pub use fetcher::{FORECAST_ENTRIES, ForecastConsumer, ForecastOutcome, WeatherFetcher};
pub use http::{HttpClient, ReqwestClient};
pub use location::{
    AuthorizationStatus, LocationConsumer, LocationSensor, LocationTracker, SensorEvent,
};
pub use model::{Coordinate, Forecast, ForecastPoint, WeatherCondition};
pub use provider::{WeatherDataSource, openweather::OpenWeatherDataSource};
