//! Forecast retrieval: request building, the network round trip and parsing,
//! with results handed back to the main context over a channel.

use std::sync::Arc;

use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};

use crate::{
    error::FetchError,
    http::HttpClient,
    model::{Coordinate, Forecast, ForecastPoint},
    provider::WeatherDataSource,
};

/// "Now" plus three upcoming slots.
pub const FORECAST_ENTRIES: usize = 4;

/// Receiver side of a forecast request. Both notifications are optional.
pub trait ForecastConsumer {
    fn forecast_ready(&mut self, _forecast: Forecast) {}

    /// Every failure kind lands here; `error` is informational.
    fn fetch_failed(&mut self, _error: &FetchError) {}
}

/// Result of one `request_forecast` call.
#[derive(Debug)]
pub struct ForecastOutcome {
    pub coordinate: Coordinate,
    pub result: Result<Forecast, FetchError>,
}

impl ForecastOutcome {
    /// Notify `consumer`. Must run on the main context.
    pub fn deliver(self, consumer: &mut dyn ForecastConsumer) {
        match self.result {
            Ok(forecast) => consumer.forecast_ready(forecast),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    network = err.is_network(),
                    retryable = err.is_retryable(),
                    "failed to fetch forecast"
                );
                consumer.fetch_failed(&err);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    source: Arc<dyn WeatherDataSource>,
    http: Arc<dyn HttpClient>,
    outcomes: UnboundedSender<ForecastOutcome>,
}

impl WeatherFetcher {
    /// Returns the fetcher and the receiver that the main context drains.
    pub fn new(
        source: Arc<dyn WeatherDataSource>,
        http: Arc<dyn HttpClient>,
    ) -> (Self, UnboundedReceiver<ForecastOutcome>) {
        let (outcomes, rx) = unbounded_channel();
        (Self { source, http, outcomes }, rx)
    }

    /// Start a forecast retrieval in the background.
    ///
    /// Exactly one [`ForecastOutcome`] is sent per call. Calls are independent:
    /// nothing is coalesced and outcomes may arrive in any order.
    pub fn request_forecast(&self, coordinate: Coordinate) -> JoinHandle<()> {
        debug_assert!(coordinate.is_valid(), "coordinate out of range: {coordinate:?}");

        let this = self.clone();
        tokio::spawn(async move {
            let result = this.fetch_forecast(coordinate).await;
            if this.outcomes.send(ForecastOutcome { coordinate, result }).is_err() {
                tracing::debug!("forecast receiver dropped, discarding outcome");
            }
        })
    }

    pub async fn fetch_forecast(&self, coordinate: Coordinate) -> Result<Forecast, FetchError> {
        let url = self.source.forecast_url(coordinate);
        let body = self.http.get_json(&url).await?;
        Ok(self.source.parse_forecast(&body, FORECAST_ENTRIES)?)
    }

    pub async fn fetch_current(&self, coordinate: Coordinate) -> Result<ForecastPoint, FetchError> {
        debug_assert!(coordinate.is_valid(), "coordinate out of range: {coordinate:?}");

        let url = self.source.current_weather_url(coordinate);
        let body = self.http.get_json(&url).await?;
        Ok(self.source.parse_current(&body)?)
    }
}
