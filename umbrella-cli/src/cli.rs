use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, Text, validator::Validation};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use umbrella_core::{
    Config, Coordinate, ForecastOutcome, OpenWeatherDataSource, ReqwestClient, Umbrella,
    WeatherFetcher,
};

use crate::{
    display::{TerminalPresenter, render_forecast, render_point},
    sensor::FixedLocationSensor,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "umbrella", version, about = "Do you need an umbrella today?")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and, optionally, a fixed location.
    Configure,

    /// Show the weather now and for the next three forecast slots.
    Forecast {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Show current conditions only.
    Current {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Keep showing the forecast, retrying after failures, until Ctrl-C.
    Watch {
        #[command(flatten)]
        location: LocationArgs,

        /// Fetch again every N seconds.
        #[arg(long, value_name = "SECS")]
        refresh: Option<u64>,
    },
}

/// Position override; falls back to the configured location.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lon: Option<f64>,
}

impl LocationArgs {
    fn resolve(&self, config: &Config) -> Result<Option<Coordinate>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Coordinate::checked(lat, lon)
                .map(Some)
                .ok_or_else(|| anyhow!("Location {lat}, {lon} is out of range")),
            _ => Ok(config.location),
        }
    }

    fn require(&self, config: &Config) -> Result<Coordinate> {
        self.resolve(config)?.ok_or_else(|| {
            anyhow!(
                "No location given.\n\
                 Hint: pass --lat and --lon, or run `umbrella configure` to store one."
            )
        })
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Forecast { location } => {
                let config = Config::load()?;
                let coordinate = location.require(&config)?;
                let (fetcher, _) = build_fetcher(&config)?;

                let forecast = fetcher
                    .fetch_forecast(coordinate)
                    .await
                    .context("Failed to fetch the forecast")?;
                println!("{}", render_forecast(&forecast, &Local));
                Ok(())
            }
            Command::Current { location } => {
                let config = Config::load()?;
                let coordinate = location.require(&config)?;
                let (fetcher, _) = build_fetcher(&config)?;

                let point = fetcher
                    .fetch_current(coordinate)
                    .await
                    .context("Failed to fetch current weather")?;
                println!("{}", render_point(&point, &Local));
                Ok(())
            }
            Command::Watch { location, refresh } => {
                let config = Config::load()?;
                let coordinate = location.resolve(&config)?;
                watch(&config, coordinate, refresh.map(Duration::from_secs)).await
            }
        }
    }
}

fn build_fetcher(config: &Config) -> Result<(WeatherFetcher, UnboundedReceiver<ForecastOutcome>)> {
    let source = OpenWeatherDataSource::from_config(config)?;
    let http = ReqwestClient::new().context("Failed to build HTTP client")?;
    Ok(WeatherFetcher::new(Arc::new(source), Arc::new(http)))
}

async fn watch(
    config: &Config,
    coordinate: Option<Coordinate>,
    refresh: Option<Duration>,
) -> Result<()> {
    let (fetcher, outcomes) = build_fetcher(config)?;
    let (events_tx, events) = unbounded_channel();
    let sensor = FixedLocationSensor::new(coordinate, events_tx);

    let (umbrella, handle) = Umbrella::new(sensor, events, fetcher, outcomes, TerminalPresenter);

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown();
        }
    });

    if let Some(period) = refresh.filter(|p| !p.is_zero()) {
        let refresher = handle.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if !refresher.refresh() {
                    break;
                }
            }
        });
    }

    umbrella.run().await;
    Ok(())
}

fn configure() -> Result<()> {
    let path = Config::config_file_path()?;
    let mut config = Config::load()?;

    let mut prompt = Text::new("OpenWeather API key:").with_validator(inquire::required!());
    if let Some(existing) = config.api_key.as_deref() {
        prompt = prompt.with_default(existing);
    }
    let api_key = prompt.prompt()?;
    config.set_api_key(api_key.trim().to_string());

    let store_location = Confirm::new("Store a fixed location for forecasts?")
        .with_default(config.location.is_some())
        .prompt()?;

    if store_location {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_validator(|value: &f64| {
                Ok(if (-90.0..=90.0).contains(value) {
                    Validation::Valid
                } else {
                    Validation::Invalid("Latitude must be between -90 and 90".into())
                })
            })
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_validator(|value: &f64| {
                Ok(if (-180.0..=180.0).contains(value) {
                    Validation::Valid
                } else {
                    Validation::Invalid("Longitude must be between -180 and 180".into())
                })
            })
            .prompt()?;
        config.set_location(Some(Coordinate::new(latitude, longitude)));
    } else {
        config.set_location(None);
    }

    config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}
