use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::{Display, Write};
use umbrella_core::{Forecast, ForecastPoint, Presenter, RETRY_DELAY};

const UNKNOWN_LOCATION: &str = "Your location";

/// Prints forecasts to stdout and problems to stderr.
#[derive(Debug, Default)]
pub struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn show_forecast(&mut self, forecast: &Forecast) {
        println!("{}", render_forecast(forecast, &Local));
    }

    fn show_fetch_failure(&mut self, placeholder: bool) {
        if placeholder {
            eprintln!("Check your network access...");
        }
        eprintln!("Could not fetch the forecast, retrying in {} s.", RETRY_DELAY.as_secs());
    }

    fn show_permission_lost(&mut self) {
        eprintln!(
            "Unknown location. umbrella needs your position: pass --lat/--lon \
             or store one with `umbrella configure`."
        );
    }
}

pub fn render_forecast<Tz>(forecast: &Forecast, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();

    let Some(now) = forecast.current() else {
        return out;
    };

    let _ = writeln!(out, "{}", forecast.location_name().unwrap_or(UNKNOWN_LOCATION));
    let _ = writeln!(out, "{:.1} °C, {} ({})", now.temperature, now.description, now.condition);

    for point in forecast.upcoming() {
        let _ = writeln!(out, "  {}", render_slot(point, tz));
    }

    out.trim_end().to_string()
}

pub fn render_point<Tz>(point: &ForecastPoint, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{}\n{} {:.1} °C, {} ({})",
        point.location_name.as_deref().unwrap_or(UNKNOWN_LOCATION),
        local_time(point.time, tz),
        point.temperature,
        point.description,
        point.condition,
    )
}

fn render_slot<Tz>(point: &ForecastPoint, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{}  {:<13} {:>6.1} °C",
        local_time(point.time, tz),
        point.condition,
        point.temperature
    )
}

fn local_time<Tz>(time: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.with_timezone(tz).format("%a %H:%M").to_string()
}
