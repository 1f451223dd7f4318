use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A position on Earth in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate that is known to be in range.
    ///
    /// Out-of-range values are a caller bug and trip a debug assertion.
    /// Use [`Coordinate::checked`] for values coming from user input.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        let coordinate = Self { latitude, longitude };
        debug_assert!(coordinate.is_valid(), "coordinate out of range: {coordinate:?}");
        coordinate
    }

    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        let coordinate = Self { latitude, longitude };
        coordinate.is_valid().then_some(coordinate)
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Simplified weather categories the presentation layer knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Sunny,
    ClearNight,
    PartlyCloudy,
    Cloudy,
    Rain,
    Snow,
    Wind,
    Extreme,
    Atmosphere,
}

impl WeatherCondition {
    /// Classify an OpenWeather condition code.
    ///
    /// Codes are documented at <http://openweathermap.org/weather-conditions>.
    /// A code outside that table means the provider changed its contract, so it
    /// trips a debug assertion; release builds get `None`.
    pub fn from_code(code: i64, night: bool) -> Option<Self> {
        debug_assert!(code > 0 && code < 1000, "unexpected condition code {code}");

        match code {
            200..=531 => Some(Self::Rain),
            600..=622 => Some(Self::Snow),
            700..=781 => Some(Self::Atmosphere),
            800 if night => Some(Self::ClearNight),
            800 => Some(Self::Sunny),
            801 => Some(Self::PartlyCloudy),
            802..=804 => Some(Self::Cloudy),
            900..=962 => Some(Self::Extreme),
            _ => {
                debug_assert!(false, "unmapped condition code {code}");
                tracing::error!(code, "unmapped condition code");
                None
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::ClearNight => "clear night",
            Self::PartlyCloudy => "partly cloudy",
            Self::Cloudy => "cloudy",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Wind => "wind",
            Self::Extreme => "extreme",
            Self::Atmosphere => "atmosphere",
        }
    }
}

impl std::fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Fixed-hour day/night rule: night is before 07:00 or after 18:59.
pub fn is_night_hour(hour: u32) -> bool {
    hour < 7 || hour > 18
}

/// One time slot of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Only set on the first point of a series.
    pub location_name: Option<String>,
    pub time: DateTime<Utc>,
    pub condition: WeatherCondition,
    pub description: String,
    pub temperature: f64,
}

/// Ordered forecast points, first one being "now".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Forecast {
    points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn new(points: Vec<ForecastPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn current(&self) -> Option<&ForecastPoint> {
        self.points.first()
    }

    pub fn upcoming(&self) -> &[ForecastPoint] {
        self.points.get(1..).unwrap_or_default()
    }

    pub fn location_name(&self) -> Option<&str> {
        self.current().and_then(|p| p.location_name.as_deref())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_codes(codes: impl IntoIterator<Item = i64>, expected: WeatherCondition) {
        for code in codes {
            assert_eq!(
                WeatherCondition::from_code(code, false),
                Some(expected),
                "wrong mapping of code {code}"
            );
        }
    }

    #[test]
    fn rain_codes() {
        assert_codes(200..=531, WeatherCondition::Rain);
    }

    #[test]
    fn snow_codes() {
        assert_codes(600..=622, WeatherCondition::Snow);
    }

    #[test]
    fn atmosphere_codes() {
        assert_codes(700..=781, WeatherCondition::Atmosphere);
    }

    #[test]
    fn clear_sky_depends_on_night_flag() {
        assert_eq!(WeatherCondition::from_code(800, false), Some(WeatherCondition::Sunny));
        assert_eq!(WeatherCondition::from_code(800, true), Some(WeatherCondition::ClearNight));
    }

    #[test]
    fn cloud_codes() {
        assert_codes([801], WeatherCondition::PartlyCloudy);
        assert_codes(802..=804, WeatherCondition::Cloudy);
    }

    #[test]
    fn extreme_codes() {
        assert_codes(900..=962, WeatherCondition::Extreme);
    }

    #[test]
    fn night_flag_ignored_for_non_clear_codes() {
        assert_eq!(WeatherCondition::from_code(500, true), Some(WeatherCondition::Rain));
        assert_eq!(WeatherCondition::from_code(801, true), Some(WeatherCondition::PartlyCloudy));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "unexpected condition code")]
    fn zero_code_trips_assertion() {
        let _ = WeatherCondition::from_code(0, false);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "unmapped condition code")]
    fn gap_in_table_trips_assertion() {
        let _ = WeatherCondition::from_code(550, false);
    }

    #[test]
    fn night_hours() {
        assert!(is_night_hour(0));
        assert!(is_night_hour(6));
        assert!(!is_night_hour(7));
        assert!(!is_night_hour(18));
        assert!(is_night_hour(19));
        assert!(is_night_hour(23));
    }

    #[test]
    fn checked_coordinate_rejects_out_of_range() {
        assert!(Coordinate::checked(90.0, 180.0).is_some());
        assert!(Coordinate::checked(-90.0, -180.0).is_some());
        assert!(Coordinate::checked(90.5, 0.0).is_none());
        assert!(Coordinate::checked(0.0, -180.1).is_none());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "coordinate out of range")]
    fn new_coordinate_asserts_range() {
        let _ = Coordinate::new(91.0, 0.0);
    }

    #[test]
    fn forecast_accessors() {
        let point = |name: Option<&str>| ForecastPoint {
            location_name: name.map(str::to_string),
            time: Utc::now(),
            condition: WeatherCondition::Cloudy,
            description: "overcast clouds".into(),
            temperature: 3.5,
        };
        let forecast = Forecast::new(vec![point(Some("Prague")), point(None), point(None)]);

        assert_eq!(forecast.len(), 3);
        assert_eq!(forecast.location_name(), Some("Prague"));
        assert_eq!(forecast.upcoming().len(), 2);
        assert!(Forecast::default().upcoming().is_empty());
    }
}
