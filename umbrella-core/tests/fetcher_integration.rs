//! End-to-end forecast retrieval against a mock OpenWeather server.

use std::sync::Arc;

use serde_json::{Value, json};
use umbrella_core::{
    Coordinate, FORECAST_ENTRIES, FetchError, HttpClient, OpenWeatherDataSource, ParseError,
    ReqwestClient, WeatherCondition, WeatherFetcher,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn slot(dt: i64, temp: f64, id: i64, description: &str) -> Value {
    json!({
        "dt": dt,
        "main": { "temp": temp, "temp_min": temp - 1.0, "temp_max": temp + 1.0, "humidity": 80 },
        "weather": [{ "id": id, "main": "Weather", "description": description, "icon": "01d" }],
        "clouds": { "all": 0 },
        "wind": { "speed": 3.46, "deg": 56.0 },
        "sys": { "pod": "d" }
    })
}

fn forecast_reply() -> Value {
    json!({
        "cod": "200",
        "message": 0.0082,
        "cnt": 5,
        "city": {
            "id": 524901,
            "name": "Moscow",
            "coord": { "lat": 55.755, "lon": 37.62 },
            "country": "RU"
        },
        "list": [
            slot(1456164000, -2.5, 800, "clear sky"),
            slot(1456174800, -4.0, 800, "clear sky"),
            slot(1456185600, -5.5, 600, "light snow"),
            slot(1456196400, -6.0, 803, "broken clouds"),
            slot(1456207200, -6.5, 804, "overcast clouds"),
        ]
    })
}

fn fetcher_for(server: &MockServer) -> WeatherFetcher {
    let source = OpenWeatherDataSource::new("TEST_KEY".into())
        .with_base_url(format!("{}/data/", server.uri()))
        .with_night_rule(|_| false);
    let http = ReqwestClient::new().expect("client builds");
    let (fetcher, _outcomes) = WeatherFetcher::new(Arc::new(source), Arc::new(http));
    fetcher
}

const MOSCOW: Coordinate = Coordinate { latitude: 55.755, longitude: 37.62 };

#[tokio::test]
async fn forecast_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("lat", "55.755"))
        .and(query_param("lon", "37.62"))
        .and(query_param("APPID", "TEST_KEY"))
        .and(query_param("lang", "en"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_reply()))
        .expect(1)
        .mount(&server)
        .await;

    let forecast = fetcher_for(&server).fetch_forecast(MOSCOW).await.unwrap();

    assert_eq!(forecast.len(), FORECAST_ENTRIES);
    assert_eq!(forecast.location_name(), Some("Moscow"));
    assert_eq!(forecast.points()[2].condition, WeatherCondition::Snow);
    assert_eq!(forecast.points()[3].description, "broken clouds");
}

#[tokio::test]
async fn background_request_delivers_on_channel() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_reply()))
        .mount(&server)
        .await;

    let source = OpenWeatherDataSource::new("TEST_KEY".into())
        .with_base_url(format!("{}/data/", server.uri()));
    let http = ReqwestClient::new().unwrap();
    let (fetcher, mut outcomes) = WeatherFetcher::new(Arc::new(source), Arc::new(http));

    fetcher.request_forecast(MOSCOW);
    let outcome = outcomes.recv().await.expect("one outcome per request");

    assert_eq!(outcome.coordinate, MOSCOW);
    assert_eq!(outcome.result.unwrap().len(), FORECAST_ENTRIES);
}

#[tokio::test]
async fn server_error_is_network_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"cod":401, "message": "Invalid API key."}"#),
        )
        .mount(&server)
        .await;

    let err = fetcher_for(&server).fetch_forecast(MOSCOW).await.unwrap_err();

    assert!(err.is_network());
    match err {
        FetchError::Status { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_json_body_is_network_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captive portal</html>"))
        .mount(&server)
        .await;

    let err = fetcher_for(&server).fetch_forecast(MOSCOW).await.unwrap_err();

    assert!(matches!(err, FetchError::Decode(_)));
    assert!(err.is_network());
}

#[tokio::test]
async fn short_reply_is_insufficient_data() {
    let server = MockServer::start().await;

    let mut reply = forecast_reply();
    reply["cnt"] = json!(3);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .mount(&server)
        .await;

    let err = fetcher_for(&server).fetch_forecast(MOSCOW).await.unwrap_err();

    assert!(matches!(
        err,
        FetchError::Parse(ParseError::InsufficientData { available: 3, requested: 4 })
    ));
    assert!(!err.is_network());
}

#[tokio::test]
async fn current_weather_round_trip() {
    let server = MockServer::start().await;

    let mut reply = slot(1456164000, 20.1, 803, "broken clouds");
    reply["name"] = json!("Moscow");

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "55.755"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .expect(1)
        .mount(&server)
        .await;

    let point = fetcher_for(&server).fetch_current(MOSCOW).await.unwrap();

    assert_eq!(point.location_name.as_deref(), Some("Moscow"));
    assert_eq!(point.condition, WeatherCondition::Cloudy);
}

#[tokio::test]
async fn reqwest_client_decodes_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let client = ReqwestClient::new().unwrap();
    let body = client.get_json(&format!("{}/ping", server.uri())).await.unwrap();

    assert_eq!(body, json!({ "ok": true }));
}
