//! The weather views served under `/api/weather`.
//!
//! Every view resolves the city first and then fetches only what it shows.
//! When a view needs several fetches they run concurrently, and the view fails
//! as a whole if any one of them fails.

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::{Json, Router, routing::get};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::geocoding::City;
use crate::weather::{CurrentConditions, HourlyData, LocationInfo};
use crate::weather_codes::weather_description;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/temperature/{city}", get(get_temperature))
        .route("/humidity/{city}", get(get_humidity))
        .route("/wind/{city}", get(get_wind))
        .route("/elevation/{city}", get(get_elevation))
        .route("/{city}", get(get_all))
}

#[derive(Serialize, Debug)]
pub struct Envelope<C, W> {
    pub success: bool,
    pub city: C,
    pub weather: W,
}

impl<C, W> Envelope<C, W> {
    fn ok(city: C, weather: W) -> Json<Self> {
        Json(Envelope {
            success: true,
            city,
            weather,
        })
    }
}

#[derive(Serialize, Debug)]
pub struct CityName {
    pub name: String,
    pub country: String,
}

impl From<City> for CityName {
    fn from(city: City) -> Self {
        CityName {
            name: city.name,
            country: city.country,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct View<C, H> {
    pub current: C,
    pub hourly: H,
}

#[derive(Serialize, Debug)]
pub struct TemperatureNow {
    /// Rounded to whole degrees.
    pub temperature: i64,
    pub description: &'static str,
}

#[derive(Serialize, Debug)]
pub struct TemperatureHourly {
    pub time: Vec<DateTime<Utc>>,
    pub temperature_2m: Vec<Option<f64>>,
}

#[derive(Serialize, Debug)]
pub struct HumidityNow {
    pub humidity: f64,
}

#[derive(Serialize, Debug)]
pub struct HumidityHourly {
    pub time: Vec<DateTime<Utc>>,
    pub relative_humidity_2m: Vec<Option<f64>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WindNow {
    pub wind_speed: f64,
}

#[derive(Serialize, Debug)]
pub struct WindHourly {
    pub time: Vec<DateTime<Utc>>,
    pub wind_speed_10m: Vec<Option<f64>>,
}

#[derive(Serialize, Debug)]
pub struct ElevationView {
    pub location: Elevation,
}

#[derive(Serialize, Debug)]
pub struct Elevation {
    pub elevation: f64,
}

#[derive(Serialize, Debug)]
pub struct FullCurrent {
    #[serde(flatten)]
    pub conditions: CurrentConditions,
    pub description: &'static str,
}

#[derive(Serialize, Debug)]
pub struct FullView {
    pub location: LocationInfo,
    pub current: FullCurrent,
    pub hourly: HourlyData,
}

type ViewResult<C, W> = Result<Json<Envelope<C, W>>, ApiError>;

/// The percent decoded `{city}` segment. Undecodable segments are reported
/// with the usual failure envelope.
pub struct CityPath(pub String);

impl<S> FromRequestParts<S> for CityPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(city_name) = Path::<String>::from_request_parts(parts, state).await?;
        Ok(CityPath(city_name))
    }
}

/// Rounds halves towards positive infinity, so -2.5 becomes -2.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

async fn get_temperature(
    State(state): State<AppState>,
    CityPath(city_name): CityPath,
) -> ViewResult<CityName, View<TemperatureNow, TemperatureHourly>> {
    debug!("Temperature view for {}", city_name);
    let city = state.geocoder.resolve(&city_name).await?;
    let (now, forecast) = tokio::try_join!(
        state
            .weather
            .get_current_weather(city.latitude, city.longitude),
        state
            .weather
            .get_temperature_forecast(city.latitude, city.longitude),
    )?;

    Ok(Envelope::ok(
        city.into(),
        View {
            current: TemperatureNow {
                temperature: round_half_up(now.current.temperature),
                description: weather_description(now.current.weather_code),
            },
            hourly: TemperatureHourly {
                time: forecast.hourly.time,
                temperature_2m: forecast.hourly.values,
            },
        },
    ))
}

async fn get_humidity(
    State(state): State<AppState>,
    CityPath(city_name): CityPath,
) -> ViewResult<CityName, View<HumidityNow, HumidityHourly>> {
    debug!("Humidity view for {}", city_name);
    let city = state.geocoder.resolve(&city_name).await?;
    let (now, forecast) = tokio::try_join!(
        state
            .weather
            .get_current_weather(city.latitude, city.longitude),
        state
            .weather
            .get_humidity_forecast(city.latitude, city.longitude),
    )?;

    Ok(Envelope::ok(
        city.into(),
        View {
            current: HumidityNow {
                humidity: now.current.humidity,
            },
            hourly: HumidityHourly {
                time: forecast.hourly.time,
                relative_humidity_2m: forecast.hourly.values,
            },
        },
    ))
}

async fn get_wind(
    State(state): State<AppState>,
    CityPath(city_name): CityPath,
) -> ViewResult<CityName, View<WindNow, WindHourly>> {
    debug!("Wind view for {}", city_name);
    let city = state.geocoder.resolve(&city_name).await?;
    let (now, forecast) = tokio::try_join!(
        state
            .weather
            .get_current_weather(city.latitude, city.longitude),
        state
            .weather
            .get_wind_forecast(city.latitude, city.longitude),
    )?;

    Ok(Envelope::ok(
        city.into(),
        View {
            current: WindNow {
                wind_speed: now.current.wind_speed,
            },
            hourly: WindHourly {
                time: forecast.hourly.time,
                wind_speed_10m: forecast.hourly.values,
            },
        },
    ))
}

async fn get_elevation(
    State(state): State<AppState>,
    CityPath(city_name): CityPath,
) -> ViewResult<CityName, ElevationView> {
    debug!("Elevation view for {}", city_name);
    let city = state.geocoder.resolve(&city_name).await?;
    let data = state
        .weather
        .get_location_data(city.latitude, city.longitude)
        .await?;

    Ok(Envelope::ok(
        city.into(),
        ElevationView {
            location: Elevation {
                elevation: data.location.elevation,
            },
        },
    ))
}

/// Everything at once; the city also carries its coordinates.
async fn get_all(
    State(state): State<AppState>,
    CityPath(city_name): CityPath,
) -> ViewResult<City, FullView> {
    debug!("Full weather for {} ({:?})", city_name, state.legacy_fetch);
    let city = state.geocoder.resolve(&city_name).await?;
    let data = state
        .weather
        .get_full_weather(city.latitude, city.longitude, state.legacy_fetch)
        .await?;

    Ok(Envelope::ok(
        city,
        FullView {
            location: data.location,
            current: FullCurrent {
                description: weather_description(data.current.weather_code),
                conditions: data.current,
            },
            hourly: data.hourly,
        },
    ))
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{self, Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::round_half_up;
    use crate::app::{AppState, create_app};
    use crate::test_support::{StubForecast, StubGeocoder};
    use crate::weather::provider::Variable;
    use crate::weather::{FetchStrategy, WeatherService};

    fn state_with(
        geocoder: StubGeocoder,
        forecast: StubForecast,
        legacy_fetch: FetchStrategy,
    ) -> (AppState, Arc<StubForecast>) {
        let forecast = Arc::new(forecast);
        let state = AppState::new(
            Arc::new(geocoder),
            WeatherService::new(forecast.clone()),
            legacy_fetch,
        );
        (state, forecast)
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
        let app = create_app(state, Path::new("no-assets"));
        let response = app
            .oneshot(
                Request::builder()
                    .method(http::Method::GET)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn keys(value: &Value) -> BTreeSet<&str> {
        value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect()
    }

    fn paris_times() -> Value {
        json!([
            "2024-06-10T00:00:00Z",
            "2024-06-10T01:00:00Z",
            "2024-06-10T02:00:00Z",
            "2024-06-10T03:00:00Z",
            "2024-06-10T04:00:00Z",
            "2024-06-10T05:00:00Z"
        ])
    }

    #[tokio::test]
    async fn temperature_view() {
        let (state, forecast) = state_with(
            StubGeocoder::paris(),
            StubForecast::paris(),
            FetchStrategy::Combined,
        );
        let (status, body) = get(state, "/api/weather/temperature/Paris").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "city": {"name": "Paris", "country": "France"},
                "weather": {
                    "current": {"temperature": 18, "description": "Partly cloudy"},
                    "hourly": {
                        "time": paris_times(),
                        "temperature_2m": [17.1, 17.6, 18.4, 19.0, 19.3, 18.8]
                    }
                }
            })
        );
        // Current conditions and the forecast are separate requests.
        assert_eq!(forecast.requests().len(), 2);
    }

    #[tokio::test]
    async fn humidity_view_shows_only_humidity() {
        let (state, _) = state_with(
            StubGeocoder::paris(),
            StubForecast::paris(),
            FetchStrategy::Combined,
        );
        let (status, body) = get(state, "/api/weather/humidity/paris").await;

        assert_eq!(status, StatusCode::OK);
        let weather = &body["weather"];
        assert_eq!(weather["current"], json!({"humidity": 64.0}));
        assert_eq!(
            keys(&weather["hourly"]),
            BTreeSet::from(["time", "relative_humidity_2m"])
        );
        assert_eq!(weather["hourly"]["time"], paris_times());
    }

    #[tokio::test]
    async fn wind_view_shows_only_wind() {
        let (state, _) = state_with(
            StubGeocoder::paris(),
            StubForecast::paris(),
            FetchStrategy::Combined,
        );
        let (status, body) = get(state, "/api/weather/wind/Paris").await;

        assert_eq!(status, StatusCode::OK);
        let weather = &body["weather"];
        assert_eq!(weather["current"], json!({"windSpeed": 11.2}));
        assert_eq!(
            weather["hourly"]["wind_speed_10m"],
            json!([9.5, 10.1, 11.2, null, 12.0, 11.7])
        );
        assert_eq!(
            keys(&weather["hourly"]),
            BTreeSet::from(["time", "wind_speed_10m"])
        );
    }

    #[tokio::test]
    async fn elevation_view_shows_only_elevation() {
        let (state, forecast) = state_with(
            StubGeocoder::paris(),
            StubForecast::paris(),
            FetchStrategy::Combined,
        );
        let (status, body) = get(state, "/api/weather/elevation/Paris").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["weather"], json!({"location": {"elevation": 43.0}}));
        let requests = forecast.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].current.is_empty() && requests[0].hourly.is_empty());
    }

    async fn check_full_view(legacy_fetch: FetchStrategy, expected_requests: usize) {
        let (state, forecast) = state_with(
            StubGeocoder::paris(),
            StubForecast::paris(),
            legacy_fetch,
        );
        let (status, body) = get(state, "/api/weather/Paris").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["city"],
            json!({"name": "Paris", "country": "France", "latitude": 48.85, "longitude": 2.35})
        );
        let weather = &body["weather"];
        assert_eq!(
            weather["location"],
            json!({
                "latitude": 48.86,
                "longitude": 2.34,
                "elevation": 43.0,
                "timezone": "Europe/Paris",
                "utcOffsetSeconds": 0
            })
        );
        assert_eq!(
            weather["current"],
            json!({
                "temperature": 18.4,
                "humidity": 64.0,
                "windSpeed": 11.2,
                "weatherCode": 2,
                "description": "Partly cloudy"
            })
        );
        assert_eq!(
            keys(&weather["hourly"]),
            BTreeSet::from([
                "time",
                "temperature_2m",
                "relative_humidity_2m",
                "wind_speed_10m"
            ])
        );
        assert_eq!(forecast.requests().len(), expected_requests);
    }

    #[tokio::test]
    async fn full_view_combined() {
        check_full_view(FetchStrategy::Combined, 1).await;
    }

    #[tokio::test]
    async fn full_view_split() {
        check_full_view(FetchStrategy::Split, 4).await;
    }

    #[tokio::test]
    async fn city_names_are_percent_decoded() {
        let mut geocoder = StubGeocoder::paris();
        geocoder.cities[0].name = "New York".to_string();
        geocoder.cities[0].country = "United States".to_string();
        let (state, _) = state_with(geocoder, StubForecast::paris(), FetchStrategy::Combined);
        let (status, body) = get(state, "/api/weather/elevation/New%20York").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["city"]["name"], "New York");
    }

    #[tokio::test]
    async fn unknown_city_fails_with_its_name() {
        let (state, forecast) = state_with(
            StubGeocoder::paris(),
            StubForecast::paris(),
            FetchStrategy::Combined,
        );
        let (status, body) = get(state, "/api/weather/temperature/Atlantis").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Atlantis"));
        assert!(forecast.requests().is_empty());
    }

    #[tokio::test]
    async fn geocoding_status_is_reported() {
        let mut geocoder = StubGeocoder::paris();
        geocoder.status = Some(429);
        let (state, _) = state_with(geocoder, StubForecast::paris(), FetchStrategy::Combined);
        let (status, body) = get(state, "/api/weather/Paris").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"success": false, "error": "Geocoding failed (HTTP 429)"})
        );
    }

    #[tokio::test]
    async fn failed_forecast_fails_the_whole_view() {
        let mut forecast = StubForecast::paris();
        forecast.fail_hourly = Some(Variable::Temperature2m);
        let (state, _) = state_with(StubGeocoder::paris(), forecast, FetchStrategy::Combined);
        let (status, body) = get(state, "/api/weather/temperature/Paris").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": "Failed to fetch temperature forecast: weather provider responded with HTTP 503"
            })
        );
    }

    #[tokio::test]
    async fn failed_current_conditions_fail_the_whole_view() {
        let mut forecast = StubForecast::paris();
        forecast.fail_current = true;
        let (state, _) = state_with(StubGeocoder::paris(), forecast, FetchStrategy::Split);

        for uri in [
            "/api/weather/humidity/Paris",
            "/api/weather/wind/Paris",
            "/api/weather/Paris",
        ] {
            let (status, body) = get(state.clone(), uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert!(body.get("weather").is_none(), "{uri}");
            assert_eq!(
                body["error"],
                "Failed to fetch current weather: weather provider responded with HTTP 503"
            );
        }
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(round_half_up(18.4), 18);
        assert_eq!(round_half_up(18.5), 19);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
    }

    #[tokio::test]
    async fn negative_half_degrees_round_up() {
        let mut forecast = StubForecast::paris();
        forecast.current.insert(Variable::Temperature2m, -2.5);
        let (state, _) = state_with(StubGeocoder::paris(), forecast, FetchStrategy::Combined);
        let (status, body) = get(state, "/api/weather/temperature/Paris").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["weather"]["current"]["temperature"], json!(-2));
    }

    #[tokio::test]
    async fn undecodable_city_uses_the_failure_envelope() {
        let (state, forecast) = state_with(
            StubGeocoder::paris(),
            StubForecast::paris(),
            FetchStrategy::Combined,
        );
        for uri in [
            "/api/weather/temperature/%FF",
            "/api/weather/humidity/%FF",
            "/api/weather/wind/%FF",
            "/api/weather/elevation/%FF",
            "/api/weather/%FF",
        ] {
            let (status, body) = get(state.clone(), uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(body["success"], false, "{uri}");
            assert!(
                body["error"]
                    .as_str()
                    .unwrap()
                    .starts_with("Invalid city name:"),
                "{uri}"
            );
        }
        assert!(forecast.requests().is_empty());
    }

    #[tokio::test]
    async fn unmatched_routes_are_404() {
        let (state, _) = state_with(
            StubGeocoder::paris(),
            StubForecast::paris(),
            FetchStrategy::Combined,
        );
        let (status, body) = get(state, "/api/weather/temperature/Paris/extra").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"success": false, "error": "Route not found"}));
    }
}
