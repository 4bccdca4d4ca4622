use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::handler::HandlerWithoutStateExt;
use axum::{Router, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ApiError;
use crate::geocoding::{Geocoder, OpenMeteoGeocoder};
use crate::routes::{health, weather};
use crate::weather::provider::OpenMeteoForecast;
use crate::weather::{FetchStrategy, WeatherService};

// Anything that goes in here must be a handle or pointer that can be cloned.
// The underlying state itself should be shared.
#[derive(Clone)]
pub struct AppState {
    pub geocoder: Arc<dyn Geocoder>,
    pub weather: WeatherService,
    pub legacy_fetch: FetchStrategy,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        weather: WeatherService,
        legacy_fetch: FetchStrategy,
    ) -> AppState {
        AppState {
            geocoder,
            weather,
            legacy_fetch,
            started_at: Instant::now(),
        }
    }
}

/// Wires the Open-Meteo services described by `config`.
pub fn create_state(config: &Config) -> reqwest::Result<AppState> {
    let http = config.http_client()?;
    let geocoder = OpenMeteoGeocoder::new(http.clone(), config.geocoding_url.clone());
    let forecast = OpenMeteoForecast::new(http, config.forecast_url.clone());
    Ok(AppState::new(
        Arc::new(geocoder),
        WeatherService::new(Arc::new(forecast)),
        config.legacy_fetch,
    ))
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

pub fn create_app(state: AppState, assets_path: &Path) -> Router {
    log::debug!("serving assets from {}", assets_path.display());
    let assets_service = ServeDir::new(assets_path).not_found_service(route_not_found.into_service());

    Router::new()
        .route("/api/health", get(health::get_health))
        .nest("/api/weather", weather::routes())
        .with_state(state)
        .fallback_service(assets_service)
        .layer(TraceLayer::new_for_http())
}
