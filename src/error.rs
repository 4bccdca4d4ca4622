use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weather::provider::Variable;
use crate::weather::time_axis::TimeAxisError;

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("Sorry, I couldn't find \"{city}\"")]
    NotFound { city: String },
    #[error("Geocoding failed (HTTP {status})")]
    Status { status: u16 },
    #[error("Geocoding request failed: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("weather provider responded with HTTP {status}")]
    Status { status: u16 },
    #[error("weather provider request failed: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },
    #[error("weather provider response has no {block} block")]
    MissingBlock { block: &'static str },
    #[error("weather provider response is missing {block} variable {variable}")]
    MissingVariable {
        block: &'static str,
        variable: Variable,
    },
    #[error("invalid hourly data: {source}")]
    TimeAxis {
        #[from]
        source: TimeAxisError,
    },
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Failed to fetch {operation}: {source}")]
    Fetch {
        operation: &'static str,
        source: ProviderError,
    },
}

/// Anything a request handler can fail with.
///
/// Every failure is reported to the client with the same envelope. All
/// upstream failures are `500`, including a city that could not be found.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error("Invalid city name: {}", .source.body_text())]
    InvalidCity {
        #[from]
        source: PathRejection,
    },
    #[error("Route not found")]
    RouteNotFound,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Geocoding(_) | ApiError::Weather(_) | ApiError::InvalidCity { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Error encountered while processing request: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }
        let envelope = FailureEnvelope {
            success: false,
            error: self.to_string(),
        };
        (status, Json(envelope)).into_response()
    }
}
