//! In-process stand-ins for the geocoding and forecast services.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{GeocodingError, ProviderError};
use crate::geocoding::{City, Geocoder};
use crate::weather::provider::{
    CurrentBlock, ForecastProvider, ForecastRequest, ForecastResponse, HourlyBlock, Variable,
};

/// 2024-06-10T00:00:00Z
pub const PARIS_START: i64 = 1_717_977_600;

pub struct StubGeocoder {
    pub cities: Vec<City>,
    pub status: Option<u16>,
}

impl StubGeocoder {
    pub fn paris() -> Self {
        StubGeocoder {
            cities: vec![City {
                name: "Paris".to_string(),
                country: "France".to_string(),
                latitude: 48.85,
                longitude: 2.35,
            }],
            status: None,
        }
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn resolve(&self, city_name: &str) -> Result<City, GeocodingError> {
        if let Some(status) = self.status {
            return Err(GeocodingError::Status { status });
        }
        self.cities
            .iter()
            .find(|city| city.name.eq_ignore_ascii_case(city_name))
            .cloned()
            .ok_or_else(|| GeocodingError::NotFound {
                city: city_name.to_string(),
            })
    }
}

/// Answers every request with the requested subset of fixed data and records
/// what was asked for.
pub struct StubForecast {
    pub start: i64,
    pub steps: usize,
    pub utc_offset_seconds: i32,
    pub current: HashMap<Variable, f64>,
    pub hourly: HashMap<Variable, Vec<Option<f64>>>,
    pub fail_current: bool,
    pub fail_hourly: Option<Variable>,
    requests: Mutex<Vec<ForecastRequest>>,
}

impl StubForecast {
    /// Paris with six hourly samples starting at [`PARIS_START`] and no UTC
    /// offset applied.
    pub fn paris() -> Self {
        StubForecast {
            start: PARIS_START,
            steps: 6,
            utc_offset_seconds: 0,
            current: HashMap::from([
                (Variable::Temperature2m, 18.4),
                (Variable::RelativeHumidity2m, 64.0),
                (Variable::WindSpeed10m, 11.2),
                (Variable::WeatherCode, 2.0),
            ]),
            hourly: HashMap::from([
                (
                    Variable::Temperature2m,
                    vec![Some(17.1), Some(17.6), Some(18.4), Some(19.0), Some(19.3), Some(18.8)],
                ),
                (
                    Variable::RelativeHumidity2m,
                    vec![Some(70.0), Some(68.0), Some(64.0), Some(60.0), Some(58.0), Some(61.0)],
                ),
                (
                    Variable::WindSpeed10m,
                    vec![Some(9.5), Some(10.1), Some(11.2), None, Some(12.0), Some(11.7)],
                ),
            ]),
            fail_current: false,
            fail_hourly: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ForecastRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForecastProvider for StubForecast {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        let fails_current = self.fail_current && !request.current.is_empty();
        let fails_hourly = self
            .fail_hourly
            .is_some_and(|variable| request.hourly.contains(&variable));
        if fails_current || fails_hourly {
            return Err(ProviderError::Status { status: 503 });
        }

        let current = (!request.current.is_empty()).then(|| CurrentBlock {
            values: request
                .current
                .iter()
                .filter_map(|variable| Some((*variable, *self.current.get(variable)?)))
                .collect(),
        });
        let hourly = (!request.hourly.is_empty()).then(|| HourlyBlock {
            time: self.start,
            time_end: self.start + self.steps as i64 * 3600,
            interval: 3600,
            values: request
                .hourly
                .iter()
                .filter_map(|variable| Some((*variable, self.hourly.get(variable)?.clone())))
                .collect(),
        });

        Ok(ForecastResponse {
            latitude: 48.86,
            longitude: 2.34,
            elevation: 43.0,
            timezone: "Europe/Paris".to_string(),
            utc_offset_seconds: self.utc_offset_seconds,
            current,
            hourly,
        })
    }
}
