use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::weather::time_axis::span_of_column;

pub const HOURLY_INTERVAL_SECONDS: i64 = 3600;

/// A weather variable that can be requested from the forecast provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    Temperature2m,
    RelativeHumidity2m,
    WindSpeed10m,
    WeatherCode,
}

impl Variable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Temperature2m => "temperature_2m",
            Variable::RelativeHumidity2m => "relative_humidity_2m",
            Variable::WindSpeed10m => "wind_speed_10m",
            Variable::WeatherCode => "weather_code",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub current: Vec<Variable>,
    pub hourly: Vec<Variable>,
}

impl ForecastRequest {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        ForecastRequest {
            latitude,
            longitude,
            current: Vec::new(),
            hourly: Vec::new(),
        }
    }

    pub fn with_current(mut self, variables: &[Variable]) -> Self {
        self.current = variables.to_vec();
        self
    }

    pub fn with_hourly(mut self, variables: &[Variable]) -> Self {
        self.hourly = variables.to_vec();
        self
    }
}

/// Single point readings keyed by the variable that was requested.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurrentBlock {
    pub values: HashMap<Variable, f64>,
}

impl CurrentBlock {
    pub fn value(&self, variable: Variable) -> Result<f64, ProviderError> {
        self.values
            .get(&variable)
            .copied()
            .ok_or(ProviderError::MissingVariable {
                block: "current",
                variable,
            })
    }
}

/// Hourly series as a time block (start, end, interval) plus one flat value
/// array per requested variable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HourlyBlock {
    pub time: i64,
    pub time_end: i64,
    pub interval: i64,
    pub values: HashMap<Variable, Vec<Option<f64>>>,
}

impl HourlyBlock {
    pub fn values(&self, variable: Variable) -> Result<&[Option<f64>], ProviderError> {
        self.values
            .get(&variable)
            .map(Vec::as_slice)
            .ok_or(ProviderError::MissingVariable {
                block: "hourly",
                variable,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub timezone: String,
    pub utc_offset_seconds: i32,
    pub current: Option<CurrentBlock>,
    pub hourly: Option<HourlyBlock>,
}

impl ForecastResponse {
    pub fn current(&self) -> Result<&CurrentBlock, ProviderError> {
        self.current
            .as_ref()
            .ok_or(ProviderError::MissingBlock { block: "current" })
    }

    pub fn hourly(&self) -> Result<&HourlyBlock, ProviderError> {
        self.hourly
            .as_ref()
            .ok_or(ProviderError::MissingBlock { block: "hourly" })
    }
}

#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct WireForecast {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    elevation: f64,
    #[serde(default)]
    timezone: String,
    #[serde(default)]
    utc_offset_seconds: i32,
    current: Option<HashMap<String, Option<f64>>>,
    hourly: Option<WireHourly>,
}

#[derive(Debug, Deserialize)]
struct WireHourly {
    time: Vec<i64>,
    #[serde(flatten)]
    series: HashMap<String, Vec<Option<f64>>>,
}

impl WireForecast {
    /// Picks out exactly the variables named in `request`, in request order.
    fn into_response(self, request: &ForecastRequest) -> Result<ForecastResponse, ProviderError> {
        let current = if request.current.is_empty() {
            None
        } else {
            let block = self
                .current
                .ok_or(ProviderError::MissingBlock { block: "current" })?;
            let mut values = HashMap::new();
            for &variable in &request.current {
                let value = block.get(variable.as_str()).copied().flatten().ok_or(
                    ProviderError::MissingVariable {
                        block: "current",
                        variable,
                    },
                )?;
                values.insert(variable, value);
            }
            Some(CurrentBlock { values })
        };

        let hourly = if request.hourly.is_empty() {
            None
        } else {
            let mut block = self
                .hourly
                .ok_or(ProviderError::MissingBlock { block: "hourly" })?;
            let (time, time_end, interval) = span_of_column(&block.time, HOURLY_INTERVAL_SECONDS)?;
            let mut values = HashMap::new();
            for &variable in &request.hourly {
                let series = block.series.remove(variable.as_str()).ok_or(
                    ProviderError::MissingVariable {
                        block: "hourly",
                        variable,
                    },
                )?;
                values.insert(variable, series);
            }
            Some(HourlyBlock {
                time,
                time_end,
                interval,
                values,
            })
        };

        Ok(ForecastResponse {
            latitude: self.latitude,
            longitude: self.longitude,
            elevation: self.elevation,
            timezone: self.timezone,
            utc_offset_seconds: self.utc_offset_seconds,
            current,
            hourly,
        })
    }
}

fn join_variables(variables: &[Variable]) -> String {
    variables
        .iter()
        .map(Variable::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Open-Meteo forecast API, queried as JSON with unix timestamps.
#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    http: Client,
    url: String,
}

impl OpenMeteoForecast {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        OpenMeteoForecast {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoForecast {
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse, ProviderError> {
        let mut query = vec![
            ("latitude", request.latitude.to_string()),
            ("longitude", request.longitude.to_string()),
        ];
        if !request.hourly.is_empty() {
            query.push(("hourly", join_variables(&request.hourly)));
        }
        if !request.current.is_empty() {
            query.push(("current", join_variables(&request.current)));
        }
        query.push(("timezone", "auto".to_string()));
        query.push(("timeformat", "unixtime".to_string()));

        debug!(
            "Requesting forecast for ({}, {}) current=[{}] hourly=[{}]",
            request.latitude,
            request.longitude,
            join_variables(&request.current),
            join_variables(&request.hourly)
        );

        let response = self.http.get(&self.url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
            });
        }
        let wire: WireForecast = response.json().await?;
        wire.into_response(request)
    }
}
