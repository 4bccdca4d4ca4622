use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, WeatherError};
use crate::weather::provider::{ForecastProvider, ForecastRequest, ForecastResponse, Variable};
use crate::weather::time_axis::{check_series_length, time_axis};

pub mod provider;
pub mod time_axis;

const CURRENT_VARIABLES: [Variable; 4] = [
    Variable::Temperature2m,
    Variable::RelativeHumidity2m,
    Variable::WindSpeed10m,
    Variable::WeatherCode,
];

const HOURLY_VARIABLES: [Variable; 3] = [
    Variable::Temperature2m,
    Variable::RelativeHumidity2m,
    Variable::WindSpeed10m,
];

/// How the full weather report is assembled.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// One request asking for every variable.
    #[default]
    Combined,
    /// Current conditions and each forecast as separate concurrent requests.
    Split,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub timezone: String,
    pub utc_offset_seconds: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub weather_code: i32,
}

/// One hourly variable with its reconstructed time axis. `time[i]` belongs to
/// `values[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    pub variable: Variable,
    pub time: Vec<DateTime<Utc>>,
    pub values: Vec<Option<f64>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HourlyData {
    pub time: Vec<DateTime<Utc>>,
    pub temperature_2m: Vec<Option<f64>>,
    pub relative_humidity_2m: Vec<Option<f64>>,
    pub wind_speed_10m: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub location: LocationInfo,
    pub current: CurrentConditions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub location: LocationInfo,
    pub hourly: HourlySeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationData {
    pub location: LocationInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherData {
    pub location: LocationInfo,
    pub current: CurrentConditions,
    pub hourly: HourlyData,
}

fn shape_location(response: &ForecastResponse) -> LocationInfo {
    LocationInfo {
        latitude: response.latitude,
        longitude: response.longitude,
        elevation: response.elevation,
        timezone: response.timezone.clone(),
        utc_offset_seconds: response.utc_offset_seconds,
    }
}

fn shape_current(response: &ForecastResponse) -> Result<CurrentConditions, ProviderError> {
    let current = response.current()?;
    Ok(CurrentConditions {
        temperature: current.value(Variable::Temperature2m)?,
        humidity: current.value(Variable::RelativeHumidity2m)?,
        wind_speed: current.value(Variable::WindSpeed10m)?,
        weather_code: current.value(Variable::WeatherCode)?.round() as i32,
    })
}

fn shape_time(response: &ForecastResponse) -> Result<Vec<DateTime<Utc>>, ProviderError> {
    let hourly = response.hourly()?;
    Ok(time_axis(
        hourly.time,
        hourly.time_end,
        hourly.interval,
        response.utc_offset_seconds,
    )?)
}

fn shape_values(
    response: &ForecastResponse,
    variable: Variable,
    steps: usize,
) -> Result<Vec<Option<f64>>, ProviderError> {
    let values = response.hourly()?.values(variable)?;
    check_series_length(variable, values.len(), steps)?;
    Ok(values.to_vec())
}

fn shape_series(
    response: &ForecastResponse,
    variable: Variable,
) -> Result<HourlySeries, ProviderError> {
    let time = shape_time(response)?;
    let values = shape_values(response, variable, time.len())?;
    Ok(HourlySeries {
        variable,
        time,
        values,
    })
}

/// Fetches weather for a pair of coordinates and reshapes the provider
/// response into plain records.
///
/// Each operation sends its own request asking only for the variables it
/// needs.
#[derive(Clone)]
pub struct WeatherService {
    provider: Arc<dyn ForecastProvider>,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn ForecastProvider>) -> Self {
        WeatherService { provider }
    }

    async fn fetch<T>(
        &self,
        operation: &'static str,
        request: ForecastRequest,
        shape: impl FnOnce(&ForecastResponse) -> Result<T, ProviderError>,
    ) -> Result<T, WeatherError> {
        self.provider
            .forecast(&request)
            .await
            .and_then(|response| shape(&response))
            .map_err(|source| WeatherError::Fetch { operation, source })
    }

    pub async fn get_current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentWeather, WeatherError> {
        let request = ForecastRequest::new(latitude, longitude).with_current(&CURRENT_VARIABLES);
        self.fetch("current weather", request, |response| {
            Ok(CurrentWeather {
                location: shape_location(response),
                current: shape_current(response)?,
            })
        })
        .await
    }

    async fn get_forecast(
        &self,
        operation: &'static str,
        variable: Variable,
        latitude: f64,
        longitude: f64,
    ) -> Result<Forecast, WeatherError> {
        let request = ForecastRequest::new(latitude, longitude).with_hourly(&[variable]);
        self.fetch(operation, request, |response| {
            Ok(Forecast {
                location: shape_location(response),
                hourly: shape_series(response, variable)?,
            })
        })
        .await
    }

    pub async fn get_temperature_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Forecast, WeatherError> {
        self.get_forecast(
            "temperature forecast",
            Variable::Temperature2m,
            latitude,
            longitude,
        )
        .await
    }

    pub async fn get_humidity_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Forecast, WeatherError> {
        self.get_forecast(
            "humidity forecast",
            Variable::RelativeHumidity2m,
            latitude,
            longitude,
        )
        .await
    }

    pub async fn get_wind_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Forecast, WeatherError> {
        self.get_forecast("wind forecast", Variable::WindSpeed10m, latitude, longitude)
            .await
    }

    /// Position and elevation only; no current or hourly variables.
    pub async fn get_location_data(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<LocationData, WeatherError> {
        let request = ForecastRequest::new(latitude, longitude);
        self.fetch("location data", request, |response| {
            Ok(LocationData {
                location: shape_location(response),
            })
        })
        .await
    }

    /// Current conditions and all hourly series in a single request.
    pub async fn get_weather_data(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherData, WeatherError> {
        let request = ForecastRequest::new(latitude, longitude)
            .with_current(&CURRENT_VARIABLES)
            .with_hourly(&HOURLY_VARIABLES);
        self.fetch("weather data", request, |response| {
            let time = shape_time(response)?;
            let steps = time.len();
            Ok(WeatherData {
                location: shape_location(response),
                current: shape_current(response)?,
                hourly: HourlyData {
                    temperature_2m: shape_values(response, Variable::Temperature2m, steps)?,
                    relative_humidity_2m: shape_values(
                        response,
                        Variable::RelativeHumidity2m,
                        steps,
                    )?,
                    wind_speed_10m: shape_values(response, Variable::WindSpeed10m, steps)?,
                    time,
                },
            })
        })
        .await
    }

    /// Same result as [`WeatherService::get_weather_data`], assembled from
    /// four concurrent narrow requests. Fails as soon as any of them fails.
    pub async fn get_weather_data_split(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherData, WeatherError> {
        let (current, temperature, humidity, wind) = tokio::try_join!(
            self.get_current_weather(latitude, longitude),
            self.get_temperature_forecast(latitude, longitude),
            self.get_humidity_forecast(latitude, longitude),
            self.get_wind_forecast(latitude, longitude),
        )?;
        Ok(WeatherData {
            location: current.location,
            current: current.current,
            hourly: HourlyData {
                time: temperature.hourly.time,
                temperature_2m: temperature.hourly.values,
                relative_humidity_2m: humidity.hourly.values,
                wind_speed_10m: wind.hourly.values,
            },
        })
    }

    pub async fn get_full_weather(
        &self,
        latitude: f64,
        longitude: f64,
        strategy: FetchStrategy,
    ) -> Result<WeatherData, WeatherError> {
        match strategy {
            FetchStrategy::Combined => self.get_weather_data(latitude, longitude).await,
            FetchStrategy::Split => self.get_weather_data_split(latitude, longitude).await,
        }
    }
}
