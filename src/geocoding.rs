use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::GeocodingError;

/// The best match for a free text city name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct City {
    pub name: String,
    #[serde(default)]
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, city_name: &str) -> Result<City, GeocodingError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    // Absent when nothing matched.
    #[serde(default)]
    results: Vec<City>,
}

/// Open-Meteo geocoding search, asking for a single result.
#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    http: Client,
    url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        OpenMeteoGeocoder {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn resolve(&self, city_name: &str) -> Result<City, GeocodingError> {
        debug!("Geocoding {}", city_name);
        let response = self
            .http
            .get(&self.url)
            .query(&[("name", city_name), ("count", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodingError::Status {
                status: response.status().as_u16(),
            });
        }
        let search: SearchResponse = response.json().await?;
        let city = search
            .results
            .into_iter()
            .next()
            .ok_or_else(|| GeocodingError::NotFound {
                city: city_name.to_string(),
            })?;
        debug!(
            "Resolved {} to {}, {} ({}, {})",
            city_name, city.name, city.country, city.latitude, city.longitude
        );
        Ok(city)
    }
}
