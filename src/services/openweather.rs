//! OpenWeatherMap 2.5 client.
//!
//! Only the wind part of the responses is read.
//! See: https://openweathermap.org/current and https://openweathermap.org/forecast5

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::geo::Coordinate;

/// Client for the OpenWeatherMap current weather and forecast APIs.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Wind as reported by OpenWeatherMap. Calm conditions omit `deg`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct WindRecord {
    /// Wind speed in metres per second
    pub speed: Option<f64>,
    /// Direction the wind blows from, degrees (meteorological)
    pub deg: Option<f64>,
    /// Gust speed in metres per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

/// One entry of the 3-hourly wind forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct WindSample {
    pub time: DateTime<Utc>,
    pub wind: WindRecord,
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    wind: Option<WindRecord>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    /// Unix timestamp (UTC) of the forecast slot
    dt: i64,
    wind: Option<WindRecord>,
}

impl OpenWeatherClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Result<Self, AppError> {
        reqwest::Url::parse(base_url).map_err(|e| {
            AppError::InternalError(format!("Invalid OpenWeatherMap API URL: {}", e))
        })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Current wind at a location.
    pub async fn current_wind(&self, at: Coordinate) -> Result<WindRecord, AppError> {
        let response: CurrentWeatherResponse = self.get_json("weather", at).await?;
        Ok(response.wind.unwrap_or_default())
    }

    /// 5-day wind forecast in 3-hour steps, in upstream order.
    pub async fn wind_forecast(&self, at: Coordinate) -> Result<Vec<WindSample>, AppError> {
        let response: ForecastResponse = self.get_json("forecast", at).await?;

        let samples = response
            .list
            .into_iter()
            .filter_map(|entry| match DateTime::from_timestamp(entry.dt, 0) {
                Some(time) => Some(WindSample {
                    time,
                    wind: entry.wind.unwrap_or_default(),
                }),
                None => {
                    tracing::warn!("Skipping forecast entry with invalid timestamp {}", entry.dt);
                    None
                }
            })
            .collect();

        Ok(samples)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        at: Coordinate,
    ) -> Result<T, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("OpenWeatherMap request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Error from OpenWeatherMap /{} (HTTP {}): {}",
                endpoint,
                status,
                body
            );
            return Err(AppError::ExternalServiceError(format!(
                "OpenWeatherMap returned HTTP {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("OpenWeatherMap JSON parse error: {}", e))
        })
    }
}
