use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{WeatherReport, WeatherSource};
use crate::error::{CoreError, CoreResult};
use crate::geo::Coordinate;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

/// [`WeatherSource`] backed by the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> CoreResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn forecast_url(&self) -> String {
        format!("{}/v1/forecast", self.base_url)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn current(&self, coord: Coordinate) -> CoreResult<WeatherReport> {
        let res = self
            .http
            .get(self.forecast_url())
            .query(&[
                ("latitude", coord.latitude.to_string()),
                ("longitude", coord.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("request failed: {e}")))?;

        let status = res.status();
        let body: Value = res
            .json()
            .await
            .map_err(|e| CoreError::Upstream(format!("unreadable body (status {status}): {e}")))?;

        tracing::debug!(%status, "open-meteo responded");
        extract_report(coord, body)
    }
}

/// Reshapes a parsed forecast body into a [`WeatherReport`].
///
/// The body must carry a non-empty `current_weather` object; anything else
/// is reported as an upstream failure using the provider's `reason` when it
/// gives one.
fn extract_report(coord: Coordinate, mut body: Value) -> CoreResult<WeatherReport> {
    let has_current = body
        .get("current_weather")
        .and_then(Value::as_object)
        .is_some_and(|o| !o.is_empty());

    if !has_current {
        let reason = body
            .get("reason")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("Failed to fetch weather data");
        return Err(CoreError::Upstream(reason.to_string()));
    }

    let current = body["current_weather"].take();
    let units = body
        .get_mut("current_weather_units")
        .map(Value::take)
        .filter(|u| !u.is_null());

    Ok(WeatherReport {
        location: coord,
        current,
        units,
    })
}
