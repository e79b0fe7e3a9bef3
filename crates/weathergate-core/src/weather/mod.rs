//! Upstream weather lookup.
//!
//! Handlers talk to the provider through the [`WeatherSource`] trait so the
//! HTTP client can be swapped for a stub in tests.

pub mod open_meteo;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreResult;
use crate::geo::Coordinate;

pub use open_meteo::OpenMeteoClient;

/// Normalized weather payload returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub location: Coordinate,
    /// Current conditions exactly as the provider reported them.
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<Value>,
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetches current conditions for an already validated coordinate.
    async fn current(&self, coord: Coordinate) -> CoreResult<WeatherReport>;
}
