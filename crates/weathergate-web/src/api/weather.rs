use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use weathergate_core::{block_restricted_latitude, validate_coordinates, WeatherReport};

use crate::auth::middleware::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// `POST /weather`. The rate limiter runs as a route layer before this;
/// extractors then run token check first and body parsing last.
pub async fn current_weather(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WeatherReport>, AppError> {
    let Json(body) = payload.map_err(|e| {
        tracing::debug!("Unreadable weather body: {e}");
        AppError::InvalidCoordinates
    })?;

    let coord = validate_coordinates(&body)?;
    let coord = block_restricted_latitude(coord)?;

    tracing::info!(
        user = %user.sub,
        latitude = coord.latitude,
        longitude = coord.longitude,
        "Fetching weather"
    );

    let report = state.weather.current(coord).await?;
    Ok(Json(report))
}
