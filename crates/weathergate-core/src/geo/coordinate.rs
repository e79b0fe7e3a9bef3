//! Coordinate parsing and range validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// Lowest accepted latitude. The south pole itself is excluded.
pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// A validated (latitude, longitude) pair in decimal degrees.
///
/// Only [`validate_coordinates`] produces values that are guaranteed to be
/// in range; the fields stay public so handlers can echo them back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Extracts a [`Coordinate`] from an untyped request body.
///
/// Both fields must be present, be JSON numbers (strings such as `"40.7"`
/// are rejected), and fall inside their ranges: latitude in `(-90, 90]`,
/// longitude in `[-180, 180]`.
pub fn validate_coordinates(input: &Value) -> CoreResult<Coordinate> {
    let object = input
        .as_object()
        .ok_or_else(|| CoreError::InvalidCoordinates("body is not an object".to_string()))?;

    let latitude = numeric_field(object, "latitude")?;
    let longitude = numeric_field(object, "longitude")?;

    if !(latitude > MIN_LATITUDE && latitude <= MAX_LATITUDE) {
        return Err(CoreError::InvalidCoordinates(format!(
            "latitude {latitude} out of range"
        )));
    }
    if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude) {
        return Err(CoreError::InvalidCoordinates(format!(
            "longitude {longitude} out of range"
        )));
    }

    Ok(Coordinate {
        latitude,
        longitude,
    })
}

fn numeric_field(object: &serde_json::Map<String, Value>, name: &str) -> CoreResult<f64> {
    let value = object
        .get(name)
        .ok_or_else(|| CoreError::InvalidCoordinates(format!("{name} missing")))?;

    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoreError::InvalidCoordinates(format!("{name} is not a number")))
}
