//! Antarctic exclusion rule.

use super::Coordinate;
use crate::error::{CoreError, CoreResult};

/// Latitudes strictly below this value are refused.
pub const RESTRICTED_LATITUDE: f64 = -89.0;

/// Passes `coord` through unless it lies south of [`RESTRICTED_LATITUDE`].
pub fn block_restricted_latitude(coord: Coordinate) -> CoreResult<Coordinate> {
    if coord.latitude < RESTRICTED_LATITUDE {
        tracing::warn!(latitude = coord.latitude, "geofence blocked coordinate");
        return Err(CoreError::GeofenceBlocked {
            latitude: coord.latitude,
        });
    }
    Ok(coord)
}
