pub mod coordinate;
pub mod geofence;

pub use coordinate::{validate_coordinates, Coordinate};
pub use geofence::{block_restricted_latitude, RESTRICTED_LATITUDE};
