//! weathergate core library — transport-agnostic weather gateway logic.
//!
//! `weathergate-core` holds the checks and the upstream lookup that the
//! HTTP server (`weathergate-web`) composes into its request pipeline.
//!
//! # Modules
//!
//! - [`geo`] — [`Coordinate`] parsing, range validation and the Antarctic geofence.
//! - [`weather`] — the [`WeatherSource`] seam, [`WeatherReport`] and the Open-Meteo client.
//! - [`error`] — Unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod error;
pub mod geo;
pub mod weather;

pub use error::{CoreError, CoreResult};
pub use geo::{block_restricted_latitude, validate_coordinates, Coordinate};
pub use weather::{OpenMeteoClient, WeatherReport, WeatherSource};
