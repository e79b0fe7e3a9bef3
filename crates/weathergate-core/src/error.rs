//! Error types for `weathergate-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`.

/// Unified error type for all core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The request body did not carry a usable coordinate pair.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// The coordinate lies inside the restricted polar band.
    #[error("latitude {latitude} is inside the restricted zone")]
    GeofenceBlocked { latitude: f64 },

    /// The upstream weather provider failed or answered with an unusable body.
    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Convenience alias used throughout `weathergate-core`.
pub type CoreResult<T> = Result<T, CoreError>;
