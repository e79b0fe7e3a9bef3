use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use weathergate_core::CoreError;

pub const UPSTREAM_FAILURE_MESSAGE: &str = "Whoops! Something broke with the weather!";

#[derive(Debug)]
pub enum AppError {
    InvalidCoordinates,
    GeofenceBlocked,
    /// Carries the seconds left until the client's window resets.
    RateLimitExceeded { retry_after: u64 },
    InvalidInput(String),
    UsernameTaken,
    InvalidCredentials,
    TokenMissing,
    TokenInvalid,
    Upstream(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCoordinates | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::GeofenceBlocked => StatusCode::FORBIDDEN,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::UsernameTaken => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::TokenMissing | AppError::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Upstream(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::InvalidCoordinates => "Invalid or missing Co-ordinates!".to_string(),
            AppError::GeofenceBlocked => {
                "Weather lookups for Antarctic latitudes are not permitted".to_string()
            }
            AppError::RateLimitExceeded { .. } => {
                "Too many requests, please try again later.".to_string()
            }
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::UsernameTaken => "Username already exists".to_string(),
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::TokenMissing => "Access token missing".to_string(),
            AppError::TokenInvalid => "Invalid or expired token".to_string(),
            AppError::Upstream(msg) => {
                // Log the real error server-side, return generic message to client
                tracing::error!("Upstream weather error: {}", msg);
                UPSTREAM_FAILURE_MESSAGE.to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.message(),
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let AppError::RateLimitExceeded { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidCoordinates(reason) => {
                tracing::debug!("Rejected coordinates: {reason}");
                AppError::InvalidCoordinates
            }
            CoreError::GeofenceBlocked { .. } => AppError::GeofenceBlocked,
            CoreError::Upstream(msg) => AppError::Upstream(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(format!("{e:#}"))
    }
}
