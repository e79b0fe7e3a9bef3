use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// Identity proven by a bearer token on a protected route.
pub struct AuthUser {
    pub sub: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Weather auth switched off: let everyone through anonymously
        if !state.config.auth.protect_weather {
            return Ok(AuthUser {
                sub: "anonymous".to_string(),
            });
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::TokenMissing)?;

        let claims = super::jwt::verify_token(&state.config.auth.jwt_secret, token).map_err(|e| {
            tracing::debug!("Token rejected: {e}");
            AppError::TokenInvalid
        })?;

        Ok(AuthUser { sub: claims.sub })
    }
}
