use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::jwt;
use crate::auth::password::{hash_password_blocking, verify_password_blocking, DUMMY_HASH};
use crate::auth::store::UserRecord;
use crate::dto::*;
use crate::error::AppError;
use crate::state::AppState;

fn credentials(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest, AppError> {
    let Json(body) = payload.map_err(|e| {
        tracing::debug!("Unreadable credentials body: {e}");
        AppError::InvalidInput("Username and password are required".to_string())
    })?;

    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and password are required".to_string(),
        ));
    }
    Ok(body)
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let body = credentials(payload)?;

    // Cheap pre-check so a taken name doesn't cost an argon2 run
    if state.users.find(&body.username).is_some() {
        tracing::warn!("Signup rejected, username taken: {}", body.username);
        return Err(AppError::UsernameTaken);
    }

    let password_hash = hash_password_blocking(body.password).await?;

    let inserted = state.users.insert(UserRecord {
        username: body.username.clone(),
        password_hash,
    });
    if !inserted {
        tracing::warn!("Signup rejected, username taken: {}", body.username);
        return Err(AppError::UsernameTaken);
    }

    tracing::info!("User registered: {}", body.username);
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let body = credentials(payload)?;

    let Some(user) = state.users.find(&body.username) else {
        // Unknown users still cost one argon2 verification
        let _ = verify_password_blocking(DUMMY_HASH.to_string(), body.password).await;
        tracing::warn!("Failed login attempt for unknown user: {}", body.username);
        return Err(AppError::InvalidCredentials);
    };

    let valid = verify_password_blocking(user.password_hash, body.password).await?;
    if !valid {
        tracing::warn!("Failed login attempt for user: {}", body.username);
        return Err(AppError::InvalidCredentials);
    }

    let (token, expires_at) = jwt::create_token(
        &state.config.auth.jwt_secret,
        state.config.token_ttl(),
        &user.username,
    )?;

    tracing::info!("Login succeeded for user: {}", user.username);
    Ok(Json(LoginResponse { token, expires_at }))
}
