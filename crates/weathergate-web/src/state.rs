use std::sync::Arc;

use weathergate_core::WeatherSource;

use crate::auth::store::{UserRecord, UserStore};
use crate::config::ServerConfig;
use crate::middleware::rate_limit::FixedWindowLimiter;

/// Process-lifetime context shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub users: Arc<UserStore>,
    pub weather_limiter: Arc<FixedWindowLimiter>,
    pub weather: Arc<dyn WeatherSource>,
}

impl AppState {
    /// Builds fresh stores from `config`, seeding any configured accounts.
    pub fn new(config: ServerConfig, weather: Arc<dyn WeatherSource>) -> Self {
        let users = UserStore::new();
        for user in &config.users {
            let inserted = users.insert(UserRecord {
                username: user.username.clone(),
                password_hash: user.password_hash.clone(),
            });
            if !inserted {
                tracing::warn!("Duplicate seeded user ignored: {}", user.username);
            }
        }

        let weather_limiter = FixedWindowLimiter::new(
            config.rate_limit.weather_requests_per_window,
            config.rate_limit.window(),
        );

        Self {
            config: Arc::new(config),
            users: Arc::new(users),
            weather_limiter: Arc::new(weather_limiter),
            weather,
        }
    }
}
