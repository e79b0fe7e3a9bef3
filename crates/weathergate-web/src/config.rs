use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Account seeded into the user store at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    /// Require a bearer token on `/weather`.
    #[serde(default = "default_protect_weather")]
    pub protect_weather: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_weather_quota")]
    pub weather_requests_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    #[serde(default = "default_auth_rpm")]
    pub auth_requests_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    #[serde(default = "default_upstream_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
            protect_weather: default_protect_weather(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            weather_requests_per_window: default_weather_quota(),
            window_seconds: default_window_seconds(),
            auth_requests_per_minute: default_auth_rpm(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_seconds: default_upstream_timeout_seconds(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            upstream: UpstreamConfig::default(),
            tls: TlsConfig::default(),
            users: Vec::new(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_token_ttl_seconds() -> u64 { 300 }
fn default_protect_weather() -> bool { true }
fn default_weather_quota() -> u32 { 5 }
fn default_window_seconds() -> u64 { 60 }
fn default_auth_rpm() -> u32 { 10 }
fn default_upstream_url() -> String { weathergate_core::weather::open_meteo::DEFAULT_BASE_URL.to_string() }
fn default_upstream_timeout_seconds() -> u64 { 10 }

const WEAK_SECRETS: &[&str] = &[
    "change-me-to-a-random-secret",
    "secret",
    "password",
    "jwt-secret",
    "supersecretkey",
];

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ServerConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.token_ttl_seconds)
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls.cert_path.is_some() && self.tls.key_path.is_some()
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("WEATHERGATE_CONFIG").map(PathBuf::from).ok();

        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(&path)?;
            Self::from_toml(&contents)?
        } else {
            ServerConfig::default()
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(secret) = std::env::var("WEATHERGATE_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(ttl) = env_parse("WEATHERGATE_TOKEN_TTL_SECONDS")? {
            self.auth.token_ttl_seconds = ttl;
        }
        if let Some(protect) = env_parse("WEATHERGATE_PROTECT_WEATHER")? {
            self.auth.protect_weather = protect;
        }
        if let Ok(url) = std::env::var("WEATHERGATE_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Some(secs) = env_parse("WEATHERGATE_UPSTREAM_TIMEOUT_SECONDS")? {
            self.upstream.timeout_seconds = secs;
        }
        if let Some(addr) = env_parse("WEATHERGATE_BIND_ADDR")? {
            self.bind_addr = addr;
        }
        if let Ok(cert) = std::env::var("WEATHERGATE_TLS_CERT") {
            self.tls.cert_path = Some(cert);
        }
        if let Ok(key) = std::env::var("WEATHERGATE_TLS_KEY") {
            self.tls.key_path = Some(key);
        }
        Ok(())
    }

    /// Rejects configurations the server must not start with.
    ///
    /// The token secret has no fallback: it must be set explicitly and must
    /// not be one of the well-known placeholder values.
    pub fn validate(&self) -> anyhow::Result<()> {
        let secret = self.auth.jwt_secret.as_str();
        if secret.is_empty() {
            anyhow::bail!(
                "No JWT secret configured. Set WEATHERGATE_JWT_SECRET or auth.jwt_secret."
            );
        }
        if WEAK_SECRETS.contains(&secret) {
            anyhow::bail!(
                "JWT secret matches a known weak/placeholder value. \
                 Set a strong random secret via WEATHERGATE_JWT_SECRET environment variable."
            );
        }
        if secret.len() < 32 {
            tracing::warn!(
                "JWT secret is shorter than 32 characters. \
                 Consider using a stronger secret via WEATHERGATE_JWT_SECRET."
            );
        }

        if self.rate_limit.weather_requests_per_window == 0 || self.rate_limit.window_seconds == 0 {
            anyhow::bail!("rate_limit quota and window must both be greater than zero");
        }
        if self.auth.token_ttl_seconds == 0 {
            anyhow::bail!("auth.token_ttl_seconds must be greater than zero");
        }
        Ok(())
    }
}

fn env_parse<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid value for {name}: {e}")),
        Err(_) => Ok(None),
    }
}
