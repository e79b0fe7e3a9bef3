mod auth_handlers;
mod weather;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use axum::response::{IntoResponse, Response};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor, GovernorError,
    GovernorLayer,
};

use crate::dto::MessageResponse;
use crate::error::AppError;
use crate::middleware::rate_limit;
use crate::state::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth_handlers::signup))
        .route("/login", post(auth_handlers::login))
}

pub fn weather_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/weather", post(weather::current_weather))
        .route_layer(from_fn_with_state(state.clone(), rate_limit::limit_weather))
}

async fn index() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello World!".to_string(),
    })
}

/// Renders throttled credential requests like every other API error.
fn governor_rejection(err: GovernorError) -> Response {
    match err {
        GovernorError::TooManyRequests { wait_time, .. } => {
            tracing::warn!("Credential endpoint throttled, retry in {wait_time}s");
            AppError::RateLimitExceeded {
                retry_after: wait_time.max(1),
            }
            .into_response()
        }
        other => AppError::Internal(format!("auth rate limiter: {other:?}")).into_response(),
    }
}

/// Assembles every route with its per-route limits.
///
/// Connection info must be provided by the server
/// (`into_make_service_with_connect_info`) so both limiters can key on the
/// peer address.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let auth_rpm = state.config.rate_limit.auth_requests_per_minute.max(1);

    // Rate limit config (per-IP) for credential endpoints
    let replenish_ms = (60_000 / u64::from(auth_rpm)).max(1);
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(replenish_ms)
            .burst_size(auth_rpm)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid auth rate limit configuration"))?,
    );

    let auth_routes = auth_router().layer(
        GovernorLayer::<_, _, axum::body::Body>::new(governor_config)
            .error_handler(governor_rejection),
    );

    Ok(Router::new()
        .route("/", get(index))
        .merge(auth_routes)
        .merge(weather_router(&state))
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use weathergate_core::{Coordinate, CoreError, CoreResult, WeatherReport, WeatherSource};

    use super::*;
    use crate::config::ServerConfig;

    const SECRET: &str = "test-secret-0123456789abcdef0123456789";

    #[derive(Default)]
    struct StubWeather {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl WeatherSource for StubWeather {
        async fn current(&self, coord: Coordinate) -> CoreResult<WeatherReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CoreError::Upstream("provider exploded at 10.1.2.3".to_string()));
            }
            Ok(WeatherReport {
                location: coord,
                current: json!({ "temperature": 12.3, "windspeed": 8.1 }),
                units: Some(json!({ "temperature": "°C" })),
            })
        }
    }

    fn test_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        config.rate_limit.auth_requests_per_minute = 1000;
        config
    }

    fn open_config() -> ServerConfig {
        let mut config = test_config();
        config.auth.protect_weather = false;
        config
    }

    fn app_with(config: ServerConfig, stub: Arc<StubWeather>) -> Router {
        build_router(AppState::new(config, stub)).unwrap()
    }

    struct Call<'a> {
        method: Method,
        uri: &'a str,
        body: Option<Value>,
        token: Option<&'a str>,
        forwarded_for: Option<String>,
        peer: [u8; 4],
    }

    impl<'a> Call<'a> {
        fn post(uri: &'a str, body: Value) -> Self {
            Self {
                method: Method::POST,
                uri,
                body: Some(body),
                token: None,
                forwarded_for: None,
                peer: [127, 0, 0, 1],
            }
        }

        fn bearer(mut self, token: &'a str) -> Self {
            self.token = Some(token);
            self
        }

        fn forwarded_for(mut self, ip: String) -> Self {
            self.forwarded_for = Some(ip);
            self
        }

        fn from_peer(mut self, peer: [u8; 4]) -> Self {
            self.peer = peer;
            self
        }

        async fn send(self, app: &Router) -> (StatusCode, axum::http::HeaderMap, Value) {
            let mut builder = Request::builder().method(self.method).uri(self.uri);
            if let Some(token) = self.token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            if let Some(ip) = self.forwarded_for {
                builder = builder.header("x-forwarded-for", ip);
            }
            let body = match self.body {
                Some(v) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            let mut req = builder.body(body).unwrap();
            req.extensions_mut()
                .insert(ConnectInfo(SocketAddr::from((self.peer, 40000))));

            let response = app.clone().oneshot(req).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, headers, json)
        }
    }

    async fn signup(app: &Router, username: &str, password: &str) -> StatusCode {
        Call::post("/signup", json!({ "username": username, "password": password }))
            .send(app)
            .await
            .0
    }

    async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
        let (status, _, body) =
            Call::post("/login", json!({ "username": username, "password": password }))
                .send(app)
                .await;
        (status, body)
    }

    async fn token_for(app: &Router, username: &str, password: &str) -> String {
        assert_eq!(signup(app, username, password).await, StatusCode::CREATED);
        let (status, body) = login(app, username, password).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    fn nyc() -> Value {
        json!({ "latitude": 40.7, "longitude": -74.0 })
    }

    // --- index ---

    #[tokio::test]
    async fn index_says_hello() {
        let app = app_with(test_config(), Arc::default());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "message": "Hello World!" }));
    }

    // --- signup / login ---

    #[tokio::test]
    async fn signup_then_login_issues_token() {
        let app = app_with(test_config(), Arc::default());
        let (status, _, body) =
            Call::post("/signup", json!({ "username": "alice", "password": "pass" }))
                .send(&app)
                .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User registered successfully");

        let (status, body) = login(&app, "alice", "pass").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert!(body["expires_at"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = app_with(test_config(), Arc::default());
        signup(&app, "alice", "hunter22").await;

        for attempt in ["hunter2", "hunter22 ", "Hunter22", "user", "pass"] {
            let (status, body) = login(&app, "alice", attempt).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "password {attempt:?}");
            assert_eq!(body["error"], "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let app = app_with(test_config(), Arc::default());
        let (status, body) = login(&app, "ghost", "pass").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let app = app_with(test_config(), Arc::default());
        assert_eq!(signup(&app, "alice", "first").await, StatusCode::CREATED);
        assert_eq!(signup(&app, "alice", "second").await, StatusCode::CONFLICT);

        // The original password still works
        assert_eq!(login(&app, "alice", "first").await.0, StatusCode::OK);
        assert_eq!(login(&app, "alice", "second").await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signup_requires_both_fields() {
        let app = app_with(test_config(), Arc::default());
        assert_eq!(signup(&app, "", "pass").await, StatusCode::BAD_REQUEST);
        assert_eq!(signup(&app, "alice", "").await, StatusCode::BAD_REQUEST);

        let (status, _, body) = Call::post("/signup", json!({ "username": "alice" }))
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Username and password are required");
    }

    #[tokio::test]
    async fn seeded_user_can_log_in() {
        let mut config = test_config();
        config.users.push(crate::config::UserConfig {
            username: "seed".to_string(),
            password_hash: crate::auth::password::hash_password("seeded-pass").unwrap(),
        });
        let app = app_with(config, Arc::default());
        assert_eq!(login(&app, "seed", "seeded-pass").await.0, StatusCode::OK);
    }

    // --- token checks on /weather ---

    #[tokio::test]
    async fn weather_with_valid_token_succeeds() {
        let stub = Arc::new(StubWeather::default());
        let app = app_with(test_config(), stub.clone());
        let token = token_for(&app, "alice", "pass").await;

        let (status, _, body) = Call::post("/weather", nyc()).bearer(&token).send(&app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"], json!({ "latitude": 40.7, "longitude": -74.0 }));
        assert!(!body["current"].as_object().unwrap().is_empty());
        assert_eq!(body["units"]["temperature"], "°C");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn weather_without_token_is_rejected() {
        let stub = Arc::new(StubWeather::default());
        let app = app_with(test_config(), stub.clone());

        let (status, _, body) = Call::post("/weather", nyc()).send(&app).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access token missing");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weather_with_forged_token_is_rejected() {
        let app = app_with(test_config(), Arc::default());
        let (forged, _) = crate::auth::jwt::create_token(
            "some-other-secret-0123456789abcdef",
            Duration::from_secs(300),
            "mallory",
        )
        .unwrap();

        for token in [forged.as_str(), "garbage"] {
            let (status, _, body) = Call::post("/weather", nyc()).bearer(token).send(&app).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "Invalid or expired token");
        }
    }

    #[tokio::test]
    async fn token_stops_working_after_expiry() {
        let mut config = test_config();
        config.auth.token_ttl_seconds = 1;
        let app = app_with(config, Arc::default());
        let token = token_for(&app, "alice", "pass").await;

        let (status, _, _) = Call::post("/weather", nyc()).bearer(&token).send(&app).await;
        assert_eq!(status, StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(2100)).await;

        let (status, _, body) = Call::post("/weather", nyc()).bearer(&token).send(&app).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn unprotected_weather_needs_no_token() {
        let app = app_with(open_config(), Arc::default());
        let (status, _, body) = Call::post("/weather", nyc()).send(&app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"]["latitude"], 40.7);
    }

    // --- validation and geofence ---

    #[tokio::test]
    async fn invalid_coordinates_never_reach_upstream() {
        let stub = Arc::new(StubWeather::default());
        let mut config = open_config();
        config.rate_limit.weather_requests_per_window = 100;
        let app = app_with(config, stub.clone());

        let bad_bodies = [
            json!({ "latitude": 91, "longitude": 0 }),
            json!({ "latitude": 0, "longitude": -180.5 }),
            json!({ "latitude": "40.7", "longitude": -74.0 }),
            json!({ "longitude": -74.0 }),
            json!([40.7, -74.0]),
            json!({ "latitude": -90, "longitude": 0 }),
        ];
        for body in bad_bodies {
            let (status, _, resp) = Call::post("/weather", body.clone()).send(&app).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(resp["error"], "Invalid or missing Co-ordinates!");
        }
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_a_coordinate_error() {
        let app = app_with(open_config(), Arc::default());
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/weather")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"latitude\": 40.7,"))
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn antarctic_latitude_is_geofenced() {
        let stub = Arc::new(StubWeather::default());
        let app = app_with(open_config(), stub.clone());

        let (status, _, body) = Call::post("/weather", json!({ "latitude": -89.5, "longitude": 0 }))
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_ne!(body["error"], "Invalid or missing Co-ordinates!");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);

        let (status, _, _) = Call::post("/weather", json!({ "latitude": -89, "longitude": 0 }))
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    // --- rate limiting ---

    #[tokio::test]
    async fn sixth_weather_request_is_limited() {
        let app = app_with(open_config(), Arc::default());

        for _ in 0..5 {
            let (status, _, _) = Call::post("/weather", nyc()).send(&app).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, headers, body) = Call::post("/weather", nyc()).send(&app).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Too many requests, please try again later.");
        let retry: u64 = headers[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
        assert!((1..=60).contains(&retry));

        // Another client is unaffected
        let (status, _, _) = Call::post("/weather", nyc()).from_peer([10, 0, 0, 9]).send(&app).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limit_runs_before_auth() {
        let app = app_with(test_config(), Arc::default());

        for _ in 0..5 {
            let (status, _, _) = Call::post("/weather", nyc()).send(&app).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, _, _) = Call::post("/weather", nyc()).send(&app).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn limit_resets_after_window() {
        let mut config = open_config();
        config.rate_limit.weather_requests_per_window = 2;
        config.rate_limit.window_seconds = 1;
        let app = app_with(config, Arc::default());

        for _ in 0..2 {
            assert_eq!(Call::post("/weather", nyc()).send(&app).await.0, StatusCode::OK);
        }
        assert_eq!(
            Call::post("/weather", nyc()).send(&app).await.0,
            StatusCode::TOO_MANY_REQUESTS
        );

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(Call::post("/weather", nyc()).send(&app).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn credential_throttle_answers_with_json() {
        let mut config = test_config();
        config.rate_limit.auth_requests_per_minute = 2;
        let app = app_with(config, Arc::default());

        for _ in 0..2 {
            let (status, body) = login(&app, "ghost", "pass").await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "Invalid credentials");
        }

        let (status, headers, body) =
            Call::post("/login", json!({ "username": "ghost", "password": "pass" }))
                .send(&app)
                .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, json!({ "error": "Too many requests, please try again later." }));
        let retry: u64 = headers[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
        assert!(retry >= 1);

        // Signup shares the same per-IP budget
        assert_eq!(signup(&app, "alice", "pass").await, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn credential_throttle_ignores_forwarded_for() {
        let mut config = test_config();
        config.rate_limit.auth_requests_per_minute = 2;
        let app = app_with(config, Arc::default());

        for _ in 0..2 {
            login(&app, "ghost", "pass").await;
        }

        for i in 0..4 {
            let (status, _, _) =
                Call::post("/login", json!({ "username": "ghost", "password": "pass" }))
                    .forwarded_for(format!("1.2.3.{i}"))
                    .send(&app)
                    .await;
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "x-forwarded-for 1.2.3.{i}");
        }

        // A genuinely different peer still gets through
        let (status, _, _) = Call::post("/login", json!({ "username": "ghost", "password": "pass" }))
            .from_peer([10, 0, 0, 7])
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // --- error responder ---

    #[tokio::test]
    async fn upstream_failure_is_generic_500() {
        let stub = Arc::new(StubWeather {
            fail: true,
            ..Default::default()
        });
        let app = app_with(open_config(), stub.clone());

        let (status, _, body) = Call::post("/weather", nyc()).send(&app).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Whoops! Something broke with the weather!" }));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }
}
