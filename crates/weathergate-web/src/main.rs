mod api;
mod auth;
mod config;
mod dto;
mod error;
mod middleware;
mod state;

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::http::{header, Method};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weathergate_core::OpenMeteoClient;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weathergate_web=debug,weathergate_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let tls_config = config.tls.clone();
    let tls_enabled = config.tls_enabled();

    let weather = OpenMeteoClient::new(&config.upstream.base_url, config.upstream.timeout())?;
    tracing::info!("Upstream weather provider: {}", config.upstream.base_url);

    let state = AppState::new(config, Arc::new(weather));
    tracing::info!(
        "Weather auth {}; {} seeded user(s)",
        if state.config.auth.protect_weather { "enabled" } else { "disabled" },
        state.users.len()
    );

    // Rate-limit window cleanup task
    let cleanup_limiter = state.weather_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_limiter.purge_expired();
            tracing::debug!("Rate-limit windows tracked: {}", cleanup_limiter.tracked_clients());
        }
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let base_router = api::build_router(state)?;

    let app = if tls_enabled {
        base_router
            .layer(from_fn(middleware::security_headers::security_headers_with_hsts))
            .layer(RequestBodyLimitLayer::new(16 * 1024))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    } else {
        base_router
            .layer(from_fn(middleware::security_headers::security_headers))
            .layer(RequestBodyLimitLayer::new(16 * 1024))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    };

    if let (Some(cert), Some(key)) = (&tls_config.cert_path, &tls_config.key_path) {
        use axum_server::tls_rustls::RustlsConfig;
        let rustls_config = RustlsConfig::from_pem_file(cert, key).await?;
        tracing::info!("weathergate listening on https://{}", bind_addr);
        axum_server::bind_rustls(bind_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("weathergate listening on http://{}", bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
