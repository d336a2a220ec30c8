//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors are rendered through `auth::AppError`.
//!
//! `api hash-password` reads a password from stdin and prints its Argon2id
//! PHC string for the users file.

use auth::{AuthAppState, AuthConfig, AuthSweepers, IdentityBackend, auth_router};
use axum::{
    Router, http,
    http::{HeaderName, Method, header},
};
use platform::clock::SystemClock;
use platform::password::ClearTextPassword;
use std::env;
use std::io::BufRead;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,platform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match env::args().nth(1).as_deref() {
        None => {}
        Some("hash-password") => return hash_password(),
        Some(other) => anyhow::bail!("unknown command: {other}"),
    }

    // Missing secrets abort startup here
    let config = AuthConfig::from_env()?;
    tracing::info!(?config, "Auth configuration loaded");

    let identity = IdentityBackend::from_env(config.identity_timeout)?;

    let state = AuthAppState::in_memory(identity, config, SystemClock::shared());
    let sweepers = AuthSweepers::spawn(
        state.authenticator.clone(),
        state.limiter.clone(),
        &state.config,
    );

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(auth::application::config::CSRF_HEADER_NAME),
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/auth", auth_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweepers.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

fn hash_password() -> anyhow::Result<()> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let raw = line.trim_end_matches(['\r', '\n']).to_string();

    let hash = ClearTextPassword::new(raw)?.hash(None)?;
    println!("{}", hash.as_phc_string());
    Ok(())
}
