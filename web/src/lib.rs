use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use domain::gateway::backlog::Backlog;
use log::*;
use service::config::Config;
use time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

mod controller;
mod error;
mod extractors;
pub(crate) mod middleware;
mod router;

pub use error::{Error, Result};

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub backlog: Arc<Backlog>,
}

impl AppState {
    pub fn new(config: Config, backlog: Backlog) -> Self {
        Self {
            config,
            backlog: Arc::new(backlog),
        }
    }

    /// Build the state from configuration, failing when a Backlog setting is missing.
    pub fn from_config(config: Config) -> Result<Self> {
        let backlog = Backlog::from_config(&config)?;
        Ok(Self::new(config, backlog))
    }
}

/// The complete application: routes plus the session and CORS layers.
pub fn app(app_state: AppState) -> Router {
    let config = app_state.config.clone();
    with_layers(router::define_routes(app_state), &config)
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let host = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let listen_addr = format!("{host}:{}", app_state.config.port);

    info!("Server starting... listening for connections on http://{listen_addr}");

    let listener = TcpListener::bind(&listen_addr).await?;
    axum::serve(
        listener,
        app(app_state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

pub(crate) fn with_layers(router: Router, config: &Config) -> Router {
    router
        .layer(session_layer(config))
        .layer(cors_layer(config))
}

fn session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    let expiry_seconds = i64::try_from(config.backend_session_expiry_seconds).unwrap_or(i64::MAX);

    SessionManagerLayer::new(MemoryStore::default())
        .with_name(config.session_cookie_name.clone())
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.is_production())
        .with_expiry(Expiry::OnInactivity(Duration::seconds(expiry_seconds)))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .inspect_err(|e| warn!("Ignoring invalid CORS origin {origin}: {e}"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}
