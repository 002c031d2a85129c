use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::GraphQL;
use axum::http::{header, Method, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::handlers::ArtService;
use crate::api::schema::{build_schema, ArtSchema};
use crate::database::repo::{ArtStore, SqliteArtStore};
use crate::utils::config::Settings;

/// Lifecycle of the server process. Startup stops at the first failure:
/// `bootstrap` returns `Err` and `main` exits with status 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Ready,
    Serving,
}

/// Opens the database, checks it answers and syncs the schema.
///
/// Any failure here is fatal: the caller must not bind a listener.
pub async fn bootstrap(settings: &Settings) -> Result<Arc<dyn ArtStore>> {
    info!(state = ?ServerState::Starting, db = %settings.db_path.display(), "Connecting to database");

    let store = SqliteArtStore::open(&settings.db_path)?;
    store.ping().await.context("Database connection check failed")?;
    info!("Database connection established successfully");

    store.migrate().await.context("Database schema synchronization failed")?;
    info!("Database models synchronized successfully");

    info!(state = ?ServerState::Ready, "Storage ready");
    Ok(Arc::new(store))
}

pub fn router(schema: ArtSchema) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/graphql", get(graphiql).post_service(GraphQL::new(schema)))
        .route("/health", get(health))
        .route("/", get(root))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn root() -> impl IntoResponse {
    (StatusCode::OK, "Digital Dreamscapes API is running")
}

/// Serves on an already bound listener until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, store: Arc<dyn ArtStore>) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    let app = router(build_schema(ArtService::new(store)));

    info!(state = ?ServerState::Serving, "Server ready at http://{addr}/graphql");
    info!("Health check available at http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

/// Full startup sequence: storage first, then the listener.
pub async fn run(settings: Settings) -> Result<()> {
    let store = bootstrap(&settings).await?;

    let addr = SocketAddr::new(settings.host, settings.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    serve(listener, store).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}
