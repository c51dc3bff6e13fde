//! HTTP server implementation.
//!
//! This module provides the axum router for the JSON API and the listener
//! lifecycle (bind, serve, graceful shutdown).

use axum::{
    Router,
    response::{IntoResponse, Json},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{links, projects, sections, tasks};
use crate::db::Database;
use crate::error::ApiError;

/// State shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    db: Arc<Database>,
}

impl ApiState {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get the database reference.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found() -> ApiError {
    ApiError::route_not_found()
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Build the router with all routes.
pub fn build_router(state: ApiState) -> Router {
    // The browser UI may be served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(projects::get_project_view)
                .put(projects::update_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/api/sections",
            get(sections::list_sections).post(sections::create_section),
        )
        .route(
            "/api/sections/{id}",
            get(sections::get_section)
                .put(sections::update_section)
                .patch(sections::update_section)
                .delete(sections::delete_section),
        )
        .route(
            "/api/tasks",
            get(tasks::list_tasks).post(tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .patch(tasks::move_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/api/links",
            get(links::list_links).post(links::create_link),
        )
        .route(
            "/api/links/{id}",
            get(links::get_link)
                .put(links::update_link)
                .patch(links::update_link)
                .delete(links::delete_link),
        )
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle for a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Trigger graceful shutdown and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::error!("Server task failed: {}", e);
        }
    }
}

/// Start the HTTP server on the given host and port.
///
/// Port 0 binds an ephemeral port; the actual address is on the handle.
pub async fn start_server(db: Arc<Database>, host: &str, port: u16) -> anyhow::Result<ServerHandle> {
    let app = build_router(ApiState::new(db));

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            })
            .await
        {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
