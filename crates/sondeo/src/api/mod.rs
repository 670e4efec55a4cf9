//! HTTP JSON API.
//!
//! Survey questions and response tallies are read-only views over the
//! cached dataset; `/usuarios` is a small CRUD surface over the profile
//! store. Errors come back as `{"detail": "<message>"}`.

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::ProfilesConfig;
use crate::error::{Error, Result};
use crate::profiles::ProfileStore;
use crate::survey::SurveyService;

pub use error::{ApiError, ApiResult};

/// Shared state of the handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Survey dataset queries.
    pub survey: Arc<SurveyService>,
    /// Profile storage. One connection, serialized.
    pub profiles: Arc<Mutex<ProfileStore>>,
    /// Page size bounds for profile listings.
    pub limits: ProfilesConfig,
}

impl AppState {
    /// Bundle the services into handler state.
    #[must_use]
    pub fn new(survey: SurveyService, profiles: ProfileStore, limits: ProfilesConfig) -> Self {
        Self {
            survey: Arc::new(survey),
            profiles: Arc::new(Mutex::new(profiles)),
            limits,
        }
    }
}

/// Build the router with every route and request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/preguntas", get(handlers::list_questions))
        .route("/respuestas/{id}", get(handlers::question_responses))
        .route(
            "/respuestas/{id}/filtradas",
            get(handlers::filtered_responses),
        )
        .route("/categorias", get(handlers::list_categories))
        .route("/categorias/{id}", get(handlers::get_category))
        .route(
            "/categorias/{id}/preguntas",
            get(handlers::category_questions),
        )
        .route(
            "/usuarios",
            get(handlers::list_profiles).post(handlers::create_profile),
        )
        .route(
            "/usuarios/{id}",
            get(handlers::get_profile)
                .put(handlers::update_profile)
                .delete(handlers::delete_profile),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until Ctrl-C.
///
/// # Errors
///
/// Returns [`Error::ServerBind`] if the address cannot be bound, or an I/O
/// error if the server fails.
pub async fn serve(state: AppState, addr: SocketAddr, cors: bool) -> Result<()> {
    let mut app = create_router(state);
    if cors {
        app = app.layer(CorsLayer::permissive());
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| Error::ServerBind {
            addr: addr.to_string(),
            source,
        })?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
