//! HTTP API over the reverse dictionary.
//!
//! `GET /api/search?query=&limit=` returns `{"results": {model: [match, ...]}}`
//! and `GET /api/random` returns one stored entry. Errors are JSON
//! `{"error": message}` with a status derived from the error kind.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::RevdictConfig;
use crate::dictionary::types::StoredEntry;
use crate::dictionary::EntryStore;
use crate::embedding;
use crate::error::Error;
use crate::service::{ReverseDictionary, SearchResults};

#[derive(Clone)]
struct AppState {
    dictionary: Arc<ReverseDictionary>,
    shutdown: CancellationToken,
}

impl AppState {
    /// A token cancelled when the request future is dropped or the server stops.
    fn request_token(&self) -> (CancellationToken, tokio_util::sync::DropGuard) {
        let token = self.shutdown.child_token();
        let guard = token.clone().drop_guard();
        (token, guard)
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SearchBody {
    results: SearchResults,
}

/// An [`Error`] rendered as an HTTP response.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) | Error::UnknownModel(_) => StatusCode::BAD_REQUEST,
            Error::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchBody>, ApiError> {
    let (cancel, _guard) = state.request_token();
    let results = state
        .dictionary
        .search(&cancel, &params.query, params.limit)
        .await?;
    Ok(Json(SearchBody { results }))
}

async fn random(State(state): State<AppState>) -> Result<Json<StoredEntry>, ApiError> {
    let (cancel, _guard) = state.request_token();
    let entry = state.dictionary.random_entry(&cancel).await?;
    Ok(Json(entry))
}

/// Build the API router. In-flight requests are cancelled when `shutdown` fires.
pub fn router(dictionary: ReverseDictionary, shutdown: CancellationToken) -> Router {
    let state = AppState {
        dictionary: Arc::new(dictionary),
        shutdown,
    };
    Router::new()
        .route("/api/search", get(search))
        .route("/api/random", get(random))
        .with_state(state)
}

/// Open the database, resolve providers and serve until Ctrl-C.
pub async fn serve(config: RevdictConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let store = EntryStore::open(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let embedders = embedding::create_embedders(&config)?;
    let dictionary = ReverseDictionary::new(embedders, store, config.search.clone());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "revdict listening at http://{bind_addr}/api");

    let shutdown = CancellationToken::new();
    let app = router(dictionary, shutdown.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down server");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
