//! HTTP boundary of the parks backend.
//!
//! | route | operation |
//! |-------|-----------|
//! | `GET /parks` | every park |
//! | `GET /parks/within?lat1&lon1&lat2&lon2[&limit]` | parks inside a box |
//! | `GET /status` | liveness, never touches the store |
//!
//! Store calls are synchronous and run on the blocking pool.

mod config;
mod error;

pub use config::*;
pub use error::{ApiError, ErrorBody};

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderName, Method};
use axum::routing::get;
use axum::{Json, Router};
use parks::errors::{ErrorKind, ParksError, ParksResult};
use parks::query::{BoxQuery, BoxQueryParams, BOX_QUERY_USAGE};
use parks::record::Record;
use parks::service::{ParkService, SeedOutcome};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    service: ParkService,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(service: ParkService) -> Self {
        Self {
            service,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn service(&self) -> &ParkService {
        &self.service
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([
            HeaderName::from_static("origin"),
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("authorization"),
        ]);

    Router::new()
        .route("/parks", get(list_parks))
        .route("/parks/within", get(parks_within))
        .route("/status", get(status))
        .layer(cors)
        .with_state(state)
}

/// Runs `initialize` on the blocking pool without holding up the caller.
///
/// Failures are logged; the server keeps serving and the next request
/// retries the connection.
pub fn spawn_initialization(service: ParkService) -> JoinHandle<ParksResult<SeedOutcome>> {
    tokio::task::spawn_blocking(move || {
        let outcome = service.initialize();
        match &outcome {
            Ok(outcome) => log::info!("Initialization finished: {}", outcome),
            Err(err) => log::error!("Initialization failed, continuing without it: {}", err),
        }
        outcome
    })
}

async fn list_parks(State(state): State<AppState>) -> Result<Json<Vec<Record>>, ApiError> {
    let records = run_blocking(&state, |service| service.query_all()).await?;
    Ok(Json(records))
}

async fn parks_within(
    State(state): State<AppState>,
    params: Result<Query<BoxQueryParams>, QueryRejection>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let Query(params) = params.map_err(|rejection| {
        ApiError(ParksError::new_with_cause(
            BOX_QUERY_USAGE,
            ErrorKind::ValidationError,
            ParksError::new(&rejection.body_text(), ErrorKind::ValidationError),
        ))
    })?;
    // reject bad input before a worker or the store is involved
    let query = BoxQuery::try_from(&params)?;
    let records = run_blocking(&state, move |service| service.query_within(&query)).await?;
    Ok(Json(records))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connection": state.service.connection_state().as_str(),
    }))
}

async fn run_blocking<T, F>(state: &AppState, operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(ParkService) -> ParksResult<T> + Send + 'static,
{
    let service = state.service.clone();
    let task = tokio::task::spawn_blocking(move || operation(service));
    match tokio::time::timeout(state.request_timeout, task).await {
        Ok(Ok(result)) => result.map_err(ApiError),
        Ok(Err(join_error)) => Err(ApiError(ParksError::new(
            &format!("worker task failed: {}", join_error),
            ErrorKind::InternalError,
        ))),
        Err(_) => Err(ApiError(ParksError::new(
            &format!("request timed out after {:?}", state.request_timeout),
            ErrorKind::InternalError,
        ))),
    }
}
