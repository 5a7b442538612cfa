//! HTTP API.
//!
//! Each handler reads the [`DocumentStore`] snapshot, calls one query or
//! kinematics operation, and serializes the result as JSON (plain text for
//! the confirmation and help routes).
//!
//! # Endpoints
//!
//! | Method   | Path | Description |
//! |----------|------|-------------|
//! | `DELETE` | `/delete-data` | Drop the loaded dataset |
//! | `POST`   | `/post-data` | Fetch the upstream feed and replace the dataset |
//! | `GET`    | `/` | Whole dataset |
//! | `GET`    | `/comment` | `data.COMMENT` lines |
//! | `GET`    | `/header` | OEM header |
//! | `GET`    | `/metadata` | Segment metadata |
//! | `GET`    | `/epochs?limit=&offset=` | Epoch keys |
//! | `GET`    | `/epochs/{epoch}` | One state vector |
//! | `GET`    | `/epochs/{epoch}/speed` | Instantaneous speed |
//! | `GET`    | `/epochs/{epoch}/location` | Sub-point, geocode, and speed |
//! | `GET`    | `/now` | Location of the epoch nearest the current time |
//! | `GET`    | `/help` | Usage text |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "dataset_unavailable", "message": "The data set does not exist yet!" } }
//! ```
//!
//! Codes and statuses: `bad_request` (400), `not_found` / `dataset_empty`
//! (404), `incomplete_record` / `malformed_timestamp` (422),
//! `upstream_fetch` / `upstream_parse` / `geocode_error` (502),
//! `dataset_unavailable` (503).

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::TrackerError;
use crate::geocode::{create_geocoder, ReverseGeocoder};
use crate::kinematics;
use crate::loader::Loader;
use crate::models::Measure;
use crate::query::{self, EpochWindow};
use crate::store::DocumentStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub loader: Arc<Loader>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            store: Arc::new(DocumentStore::new()),
            loader: Arc::new(Loader::new(&config.upstream)?),
            geocoder: create_geocoder(&config.geocode)?,
        })
    }
}

/// Builds the router with all routes and the CORS layer.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_dataset))
        .route("/delete-data", delete(handle_delete))
        .route("/post-data", post(handle_post))
        .route("/comment", get(handle_comment))
        .route("/header", get(handle_header))
        .route("/metadata", get(handle_metadata))
        .route("/epochs", get(handle_epochs))
        .route("/epochs/{epoch}", get(handle_epoch))
        .route("/epochs/{epoch}/speed", get(handle_speed))
        .route("/epochs/{epoch}/location", get(handle_location))
        .route("/now", get(handle_now))
        .route("/help", get(handle_help))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the server on `[server].bind` and runs until the process exits.
///
/// With `preload`, the feed is fetched before the listener binds; a failed
/// preload is logged and the server starts with no dataset.
pub async fn run_server(config: &Config, preload: bool) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;

    if preload {
        match state.loader.load().await {
            Ok(dataset) => state.store.set(dataset),
            Err(e) => tracing::warn!(error = %e, "preload failed, starting without data"),
        }
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "ISS tracker listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        AppError {
            status: StatusCode::from_u16(err.status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

type Handled = Result<Response, AppError>;

// ============ Load / reset ============

async fn handle_delete(State(state): State<AppState>) -> &'static str {
    state.store.clear();
    tracing::info!("dataset cleared");
    "Successfully deleted all the data from the dictionary!\n"
}

async fn handle_post(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let dataset = state.loader.load().await?;
    state.store.set(dataset);
    Ok("Successfully reloaded the dictionary with the data from the web!\n")
}

// ============ Document sections ============

async fn handle_dataset(State(state): State<AppState>) -> Handled {
    let dataset = state.store.current()?;
    Ok(Json(&*dataset).into_response())
}

async fn handle_comment(State(state): State<AppState>) -> Handled {
    let dataset = state.store.current()?;
    let comments = dataset.comments.as_ref().ok_or(TrackerError::DatasetEmpty)?;
    Ok(Json(comments).into_response())
}

async fn handle_header(State(state): State<AppState>) -> Handled {
    let dataset = state.store.current()?;
    let header = dataset.header.as_ref().ok_or(TrackerError::DatasetEmpty)?;
    Ok(Json(header).into_response())
}

async fn handle_metadata(State(state): State<AppState>) -> Handled {
    let dataset = state.store.current()?;
    let metadata = dataset.metadata.as_ref().ok_or(TrackerError::DatasetEmpty)?;
    Ok(Json(metadata).into_response())
}

// ============ Epochs ============

/// Query pairs are taken raw and validated by [`EpochWindow::from_query`],
/// so a bad or repeated value yields our own 400 body rather than Axum's
/// rejection text.
async fn handle_epochs(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Handled {
    let Query(pairs) = params.map_err(|e| TrackerError::InvalidArgument(e.body_text()))?;
    let dataset = state.store.current()?;
    let window = EpochWindow::from_query(&pairs)?;
    let keys = query::list_epochs(&dataset, window)?;
    Ok(Json(keys).into_response())
}

async fn handle_epoch(State(state): State<AppState>, Path(epoch): Path<String>) -> Handled {
    let dataset = state.store.current()?;
    let sv = query::get_epoch(&dataset, &epoch)?;
    Ok(Json(sv).into_response())
}

#[derive(Serialize)]
struct SpeedResponse {
    speed: Measure,
}

async fn handle_speed(State(state): State<AppState>, Path(epoch): Path<String>) -> Handled {
    let dataset = state.store.current()?;
    let sv = query::get_epoch(&dataset, &epoch)?;
    let speed = kinematics::speed(sv)?;
    Ok(Json(SpeedResponse { speed }).into_response())
}

async fn handle_location(State(state): State<AppState>, Path(epoch): Path<String>) -> Handled {
    let dataset = state.store.current()?;
    let result = kinematics::locate(&dataset, &epoch, state.geocoder.as_ref()).await?;
    Ok(Json(result).into_response())
}

async fn handle_now(State(state): State<AppState>) -> Handled {
    let dataset = state.store.current()?;
    let result =
        kinematics::locate_nearest(&dataset, chrono::Utc::now(), state.geocoder.as_ref()).await?;
    Ok(Json(result).into_response())
}

// ============ Help / health ============

pub const HELP_TEXT: &str = "usage: curl localhost:5000[<route>][?<query parameter>]

The different possible routes:
    /                                   Returns the entire data set
    /comment                            Returns the comment lines of the data set
    /header                             Returns the header of the data set
    /metadata                           Returns the metadata of the data set
    /epochs                             Returns the list of all Epochs in the data set
    /epochs/<epoch>                     Returns the state vectors for a specific Epoch from the data set
    /epochs/<epoch>/speed               Returns the instantaneous speed for a specific Epoch in the data set
    /epochs/<epoch>/location            Returns the latitude, longitude, altitude, and geoposition for a specific Epoch
    /now                                Returns the location and speed of the Epoch nearest to the current time
    /help                               Returns the help text that describes each route
    /health                             Returns the service status and version
    /delete-data                        Deletes all the data from the dictionary (DELETE)
    /post-data                          Reloads the dictionary with data from the website (POST)

The different query parameters (only works for the \"/epochs\" route):
    limit=<int>                         Returns a specific integer amount of Epochs from the data set
    offset=<int>                        Returns the entire data set starting offset by a certain integer amount
    limit=<int>'&'offset=<int>          Combining the limit and offset query parameters

    example:
    /epochs?limit=15'&'offset=3         Returns the 15 Epochs from the data set offset by 3
";

async fn handle_help() -> &'static str {
    HELP_TEXT
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
