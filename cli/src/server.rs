//! JSON API over the analysis pipeline.
//!
//! Routes:
//! - `POST /api/upload` - store a workbook (multipart `file`), list its sheets
//! - `POST /api/analyze` - summary, comparable metrics, column catalog, play count chart
//! - `POST /api/compare` - one metric charted across sheets
//! - `POST /api/preview` - first rows of the play table
//! - `POST /api/plays` - plays filtered by play type and/or sheet
//! - `POST /api/compare-plays` - the same play numbers across sheets
//! - `GET /api/health`
//!
//! The server keeps no per-user state: every request names the uploaded file
//! and the sheets to read. Uploads are stored under their original file name,
//! so two uploads with the same name overwrite each other.

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use gridiq::{
    chart::{self, ChartSpec},
    filter::PlayFilter,
    plays::PlayRows,
    sheet,
    summary::{self, Analysis},
    AnalysisMode, PlayDf, PlayType,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub upload_limit_mb: usize,
    /// While set, every route except health answers 503
    pub maintenance: bool,
}

#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Path of a previously uploaded workbook
    fn upload_path(&self, filename: &str) -> Result<PathBuf, ApiError> {
        let filename = sanitize_filename(filename)
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Invalid file name"))?;
        sheet::check_extension(Path::new(&filename))?;
        let path = self.config.upload_dir.join(&filename);
        if !path.is_file() {
            return Err(ApiError::new(
                StatusCode::NOT_FOUND,
                format!("File not found: {}", filename),
            ));
        }
        Ok(path)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Selection {
    filename: String,
    #[serde(default)]
    sheets: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(flatten)]
    selection: Selection,
    #[serde(default)]
    mode: AnalysisMode,
}

#[derive(Debug, Deserialize)]
struct CompareRequest {
    #[serde(flatten)]
    selection: Selection,
    metric: Option<String>,
    #[serde(default)]
    mode: AnalysisMode,
}

#[derive(Debug, Deserialize)]
struct PreviewRequest {
    #[serde(flatten)]
    selection: Selection,
    #[serde(default = "default_preview_limit")]
    limit: usize,
}

fn default_preview_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
struct PlaysRequest {
    #[serde(flatten)]
    selection: Selection,
    play_type: Option<String>,
    sheet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComparePlaysRequest {
    #[serde(flatten)]
    selection: Selection,
    plays: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    filename: String,
    sheets: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    maintenance: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<gridiq::Error> for ApiError {
    fn from(err: gridiq::Error) -> Self {
        use gridiq::Error;
        let status = match &err {
            Error::FileFormat(_)
            | Error::Workbook(_)
            | Error::SheetNotFound(_)
            | Error::NoSheetsLoaded => StatusCode::BAD_REQUEST,
            Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            Error::Io(_) | Error::Polars(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("{}", err);
        } else {
            log::warn!("{}", err);
        }
        ApiError::new(status, err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        log::error!("Analysis task failed: {}", err);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Analysis task failed")
    }
}

/// Strips any directory components a client sent along with a file name
fn sanitize_filename(name: &str) -> Option<String> {
    name.rsplit(|c| c == '/' || c == '\\')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
}

/// Loads the selected sheets and runs `work` on the blocking pool
async fn with_plays<T, F>(state: &AppState, selection: Selection, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(PlayDf) -> gridiq::Result<T> + Send + 'static,
{
    if selection.sheets.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "No sheets selected"));
    }
    let path = state.upload_path(&selection.filename)?;
    let sheets = selection.sheets;
    let result = tokio::task::spawn_blocking(move || PlayDf::load(&path, &sheets).and_then(work)).await?;
    Ok(result?)
}

// ============================================================================
// Handlers
// ============================================================================

async fn maintenance_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.config.maintenance {
        return ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "The site is down for maintenance",
        )
        .into_response();
    }
    next.run(request).await
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        maintenance: state.config.maintenance,
    })
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let invalid = |err: axum::extract::multipart::MultipartError| {
        ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", err))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .and_then(sanitize_filename)
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "No file selected"))?;
        sheet::check_extension(Path::new(&filename))?;
        let bytes = field.bytes().await.map_err(invalid)?;

        tokio::fs::create_dir_all(&state.config.upload_dir)
            .await
            .map_err(gridiq::Error::from)?;
        let path = state.config.upload_dir.join(&filename);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(gridiq::Error::from)?;
        log::info!("Stored upload {} ({} bytes)", filename, bytes.len());

        let listed = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || sheet::list_sheets(&path)).await?
        };
        let sheets = match listed {
            Ok(sheets) => sheets,
            Err(err) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    log::warn!("Could not remove {}: {}", path.display(), remove_err);
                }
                return Err(err.into());
            }
        };
        return Ok(Json(UploadResponse { filename, sheets }));
    }

    Err(ApiError::new(StatusCode::BAD_REQUEST, "No file part in upload"))
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<Analysis>, ApiError> {
    let mode = request.mode;
    let analysis = with_plays(&state, request.selection, move |plays| {
        summary::analyze(&plays, mode)
    })
    .await?;
    log::info!("Analyzed {} plays", analysis.total_plays);
    Ok(Json(analysis))
}

async fn compare(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<ChartSpec>, ApiError> {
    let CompareRequest {
        selection,
        metric,
        mode,
    } = request;
    let chart = with_plays(&state, selection, move |plays| {
        chart::compare(&plays, metric.as_deref(), mode)
    })
    .await?;
    Ok(Json(chart))
}

async fn preview(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PlayRows>, ApiError> {
    let limit = request.limit;
    let rows = with_plays(&state, request.selection, move |plays| plays.head_rows(limit)).await?;
    Ok(Json(rows))
}

async fn get_plays(
    State(state): State<AppState>,
    Json(request): Json<PlaysRequest>,
) -> Result<Json<PlayRows>, ApiError> {
    let play_type = request
        .play_type
        .as_deref()
        .map(str::parse::<PlayType>)
        .transpose()
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Play type must be Run, Pass, or Unknown"))?;

    let mut filter = PlayFilter::new();
    if let Some(play_type) = play_type {
        filter = filter.play_type(play_type);
    }
    if let Some(sheet) = &request.sheet {
        filter = filter.sheet(sheet);
    }
    let filter = filter.build();

    let rows = with_plays(&state, request.selection, move |plays| {
        plays.filter(filter)?.to_rows()
    })
    .await?;
    Ok(Json(rows))
}

async fn compare_plays(
    State(state): State<AppState>,
    Json(request): Json<ComparePlaysRequest>,
) -> Result<Json<PlayRows>, ApiError> {
    let play_numbers = request.plays;
    let rows = with_plays(&state, request.selection, move |plays| {
        plays
            .filter(PlayFilter::new().plays(&play_numbers).build())?
            .sorted_by_sheet()?
            .to_rows()
    })
    .await?;
    Ok(Json(rows))
}

pub fn router(config: ServerConfig) -> Router {
    let upload_limit_bytes = config.upload_limit_mb * 1024 * 1024;
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(upload_limit_bytes)),
        )
        .route("/api/analyze", post(analyze))
        .route("/api/compare", post(compare))
        .route("/api/preview", post(preview))
        .route("/api/plays", post(get_plays))
        .route("/api/compare-plays", post(compare_plays))
        .route_layer(middleware::from_fn_with_state(state.clone(), maintenance_guard))
        .route("/api/health", get(health))
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid host or port")?;

    if config.maintenance {
        log::warn!("Maintenance mode is on; API routes will answer 503");
    }
    log::info!(
        "Serving on http://{} (uploads in {}, limit {} MB)",
        addr,
        config.upload_dir.display(),
        config.upload_limit_mb
    );

    let app = router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
