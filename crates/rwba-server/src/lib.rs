//! HTTP front end for the RWBA engine.
//!
//! Accepts analysis requests as JSON, runs them on the blocking pool, keeps
//! every completed session in an in-memory store and serves it back by id.
//! Field names on the wire follow the RWBA web client (`camelCase`
//! requests, `snake_case` records).

pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    extract::{self, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use rwba_core::sources::hardware;
use rwba_core::{
    AimMode, AnalysisConfig, DEFAULT_TRIAL_COUNT, EntropySource, EntropyStats, HardwareStatus,
    RwbaError, SessionRecord, SessionRequest, SimulatedSource, SourceConfig, WalkBoundary,
    diagnostics, run_session,
};

pub use store::SessionStore;

/// Largest session accepted over HTTP.
pub const MAX_TRIAL_COUNT: usize = 10_000;

/// Largest number of bits one HTTP session may draw, whatever the boundary.
pub const MAX_SESSION_BITS: usize = MAX_TRIAL_COUNT * WalkBoundary::DEFAULT.trial_len();

/// Largest `/test_entropy` draw.
pub const MAX_TEST_BITS: usize = 100_000_000;

const DEFAULT_TEST_BITS: usize = 1_000_000;

/// Shared server state.
struct AppState {
    sessions: SessionStore,
    hardware_library: PathBuf,
    qrng_available: bool,
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AnalyzeRequest {
    mode: Option<String>,
    entropy_source: Option<String>,
    trial_count: Option<usize>,
    bias_delta: Option<f64>,
    uploaded_bits: Option<String>,
    boundary: Option<usize>,
    /// Seed for the simulated source; omitted means OS-seeded.
    seed: Option<u64>,
}

impl AnalyzeRequest {
    /// Resolve the source and analysis parameters, rejecting anything the
    /// engine would refuse.
    ///
    /// Local files are not reachable from HTTP; `file` is a CLI-only source.
    fn into_session(
        self,
        hardware_library: &Path,
    ) -> Result<(SourceConfig, SessionRequest), ApiError> {
        let mode = match self.mode.as_deref() {
            Some(m) => m.parse::<AimMode>()?,
            None => AimMode::default(),
        };
        let trial_count = self.trial_count.unwrap_or(DEFAULT_TRIAL_COUNT);
        if trial_count > MAX_TRIAL_COUNT {
            return Err(ApiError::bad_request(format!(
                "trialCount {trial_count} exceeds the limit of {MAX_TRIAL_COUNT}"
            )));
        }
        let boundary = match self.boundary {
            Some(n) => WalkBoundary::new(n)?,
            None => WalkBoundary::DEFAULT,
        };
        // Recorded with every session, so checked whatever the source.
        let bias_delta = self.bias_delta.unwrap_or(0.0);
        if !(-0.5..=0.5).contains(&bias_delta) {
            return Err(ApiError::bad_request(format!(
                "biasDelta {bias_delta} outside [-0.5, 0.5]"
            )));
        }

        let source = match self.entropy_source.as_deref().unwrap_or("simulated") {
            "simulated" => SourceConfig::Simulated {
                bias_delta,
                seed: self.seed,
            },
            "qrng" => SourceConfig::Hardware {
                library: hardware_library.to_path_buf(),
                serial: None,
            },
            "uploaded" => match self.uploaded_bits {
                Some(bitstring) if !bitstring.is_empty() => SourceConfig::Uploaded { bitstring },
                _ => return Err(ApiError::invalid_source()),
            },
            _ => return Err(ApiError::invalid_source()),
        };

        let request = SessionRequest {
            analysis: AnalysisConfig {
                trial_count,
                mode,
                boundary,
                ..Default::default()
            },
            bias_delta,
            cancel: None,
        };
        let total_bits = request.analysis.total_bits();
        if total_bits > MAX_SESSION_BITS {
            return Err(ApiError::bad_request(format!(
                "session needs {total_bits} bits, over the limit of {MAX_SESSION_BITS}"
            )));
        }
        Ok((source, request))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TestEntropyRequest {
    bit_length: Option<usize>,
    bias_delta: Option<f64>,
}

#[derive(Debug, Serialize)]
struct TestEntropyResponse {
    #[serde(rename = "bitLength")]
    bit_length: usize,
    #[serde(rename = "biasDelta")]
    bias_delta: f64,
    entropy_stats: Option<EntropyStats>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    version: &'static str,
    qrng_available: bool,
    sessions: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error reply: `{"error": message}` with an HTTP status.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    fn invalid_source() -> Self {
        Self::bad_request("Invalid or missing entropy source.")
    }
}

impl From<RwbaError> for ApiError {
    fn from(err: RwbaError) -> Self {
        if err.is_caller_error() {
            Self::bad_request(err.to_string())
        } else {
            log::warn!("request failed: {err}");
            Self::internal(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        log::error!("analysis task failed: {err}");
        Self::internal("analysis task failed")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<SessionRecord>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        log::debug!("rejected /analyze body: {rejection}");
        ApiError::bad_request("Malformed request: missing or invalid fields.")
    })?;
    let (source_config, request) = body.into_session(&state.hardware_library)?;

    let record = tokio::task::spawn_blocking(move || {
        let source = source_config.build()?;
        run_session(source.as_ref(), &request)
    })
    .await??;

    state.sessions.insert(record.clone()).await;
    Ok(Json(record))
}

async fn handle_export(
    State(state): State<Arc<AppState>>,
    extract::Path(session_id): extract::Path<String>,
) -> Result<Json<SessionRecord>, ApiError> {
    state
        .sessions
        .get(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError {
            status: StatusCode::NOT_FOUND,
            message: "Session not found".into(),
        })
}

async fn handle_qrng_status(State(state): State<Arc<AppState>>) -> Json<HardwareStatus> {
    let library = state.hardware_library.clone();
    let status = tokio::task::spawn_blocking(move || hardware::probe(&library))
        .await
        .unwrap_or_else(|e| HardwareStatus {
            available: false,
            number_of_generators: 0,
            runtime_ok: false,
            library_initialized: false,
            error: Some(e.to_string()),
        });
    Json(status)
}

async fn handle_test_entropy(
    payload: Result<Json<TestEntropyRequest>, JsonRejection>,
) -> Result<Json<TestEntropyResponse>, ApiError> {
    let Json(body) = payload
        .map_err(|_| ApiError::bad_request("Malformed request: missing or invalid fields."))?;
    let bit_length = body.bit_length.unwrap_or(DEFAULT_TEST_BITS);
    let bias_delta = body.bias_delta.unwrap_or(0.0);
    if bit_length > MAX_TEST_BITS {
        return Err(ApiError::bad_request(format!(
            "bitLength {bit_length} exceeds the limit of {MAX_TEST_BITS}"
        )));
    }

    let entropy_stats = tokio::task::spawn_blocking(move || {
        let source = SimulatedSource::new(bias_delta, None)?;
        let bits = source.get_bits(bit_length).map_err(RwbaError::from)?;
        Ok::<_, RwbaError>(diagnostics(&bits))
    })
    .await??;

    Ok(Json(TestEntropyResponse {
        bit_length,
        bias_delta,
        entropy_stats,
    }))
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "RWBA backend running",
        version: rwba_core::VERSION,
        qrng_available: state.qrng_available,
        sessions: state.sessions.len().await,
    })
}

async fn handle_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Allow any origin, as the browser client is served from elsewhere.
async fn add_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    response
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/analyze", post(handle_analyze).options(handle_preflight))
        .route("/export/{session_id}", get(handle_export))
        .route("/qrng/status", get(handle_qrng_status))
        .route(
            "/test_entropy",
            post(handle_test_entropy).options(handle_preflight),
        )
        .route("/status", get(handle_status))
        .layer(middleware::map_response(add_cors))
        .with_state(state)
}

/// Build the router around an existing session store.
///
/// `hardware_library` is where `qrng` sessions load MeterFeeder from.
pub fn router(sessions: SessionStore, hardware_library: PathBuf) -> Router {
    let qrng_available = hardware::probe(&hardware_library).available;
    build_router(Arc::new(AppState {
        sessions,
        hardware_library,
        qrng_available,
    }))
}

/// Run the HTTP analysis server until the process is stopped.
pub async fn run_server(host: &str, port: u16, hardware_library: PathBuf) -> std::io::Result<()> {
    let app = router(SessionStore::new(), hardware_library);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("RWBA server listening on http://{addr}");
    axum::serve(listener, app).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            sessions: SessionStore::new(),
            hardware_library: PathBuf::from("/nonexistent/libmeterfeeder.so"),
            qrng_available: false,
        })
    }

    fn alternating_bits(trials: usize) -> String {
        (0..trials * WalkBoundary::DEFAULT.trial_len())
            .map(|i| if i % 2 == 0 { '1' } else { '0' })
            .collect()
    }

    async fn analyze(
        state: &Arc<AppState>,
        body: AnalyzeRequest,
    ) -> Result<Json<SessionRecord>, ApiError> {
        handle_analyze(State(Arc::clone(state)), Ok(Json(body))).await
    }

    #[tokio::test]
    async fn analyze_uploaded_then_export() {
        let state = test_state();
        let body = AnalyzeRequest {
            entropy_source: Some("uploaded".into()),
            uploaded_bits: Some(alternating_bits(2)),
            trial_count: Some(2),
            ..Default::default()
        };
        let Json(record) = analyze(&state, body).await.unwrap();
        assert_eq!(record.entropy_source, "uploaded");
        assert_eq!(record.p_values, vec![1.0, 1.0]);

        let Json(exported) = handle_export(
            State(Arc::clone(&state)),
            extract::Path(record.session_id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(exported.session_hash, record.session_hash);
        assert_eq!(state.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn analyze_simulated_defaults() {
        let state = test_state();
        let body = AnalyzeRequest {
            trial_count: Some(3),
            bias_delta: Some(0.01),
            seed: Some(5),
            ..Default::default()
        };
        let Json(record) = analyze(&state, body).await.unwrap();
        assert_eq!(record.entropy_source, "simulated");
        assert_eq!(record.mode, AimMode::NoAim);
        assert_eq!(record.bias_delta, 0.01);
        assert_eq!(record.trials.len(), 3);
    }

    #[tokio::test]
    async fn analyze_rejects_unknown_source() {
        let state = test_state();
        let body = AnalyzeRequest {
            entropy_source: Some("bogus".into()),
            ..Default::default()
        };
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid or missing entropy source.");
        assert!(state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn analyze_rejects_upload_without_bits() {
        let state = test_state();
        let body = AnalyzeRequest {
            entropy_source: Some("uploaded".into()),
            ..Default::default()
        };
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyze_rejects_bad_mode() {
        let state = test_state();
        let body = AnalyzeRequest {
            mode: Some("sideways".into()),
            ..Default::default()
        };
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyze_short_upload_is_bad_request() {
        let state = test_state();
        let body = AnalyzeRequest {
            entropy_source: Some("uploaded".into()),
            uploaded_bits: Some("0101".into()),
            trial_count: Some(1),
            ..Default::default()
        };
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("Not enough entropy bits provided"));
    }

    #[tokio::test]
    async fn analyze_missing_hardware_is_server_error() {
        let state = test_state();
        let body = AnalyzeRequest {
            entropy_source: Some("qrng".into()),
            trial_count: Some(1),
            ..Default::default()
        };
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn analyze_rejects_oversized_session() {
        let state = test_state();
        let body = AnalyzeRequest {
            trial_count: Some(MAX_TRIAL_COUNT + 1),
            ..Default::default()
        };
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyze_rejects_oversized_boundary() {
        let state = test_state();
        let body = AnalyzeRequest {
            boundary: Some(100_000),
            trial_count: Some(1),
            ..Default::default()
        };
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("over the limit"));

        let body = AnalyzeRequest {
            boundary: Some(usize::MAX),
            trial_count: Some(1),
            ..Default::default()
        };
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn analyze_small_boundary_within_limit() {
        let state = test_state();
        let body = AnalyzeRequest {
            boundary: Some(5),
            trial_count: Some(MAX_TRIAL_COUNT),
            seed: Some(3),
            ..Default::default()
        };
        let (_, request) = body.into_session(&state.hardware_library).unwrap();
        assert_eq!(request.analysis.total_bits(), MAX_TRIAL_COUNT * 21 * 25);
    }

    #[tokio::test]
    async fn analyze_file_source_is_not_served() {
        let state = test_state();
        let body: AnalyzeRequest = serde_json::from_value(serde_json::json!({
            "entropySource": "file",
            "filePath": "/etc/passwd",
            "trialCount": 1,
        }))
        .unwrap();
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid or missing entropy source.");
        assert!(state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn analyze_uploaded_records_requested_delta() {
        let state = test_state();
        let body = AnalyzeRequest {
            entropy_source: Some("uploaded".into()),
            uploaded_bits: Some(alternating_bits(1)),
            trial_count: Some(1),
            bias_delta: Some(0.05),
            ..Default::default()
        };
        let Json(record) = analyze(&state, body).await.unwrap();
        assert_eq!(record.entropy_source, "uploaded");
        assert_eq!(record.bias_delta, 0.05);

        let body = AnalyzeRequest {
            entropy_source: Some("uploaded".into()),
            uploaded_bits: Some(alternating_bits(1)),
            trial_count: Some(1),
            bias_delta: Some(0.7),
            ..Default::default()
        };
        let err = analyze(&state, body).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(state.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn export_unknown_session_is_not_found() {
        let err = handle_export(State(test_state()), extract::Path("nope".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Session not found");
    }

    #[tokio::test]
    async fn test_entropy_reports_stats() {
        let body = TestEntropyRequest {
            bit_length: Some(10_000),
            bias_delta: Some(0.0),
        };
        let Json(resp) = handle_test_entropy(Ok(Json(body))).await.unwrap();
        assert_eq!(resp.bit_length, 10_000);
        let stats = resp.entropy_stats.unwrap();
        assert_eq!(stats.length, 10_000);
        assert!((stats.mean - 0.5).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_entropy_rejects_bad_delta() {
        let body = TestEntropyRequest {
            bit_length: Some(10),
            bias_delta: Some(2.0),
        };
        let err = handle_test_entropy(Ok(Json(body))).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn qrng_status_without_library() {
        let Json(status) = handle_qrng_status(State(test_state())).await;
        assert!(!status.available);
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn status_reports_running() {
        let Json(status) = handle_status(State(test_state())).await;
        assert_eq!(status.status, "RWBA backend running");
        assert!(!status.qrng_available);
        assert_eq!(status.sessions, 0);
    }

    #[tokio::test]
    async fn cors_header_added() {
        let response = add_cors(Response::new(Body::empty())).await;
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn error_body_is_json() {
        let response = ApiError::bad_request("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
