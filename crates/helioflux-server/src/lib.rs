//! HTTP boundary for the helioflux telemetry pipeline.
//!
//! Exposes ingestion, recency/range/statistics queries, device status, the
//! prediction endpoints, and a server-sent-events stream of newly processed
//! readings with periodic keep-alives.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use helioflux_core::{EnvironmentalInputs, IngestError, TelemetryPipeline};

/// How many queued readings a slow SSE client may fall behind by.
const STREAM_BUFFER: usize = 64;

/// Shared server state.
struct AppState {
    pipeline: Arc<TelemetryPipeline>,
    /// Pre-serialized processed readings fanned out to SSE clients.
    events: broadcast::Sender<String>,
}

#[derive(Deserialize)]
struct RecentParams {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct RangeParams {
    /// Inclusive start bound, unix milliseconds.
    start: u64,
    /// Inclusive end bound, unix milliseconds.
    end: u64,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    errors: Vec<String>,
}

async fn handle_ingest(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.pipeline.ingest(&body) {
        Ok(reading) => match serde_json::to_value(&reading) {
            Ok(json) => (StatusCode::OK, Json(json)),
            Err(e) => {
                log::error!("failed to serialize processed reading: {e}");
                internal_error()
            }
        },
        Err(IngestError::Validation(v)) => {
            let body = serde_json::json!(ErrorResponse {
                success: false,
                errors: v.violations,
            });
            (StatusCode::BAD_REQUEST, Json(body))
        }
    }
}

fn internal_error() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!(ErrorResponse {
            success: false,
            errors: vec!["internal error".to_string()],
        })),
    )
}

async fn handle_recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(20).clamp(1, 200);
    let readings = state.pipeline.store().latest(limit);
    Json(serde_json::json!({
        "count": readings.len(),
        "readings": readings,
    }))
}

async fn handle_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> (StatusCode, Json<serde_json::Value>) {
    if params.start > params.end {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!(ErrorResponse {
                success: false,
                errors: vec!["start must not exceed end".to_string()],
            })),
        );
    }
    let readings = state.pipeline.store().by_time_range(params.start, params.end);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "count": readings.len(),
            "readings": readings,
        })),
    )
}

async fn handle_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.pipeline.store().stats()))
}

async fn handle_trend(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.pipeline.store().trend()))
}

async fn handle_devices(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let devices = state.pipeline.tracker().all();
    Json(serde_json::json!({
        "count": devices.len(),
        "devices": devices,
    }))
}

/// Point-in-time snapshot equivalent to "latest reading + device status +
/// statistics", the simplified alternative to the SSE stream.
async fn handle_snapshot(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let latest = state.pipeline.store().latest(1).into_iter().next();
    Json(serde_json::json!({
        "latest": latest,
        "devices": state.pipeline.tracker().all(),
        "stats": state.pipeline.store().stats(),
    }))
}

async fn handle_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        // Lagged receivers drop missed readings and continue.
        msg.ok()
            .map(|json| Ok(Event::default().event("reading").data(json)))
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn handle_predict_current(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    prediction_response(state.pipeline.engine().predict_current())
}

async fn handle_predict_hour(
    State(state): State<Arc<AppState>>,
    Path(hour): Path<u8>,
) -> (StatusCode, Json<serde_json::Value>) {
    if hour > 23 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!(ErrorResponse {
                success: false,
                errors: vec!["hour must be between 0 and 23".to_string()],
            })),
        );
    }
    prediction_response(state.pipeline.engine().predict_for_hour(hour))
}

async fn handle_forecast(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let forecast = state.pipeline.engine().forecast_24h();
    Json(serde_json::json!({
        "hours": forecast.len(),
        "forecast": forecast,
    }))
}

async fn handle_predict_custom(
    State(state): State<Arc<AppState>>,
    Json(inputs): Json<EnvironmentalInputs>,
) -> (StatusCode, Json<serde_json::Value>) {
    if inputs.hour > 23 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!(ErrorResponse {
                success: false,
                errors: vec!["hour must be between 0 and 23".to_string()],
            })),
        );
    }
    prediction_response(state.pipeline.engine().predict_from_inputs(&inputs))
}

/// Predictions are best-effort: an absent prediction is a 200 with
/// `available: false`, not a server error.
fn prediction_response(
    prediction: Option<helioflux_core::Prediction>,
) -> (StatusCode, Json<serde_json::Value>) {
    match prediction {
        Some(p) => (
            StatusCode::OK,
            Json(serde_json::json!({ "available": true, "prediction": p })),
        ),
        None => (
            StatusCode::OK,
            Json(serde_json::json!({ "available": false, "prediction": null })),
        ),
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "readings": state.pipeline.store().count(),
        "capacity": state.pipeline.store().capacity(),
        "devices": state.pipeline.tracker().count(),
        "streamClients": state.events.receiver_count(),
    }))
}

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Helioflux Server",
        "version": helioflux_core::VERSION,
        "endpoints": {
            "/": "This API index",
            "/api/v1/readings": {
                "POST": "Ingest one raw reading (JSON object with the RawReading fields)",
                "GET": "Most recent readings; params: limit (1-200, default 20)",
            },
            "/api/v1/readings/range": "Readings in an inclusive unix-ms window; params: start, end",
            "/api/v1/stats": "Count and average temperature/power/efficiency",
            "/api/v1/trend": "Recent 10 vs older 10 efficiency comparison",
            "/api/v1/devices": "Last-known status per device",
            "/api/v1/snapshot": "Latest reading + devices + stats in one call",
            "/api/v1/stream": "SSE stream of processed readings (15s keep-alive)",
            "/api/v1/predict/current": "Prediction for the current hour",
            "/api/v1/predict/hour/{hour}": "Prediction for a specific hour (0-23)",
            "/api/v1/predict/forecast": "24-hour forecast",
            "/api/v1/predict": "POST environmental inputs for a custom prediction",
            "/health": "Health check",
        },
        "examples": {
            "ingest": "curl -X POST /api/v1/readings -H 'content-type: application/json' -d '{...}'",
            "recent": "/api/v1/readings?limit=10",
            "forecast": "/api/v1/predict/forecast",
        }
    }))
}

/// Build the axum router and wire the notification bus into the SSE
/// broadcast channel.
pub fn build_router(pipeline: Arc<TelemetryPipeline>) -> Router {
    let (events, _) = broadcast::channel::<String>(STREAM_BUFFER);

    // Bridge the synchronous bus into the async broadcast channel. Send
    // errors just mean no SSE client is currently connected.
    let tx = events.clone();
    pipeline.bus().subscribe(move |reading| {
        match serde_json::to_string(reading) {
            Ok(json) => {
                let _ = tx.send(json);
            }
            Err(e) => log::error!("failed to serialize reading for stream: {e}"),
        }
    });

    let state = Arc::new(AppState { pipeline, events });

    Router::new()
        .route("/", get(handle_index))
        .route("/api/v1/readings", post(handle_ingest).get(handle_recent))
        .route("/api/v1/readings/range", get(handle_range))
        .route("/api/v1/stats", get(handle_stats))
        .route("/api/v1/trend", get(handle_trend))
        .route("/api/v1/devices", get(handle_devices))
        .route("/api/v1/snapshot", get(handle_snapshot))
        .route("/api/v1/stream", get(handle_stream))
        .route("/api/v1/predict/current", get(handle_predict_current))
        .route("/api/v1/predict/hour/{hour}", get(handle_predict_hour))
        .route("/api/v1/predict/forecast", get(handle_forecast))
        .route("/api/v1/predict", post(handle_predict_custom))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Run the HTTP server until the process exits.
pub async fn run_server(
    pipeline: Arc<TelemetryPipeline>,
    host: &str,
    port: u16,
) -> std::io::Result<()> {
    let app = build_router(pipeline);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on {addr}");
    axum::serve(listener, app).await
}
