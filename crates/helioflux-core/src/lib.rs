//! # helioflux-core
//!
//! **Telemetry pipeline and power prediction for solar/wind harvesting devices.**
//!
//! `helioflux-core` ingests periodic environmental/power telemetry from a
//! harvesting device, derives operational metrics (efficiency, energy, cost,
//! carbon offset), retains a bounded recent history in memory, fans updates
//! out to observers, and produces short-horizon power predictions from a
//! lightweight physical model corrected by recent history.
//!
//! ## Quick Start
//!
//! ```no_run
//! use helioflux_core::{PipelineConfig, TelemetryPipeline};
//!
//! let pipeline = TelemetryPipeline::new(PipelineConfig::default());
//!
//! let reading = pipeline.ingest(&serde_json::json!({
//!     "temperature": 30.8, "humidity": 73.7, "busVoltage": 5.2,
//!     "current": -18.9, "power": 98.0, "lightValue": 4095,
//!     "lightStatus": "Light available, good for solar energy",
//!     "windCount": 0, "hour": 14
//! })).expect("valid reading");
//! println!("total efficiency: {}", reading.total_efficiency);
//!
//! // On-demand 24-hour forecast from the same history.
//! for p in pipeline.engine().forecast_24h() {
//!     println!("hour {:02}: {} mW", p.hour, p.predicted_power);
//! }
//! ```
//!
//! ## Architecture
//!
//! Raw reading → Validator → Metrics → Retention Store + Status Tracker →
//! Notification Bus → optional Persistence Gateway (fire-and-forget).
//!
//! The prediction engine is invoked on demand, reading the retention store
//! for its historical adjustment and keeping its own hour-keyed TTL cache.
//! Predictions are best-effort: a failed estimate is logged and absent,
//! never an error. A persistence failure degrades the pipeline to
//! memory-only mode; it never fails ingestion.

pub mod bus;
pub mod cache;
pub mod metrics;
pub mod persist;
pub mod pipeline;
pub mod predict;
pub mod reading;
pub mod status;
pub mod store;
pub mod time;
pub mod validate;

pub use bus::{NotificationBus, SubscriptionId};
pub use cache::TtlCache;
pub use metrics::MetricsConfig;
pub use persist::{JsonlGateway, PersistJob, PersistenceGateway, spawn_writer};
pub use pipeline::{IngestError, PipelineConfig, TelemetryPipeline};
pub use predict::{
    EnvironmentalInputs, PredictionConfig, PredictionEngine, efficiency_vs_prediction,
    is_night_hour, prediction_accuracy,
};
pub use reading::{
    ConnectionQuality, DeviceStatus, Prediction, PredictionSource, ProcessedReading, RawReading,
};
pub use status::DeviceStatusTracker;
pub use store::{DEFAULT_CAPACITY, RetentionStore, StoreStats, TrendDirection, TrendReport};
pub use validate::{ValidationError, validate};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
