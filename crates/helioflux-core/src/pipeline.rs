//! Telemetry processing pipeline.
//!
//! One accepted reading flows validation → derived metrics → retention
//! append → device status update → prediction attach → notification fan-out
//! → optional fire-and-forget persistence. Each reading is processed
//! atomically start-to-finish in arrival order; callers receive either a
//! fully processed reading or the full list of rejected constraints, never
//! a partially-applied state.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use serde_json::Value;
use uuid::Uuid;

use crate::bus::NotificationBus;
use crate::metrics::{self, MetricsConfig};
use crate::persist::{PersistJob, PersistenceGateway, spawn_writer};
use crate::predict::{
    EnvironmentalInputs, PredictionConfig, PredictionEngine, efficiency_vs_prediction,
    prediction_accuracy,
};
use crate::reading::{DeviceStatus, ProcessedReading, RawReading};
use crate::status::DeviceStatusTracker;
use crate::store::{self, RetentionStore};
use crate::time;
use crate::validate::{self, ValidationError};

/// Pipeline construction tunables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Retention store capacity in readings.
    pub capacity: usize,
    /// Device id attributed to readings that carry no `deviceId` field.
    pub default_device_id: String,
    pub metrics: MetricsConfig,
    pub prediction: PredictionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: store::DEFAULT_CAPACITY,
            default_device_id: "harvester-01".to_string(),
            metrics: MetricsConfig::default(),
            prediction: PredictionConfig::default(),
        }
    }
}

/// Why an ingestion request was rejected.
#[derive(Debug)]
pub enum IngestError {
    /// Malformed or out-of-range input; reported to the caller, not retried.
    Validation(ValidationError),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<ValidationError> for IngestError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

/// The assembled telemetry pipeline.
///
/// All shared state lives behind per-store locks, so a pipeline wrapped in
/// an [`Arc`] is safe to drive from multiple ingestion sources; readings
/// are appended in arrival order.
pub struct TelemetryPipeline {
    config: PipelineConfig,
    store: Arc<RetentionStore>,
    tracker: DeviceStatusTracker,
    bus: NotificationBus,
    engine: PredictionEngine,
    persist: Option<Sender<PersistJob>>,
}

impl TelemetryPipeline {
    /// Build a pipeline with no persistence (memory-only).
    pub fn new(config: PipelineConfig) -> Self {
        let store = Arc::new(RetentionStore::new(config.capacity));
        let engine = PredictionEngine::new(store.clone(), config.prediction.clone());
        Self {
            config,
            store,
            tracker: DeviceStatusTracker::new(),
            bus: NotificationBus::new(),
            engine,
            persist: None,
        }
    }

    /// Build a pipeline that persists through `gateway` on a background
    /// thread. Previously persisted readings and statuses are restored
    /// first; restore failures degrade to an empty store.
    pub fn with_gateway(config: PipelineConfig, gateway: Box<dyn PersistenceGateway>) -> Self {
        let pipeline = Self::new(config);

        match gateway.load_recent(pipeline.config.capacity) {
            Ok(restored) => {
                // load_recent returns oldest-first; append in arrival order.
                for reading in restored {
                    pipeline.tracker.update(DeviceStatus {
                        device_id: reading.device_id.clone(),
                        online: false,
                        last_seen: reading.timestamp.clone(),
                        last_seen_ms: reading.timestamp_ms,
                        battery_level: reading.battery_level,
                        connection_quality: reading.connection_quality,
                    });
                    pipeline.store.append(reading);
                }
                if !pipeline.store.is_empty() {
                    log::info!(
                        "restored {} readings from persistence",
                        pipeline.store.count()
                    );
                }
            }
            Err(e) => {
                log::warn!("persistence read-back failed, starting empty: {e}");
            }
        }

        Self {
            persist: Some(spawn_writer(gateway)),
            ..pipeline
        }
    }

    /// Process one raw inbound reading to completion.
    pub fn ingest(&self, raw: &Value) -> Result<ProcessedReading, IngestError> {
        let raw_reading = validate::validate(raw)?;
        let device_id = raw
            .get("deviceId")
            .and_then(Value::as_str)
            .unwrap_or(&self.config.default_device_id)
            .to_string();

        let reading = self.process(raw_reading, device_id);

        self.store.append(reading.clone());
        self.tracker.update(DeviceStatus {
            device_id: reading.device_id.clone(),
            online: true,
            last_seen: reading.timestamp.clone(),
            last_seen_ms: reading.timestamp_ms,
            battery_level: reading.battery_level,
            connection_quality: reading.connection_quality,
        });
        self.bus.publish(&reading);

        if let Some(tx) = &self.persist {
            // Fire-and-forget: a dead writer thread is logged, never fatal.
            if tx.send(PersistJob::Reading(reading.clone())).is_err() {
                log::warn!("persistence writer gone, continuing in memory-only mode");
            } else if let Some(status) = self.tracker.get(&reading.device_id)
                && tx.send(PersistJob::Status(status)).is_err()
            {
                log::warn!("persistence writer gone, continuing in memory-only mode");
            }
        }

        Ok(reading)
    }

    /// Derive a [`ProcessedReading`] from a validated raw reading. Pure
    /// except for the clock, id generation, and the best-effort prediction.
    fn process(&self, raw: RawReading, device_id: String) -> ProcessedReading {
        let now_ms = time::unix_ms_now();
        let metrics_cfg = &self.config.metrics;

        let battery_level = metrics::battery_level(raw.bus_voltage);
        let solar_efficiency = metrics::solar_efficiency(raw.power, &raw.light_status, metrics_cfg);
        let wind_efficiency = metrics::wind_efficiency(raw.wind_count, metrics_cfg);
        let total_efficiency = metrics::total_efficiency(solar_efficiency, wind_efficiency);
        let energy_harvested = metrics::energy_harvested(raw.power);
        let connection_quality = metrics::connection_quality(raw.power);

        // Prediction is best-effort and optional.
        let prediction = self.engine.predict_from_inputs(&EnvironmentalInputs {
            temperature: raw.temperature,
            humidity: raw.humidity,
            light_status: raw.light_status.clone(),
            wind_count: raw.wind_count,
            hour: raw.hour,
        });
        let prediction_accuracy = prediction
            .as_ref()
            .map(|p| prediction_accuracy(raw.power, p.predicted_power));
        let efficiency_delta = prediction
            .as_ref()
            .map(|p| efficiency_vs_prediction(total_efficiency, p.predicted_power, metrics_cfg));

        ProcessedReading {
            id: Uuid::new_v4().to_string(),
            timestamp: time::format_iso8601(now_ms),
            timestamp_ms: now_ms,
            device_id,
            temperature: raw.temperature,
            humidity: raw.humidity,
            bus_voltage: raw.bus_voltage,
            current: raw.current,
            power: raw.power,
            light_value: raw.light_value,
            light_status: raw.light_status,
            wind_count: raw.wind_count,
            hour: raw.hour,
            battery_level,
            solar_efficiency,
            wind_efficiency,
            total_efficiency,
            energy_harvested,
            cost_savings: metrics::cost_savings(energy_harvested, metrics_cfg),
            carbon_offset: metrics::carbon_offset(energy_harvested, metrics_cfg),
            online: true,
            connection_quality,
            prediction,
            prediction_accuracy,
            efficiency_vs_prediction: efficiency_delta,
        }
    }

    /// Retention store backing this pipeline.
    pub fn store(&self) -> &RetentionStore {
        &self.store
    }

    /// Device status tracker.
    pub fn tracker(&self) -> &DeviceStatusTracker {
        &self.tracker
    }

    /// Notification bus for processed-reading fan-out.
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Prediction engine reading this pipeline's history.
    pub fn engine(&self) -> &PredictionEngine {
        &self.engine
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
