//! Telemetry record types shared across the pipeline.
//!
//! [`RawReading`] is the transient producer-supplied sample. [`ProcessedReading`]
//! is the derived record the retention store keeps and the notification bus
//! fans out. [`DeviceStatus`] is the per-device last-known state, and
//! [`Prediction`] the output of the prediction engine.

use serde::{Deserialize, Serialize};

/// Coarse device link health classification, inferred from instantaneous
/// power output rather than actual network metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl std::fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

/// One raw telemetry sample as submitted by a harvesting device.
///
/// Carries no identity of its own; the pipeline attributes it to a device
/// and derives a [`ProcessedReading`] from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    /// Ambient temperature in °C.
    pub temperature: f64,
    /// Relative humidity in %.
    pub humidity: f64,
    /// Bus voltage in V.
    pub bus_voltage: f64,
    /// Current in mA (may be negative when charging).
    pub current: f64,
    /// Instantaneous power in mW.
    pub power: f64,
    /// Light sensor value on the raw 0-4095 ADC scale.
    pub light_value: f64,
    /// Free-text light condition label from the device firmware.
    pub light_status: String,
    /// Raw anemometer pulse count.
    pub wind_count: f64,
    /// Hour of day (0-23) reported by the device.
    pub hour: u8,
}

/// Fully derived, retained telemetry record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedReading {
    /// Generated unique identifier (UUID v4).
    pub id: String,
    /// ISO-8601 processing timestamp.
    pub timestamp: String,
    /// Processing timestamp as unix milliseconds (authoritative for range queries).
    pub timestamp_ms: u64,
    /// Device this reading is attributed to.
    pub device_id: String,

    pub temperature: f64,
    pub humidity: f64,
    pub bus_voltage: f64,
    pub current: f64,
    pub power: f64,
    pub light_value: f64,
    pub light_status: String,
    pub wind_count: f64,
    pub hour: u8,

    /// Battery charge estimate in [0, 100], derived from bus voltage.
    pub battery_level: f64,
    /// Solar conversion proxy in [0, 100].
    pub solar_efficiency: f64,
    /// Wind conversion proxy in [0, 100].
    pub wind_efficiency: f64,
    /// Rounded mean of solar and wind efficiency.
    pub total_efficiency: f64,
    /// Energy attributed to this one-reading time slice, in kWh.
    pub energy_harvested: f64,
    /// Cost savings in currency units.
    pub cost_savings: f64,
    /// Carbon offset in kg CO2-equivalent.
    pub carbon_offset: f64,

    pub online: bool,
    pub connection_quality: ConnectionQuality,

    /// Prediction attached at ingest time, if the engine produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
    /// Accuracy of the attached prediction versus actual power, in [0, 100].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_accuracy: Option<f64>,
    /// Actual total efficiency minus the predicted-efficiency proxy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency_vs_prediction: Option<f64>,
}

/// Per-device last-known state. Created on first reading from a device and
/// overwritten in place on every subsequent accepted reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub device_id: String,
    pub online: bool,
    /// ISO-8601 timestamp of the last accepted reading.
    pub last_seen: String,
    /// Last-seen time as unix milliseconds.
    pub last_seen_ms: u64,
    pub battery_level: f64,
    pub connection_quality: ConnectionQuality,
}

/// Which model path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// Daytime physics model with corrections.
    PhysicsModel,
    /// Night hours: always zero power, independent of other inputs.
    Night,
}

impl std::fmt::Display for PredictionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PhysicsModel => write!(f, "physics_model"),
            Self::Night => write!(f, "night"),
        }
    }
}

/// Output of the prediction engine for one hour of day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub source: PredictionSource,
    /// Temperature input consumed by the model, in °C.
    pub temperature: f64,
    /// Irradiance estimate resolved from the light-status label, in W/m².
    pub irradiance: f64,
    /// Humidity input consumed by the model, in %.
    pub humidity: f64,
    /// Target hour of day (0-23).
    pub hour: u8,
    /// Sine of the cyclical hour encoding.
    pub hour_sin: f64,
    /// Cosine of the cyclical hour encoding.
    pub hour_cos: f64,
    /// Predicted power output in mW, always >= 0.
    pub predicted_power: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_quality_display() {
        assert_eq!(ConnectionQuality::Excellent.to_string(), "excellent");
        assert_eq!(ConnectionQuality::Poor.to_string(), "poor");
    }

    #[test]
    fn test_raw_reading_json_field_names() {
        let raw = RawReading {
            temperature: 30.8,
            humidity: 73.7,
            bus_voltage: 5.2,
            current: -18.9,
            power: 98.0,
            light_value: 4095.0,
            light_status: "Light available, good for solar energy".to_string(),
            wind_count: 0.0,
            hour: 14,
        };
        let json = serde_json::to_value(&raw).unwrap();
        assert!(json.get("busVoltage").is_some());
        assert!(json.get("lightStatus").is_some());
        assert!(json.get("windCount").is_some());
        assert!(json.get("bus_voltage").is_none());
    }

    #[test]
    fn test_prediction_source_serializes_snake_case() {
        let json = serde_json::to_value(PredictionSource::PhysicsModel).unwrap();
        assert_eq!(json, serde_json::json!("physics_model"));
        let json = serde_json::to_value(PredictionSource::Night).unwrap();
        assert_eq!(json, serde_json::json!("night"));
    }

    #[test]
    fn test_processed_reading_omits_absent_prediction() {
        let reading = ProcessedReading {
            id: "r1".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            timestamp_ms: 0,
            device_id: "harvester-01".to_string(),
            temperature: 25.0,
            humidity: 50.0,
            bus_voltage: 3.7,
            current: 10.0,
            power: 120.0,
            light_value: 2000.0,
            light_status: "moderate".to_string(),
            wind_count: 3.0,
            hour: 12,
            battery_level: 50.0,
            solar_efficiency: 12.0,
            wind_efficiency: 15.0,
            total_efficiency: 14.0,
            energy_harvested: 0.0000333,
            cost_savings: 0.000004,
            carbon_offset: 0.00003,
            online: true,
            connection_quality: ConnectionQuality::Fair,
            prediction: None,
            prediction_accuracy: None,
            efficiency_vs_prediction: None,
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert!(json.get("prediction").is_none());
        assert!(json.get("predictionAccuracy").is_none());
        assert_eq!(json["connectionQuality"], serde_json::json!("fair"));
    }
}
