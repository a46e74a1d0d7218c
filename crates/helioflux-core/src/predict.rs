//! Short-horizon power prediction.
//!
//! A deterministic physical model corrected by environment and recent
//! history, not a trained model. Two modes, selected purely by hour of day:
//! night hours always yield a zero-power prediction tagged
//! [`PredictionSource::Night`]; daytime hours run the physics model:
//!
//! 1. irradiance estimate from the light-status label (with per-bucket jitter)
//! 2. base power = irradiance × panel efficiency × panel area × time-of-day factor
//! 3. temperature, humidity and wind correction factors
//! 4. historical adjustment from retained readings near the target hour
//! 5. bounded random variation, clamp to >= 0, round to 2 decimals
//!
//! Predictions are best-effort: any internal fault is logged and surfaced
//! as `None`, never propagated. Hour-keyed results are cached for 5 minutes.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cache::TtlCache;
use crate::metrics::MetricsConfig;
use crate::reading::{Prediction, PredictionSource};
use crate::store::RetentionStore;
use crate::time;

/// First night hour (inclusive).
const NIGHT_START_HOUR: u8 = 18;
/// First daytime hour (inclusive).
const NIGHT_END_HOUR: u8 = 6;

/// Irradiance assumed for light-status labels no bucket matches, in W/m².
const DEFAULT_IRRADIANCE: f64 = 400.0;

/// Tunable constants for the prediction model.
///
/// The panel constants and baseline efficiency are calibration values for
/// one particular harvester, not physical truths; recalibrate for other
/// hardware.
#[derive(Debug, Clone)]
pub struct PredictionConfig {
    /// Panel conversion efficiency (fraction).
    pub panel_efficiency: f64,
    /// Panel area in m².
    pub panel_area_m2: f64,
    /// Assumed baseline total efficiency the historical adjustment is
    /// normalized against, in points.
    pub baseline_efficiency: f64,
    /// Power derating per °C above 25 °C (negative).
    pub temperature_coefficient: f64,
    /// How long a cached hourly prediction stays valid.
    pub cache_ttl: Duration,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            panel_efficiency: 0.15,
            panel_area_m2: 0.13,
            baseline_efficiency: 15.0,
            temperature_coefficient: -0.004,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Environmental inputs for an on-demand prediction, either supplied by a
/// caller or synthesized as an hour-of-day proxy reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalInputs {
    pub temperature: f64,
    pub humidity: f64,
    #[serde(default = "default_light_status")]
    pub light_status: String,
    #[serde(default)]
    pub wind_count: f64,
    pub hour: u8,
}

fn default_light_status() -> String {
    "moderate".to_string()
}

/// Prediction engine over the retention store's recent history.
pub struct PredictionEngine {
    config: PredictionConfig,
    store: Arc<RetentionStore>,
    cache: TtlCache<u8, Prediction>,
}

impl PredictionEngine {
    /// Create an engine reading historical context from `store`.
    pub fn new(store: Arc<RetentionStore>, config: PredictionConfig) -> Self {
        let cache = TtlCache::new(config.cache_ttl);
        Self {
            config,
            store,
            cache,
        }
    }

    /// Predict for the current wall-clock hour. Cached.
    pub fn predict_current(&self) -> Option<Prediction> {
        self.predict_for_hour(time::current_hour())
    }

    /// Predict for a specific hour of day, synthesizing proxy environmental
    /// inputs from the most recent retained reading (or defaults). A cached
    /// result younger than the TTL is reused; expired entries are recomputed.
    pub fn predict_for_hour(&self, hour: u8) -> Option<Prediction> {
        if hour > 23 {
            log::warn!("prediction requested for invalid hour {hour}");
            return None;
        }
        if let Some(cached) = self.cache.get(&hour) {
            return Some(cached);
        }
        let inputs = self.proxy_inputs(hour);
        let prediction = self.estimate(&inputs)?;
        self.cache.put(hour, prediction.clone());
        Some(prediction)
    }

    /// Predict every hour of the day, most useful as a 24-hour forecast.
    pub fn forecast_24h(&self) -> Vec<Prediction> {
        (0..24).filter_map(|h| self.predict_for_hour(h)).collect()
    }

    /// Predict from caller-supplied environmental inputs. Not cached, since
    /// the inputs are specific to the caller rather than the hour bucket.
    pub fn predict_from_inputs(&self, inputs: &EnvironmentalInputs) -> Option<Prediction> {
        if inputs.hour > 23 {
            log::warn!("prediction requested for invalid hour {}", inputs.hour);
            return None;
        }
        self.estimate(inputs)
    }

    /// Discard expired cache entries. Returns how many were removed.
    pub fn sweep_cache(&self) -> usize {
        self.cache.sweep()
    }

    /// Number of cached hourly predictions (including not-yet-swept expired ones).
    pub fn cached_predictions(&self) -> usize {
        self.cache.len()
    }

    /// Synthesize proxy inputs for an hour-only prediction from the most
    /// recent retained reading, falling back to neutral defaults.
    fn proxy_inputs(&self, hour: u8) -> EnvironmentalInputs {
        match self.store.latest(1).into_iter().next() {
            Some(r) => EnvironmentalInputs {
                temperature: r.temperature,
                humidity: r.humidity,
                light_status: r.light_status,
                wind_count: r.wind_count,
                hour,
            },
            None => EnvironmentalInputs {
                temperature: 25.0,
                humidity: 50.0,
                light_status: default_light_status(),
                wind_count: 0.0,
                hour,
            },
        }
    }

    /// Run the model. Faults surface as `None`, never as errors.
    fn estimate(&self, inputs: &EnvironmentalInputs) -> Option<Prediction> {
        let prediction = self.compute(inputs);
        if !prediction.predicted_power.is_finite() {
            log::warn!(
                "prediction for hour {} produced non-finite power; treating as unavailable",
                inputs.hour
            );
            return None;
        }
        Some(prediction)
    }

    fn compute(&self, inputs: &EnvironmentalInputs) -> Prediction {
        let hour = inputs.hour;
        let hour_angle = 2.0 * PI * f64::from(hour) / 24.0;
        let (hour_sin, hour_cos) = (hour_angle.sin(), hour_angle.cos());

        if is_night_hour(hour) {
            return Prediction {
                source: PredictionSource::Night,
                temperature: inputs.temperature,
                irradiance: 0.0,
                humidity: inputs.humidity,
                hour,
                hour_sin,
                hour_cos,
                predicted_power: 0.0,
            };
        }

        let irradiance = irradiance_estimate(&inputs.light_status);

        // Peaks at solar noon (hour 12).
        let time_factor = ((f64::from(hour) - 12.0) * PI / 12.0).cos() * 0.3 + 0.7;
        let base =
            irradiance * self.config.panel_efficiency * self.config.panel_area_m2 * time_factor;

        let temperature_factor =
            1.0 + self.config.temperature_coefficient * (inputs.temperature - 25.0);
        let humidity_factor = 1.0 - (inputs.humidity / 100.0) * 0.05;
        let wind_factor = if inputs.wind_count < 5.0 {
            1.0
        } else if inputs.wind_count <= 15.0 {
            1.02
        } else {
            0.98
        };
        let historical = self.historical_adjustment(hour);

        let variation = rand::rng().random_range(0.85..=1.15);
        let power = base * temperature_factor * humidity_factor * wind_factor * historical
            * variation;
        let predicted_power = (power.max(0.0) * 100.0).round() / 100.0;

        Prediction {
            source: PredictionSource::PhysicsModel,
            temperature: inputs.temperature,
            irradiance,
            humidity: inputs.humidity,
            hour,
            hour_sin,
            hour_cos,
            predicted_power,
        }
    }

    /// Correction factor from retained readings recorded within ±1 hour of
    /// the target. Mean total efficiency normalized against the assumed
    /// baseline, clamped to [0.7, 1.3]; 1.0 when no history qualifies.
    fn historical_adjustment(&self, hour: u8) -> f64 {
        match self.store.mean_efficiency_near_hour(hour, 1) {
            Some(mean) => (mean / self.config.baseline_efficiency).clamp(0.7, 1.3),
            None => 1.0,
        }
    }
}

/// Whether an hour falls in the night mode window.
pub fn is_night_hour(hour: u8) -> bool {
    hour >= NIGHT_START_HOUR || hour < NIGHT_END_HOUR
}

/// Resolve an irradiance estimate (W/m²) from a free-text light-status
/// label. Buckets carry random jitter; unrecognized labels fall back to
/// [`DEFAULT_IRRADIANCE`].
fn irradiance_estimate(light_status: &str) -> f64 {
    let label = light_status.to_lowercase();
    let mut rng = rand::rng();
    if label.contains("bright") {
        rng.random_range(800.0..=1000.0)
    } else if label.contains("good") {
        rng.random_range(600.0..=750.0)
    } else if label.contains("moderate") {
        rng.random_range(400.0..=500.0)
    } else if label.contains("low") {
        rng.random_range(200.0..=300.0)
    } else {
        DEFAULT_IRRADIANCE
    }
}

/// Prediction accuracy versus the actual power, in [0, 100].
///
/// Special cases for a zero prediction: 100 when the actual is also zero,
/// else 0.
pub fn prediction_accuracy(actual_mw: f64, predicted_mw: f64) -> f64 {
    if predicted_mw == 0.0 {
        return if actual_mw == 0.0 { 100.0 } else { 0.0 };
    }
    (100.0 - (actual_mw - predicted_mw).abs() / predicted_mw * 100.0).max(0.0)
}

/// Actual total efficiency minus the predicted-efficiency proxy, where the
/// proxy normalizes predicted power the same way the solar-efficiency
/// metric normalizes actual power.
pub fn efficiency_vs_prediction(
    actual_total_efficiency: f64,
    predicted_mw: f64,
    metrics: &MetricsConfig,
) -> f64 {
    let predicted_efficiency = (predicted_mw / metrics.solar_norm * 100.0).min(100.0);
    actual_total_efficiency - predicted_efficiency
}
