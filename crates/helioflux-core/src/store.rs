//! Bounded in-memory history of processed readings.
//!
//! Most-recent-first ordering, strict FIFO eviction beyond capacity. This
//! store is the sole source of historical context for the prediction
//! engine's adjustment step and for the trend/statistics queries exposed at
//! the query boundary.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::reading::ProcessedReading;

/// Default retained-reading capacity.
pub const DEFAULT_CAPACITY: usize = 200;

/// How many readings each side of the trend comparison uses.
const TREND_WINDOW: usize = 10;

/// Thread-safe fixed-capacity retention store.
pub struct RetentionStore {
    readings: Mutex<VecDeque<ProcessedReading>>,
    capacity: usize,
}

/// Aggregate statistics over every retained reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub count: usize,
    pub avg_temperature: f64,
    pub avg_power: f64,
    pub avg_efficiency: f64,
}

/// Direction of the recent-versus-older efficiency comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    /// Not enough history for a meaningful comparison.
    Insufficient,
}

/// Comparison of the 10 most recent readings against the 10 before them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub direction: TrendDirection,
    pub recent_avg_efficiency: f64,
    pub previous_avg_efficiency: f64,
    /// Recent minus previous average efficiency, in points.
    pub change: f64,
    pub recent_samples: usize,
    pub previous_samples: usize,
}

impl RetentionStore {
    /// Create a store holding at most `capacity` readings.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a reading at the head (newest) and evict beyond capacity.
    pub fn append(&self, reading: ProcessedReading) {
        let mut readings = self.readings.lock().unwrap();
        readings.push_front(reading);
        readings.truncate(self.capacity);
    }

    /// The `n` most recent readings, most-recent-first.
    pub fn latest(&self, n: usize) -> Vec<ProcessedReading> {
        let readings = self.readings.lock().unwrap();
        readings.iter().take(n).cloned().collect()
    }

    /// Every retained reading, most-recent-first.
    pub fn all(&self) -> Vec<ProcessedReading> {
        let readings = self.readings.lock().unwrap();
        readings.iter().cloned().collect()
    }

    /// Readings whose timestamp falls within the inclusive `[start_ms, end_ms]`
    /// bounds, in the store's natural most-recent-first order.
    pub fn by_time_range(&self, start_ms: u64, end_ms: u64) -> Vec<ProcessedReading> {
        let readings = self.readings.lock().unwrap();
        readings
            .iter()
            .filter(|r| r.timestamp_ms >= start_ms && r.timestamp_ms <= end_ms)
            .cloned()
            .collect()
    }

    /// Number of retained readings.
    pub fn count(&self) -> usize {
        self.readings.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Mean total efficiency of retained readings whose recorded hour is
    /// within `tolerance` of `hour`. `None` when no reading qualifies.
    /// Used by the prediction engine's historical adjustment.
    pub fn mean_efficiency_near_hour(&self, hour: u8, tolerance: u8) -> Option<f64> {
        let readings = self.readings.lock().unwrap();
        let mut sum = 0.0;
        let mut n = 0usize;
        for r in readings.iter() {
            if (i16::from(r.hour) - i16::from(hour)).abs() <= i16::from(tolerance) {
                sum += r.total_efficiency;
                n += 1;
            }
        }
        if n == 0 { None } else { Some(sum / n as f64) }
    }

    /// Aggregate count and averages over every retained reading.
    pub fn stats(&self) -> StoreStats {
        let readings = self.readings.lock().unwrap();
        let count = readings.len();
        if count == 0 {
            return StoreStats {
                count: 0,
                avg_temperature: 0.0,
                avg_power: 0.0,
                avg_efficiency: 0.0,
            };
        }
        let n = count as f64;
        StoreStats {
            count,
            avg_temperature: readings.iter().map(|r| r.temperature).sum::<f64>() / n,
            avg_power: readings.iter().map(|r| r.power).sum::<f64>() / n,
            avg_efficiency: readings.iter().map(|r| r.total_efficiency).sum::<f64>() / n,
        }
    }

    /// Compare the 10 most recent readings against the 10 before them.
    ///
    /// An average-efficiency change within ±2 points reports `Stable`;
    /// fewer than 2 readings in either window reports `Insufficient`.
    pub fn trend(&self) -> TrendReport {
        let readings = self.readings.lock().unwrap();
        let recent: Vec<f64> = readings
            .iter()
            .take(TREND_WINDOW)
            .map(|r| r.total_efficiency)
            .collect();
        let previous: Vec<f64> = readings
            .iter()
            .skip(TREND_WINDOW)
            .take(TREND_WINDOW)
            .map(|r| r.total_efficiency)
            .collect();
        drop(readings);

        let mean = |v: &[f64]| {
            if v.is_empty() {
                0.0
            } else {
                v.iter().sum::<f64>() / v.len() as f64
            }
        };
        let recent_avg = mean(&recent);
        let previous_avg = mean(&previous);
        let change = recent_avg - previous_avg;

        let direction = if recent.len() < 2 || previous.len() < 2 {
            TrendDirection::Insufficient
        } else if change > 2.0 {
            TrendDirection::Improving
        } else if change < -2.0 {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        TrendReport {
            direction,
            recent_avg_efficiency: recent_avg,
            previous_avg_efficiency: previous_avg,
            change,
            recent_samples: recent.len(),
            previous_samples: previous.len(),
        }
    }
}

impl Default for RetentionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::ConnectionQuality;

    fn reading(id: &str, hour: u8, efficiency: f64, timestamp_ms: u64) -> ProcessedReading {
        ProcessedReading {
            id: id.to_string(),
            timestamp: crate::time::format_iso8601(timestamp_ms),
            timestamp_ms,
            device_id: "harvester-01".to_string(),
            temperature: 25.0,
            humidity: 50.0,
            bus_voltage: 3.9,
            current: 10.0,
            power: 200.0,
            light_value: 2000.0,
            light_status: "moderate".to_string(),
            wind_count: 2.0,
            hour,
            battery_level: 70.0,
            solar_efficiency: efficiency,
            wind_efficiency: efficiency,
            total_efficiency: efficiency,
            energy_harvested: 0.0,
            cost_savings: 0.0,
            carbon_offset: 0.0,
            online: true,
            connection_quality: ConnectionQuality::Fair,
            prediction: None,
            prediction_accuracy: None,
            efficiency_vs_prediction: None,
        }
    }

    // -----------------------------------------------------------------------
    // Capacity & ordering
    // -----------------------------------------------------------------------

    #[test]
    fn test_append_is_most_recent_first() {
        let store = RetentionStore::new(10);
        store.append(reading("a", 10, 10.0, 1000));
        store.append(reading("b", 10, 20.0, 2000));
        store.append(reading("c", 10, 30.0, 3000));
        let all = store.all();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let store = RetentionStore::new(5);
        for i in 0..50 {
            store.append(reading(&format!("r{i}"), 10, 10.0, i));
            assert!(store.count() <= 5, "store exceeded capacity");
        }
        assert_eq!(store.count(), 5);
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let store = RetentionStore::new(3);
        for i in 0..5u64 {
            store.append(reading(&format!("r{i}"), 10, 10.0, i));
        }
        let ids: Vec<String> = store.all().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r4", "r3", "r2"]);
    }

    #[test]
    fn test_latest_limits_and_orders() {
        let store = RetentionStore::new(10);
        for i in 0..6u64 {
            store.append(reading(&format!("r{i}"), 10, 10.0, i));
        }
        let latest = store.latest(2);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].id, "r5");
        assert_eq!(latest[1].id, "r4");
        // Asking for more than retained returns what exists.
        assert_eq!(store.latest(100).len(), 6);
    }

    // -----------------------------------------------------------------------
    // Time range
    // -----------------------------------------------------------------------

    #[test]
    fn test_by_time_range_inclusive() {
        let store = RetentionStore::new(10);
        store.append(reading("a", 10, 10.0, 1000));
        store.append(reading("b", 10, 10.0, 2000));
        store.append(reading("c", 10, 10.0, 3000));
        let hits = store.by_time_range(1000, 2000);
        let ids: Vec<String> = hits.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(store.by_time_range(4000, 5000).is_empty());
    }

    // -----------------------------------------------------------------------
    // Hour-window efficiency
    // -----------------------------------------------------------------------

    #[test]
    fn test_mean_efficiency_near_hour() {
        let store = RetentionStore::new(10);
        store.append(reading("a", 11, 10.0, 1));
        store.append(reading("b", 12, 20.0, 2));
        store.append(reading("c", 13, 30.0, 3));
        store.append(reading("d", 5, 90.0, 4));
        let mean = store.mean_efficiency_near_hour(12, 1).unwrap();
        assert!((mean - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_efficiency_empty_window() {
        let store = RetentionStore::new(10);
        store.append(reading("a", 5, 90.0, 1));
        assert!(store.mean_efficiency_near_hour(12, 1).is_none());
        let empty = RetentionStore::new(10);
        assert!(empty.mean_efficiency_near_hour(12, 1).is_none());
    }

    // -----------------------------------------------------------------------
    // Stats & trend
    // -----------------------------------------------------------------------

    #[test]
    fn test_stats_empty() {
        let store = RetentionStore::default();
        let stats = store.stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.avg_power, 0.0);
    }

    #[test]
    fn test_stats_averages() {
        let store = RetentionStore::new(10);
        store.append(reading("a", 10, 10.0, 1));
        store.append(reading("b", 10, 30.0, 2));
        let stats = store.stats();
        assert_eq!(stats.count, 2);
        assert!((stats.avg_efficiency - 20.0).abs() < 1e-9);
        assert!((stats.avg_temperature - 25.0).abs() < 1e-9);
        assert!((stats.avg_power - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_insufficient_history() {
        let store = RetentionStore::new(50);
        store.append(reading("a", 10, 10.0, 1));
        assert_eq!(store.trend().direction, TrendDirection::Insufficient);
    }

    #[test]
    fn test_trend_improving() {
        let store = RetentionStore::new(50);
        for i in 0..10u64 {
            store.append(reading(&format!("old{i}"), 10, 10.0, i));
        }
        for i in 0..10u64 {
            store.append(reading(&format!("new{i}"), 10, 40.0, 100 + i));
        }
        let trend = store.trend();
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert!((trend.recent_avg_efficiency - 40.0).abs() < 1e-9);
        assert!((trend.previous_avg_efficiency - 10.0).abs() < 1e-9);
        assert_eq!(trend.recent_samples, 10);
        assert_eq!(trend.previous_samples, 10);
    }

    #[test]
    fn test_trend_stable_within_threshold() {
        let store = RetentionStore::new(50);
        for i in 0..10u64 {
            store.append(reading(&format!("old{i}"), 10, 20.0, i));
        }
        for i in 0..10u64 {
            store.append(reading(&format!("new{i}"), 10, 21.0, 100 + i));
        }
        assert_eq!(store.trend().direction, TrendDirection::Stable);
    }
}
