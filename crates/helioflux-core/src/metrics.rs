//! Pure derived-metric functions.
//!
//! Every function here is a deterministic mapping from a validated reading
//! (plus tunables) to a derived field with no randomness, no clock, no external
//! calls. The scale constants are tunable normalizations, not physical
//! truths; they live in [`MetricsConfig`] so other hardware can recalibrate.

use serde::{Deserialize, Serialize};

use crate::reading::ConnectionQuality;

/// Tunable constants for the derived-metric computations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Electricity price in currency units per kWh.
    pub unit_rate: f64,
    /// Grid carbon intensity in kg CO2-equivalent per kWh.
    pub carbon_factor: f64,
    /// Wind signal that maps to 100% wind efficiency, in raw counts.
    pub wind_norm: f64,
    /// Power that maps to 100% solar efficiency, in mW.
    pub solar_norm: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            unit_rate: 0.12,
            carbon_factor: 0.92,
            wind_norm: 20.0,
            solar_norm: 1000.0,
        }
    }
}

/// Battery charge estimate in [0, 100] from bus voltage.
///
/// Piecewise-linear over a Li-ion style discharge curve: 3.0 V → 0%,
/// 3.7 V → 50%, 4.2 V → 100%. Values outside the band clamp.
pub fn battery_level(bus_voltage: f64) -> f64 {
    if bus_voltage >= 4.2 {
        100.0
    } else if bus_voltage >= 3.7 {
        50.0 + (bus_voltage - 3.7) / (4.2 - 3.7) * 50.0
    } else if bus_voltage >= 3.0 {
        (bus_voltage - 3.0) / (3.7 - 3.0) * 50.0
    } else {
        0.0
    }
}

/// Whether a free-text light-status label indicates light usable for
/// solar generation.
pub fn light_usable(light_status: &str) -> bool {
    let s = light_status.to_lowercase();
    s.contains("available") || s.contains("bright") || s.contains("good")
}

/// Solar conversion proxy in [0, 100].
///
/// Zero unless there is positive power and usable light; otherwise power
/// normalized against `solar_norm` mW.
pub fn solar_efficiency(power_mw: f64, light_status: &str, config: &MetricsConfig) -> f64 {
    if power_mw <= 0.0 || !light_usable(light_status) {
        return 0.0;
    }
    (power_mw / config.solar_norm * 100.0).min(100.0)
}

/// Wind conversion proxy in [0, 100]. Zero unless the wind signal is positive.
pub fn wind_efficiency(wind_count: f64, config: &MetricsConfig) -> f64 {
    if wind_count <= 0.0 {
        return 0.0;
    }
    (wind_count / config.wind_norm * 100.0).min(100.0)
}

/// Rounded arithmetic mean of solar and wind efficiency.
pub fn total_efficiency(solar: f64, wind: f64) -> f64 {
    ((solar + wind) / 2.0).round()
}

/// Energy attributed to one reading, in kWh. Each reading is treated as
/// representing one second of generation at the observed power.
pub fn energy_harvested(power_mw: f64) -> f64 {
    (power_mw / 1000.0) * (1.0 / 3600.0)
}

/// Cost savings for the harvested energy, in currency units.
pub fn cost_savings(energy_kwh: f64, config: &MetricsConfig) -> f64 {
    energy_kwh * config.unit_rate
}

/// Carbon offset for the harvested energy, in kg CO2-equivalent.
pub fn carbon_offset(energy_kwh: f64, config: &MetricsConfig) -> f64 {
    energy_kwh * config.carbon_factor
}

/// Link health class thresholded on instantaneous power.
pub fn connection_quality(power_mw: f64) -> ConnectionQuality {
    if power_mw > 1000.0 {
        ConnectionQuality::Excellent
    } else if power_mw > 500.0 {
        ConnectionQuality::Good
    } else if power_mw > 100.0 {
        ConnectionQuality::Fair
    } else {
        ConnectionQuality::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Battery mapping
    // -----------------------------------------------------------------------

    #[test]
    fn test_battery_full_at_4_2v() {
        assert!((battery_level(4.2) - 100.0).abs() < f64::EPSILON);
        assert!((battery_level(5.2) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_battery_empty_at_3_0v() {
        assert!((battery_level(3.0)).abs() < f64::EPSILON);
        assert!((battery_level(2.5)).abs() < f64::EPSILON);
        assert!((battery_level(0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_battery_midpoint_strictly_between() {
        let mid = battery_level(3.7);
        assert!(mid > 0.0 && mid < 100.0, "3.7V should map inside (0,100), got {mid}");
        assert!((mid - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_battery_monotonic() {
        let mut prev = battery_level(2.8);
        for step in 0..30 {
            let v = 2.8 + f64::from(step) * 0.05;
            let level = battery_level(v);
            assert!(level >= prev, "battery level must not decrease with voltage");
            prev = level;
        }
    }

    // -----------------------------------------------------------------------
    // Solar / wind / total efficiency
    // -----------------------------------------------------------------------

    #[test]
    fn test_solar_efficiency_zero_without_power() {
        let cfg = MetricsConfig::default();
        assert_eq!(solar_efficiency(0.0, "Light available", &cfg), 0.0);
        assert_eq!(solar_efficiency(-5.0, "Light available", &cfg), 0.0);
    }

    #[test]
    fn test_solar_efficiency_zero_without_usable_light() {
        let cfg = MetricsConfig::default();
        assert_eq!(solar_efficiency(500.0, "No light detected", &cfg), 0.0);
        assert_eq!(solar_efficiency(500.0, "dark", &cfg), 0.0);
    }

    #[test]
    fn test_solar_efficiency_scales_and_clamps() {
        let cfg = MetricsConfig::default();
        let eff = solar_efficiency(98.0, "Light available, good for solar energy", &cfg);
        assert!((eff - 9.8).abs() < 1e-9);
        assert_eq!(solar_efficiency(2000.0, "bright", &cfg), 100.0);
    }

    #[test]
    fn test_wind_efficiency_scales_and_clamps() {
        let cfg = MetricsConfig::default();
        assert_eq!(wind_efficiency(0.0, &cfg), 0.0);
        assert!((wind_efficiency(10.0, &cfg) - 50.0).abs() < 1e-9);
        assert_eq!(wind_efficiency(100.0, &cfg), 100.0);
    }

    #[test]
    fn test_total_efficiency_rounded_mean() {
        assert_eq!(total_efficiency(9.8, 0.0), 5.0);
        assert_eq!(total_efficiency(50.0, 50.0), 50.0);
        assert_eq!(total_efficiency(33.3, 66.6), 50.0);
    }

    // -----------------------------------------------------------------------
    // Energy / cost / carbon
    // -----------------------------------------------------------------------

    #[test]
    fn test_energy_harvested_one_second_slice() {
        // 98 mW for one second: 0.098 W / 3600 / 1000 kWh.
        let e = energy_harvested(98.0);
        assert!((e - 98.0 / 1000.0 / 3600.0).abs() < 1e-15);
    }

    #[test]
    fn test_cost_and_carbon_proportional_to_energy() {
        let cfg = MetricsConfig::default();
        let e = energy_harvested(1000.0);
        assert!((cost_savings(e, &cfg) - e * 0.12).abs() < 1e-15);
        assert!((carbon_offset(e, &cfg) - e * 0.92).abs() < 1e-15);
    }

    // -----------------------------------------------------------------------
    // Connection quality thresholds
    // -----------------------------------------------------------------------

    #[test]
    fn test_connection_quality_thresholds() {
        assert_eq!(connection_quality(1500.0), ConnectionQuality::Excellent);
        assert_eq!(connection_quality(1000.0), ConnectionQuality::Good);
        assert_eq!(connection_quality(501.0), ConnectionQuality::Good);
        assert_eq!(connection_quality(500.0), ConnectionQuality::Fair);
        assert_eq!(connection_quality(101.0), ConnectionQuality::Fair);
        assert_eq!(connection_quality(100.0), ConnectionQuality::Poor);
        assert_eq!(connection_quality(0.0), ConnectionQuality::Poor);
    }
}
