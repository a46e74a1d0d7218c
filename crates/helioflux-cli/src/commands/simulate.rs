//! `helioflux simulate`: synthetic reading generator.
//!
//! Drives an in-process pipeline with plausible telemetry at a fixed
//! interval, for demos and for exercising persistence without hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;

use helioflux_core::is_night_hour;

pub fn run(interval_ms: u64, count: Option<u64>, device: &str, data_dir: Option<&str>, json: bool) {
    let pipeline = super::make_pipeline(helioflux_core::DEFAULT_CAPACITY, data_dir);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: cannot install Ctrl+C handler: {e}");
    }

    println!("Simulating readings for device '{device}'");
    println!("  Interval:  {interval_ms}ms");
    match count {
        Some(n) => println!("  Count:     {n}"),
        None => println!("  Count:     until Ctrl+C"),
    }
    println!();

    let mut generated = 0u64;
    while running.load(Ordering::SeqCst) && count.is_none_or(|n| generated < n) {
        let raw = synthetic_reading(device);
        match pipeline.ingest(&raw) {
            Ok(reading) => {
                if json {
                    match serde_json::to_string(&reading) {
                        Ok(line) => println!("{line}"),
                        Err(e) => eprintln!("Error: cannot serialize reading: {e}"),
                    }
                } else {
                    println!(
                        "{}  {:>7.1} mW  eff {:>3.0}%  battery {:>3.0}%  {}",
                        reading.timestamp,
                        reading.power,
                        reading.total_efficiency,
                        reading.battery_level,
                        reading.connection_quality,
                    );
                }
            }
            Err(e) => eprintln!("Error: generated reading rejected: {e}"),
        }

        generated += 1;
        std::thread::sleep(Duration::from_millis(interval_ms));
    }

    let stats = pipeline.store().stats();
    println!();
    println!("Done: {generated} readings generated");
    println!(
        "  avg temperature {:.1}°C | avg power {:.1} mW | avg efficiency {:.1}%",
        stats.avg_temperature, stats.avg_power, stats.avg_efficiency
    );
}

/// One plausible raw reading for the current wall-clock hour.
fn synthetic_reading(device: &str) -> serde_json::Value {
    let mut rng = rand::rng();
    let hour = helioflux_core::time::current_hour();

    let (power, light_value, light_status) = if is_night_hour(hour) {
        (0.0, rng.random_range(0.0..50.0), "No light detected")
    } else {
        (
            rng.random_range(50.0..900.0),
            rng.random_range(1500.0..4095.0),
            "Light available, good for solar energy",
        )
    };

    serde_json::json!({
        "deviceId": device,
        "temperature": rng.random_range(15.0..38.0),
        "humidity": rng.random_range(30.0..95.0),
        "busVoltage": rng.random_range(3.1..5.2),
        "current": rng.random_range(-50.0..250.0),
        "power": power,
        "lightValue": light_value,
        "lightStatus": light_status,
        "windCount": rng.random_range(0.0..25.0),
        "hour": hour,
    })
}
