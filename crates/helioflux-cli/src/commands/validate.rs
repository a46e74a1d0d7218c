//! `helioflux validate`: check a raw reading JSON against the ingest contract.

use std::io::Read;

pub fn run(path: &str) {
    let raw = if path == "-" {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("Error: cannot read stdin: {e}");
            std::process::exit(1);
        }
        buf
    } else {
        match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: cannot read '{path}': {e}");
                std::process::exit(1);
            }
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: not valid JSON: {e}");
            std::process::exit(1);
        }
    };

    match helioflux_core::validate(&value) {
        Ok(reading) => {
            println!("Valid reading:");
            println!("  temperature {:.1}°C, humidity {:.1}%", reading.temperature, reading.humidity);
            println!("  power {:.1} mW at hour {}", reading.power, reading.hour);
        }
        Err(e) => {
            eprintln!("Invalid reading ({} violations):", e.violations.len());
            for v in &e.violations {
                eprintln!("  - {v}");
            }
            std::process::exit(1);
        }
    }
}
