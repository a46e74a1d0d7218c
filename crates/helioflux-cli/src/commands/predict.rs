//! `helioflux predict`: print power predictions.

use helioflux_core::{PipelineConfig, Prediction, TelemetryPipeline};

pub fn run(hour: Option<u8>, forecast: bool, json: bool) {
    if let Some(h) = hour
        && h > 23
    {
        eprintln!("Error: hour must be between 0 and 23");
        std::process::exit(1);
    }

    // A fresh pipeline has no history, so predictions use the neutral
    // historical adjustment of 1.0.
    let pipeline = TelemetryPipeline::new(PipelineConfig::default());
    let engine = pipeline.engine();

    if forecast {
        let predictions = engine.forecast_24h();
        if json {
            print_json(&predictions);
        } else {
            println!("{:>4}  {:>12}  {:>10}  {}", "hour", "power (mW)", "irradiance", "source");
            println!("{}", "-".repeat(44));
            for p in &predictions {
                print_row(p);
            }
        }
        return;
    }

    let prediction = match hour {
        Some(h) => engine.predict_for_hour(h),
        None => engine.predict_current(),
    };
    match prediction {
        Some(p) if json => print_json(&[p]),
        Some(p) => {
            println!("{:>4}  {:>12}  {:>10}  {}", "hour", "power (mW)", "irradiance", "source");
            println!("{}", "-".repeat(44));
            print_row(&p);
        }
        None => {
            eprintln!("No prediction available");
            std::process::exit(1);
        }
    }
}

fn print_row(p: &Prediction) {
    println!(
        "{:>4}  {:>12.2}  {:>10.0}  {}",
        p.hour, p.predicted_power, p.irradiance, p.source
    );
}

fn print_json(predictions: &[Prediction]) {
    match serde_json::to_string_pretty(predictions) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("Error: cannot serialize predictions: {e}");
            std::process::exit(1);
        }
    }
}
