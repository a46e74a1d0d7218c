pub mod predict;
pub mod serve;
pub mod simulate;
pub mod validate;

use helioflux_core::{JsonlGateway, PipelineConfig, TelemetryPipeline};

/// Build a pipeline, with a file-backed persistence gateway when a data
/// directory is given. An unusable directory degrades to memory-only.
pub fn make_pipeline(capacity: usize, data_dir: Option<&str>) -> TelemetryPipeline {
    let config = PipelineConfig {
        capacity,
        ..Default::default()
    };

    match data_dir {
        Some(dir) => match JsonlGateway::open(dir) {
            Ok(gateway) => TelemetryPipeline::with_gateway(config, Box::new(gateway)),
            Err(e) => {
                eprintln!("Warning: cannot open data dir '{dir}' ({e}), running memory-only");
                TelemetryPipeline::new(config)
            }
        },
        None => TelemetryPipeline::new(config),
    }
}
