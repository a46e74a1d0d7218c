//! Command-line interface for the helioflux telemetry pipeline.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "helioflux")]
#[command(about = "Telemetry pipeline and power prediction for harvesting devices")]
#[command(version = helioflux_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (ingest, queries, SSE stream, predictions)
    Serve {
        /// Host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind
        #[arg(long, default_value = "8787")]
        port: u16,

        /// Retention store capacity in readings
        #[arg(long, default_value = "200")]
        capacity: usize,

        /// Persist readings/status to this directory (memory-only if omitted)
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Generate synthetic readings and drive an in-process pipeline
    Simulate {
        /// Milliseconds between readings
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Stop after this many readings (until Ctrl+C if omitted)
        #[arg(long)]
        count: Option<u64>,

        /// Device id to attribute readings to
        #[arg(long, default_value = "harvester-01")]
        device: String,

        /// Persist generated readings to this directory
        #[arg(long)]
        data_dir: Option<String>,

        /// Print each processed reading as JSON instead of a summary line
        #[arg(long)]
        json: bool,
    },

    /// Print a power prediction for one hour or a 24-hour forecast
    Predict {
        /// Hour of day (0-23); current hour if omitted
        #[arg(long)]
        hour: Option<u8>,

        /// Print the full 24-hour forecast
        #[arg(long)]
        forecast: bool,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Validate a raw reading JSON from a file (or stdin with "-")
    Validate {
        /// Path to a JSON file, or "-" for stdin
        path: String,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            host,
            port,
            capacity,
            data_dir,
        } => commands::serve::run(&host, port, capacity, data_dir.as_deref()),
        Commands::Simulate {
            interval_ms,
            count,
            device,
            data_dir,
            json,
        } => commands::simulate::run(interval_ms, count, &device, data_dir.as_deref(), json),
        Commands::Predict {
            hour,
            forecast,
            json,
        } => commands::predict::run(hour, forecast, json),
        Commands::Validate { path } => commands::validate::run(&path),
    }
}
