//! `helioflux serve`: run the HTTP server.

use std::sync::Arc;

pub fn run(host: &str, port: u16, capacity: usize, data_dir: Option<&str>) {
    let pipeline = Arc::new(super::make_pipeline(capacity, data_dir));

    let base = format!("http://{host}:{port}");
    println!("☀ Helioflux Server v{}", helioflux_core::VERSION);
    println!("   {base}");
    println!("   retention capacity: {capacity} readings");
    match data_dir {
        Some(dir) => println!("   persistence: {dir}"),
        None => println!("   persistence: memory-only"),
    }
    println!();
    println!("   Endpoints:");
    println!("     POST /api/v1/readings          Ingest one raw reading");
    println!("     GET  /api/v1/readings          Recent readings (?limit=N)");
    println!("     GET  /api/v1/readings/range    Readings in a unix-ms window (?start=&end=)");
    println!("     GET  /api/v1/stats             Aggregate statistics");
    println!("     GET  /api/v1/trend             Recent vs older efficiency trend");
    println!("     GET  /api/v1/devices           Device status list");
    println!("     GET  /api/v1/snapshot          Latest reading + devices + stats");
    println!("     GET  /api/v1/stream            SSE stream of processed readings");
    println!("     GET  /api/v1/predict/current   Prediction for the current hour");
    println!("     GET  /api/v1/predict/hour/{{h}}  Prediction for hour h");
    println!("     GET  /api/v1/predict/forecast  24-hour forecast");
    println!("     POST /api/v1/predict           Prediction from supplied inputs");
    println!("     GET  /health                   Health check");
    println!();
    println!("   Examples:");
    println!("     curl {base}/api/v1/readings?limit=10");
    println!("     curl {base}/api/v1/predict/forecast");
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: cannot start async runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(helioflux_server::run_server(pipeline, host, port)) {
        eprintln!("Error: server failed: {e}");
        std::process::exit(1);
    }
}
