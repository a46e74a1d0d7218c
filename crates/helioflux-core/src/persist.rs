//! Optional durable persistence for processed readings and device status.
//!
//! The pipeline treats persistence as a best-effort external collaborator:
//! writes happen on a background thread fed by a channel, a failed or slow
//! write never blocks or fails ingestion, and the pipeline continues in
//! memory-only mode when the sink is unavailable.
//!
//! # Storage Format
//!
//! [`JsonlGateway`] keeps a data directory containing:
//! - `readings.jsonl`: one JSON object per processed reading, append-only
//! - `devices.json`: device-id → status map, rewritten on every upsert

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::{self, Sender};
use std::thread;

use crate::reading::{DeviceStatus, ProcessedReading};

/// Durable sink/source boundary the pipeline writes through.
///
/// Readings are append-only; device status is upsert-by-device-id. The
/// read-back side is optional and only used at startup.
pub trait PersistenceGateway: Send + Sync {
    /// Append one processed reading.
    fn store_reading(&self, reading: &ProcessedReading) -> io::Result<()>;

    /// Insert or replace the status row for `status.device_id`.
    fn store_status(&self, status: &DeviceStatus) -> io::Result<()>;

    /// Most recent `limit` persisted readings, oldest-first, for rebuilding
    /// the retention store in arrival order on startup.
    fn load_recent(&self, limit: usize) -> io::Result<Vec<ProcessedReading>>;
}

/// One unit of background persistence work.
pub enum PersistJob {
    Reading(ProcessedReading),
    Status(DeviceStatus),
}

/// Spawn the background writer thread. The returned sender is the
/// fire-and-forget side: the pipeline sends jobs and never waits. Write
/// failures are logged and dropped. The thread exits when every sender is
/// dropped.
pub fn spawn_writer(gateway: Box<dyn PersistenceGateway>) -> Sender<PersistJob> {
    let (tx, rx) = mpsc::channel::<PersistJob>();
    thread::spawn(move || {
        for job in rx {
            let result = match &job {
                PersistJob::Reading(reading) => gateway.store_reading(reading),
                PersistJob::Status(status) => gateway.store_status(status),
            };
            if let Err(e) = result {
                log::warn!("persistence write failed, continuing in memory-only mode: {e}");
            }
        }
    });
    tx
}

/// File-backed gateway: JSON-lines readings plus a device status map.
pub struct JsonlGateway {
    data_dir: PathBuf,
    readings_writer: Mutex<File>,
    devices: Mutex<HashMap<String, DeviceStatus>>,
}

impl JsonlGateway {
    /// Open (or create) a gateway rooted at `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> io::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let readings_writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(data_dir.join("readings.jsonl"))?;

        // Seed the upsert map from an earlier run, if any.
        let devices_path = data_dir.join("devices.json");
        let devices = if devices_path.exists() {
            let raw = fs::read_to_string(&devices_path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Ok(Self {
            data_dir,
            readings_writer: Mutex::new(readings_writer),
            devices: Mutex::new(devices),
        })
    }

    /// Directory the gateway writes into.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Persisted device statuses, in no particular order.
    pub fn load_statuses(&self) -> Vec<DeviceStatus> {
        self.devices.lock().unwrap().values().cloned().collect()
    }
}

impl PersistenceGateway for JsonlGateway {
    fn store_reading(&self, reading: &ProcessedReading) -> io::Result<()> {
        let line = serde_json::to_string(reading).map_err(io::Error::other)?;
        let mut writer = self.readings_writer.lock().unwrap();
        writeln!(writer, "{line}")?;
        writer.flush()
    }

    fn store_status(&self, status: &DeviceStatus) -> io::Result<()> {
        let mut devices = self.devices.lock().unwrap();
        devices.insert(status.device_id.clone(), status.clone());
        let json = serde_json::to_string_pretty(&*devices).map_err(io::Error::other)?;
        // Lock held through the write so upserts never interleave stale maps.
        fs::write(self.data_dir.join("devices.json"), json)
    }

    fn load_recent(&self, limit: usize) -> io::Result<Vec<ProcessedReading>> {
        let path = self.data_dir.join("readings.jsonl");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut readings = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ProcessedReading>(&line) {
                Ok(reading) => readings.push(reading),
                Err(e) => log::warn!("skipping corrupt persisted reading: {e}"),
            }
        }
        let skip = readings.len().saturating_sub(limit);
        Ok(readings.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::ConnectionQuality;
    use std::time::Duration;

    fn reading(id: &str, ts: u64) -> ProcessedReading {
        ProcessedReading {
            id: id.to_string(),
            timestamp: crate::time::format_iso8601(ts),
            timestamp_ms: ts,
            device_id: "harvester-01".to_string(),
            temperature: 25.0,
            humidity: 50.0,
            bus_voltage: 3.9,
            current: 10.0,
            power: 150.0,
            light_value: 2500.0,
            light_status: "moderate".to_string(),
            wind_count: 1.0,
            hour: 12,
            battery_level: 60.0,
            solar_efficiency: 15.0,
            wind_efficiency: 5.0,
            total_efficiency: 10.0,
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

    fn status(device_id: &str, battery: f64) -> DeviceStatus {
        DeviceStatus {
            device_id: device_id.to_string(),
            online: true,
            last_seen: "2026-01-01T00:00:00Z".to_string(),
            last_seen_ms: 0,
            battery_level: battery,
            connection_quality: ConnectionQuality::Good,
        }
    }

    #[test]
    fn test_readings_round_trip_oldest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let gateway = JsonlGateway::open(tmp.path()).unwrap();
        gateway.store_reading(&reading("a", 1000)).unwrap();
        gateway.store_reading(&reading("b", 2000)).unwrap();
        gateway.store_reading(&reading("c", 3000)).unwrap();

        let loaded = gateway.load_recent(10).unwrap();
        let ids: Vec<String> = loaded.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_recent_limits_to_newest() {
        let tmp = tempfile::tempdir().unwrap();
        let gateway = JsonlGateway::open(tmp.path()).unwrap();
        for i in 0..5u64 {
            gateway.store_reading(&reading(&format!("r{i}"), i)).unwrap();
        }
        let loaded = gateway.load_recent(2).unwrap();
        let ids: Vec<String> = loaded.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r3", "r4"]);
    }

    #[test]
    fn test_load_recent_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let gateway = JsonlGateway::open(tmp.path().join("fresh")).unwrap();
        assert!(gateway.load_recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_status_upsert_by_device_id() {
        let tmp = tempfile::tempdir().unwrap();
        let gateway = JsonlGateway::open(tmp.path()).unwrap();
        gateway.store_status(&status("harvester-01", 80.0)).unwrap();
        gateway.store_status(&status("harvester-02", 70.0)).unwrap();
        gateway.store_status(&status("harvester-01", 40.0)).unwrap();

        let statuses = gateway.load_statuses();
        assert_eq!(statuses.len(), 2);
        let one = statuses
            .iter()
            .find(|s| s.device_id == "harvester-01")
            .unwrap();
        assert!((one.battery_level - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_statuses_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let gateway = JsonlGateway::open(tmp.path()).unwrap();
            gateway.store_status(&status("harvester-01", 55.0)).unwrap();
        }
        let reopened = JsonlGateway::open(tmp.path()).unwrap();
        let statuses = reopened.load_statuses();
        assert_eq!(statuses.len(), 1);
        assert!((statuses[0].battery_level - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_corrupt_lines_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let gateway = JsonlGateway::open(tmp.path()).unwrap();
        gateway.store_reading(&reading("good", 1)).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(tmp.path().join("readings.jsonl"))
            .unwrap()
            .write_all(b"{not json}\n")
            .unwrap();
        gateway.store_reading(&reading("also-good", 2)).unwrap();

        let loaded = gateway.load_recent(10).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_background_writer_fire_and_forget() {
        let tmp = tempfile::tempdir().unwrap();
        let gateway = JsonlGateway::open(tmp.path()).unwrap();
        let tx = spawn_writer(Box::new(gateway));

        tx.send(PersistJob::Reading(reading("bg", 1))).unwrap();
        tx.send(PersistJob::Status(status("harvester-01", 90.0)))
            .unwrap();
        drop(tx);

        // The worker drains the channel before exiting; poll briefly.
        let readings_path = tmp.path().join("readings.jsonl");
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            let done = fs::read_to_string(&readings_path)
                .map(|s| s.contains("\"bg\""))
                .unwrap_or(false);
            if done || std::time::Instant::now() > deadline {
                assert!(done, "background writer never persisted the reading");
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}
