//! Per-device last-known status tracking.
//!
//! One entry per device identifier, created on first reading and overwritten
//! (not merged) on every subsequent accepted reading. Liveness beyond
//! `last_seen` age is inferred by callers; the tracker itself never marks a
//! device offline.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::reading::DeviceStatus;

/// Thread-safe device-id → status map.
#[derive(Default)]
pub struct DeviceStatusTracker {
    devices: Mutex<HashMap<String, DeviceStatus>>,
}

impl DeviceStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the status entry for `status.device_id` in full.
    pub fn update(&self, status: DeviceStatus) {
        let mut devices = self.devices.lock().unwrap();
        devices.insert(status.device_id.clone(), status);
    }

    /// Last-known status for a device, if it has ever reported.
    pub fn get(&self, device_id: &str) -> Option<DeviceStatus> {
        self.devices.lock().unwrap().get(device_id).cloned()
    }

    /// All known device statuses, sorted by device id for stable output.
    pub fn all(&self) -> Vec<DeviceStatus> {
        let devices = self.devices.lock().unwrap();
        let mut out: Vec<DeviceStatus> = devices.values().cloned().collect();
        out.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        out
    }

    /// Number of devices that have ever reported.
    pub fn count(&self) -> usize {
        self.devices.lock().unwrap().len()
    }
}
