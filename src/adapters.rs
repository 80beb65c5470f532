//! External contracts the engine consumes. These are traits rather than
//! concrete sensor plumbing because the core only needs the data they
//! produce, never how it's produced — the host application owns the
//! actual magnetometer/device-motion/pedometer/Wi-Fi integration.

use serde::{Deserialize, Serialize};

use crate::store_map::WifiReading;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WifiScanStatus {
    Ok,
    Unavailable,
    PermissionDenied,
    Error,
}

#[derive(Clone, Debug)]
pub struct WifiScanOutcome {
    pub readings: Vec<WifiReading>,
    pub status: WifiScanStatus,
    pub message: Option<String>,
}

/// Black-box Wi-Fi scanner. Anything other than `Ok` is treated as "no fix
/// this interval," but the status/message are surfaced verbatim.
pub trait WifiScanner {
    fn scan(&mut self) -> WifiScanOutcome;
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SensorAvailability {
    pub available: bool,
    pub last_at_ms: Option<f64>,
    pub permission_denied: bool,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SensorHealth {
    pub magnetometer: SensorAvailability,
    pub device_motion: SensorAvailability,
    pub pedometer: SensorAvailability,
}
