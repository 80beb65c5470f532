//! Aggregated, serde-deserializable configuration for a positioning
//! session. Grounded on the teacher's `Args` (clap) parameter-struct
//! style, expressed as plain data so it can also be loaded from a config
//! file or constructed directly in tests.

use serde::{Deserialize, Serialize};

use crate::geometry::Point2;
use crate::snap::SnapConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositioningConfig {
    pub start: Point2,
    #[serde(default = "default_stride_scale")]
    pub stride_scale: f64,
    #[serde(default = "default_true")]
    pub wifi_enabled: bool,
    #[serde(default = "default_wifi_scan_interval_ms")]
    pub wifi_scan_interval_ms: f64,
    #[serde(default)]
    pub snap: SnapConfigDto,
}

fn default_stride_scale() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_wifi_scan_interval_ms() -> f64 {
    3500.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapConfigDto {
    #[serde(default = "default_max_snap_meters")]
    pub max_snap_meters: f64,
    #[serde(default)]
    pub hard_clamp: bool,
    #[serde(default = "default_switch_penalty_meters")]
    pub switch_penalty_meters: f64,
}

fn default_max_snap_meters() -> f64 {
    1.75
}
fn default_switch_penalty_meters() -> f64 {
    0.35
}

impl Default for SnapConfigDto {
    fn default() -> Self {
        SnapConfigDto {
            max_snap_meters: default_max_snap_meters(),
            hard_clamp: false,
            switch_penalty_meters: default_switch_penalty_meters(),
        }
    }
}

impl From<&SnapConfigDto> for SnapConfig {
    fn from(dto: &SnapConfigDto) -> Self {
        SnapConfig {
            max_snap_meters: dto.max_snap_meters,
            switch_penalty_meters: dto.switch_penalty_meters,
            hard_clamp: dto.hard_clamp,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RerouteConfig {
    #[serde(default = "default_off_route_meters")]
    pub off_route_meters: f64,
    #[serde(default = "default_persist_ms")]
    pub persist_ms: f64,
}

fn default_off_route_meters() -> f64 {
    2.0
}
fn default_persist_ms() -> f64 {
    3000.0
}

impl Default for RerouteConfig {
    fn default() -> Self {
        RerouteConfig {
            off_route_meters: default_off_route_meters(),
            persist_ms: default_persist_ms(),
        }
    }
}
