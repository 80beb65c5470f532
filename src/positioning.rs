//! Top-level orchestration: PDR -> Kalman -> snap-to-graph, consuming
//! Wi-Fi scans and emitting poses. Grounded on the teacher's `main.rs`
//! session-state orchestration (`SensorState`, `DynamicCalibration`)
//! generalized from ad hoc shared buffers to an owned, single-threaded
//! session struct per the synchronous core model.

use std::collections::VecDeque;

use crate::config::PositioningConfig;
use crate::geometry::{low_pass_heading, Point2};
use crate::kalman::Kalman2D;
use crate::pdr::{DeviceMotionSample, MagSample, PdrEngine, StepEvent};
use crate::snap::{snap_to_graph, EdgeRef, SnapConfig};
use crate::store_map::{StoreMap, WifiReading};
use crate::wifi::{compute_fix, confidence as wifi_confidence};

const PATH_BUFFER_CAP: usize = 240;
const MAX_STEPS_PER_EVENT: usize = 20;
const HEADING_SMOOTH_ALPHA: f64 = 0.18;
const WIFI_HARD_RESET_METERS: f64 = 10.0;
const WIFI_HARD_RESET_CONFIDENCE: f64 = 0.75;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseSource {
    Pdr,
    PdrWifi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfidenceTier {
    Good,
    Ok,
    Low,
}

#[derive(Clone, Copy, Debug)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
    pub timestamp_ms: f64,
    pub source: PoseSource,
    pub snapped: bool,
}

pub struct PositioningSession {
    map: StoreMap,
    pdr: PdrEngine,
    kalman: Option<Kalman2D>,
    snap_config: SnapConfig,
    last_edge: Option<EdgeRef>,
    path_buffer: VecDeque<Point2>,
    last_raw_position: Point2,
    reported_heading: f64,
    stride_scale: f64,
    wifi_enabled: bool,
    last_step_at_ms: Option<f64>,
    last_pose_timestamp_ms: f64,
}

impl PositioningSession {
    pub fn start(map: StoreMap, config: PositioningConfig) -> Self {
        let kalman = if config.wifi_enabled {
            Some(Kalman2D::create(config.start, 1.5))
        } else {
            None
        };

        let mut path_buffer = VecDeque::with_capacity(PATH_BUFFER_CAP);
        path_buffer.push_back(config.start);

        PositioningSession {
            map,
            pdr: PdrEngine::new(0.0),
            kalman,
            snap_config: SnapConfig::from(&config.snap),
            last_edge: None,
            path_buffer,
            last_raw_position: config.start,
            reported_heading: 0.0,
            stride_scale: config.stride_scale.clamp(0.6, 1.5),
            wifi_enabled: config.wifi_enabled,
            last_step_at_ms: None,
            last_pose_timestamp_ms: 0.0,
        }
    }

    pub fn map(&self) -> &StoreMap {
        &self.map
    }

    pub fn path_buffer(&self) -> &VecDeque<Point2> {
        &self.path_buffer
    }

    pub fn reset_to(&mut self, point: Point2) {
        self.pdr.reset(0.0);
        self.path_buffer.clear();
        self.path_buffer.push_back(point);
        self.last_raw_position = point;
        self.last_edge = None;
        if self.wifi_enabled {
            self.kalman = Some(Kalman2D::create(point, 1.5));
        } else {
            self.kalman = None;
        }
    }

    pub fn align_heading_to_mag(&mut self) {
        self.pdr.align_heading_to_mag();
    }

    pub fn set_stride_scale(&mut self, s: f64) {
        self.stride_scale = s.clamp(0.6, 1.5);
        self.pdr.set_stride_scale(self.stride_scale);
    }

    pub fn set_wifi_enabled(&mut self, enabled: bool) {
        self.wifi_enabled = enabled;
        if !enabled {
            self.kalman = None;
        }
    }

    pub fn on_magnetometer(&mut self, sample: MagSample) {
        self.pdr.on_magnetometer(sample);
    }

    /// Feed a device-motion sample; returns a pose if it produced one or
    /// more step events.
    pub fn on_device_motion(&mut self, timestamp_ms: f64, sample: DeviceMotionSample) -> Option<Pose2D> {
        let step_len = self.pdr.on_device_motion(sample);
        let len = step_len?;
        self.last_step_at_ms = Some(timestamp_ms);
        Some(self.apply_steps(
            &[StepEvent {
                source: crate::pdr::StepSource::DeviceMotion,
                length_m: len,
            }],
            timestamp_ms,
        ))
    }

    pub fn on_pedometer(&mut self, cumulative_count: u64, timestamp_ms: f64) -> Option<Pose2D> {
        let events = self.pdr.on_pedometer(cumulative_count, timestamp_ms);
        if events.is_empty() {
            return None;
        }
        Some(self.apply_steps(&events, timestamp_ms))
    }

    fn apply_steps(&mut self, events: &[StepEvent], timestamp_ms: f64) -> Pose2D {
        let heading = self.pdr.heading();
        let diag = self.pdr.diagnostics();

        let mut dx = 0.0;
        let mut dy = 0.0;
        for ev in events.iter().take(MAX_STEPS_PER_EVENT) {
            dx += heading.to_radians().sin() * ev.length_m;
            dy += -heading.to_radians().cos() * ev.length_m;
        }

        let proc_sigma = 0.22 + 0.08 * (1.0 - diag.mag_reliability);
        if let Some(kf) = &mut self.kalman {
            kf.predict(Point2::new(dx, dy), proc_sigma);
        }
        self.last_raw_position = Point2::new(
            self.last_raw_position.x + dx,
            self.last_raw_position.y + dy,
        );

        let current_position = self
            .kalman
            .as_ref()
            .map(|kf| kf.center())
            .unwrap_or(self.last_raw_position);

        let snap = snap_to_graph(&self.map, &current_position, self.last_edge, &self.snap_config);
        self.last_edge = snap.edge;

        self.reported_heading = low_pass_heading(self.reported_heading, heading, HEADING_SMOOTH_ALPHA);

        if self.path_buffer.len() >= PATH_BUFFER_CAP {
            self.path_buffer.pop_front();
        }
        self.path_buffer.push_back(snap.snapped);

        self.last_pose_timestamp_ms = timestamp_ms;

        Pose2D {
            x: snap.snapped.x,
            y: snap.snapped.y,
            heading_deg: self.reported_heading,
            timestamp_ms,
            source: PoseSource::Pdr,
            snapped: snap.distance <= self.snap_config.max_snap_meters,
        }
    }

    /// Absorb a Wi-Fi scan result; returns a pose if a fix was computed.
    pub fn on_wifi_scan(&mut self, readings: &[WifiReading], timestamp_ms: f64) -> Option<Pose2D> {
        if !self.wifi_enabled {
            return None;
        }
        let fix = compute_fix(readings, &self.map.anchors)?;
        let conf = wifi_confidence(&fix);

        let kf = self.kalman.get_or_insert_with(|| Kalman2D::create(fix.position, 1.5));
        let current = kf.center();
        let dist = current.distance_to(&fix.position);

        if dist > WIFI_HARD_RESET_METERS && conf > WIFI_HARD_RESET_CONFIDENCE {
            *kf = Kalman2D::create(fix.position, 1.5);
        } else {
            let meas_sigma = (6.0 - 5.2 * conf).clamp(1.2, 6.0);
            kf.update(fix.position, meas_sigma);
        }

        let position = kf.center();
        let snap = snap_to_graph(&self.map, &position, self.last_edge, &self.snap_config);
        self.last_edge = snap.edge;

        if self.path_buffer.len() >= PATH_BUFFER_CAP {
            self.path_buffer.pop_front();
        }
        self.path_buffer.push_back(snap.snapped);
        self.last_pose_timestamp_ms = timestamp_ms;

        Some(Pose2D {
            x: snap.snapped.x,
            y: snap.snapped.y,
            heading_deg: self.reported_heading,
            timestamp_ms,
            source: PoseSource::PdrWifi,
            snapped: snap.distance <= self.snap_config.max_snap_meters,
        })
    }

    pub fn confidence_tier(&self, now_ms: f64, yaw_rate_deg_s: f64) -> ConfidenceTier {
        let diag = self.pdr.diagnostics();
        let mut score = 0.35;
        if let Some(last_step) = self.last_step_at_ms {
            if now_ms - last_step < 1800.0 {
                score += 0.25;
            }
        }
        if !diag.stationary {
            score += 0.10;
        }
        score += (diag.mag_reliability - 0.5) * 0.35;
        if yaw_rate_deg_s.abs() > 280.0 {
            score -= 0.08;
        }

        if score > 0.72 {
            ConfidenceTier::Good
        } else if score > 0.45 {
            ConfidenceTier::Ok
        } else {
            ConfidenceTier::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnapConfigDto;

    fn empty_map() -> StoreMap {
        StoreMap::from_json(r#"{"id":"m","label":"m","nodes":[],"edges":[],"anchors":[]}"#)
            .unwrap()
    }

    fn config(start: Point2) -> PositioningConfig {
        PositioningConfig {
            start,
            stride_scale: 1.0,
            wifi_enabled: true,
            wifi_scan_interval_ms: 3500.0,
            snap: SnapConfigDto::default(),
        }
    }

    #[test]
    fn reset_to_then_zero_steps_yields_pose_at_point() {
        let target = Point2::new(3.0, 4.0);
        let mut session = PositioningSession::start(empty_map(), config(Point2::new(0.0, 0.0)));
        session.reset_to(target);
        assert_eq!(session.path_buffer().back().copied().unwrap(), target);
    }

    #[test]
    fn path_buffer_never_exceeds_cap() {
        let mut session = PositioningSession::start(empty_map(), config(Point2::new(0.0, 0.0)));
        for i in 0..400 {
            session.on_device_motion(
                i as f64 * 50.0,
                DeviceMotionSample {
                    linear_acceleration: Some((1.2, 0.0, 0.0)),
                    timestamp_ms: i as f64 * 50.0,
                    ..Default::default()
                },
            );
        }
        assert!(session.path_buffer().len() <= 240);
    }

    #[test]
    fn toggling_wifi_off_then_on_does_not_move_pdr_heading() {
        let mut session = PositioningSession::start(empty_map(), config(Point2::new(0.0, 0.0)));
        let before = session.pdr.heading();
        session.set_wifi_enabled(false);
        session.set_wifi_enabled(true);
        assert_eq!(session.pdr.heading(), before);
    }
}
