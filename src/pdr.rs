//! Pedestrian dead reckoning: heading fusion from magnetometer + device
//! motion, and step detection via a peak detector on linear acceleration.
//!
//! Grounded on the windowed-statistics style of the teacher's accelerometer
//! smoothing (mean/std over a ring buffer) and its gravity-EMA high-pass
//! idiom, generalized from a fixed-rate dashboard feed into the explicit
//! sample-driven engine this module exposes.

use std::collections::VecDeque;

use crate::geometry::{heading_diff, low_pass_heading, wrap_heading};

const MAG_EMA_ALPHA: f64 = 0.08;
const MAG_SPIKE_DEVIATION_UT: f64 = 12.0;
const GRAVITY_EMA_ALPHA: f64 = 0.08;
const STEP_WINDOW_LEN: usize = 35;
const MIN_STEP_INTERVAL_MS: f64 = 280.0;
const STATIONARY_HOLD_MS: f64 = 600.0;
const PEDOMETER_SUPPRESS_MS: f64 = 1800.0;

#[derive(Clone, Copy, Debug)]
pub struct MagSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeviceMotionSample {
    /// Attitude yaw, radians or degrees per the `alpha` convention in the
    /// sensor adapter contract (already normalized to degrees by the
    /// caller-facing constructor below).
    pub attitude_yaw_deg: Option<f64>,
    pub yaw_rate_deg_s: Option<f64>,
    pub linear_acceleration: Option<(f64, f64, f64)>,
    pub acceleration_including_gravity: Option<(f64, f64, f64)>,
    pub timestamp_ms: f64,
}

impl DeviceMotionSample {
    /// `alpha` is radians if `|alpha| <= 2*pi + 0.5`, otherwise already
    /// degrees, per the sensor adapter contract.
    pub fn normalize_alpha(alpha: f64) -> f64 {
        if alpha.abs() <= std::f64::consts::TAU + 0.5 {
            alpha.to_degrees()
        } else {
            alpha
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepSource {
    DeviceMotion,
    Pedometer,
}

#[derive(Clone, Copy, Debug)]
pub struct StepEvent {
    pub source: StepSource,
    pub length_m: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct PdrDiagnostics {
    pub heading_deg: f64,
    pub mag_reliability: f64,
    pub stationary: bool,
    pub yaw_rate_deg_s: f64,
    pub last_step_length_m: Option<f64>,
}

pub struct PdrEngine {
    heading: f64,
    mag_heading: f64,
    gyro_heading: f64,
    mag_reliability: f64,
    mag_field_ema: Option<f64>,
    gravity_ema: Option<(f64, f64, f64)>,
    yaw_rate_deg_s: f64,

    accel_window: VecDeque<f64>,
    last_step_at_ms: f64,
    last_timestamp_ms: Option<f64>,
    time_since_start_ms: f64,
    in_peak: bool,
    peak_max: f64,
    low_since_ms: Option<f64>,
    stationary: bool,
    last_device_motion_step_at_ms: Option<f64>,
    last_pedometer_count: Option<u64>,
    last_step_length_m: Option<f64>,

    stride_scale: f64,
}

impl PdrEngine {
    pub fn new(initial_heading_deg: f64) -> Self {
        PdrEngine {
            heading: wrap_heading(initial_heading_deg),
            mag_heading: wrap_heading(initial_heading_deg),
            gyro_heading: wrap_heading(initial_heading_deg),
            mag_reliability: 0.0,
            mag_field_ema: None,
            gravity_ema: None,
            yaw_rate_deg_s: 0.0,
            accel_window: VecDeque::with_capacity(STEP_WINDOW_LEN),
            last_step_at_ms: f64::NEG_INFINITY,
            last_timestamp_ms: None,
            time_since_start_ms: 0.0,
            in_peak: false,
            peak_max: 0.0,
            low_since_ms: None,
            stationary: false,
            last_device_motion_step_at_ms: None,
            last_pedometer_count: None,
            last_step_length_m: None,
            stride_scale: 1.0,
        }
    }

    pub fn reset(&mut self, heading_deg: f64) {
        *self = PdrEngine::new(heading_deg);
    }

    pub fn set_stride_scale(&mut self, s: f64) {
        self.stride_scale = s.clamp(0.6, 1.5);
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn mag_heading(&self) -> f64 {
        self.mag_heading
    }

    pub fn align_heading_to_mag(&mut self) {
        self.heading = self.mag_heading;
    }

    pub fn diagnostics(&self) -> PdrDiagnostics {
        PdrDiagnostics {
            heading_deg: self.heading,
            mag_reliability: self.mag_reliability,
            stationary: self.stationary,
            yaw_rate_deg_s: self.yaw_rate_deg_s,
            last_step_length_m: self.last_step_length_m,
        }
    }

    /// Feed a magnetometer sample; updates `mag_heading`/`mag_reliability`
    /// and applies the slow correction into the fused heading.
    pub fn on_magnetometer(&mut self, sample: MagSample) {
        let mag = (sample.x * sample.x + sample.y * sample.y + sample.z * sample.z).sqrt();
        let ema = match self.mag_field_ema {
            Some(prev) => prev + MAG_EMA_ALPHA * (mag - prev),
            None => mag,
        };
        self.mag_field_ema = Some(ema);

        let in_band = ema > 15.0 && ema < 80.0;
        let near_ema = (mag - ema).abs() < MAG_SPIKE_DEVIATION_UT;
        let r_instant = if in_band && near_ema { 1.0 } else { 0.0 };
        self.mag_reliability = (0.85 * self.mag_reliability + 0.15 * r_instant).clamp(0.0, 1.0);

        let candidate = wrap_heading(sample.y.atan2(sample.x).to_degrees());
        let mag_alpha = 0.03 + 0.09 * self.mag_reliability;
        self.mag_heading = low_pass_heading(self.mag_heading, candidate, mag_alpha);

        let fast_turn = self.yaw_rate_deg_s.abs() > 140.0;
        let f_turn = if fast_turn { 0.2 } else { 1.0 };
        let g = (0.008 + 0.05 * self.mag_reliability) * f_turn;
        self.heading = low_pass_heading(self.heading, self.mag_heading, g);
    }

    /// Feed a device-motion sample: attitude yaw nudges the heading by a
    /// clamped step, yaw rate integrates it, and linear acceleration feeds
    /// the step detector.
    /// Returns the step length (meters) if this sample crossed the peak
    /// detector's exit condition, i.e. produced a device-motion step event.
    pub fn on_device_motion(&mut self, sample: DeviceMotionSample) -> Option<f64> {
        if let Some(dt_ms) = self.advance_clock(sample.timestamp_ms) {
            if let Some(yaw) = sample.attitude_yaw_deg {
                self.gyro_heading = wrap_heading(yaw);
                let delta = heading_diff(self.gyro_heading, self.heading).clamp(-20.0, 20.0);
                self.heading = wrap_heading(self.heading + delta);
            }

            if let Some(rate) = sample.yaw_rate_deg_s {
                self.yaw_rate_deg_s = rate;
                let dt_s = dt_ms / 1000.0;
                self.heading = wrap_heading(self.heading + rate * dt_s);
            }
        }

        if let Some(step) = self.feed_acceleration(sample) {
            self.last_device_motion_step_at_ms = Some(self.time_since_start_ms);
            self.last_step_length_m = Some(step);
            Some(step)
        } else {
            None
        }
    }

    /// Returns the step event, if this sample crossed the peak detector's
    /// exit condition.
    fn feed_acceleration(&mut self, sample: DeviceMotionSample) -> Option<f64> {
        self.time_since_start_ms = sample.timestamp_ms;
        let lin = if let Some((ax, ay, az)) = sample.linear_acceleration {
            (ax * ax + ay * ay + az * az).sqrt()
        } else if let Some((ax, ay, az)) = sample.acceleration_including_gravity {
            let mag = (ax * ax + ay * ay + az * az).sqrt();
            let ema = match self.gravity_ema {
                Some(prev) => prev + GRAVITY_EMA_ALPHA * (mag - prev),
                None => mag,
            };
            self.gravity_ema = Some(ema);
            (mag - ema).abs()
        } else {
            return None;
        };

        if self.accel_window.len() == STEP_WINDOW_LEN {
            self.accel_window.pop_front();
        }
        self.accel_window.push_back(lin);

        let (mean, std) = window_stats(&self.accel_window);
        let tau = (mean + 2.6 * std).clamp(0.06, 1.6);

        let low_threshold = 0.02_f64.max(0.25 * tau);
        if lin < low_threshold {
            if self.low_since_ms.is_none() {
                self.low_since_ms = Some(self.time_since_start_ms);
            }
            if self.time_since_start_ms - self.low_since_ms.unwrap() >= STATIONARY_HOLD_MS {
                self.stationary = true;
            }
        } else {
            self.low_since_ms = None;
            self.stationary = false;
        }

        let mut emitted = None;
        if !self.in_peak {
            if lin > tau {
                self.in_peak = true;
                self.peak_max = lin;
            }
        } else {
            self.peak_max = self.peak_max.max(lin);
            if lin < mean {
                self.in_peak = false;
                let since_last = self.time_since_start_ms - self.last_step_at_ms;
                if since_last > MIN_STEP_INTERVAL_MS && self.peak_max > tau && !self.stationary {
                    let length = (0.62 + 0.18 * (self.peak_max - tau))
                        .clamp(0.45, 1.05)
                        * self.stride_scale;
                    self.last_step_at_ms = self.time_since_start_ms;
                    emitted = Some(length);
                }
                self.peak_max = 0.0;
            }
        }

        emitted
    }

    fn advance_clock(&mut self, timestamp_ms: f64) -> Option<f64> {
        self.time_since_start_ms = timestamp_ms;
        let prev = self.last_timestamp_ms;
        self.last_timestamp_ms = Some(timestamp_ms);
        match prev {
            None => None,
            Some(p) => Some((timestamp_ms - p).clamp(1.0, 200.0)),
        }
    }

    /// Feed a cumulative pedometer count; emits a step only if no
    /// device-motion step has occurred in the last 1800 ms (anti-double-
    /// count), one event per unit of delta.
    pub fn on_pedometer(&mut self, cumulative_count: u64, timestamp_ms: f64) -> Vec<StepEvent> {
        let delta = match self.last_pedometer_count {
            Some(prev) if cumulative_count > prev => cumulative_count - prev,
            Some(_) => 0,
            None => 0,
        };
        self.last_pedometer_count = Some(cumulative_count);

        if delta == 0 {
            return Vec::new();
        }

        let suppressed = self
            .last_device_motion_step_at_ms
            .map(|t| timestamp_ms - t < PEDOMETER_SUPPRESS_MS)
            .unwrap_or(false);

        if suppressed {
            return Vec::new();
        }

        let length = (0.62 * self.stride_scale).clamp(0.45 * 0.6, 1.05 * 1.5);
        (0..delta)
            .map(|_| StepEvent {
                source: StepSource::Pedometer,
                length_m: length,
            })
            .collect()
    }
}

fn window_stats(window: &VecDeque<f64>) -> (f64, f64) {
    let n = window.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = window.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    (mean, var.sqrt())
}
