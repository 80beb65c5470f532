//! Indoor positioning and navigation engine for pedestrians moving
//! through a building whose floorplan is known.
//!
//! Given a stream of inertial sensor samples, optional step counts, and
//! periodic Wi-Fi scans, [`Session`] maintains a continuously updated
//! pose, matches it to the walkable graph, routes to a chosen destination,
//! and emits turn-by-turn instructions with reroute detection.

pub mod adapters;
pub mod config;
pub mod error;
pub mod geometry;
pub mod kalman;
pub mod navigation;
pub mod pdr;
pub mod positioning;
pub mod routing;
pub mod snap;
pub mod store_map;
pub mod turns;
pub mod wifi;

use adapters::SensorHealth;
use config::{PositioningConfig, RerouteConfig};
use error::EngineError;
use geometry::Point2;
use navigation::{NavState, NavigationService};
use pdr::{DeviceMotionSample, MagSample};
use positioning::{Pose2D, PositioningSession};
use snap::SnapConfig;
use store_map::{StoreMap, WifiReading};

/// Events the session may produce in response to a single input. The host
/// application drains these after each call rather than subscribing to a
/// callback, since the core is synchronous and single-threaded.
#[derive(Clone, Debug)]
pub enum NavigationEvent {
    Pose(Pose2D),
    PathPoint(Point2),
    Route(Option<navigation::IndoorRoute>),
    Instruction {
        next_instruction: String,
        distance_to_next: f64,
    },
    OffRoute(bool),
    SensorHealth(SensorHealth),
}

/// Owns a positioning session and an optional active route. This is the
/// crate's primary entry point.
pub struct Session {
    positioning: PositioningSession,
    navigation: NavigationService,
    snap_config: SnapConfig,
    last_off_route: Option<bool>,
}

impl Session {
    pub fn start(
        map_json: &str,
        positioning_config: PositioningConfig,
        reroute_config: RerouteConfig,
    ) -> Result<Session, EngineError> {
        let map = StoreMap::from_json(map_json)?;
        let snap_config = SnapConfig::from(&positioning_config.snap);
        let positioning = PositioningSession::start(map, positioning_config);
        let navigation = NavigationService::new(reroute_config);

        Ok(Session {
            positioning,
            navigation,
            snap_config,
            last_off_route: None,
        })
    }

    pub fn on_magnetometer(&mut self, sample: MagSample) {
        self.positioning.on_magnetometer(sample);
    }

    pub fn on_device_motion(&mut self, timestamp_ms: f64, sample: DeviceMotionSample) -> Vec<NavigationEvent> {
        let pose = self.positioning.on_device_motion(timestamp_ms, sample);
        self.events_for_pose(pose, timestamp_ms)
    }

    pub fn on_pedometer(&mut self, cumulative_count: u64, timestamp_ms: f64) -> Vec<NavigationEvent> {
        let pose = self.positioning.on_pedometer(cumulative_count, timestamp_ms);
        self.events_for_pose(pose, timestamp_ms)
    }

    pub fn on_wifi_scan(&mut self, readings: &[WifiReading], timestamp_ms: f64) -> Vec<NavigationEvent> {
        let pose = self.positioning.on_wifi_scan(readings, timestamp_ms);
        self.events_for_pose(pose, timestamp_ms)
    }

    fn events_for_pose(&mut self, pose: Option<Pose2D>, timestamp_ms: f64) -> Vec<NavigationEvent> {
        let Some(pose) = pose else {
            return Vec::new();
        };

        let mut events = vec![
            NavigationEvent::Pose(pose),
            NavigationEvent::PathPoint(Point2::new(pose.x, pose.y)),
        ];

        let nav_state: NavState = self.navigation.on_position_update(
            self.positioning.map(),
            Point2::new(pose.x, pose.y),
            timestamp_ms,
            &self.snap_config,
        );

        events.push(NavigationEvent::Instruction {
            next_instruction: nav_state.next_instruction,
            distance_to_next: nav_state.distance_to_next,
        });

        if self.last_off_route != Some(nav_state.off_route) {
            events.push(NavigationEvent::OffRoute(nav_state.off_route));
            self.last_off_route = Some(nav_state.off_route);
        }

        if nav_state.recalculated {
            events.push(NavigationEvent::Route(self.navigation.route().cloned()));
        }

        events
    }

    /// Selects a destination and runs the initial route calculation,
    /// returning the resulting route event.
    pub fn set_destination(&mut self, destination_id: &str, now_ms: f64) -> NavigationEvent {
        let current = self.positioning.path_buffer().back().copied().unwrap_or(Point2::new(0.0, 0.0));
        self.navigation.set_destination(
            self.positioning.map(),
            destination_id,
            current,
            now_ms,
            &self.snap_config,
        );
        NavigationEvent::Route(self.navigation.route().cloned())
    }

    pub fn disable_navigation(&mut self) {
        self.navigation.disable();
    }

    pub fn route(&self) -> Option<&navigation::IndoorRoute> {
        self.navigation.route()
    }

    pub fn reset_to(&mut self, point: Point2) {
        self.positioning.reset_to(point);
    }

    pub fn align_heading_to_mag(&mut self) {
        self.positioning.align_heading_to_mag();
    }

    pub fn set_stride_scale(&mut self, s: f64) {
        self.positioning.set_stride_scale(s);
    }

    pub fn set_wifi_enabled(&mut self, enabled: bool) {
        self.positioning.set_wifi_enabled(enabled);
    }

    /// Host-reported sensor availability/permission state, echoed back as
    /// an observable event per the sensor adapter contract (the engine
    /// itself never probes hardware).
    pub fn report_sensor_health(&mut self, health: SensorHealth) -> NavigationEvent {
        NavigationEvent::SensorHealth(health)
    }
}
