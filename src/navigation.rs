//! Tracks an active route: destination selection, progress, off-route
//! detection, and reroute scheduling.
//!
//! The off-route persist timer and reroute cooldown are the same shape as
//! the teacher's `restart_manager::RestartState` cooldown gating (signal,
//! wait for a timer, then re-trigger) but with a fixed interval rather than
//! exponential backoff, since spec scenario S6 pins an exact cooldown.

use crate::config::RerouteConfig;
use crate::geometry::{project_point_to_segment, Point2};
use crate::routing::{shortest_path_from_point, PathResult};
use crate::snap::SnapConfig;
use crate::store_map::StoreMap;
use crate::turns::{build_maneuvers, format_next_instruction, Maneuver};

const RECALC_MIN_INTERVAL_MS: f64 = 1500.0;
const NEXT_MANEUVER_LOOKAHEAD_M: f64 = 0.5;

#[derive(Clone, Debug)]
pub struct IndoorRoute {
    pub path: PathResult,
    pub maneuvers: Vec<Maneuver>,
}

#[derive(Clone, Copy, Debug)]
pub struct RouteProgress {
    pub along_meters: f64,
    pub closest: Point2,
    pub distance_meters: f64,
    pub segment_index: usize,
    pub t: f64,
}

pub struct NavigationService {
    enabled: bool,
    destination_id: Option<String>,
    route: Option<IndoorRoute>,
    reroute: RerouteConfig,
    off_route_since_ms: Option<f64>,
    last_recalc_ms: Option<f64>,
    off_route: bool,
}

impl NavigationService {
    pub fn new(reroute: RerouteConfig) -> Self {
        NavigationService {
            enabled: false,
            destination_id: None,
            route: None,
            reroute,
            off_route_since_ms: None,
            last_recalc_ms: None,
            off_route: false,
        }
    }

    pub fn route(&self) -> Option<&IndoorRoute> {
        self.route.as_ref()
    }

    pub fn is_off_route(&self) -> bool {
        self.off_route
    }

    pub fn set_destination(
        &mut self,
        map: &StoreMap,
        destination_id: &str,
        current: Point2,
        now_ms: f64,
        snap_config: &SnapConfig,
    ) {
        self.enabled = true;
        self.destination_id = Some(destination_id.to_string());
        self.recalc(map, current, now_ms, snap_config);
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.route = None;
        self.off_route = false;
        self.off_route_since_ms = None;
    }

    fn recalc(&mut self, map: &StoreMap, current: Point2, now_ms: f64, snap_config: &SnapConfig) {
        self.last_recalc_ms = Some(now_ms);
        self.off_route_since_ms = None;
        self.off_route = false;

        let Some(dest) = &self.destination_id else {
            self.route = None;
            return;
        };

        self.route = shortest_path_from_point(map, current, dest, snap_config).map(|path| {
            let maneuvers = build_maneuvers(&path.points);
            IndoorRoute { path, maneuvers }
        });
    }

    fn project_progress(route: &IndoorRoute, current: Point2) -> RouteProgress {
        let points = &route.path.points;
        let mut best: Option<RouteProgress> = None;
        let mut cumulative = 0.0;

        for i in 0..points.len().saturating_sub(1) {
            let proj = project_point_to_segment(&current, &points[i], &points[i + 1]);
            let along = cumulative + points[i].distance_to(&proj.q);
            let candidate = RouteProgress {
                along_meters: along,
                closest: proj.q,
                distance_meters: proj.d,
                segment_index: i,
                t: proj.t,
            };
            if best.map(|b| candidate.distance_meters < b.distance_meters).unwrap_or(true) {
                best = Some(candidate);
            }
            cumulative += points[i].distance_to(&points[i + 1]);
        }

        best.unwrap_or(RouteProgress {
            along_meters: 0.0,
            closest: current,
            distance_meters: 0.0,
            segment_index: 0,
            t: 0.0,
        })
    }

    fn next_maneuver(&self, along_meters: f64) -> Option<&Maneuver> {
        self.route
            .as_ref()?
            .maneuvers
            .iter()
            .find(|m| m.distance_from_start_meters > along_meters + NEXT_MANEUVER_LOOKAHEAD_M)
    }

    /// Update progress against `current` at `now_ms`; may trigger a
    /// reroute recalculation. Returns the observable navigation state.
    pub fn on_position_update(
        &mut self,
        map: &StoreMap,
        current: Point2,
        now_ms: f64,
        snap_config: &SnapConfig,
    ) -> NavState {
        if !self.enabled {
            return NavState {
                off_route: false,
                next_instruction: format_next_instruction(None, 0.0),
                distance_to_next: 0.0,
                recalculated: false,
            };
        }

        let progress = self.route.as_ref().map(|r| Self::project_progress(r, current));
        let mut recalculated = false;

        if let Some(p) = progress {
            if p.distance_meters > self.reroute.off_route_meters {
                let since = *self.off_route_since_ms.get_or_insert(now_ms);
                let age = now_ms - since;
                let elapsed_since_recalc =
                    self.last_recalc_ms.map(|t| now_ms - t).unwrap_or(f64::INFINITY);
                if age >= self.reroute.persist_ms && elapsed_since_recalc >= RECALC_MIN_INTERVAL_MS
                {
                    self.recalc(map, current, now_ms, snap_config);
                    self.off_route = false;
                    recalculated = true;
                } else {
                    self.off_route = true;
                }
            } else {
                self.off_route = false;
                self.off_route_since_ms = None;
            }
        }

        let along = progress.map(|p| p.along_meters).unwrap_or(0.0);
        let next = self.next_maneuver(along);
        let distance_to_next = next.map(|m| m.distance_from_start_meters - along).unwrap_or(0.0);

        NavState {
            off_route: self.off_route,
            next_instruction: format_next_instruction(next, distance_to_next),
            distance_to_next,
            recalculated,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NavState {
    pub off_route: bool,
    pub next_instruction: String,
    pub distance_to_next: f64,
    pub recalculated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_line_map() -> StoreMap {
        let json = r#"{
            "id": "m", "label": "m",
            "nodes": [
                {"id": "a", "label": "a", "x": 0, "y": 0, "floor": 1, "type": "entry"},
                {"id": "b", "label": "b", "x": 10, "y": 0, "floor": 1, "type": "exit"}
            ],
            "edges": [
                {"from": "a", "to": "b"}
            ],
            "anchors": []
        }"#;
        StoreMap::from_json(json).unwrap()
    }

    #[test]
    fn s6_reroute_triggers_once_then_waits_for_cooldown() {
        let map = straight_line_map();
        let snap_config = SnapConfig::default();
        let mut nav = NavigationService::new(RerouteConfig {
            off_route_meters: 2.0,
            persist_ms: 3000.0,
        });
        nav.set_destination(&map, "b", Point2::new(0.0, 0.0), 0.0, &snap_config);

        let off_route_point = Point2::new(5.0, 2.5);

        let s0 = nav.on_position_update(&map, off_route_point, 0.0, &snap_config);
        assert!(s0.off_route);

        let s_before = nav.on_position_update(&map, off_route_point, 2999.0, &snap_config);
        assert!(s_before.off_route, "must not recalc before persistMs elapses");

        let s_trigger = nav.on_position_update(&map, off_route_point, 3001.0, &snap_config);
        assert!(!s_trigger.off_route, "recalc resets the off-route flag");

        // re-entering off-route immediately after a recalc must not
        // trigger a second recalc before the 1500ms cooldown.
        let s_again = nav.on_position_update(&map, off_route_point, 3002.0, &snap_config);
        assert!(s_again.off_route);
    }

    #[test]
    fn format_none_destination_prompts_selection() {
        let map = straight_line_map();
        let mut nav = NavigationService::new(RerouteConfig::default());
        let state = nav.on_position_update(&map, Point2::new(0.0, 0.0), 0.0, &SnapConfig::default());
        assert_eq!(state.next_instruction, "Select a destination");
    }
}
