//! Snap-to-graph: projects a free 2D point onto the nearest walkable edge,
//! with corridor stickiness and an optional hard clamp for relocalization.
//!
//! Grounded on the teacher's `map_match::MapMatcher` — the hysteresis and
//! scoring shape is the same idea, adapted from lat/lon road segments with
//! heading compatibility to this spec's plan-frame edges with a pure
//! distance+penalty score.

use crate::geometry::{project_point_to_segment, Point2};
use crate::store_map::{StoreMap, StoreMapEdge};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeRef {
    pub from: usize,
    pub to: usize,
}

#[derive(Clone, Debug)]
pub struct SnapConfig {
    pub max_snap_meters: f64,
    pub switch_penalty_meters: f64,
    pub hard_clamp: bool,
}

impl Default for SnapConfig {
    fn default() -> Self {
        SnapConfig {
            max_snap_meters: 1.75,
            switch_penalty_meters: 0.35,
            hard_clamp: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SnapResult {
    pub snapped: Point2,
    pub distance: f64,
    pub edge: Option<EdgeRef>,
    pub t: f64,
}

struct Candidate {
    point: Point2,
    raw_distance: f64,
    score: f64,
    edge: EdgeRef,
    t: f64,
}

fn shares_endpoint(a: &EdgeRef, b: &EdgeRef) -> bool {
    a.from == b.from || a.from == b.to || a.to == b.from || a.to == b.to
}

fn same_edge(a: &EdgeRef, b: &EdgeRef) -> bool {
    (a.from == b.from && a.to == b.to) || (a.from == b.to && a.to == b.from)
}

fn usable(edge: &StoreMapEdge) -> bool {
    edge.bidirectional || edge.distance.map(|d| d > 0.0).unwrap_or(true)
}

fn score_candidates(
    map: &StoreMap,
    point: &Point2,
    previous_edge: Option<EdgeRef>,
    switch_penalty_meters: f64,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for (i, edge) in map.edges.iter().enumerate() {
        if !usable(edge) {
            continue;
        }
        let (Some(from_i), Some(to_i)) =
            (map.node_index_of(&edge.from), map.node_index_of(&edge.to))
        else {
            continue;
        };
        let a = map.node_by_index(from_i).point();
        let b = map.node_by_index(to_i).point();
        let proj = project_point_to_segment(point, &a, &b);
        let edge_ref = EdgeRef {
            from: from_i,
            to: to_i,
        };

        let penalty = match previous_edge {
            Some(prev) if same_edge(&prev, &edge_ref) => 0.0,
            Some(prev) if shares_endpoint(&prev, &edge_ref) => 0.08,
            Some(_) => switch_penalty_meters,
            None => 0.0,
        };

        out.push(Candidate {
            point: proj.q,
            raw_distance: proj.d,
            score: proj.d + penalty,
            edge: edge_ref,
            t: proj.t,
        });
        let _ = i;
    }
    out
}

fn best_by_score(candidates: &[Candidate]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.score.partial_cmp(&b.score).unwrap())
        .map(|(i, _)| i)
}

/// Snap `point` to the nearest usable edge in `map`.
pub fn snap_to_graph(
    map: &StoreMap,
    point: &Point2,
    previous_edge: Option<EdgeRef>,
    config: &SnapConfig,
) -> SnapResult {
    let candidates = score_candidates(map, point, previous_edge, config.switch_penalty_meters);

    if candidates.is_empty() {
        return SnapResult {
            snapped: *point,
            distance: f64::INFINITY,
            edge: None,
            t: 0.0,
        };
    }

    let global_best_i = best_by_score(&candidates).unwrap();

    let chosen_i = if let Some(prev) = previous_edge {
        let connected: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| shares_endpoint(&prev, &c.edge))
            .map(|(i, _)| i)
            .collect();

        if connected.is_empty() {
            global_best_i
        } else {
            let connected_best_i = *connected
                .iter()
                .min_by(|&&a, &&b| candidates[a].score.partial_cmp(&candidates[b].score).unwrap())
                .unwrap();

            if config.hard_clamp {
                let connected_d = candidates[connected_best_i].raw_distance;
                let global_d = candidates[global_best_i].raw_distance;
                let relocalize = connected_d > 2.25 * config.max_snap_meters
                    && global_d + 0.2 < connected_d;
                if relocalize {
                    global_best_i
                } else {
                    connected_best_i
                }
            } else {
                global_best_i
            }
        }
    } else {
        global_best_i
    };

    let chosen = &candidates[chosen_i];

    if !config.hard_clamp && chosen.raw_distance > config.max_snap_meters {
        return SnapResult {
            snapped: *point,
            distance: chosen.raw_distance,
            edge: Some(chosen.edge),
            t: chosen.t,
        };
    }

    SnapResult {
        snapped: chosen.point,
        distance: chosen.raw_distance,
        edge: Some(chosen.edge),
        t: chosen.t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_parallel_edges_map() -> StoreMap {
        let json = r#"{
            "id": "m", "label": "m",
            "nodes": [
                {"id": "a0", "label": "a0", "x": 0, "y": 0, "floor": 1, "type": "aisle"},
                {"id": "a1", "label": "a1", "x": 10, "y": 0, "floor": 1, "type": "aisle"},
                {"id": "b0", "label": "b0", "x": 0, "y": 0.4, "floor": 1, "type": "aisle"},
                {"id": "b1", "label": "b1", "x": 10, "y": 0.4, "floor": 1, "type": "aisle"}
            ],
            "edges": [
                {"from": "a0", "to": "a1"},
                {"from": "b0", "to": "b1"}
            ],
            "anchors": []
        }"#;
        StoreMap::from_json(json).unwrap()
    }

    #[test]
    fn s4_stickiness_prefers_previous_edge() {
        let map = two_parallel_edges_map();
        let a0 = map.node_index_of("a0").unwrap();
        let a1 = map.node_index_of("a1").unwrap();
        let prev = EdgeRef { from: a0, to: a1 };
        let config = SnapConfig::default();
        let result = snap_to_graph(&map, &Point2::new(5.0, 0.25), Some(prev), &config);
        assert_eq!(result.edge, Some(prev));
    }

    #[test]
    fn s5_hard_clamp_relocalizes_across_wall() {
        let json = r#"{
            "id": "m", "label": "m",
            "nodes": [
                {"id": "a0", "label": "a0", "x": 0, "y": 0, "floor": 1, "type": "aisle"},
                {"id": "a1", "label": "a1", "x": 10, "y": 0, "floor": 1, "type": "aisle"},
                {"id": "f0", "label": "f0", "x": 0, "y": 7.6, "floor": 1, "type": "aisle"},
                {"id": "f1", "label": "f1", "x": 10, "y": 7.6, "floor": 1, "type": "aisle"}
            ],
            "edges": [
                {"from": "a0", "to": "a1"},
                {"from": "f0", "to": "f1"}
            ],
            "anchors": []
        }"#;
        let map = StoreMap::from_json(json).unwrap();
        let a0 = map.node_index_of("a0").unwrap();
        let a1 = map.node_index_of("a1").unwrap();
        let prev = EdgeRef { from: a0, to: a1 };
        let config = SnapConfig {
            max_snap_meters: 0.5,
            switch_penalty_meters: 0.35,
            hard_clamp: true,
        };
        // distance to a0-a1 is 4.0, distance to f0-f1 is 3.6
        let result = snap_to_graph(&map, &Point2::new(5.0, 4.0), Some(prev), &config);
        assert_ne!(result.edge, Some(prev), "should relocalize to the far edge");
    }

    #[test]
    fn empty_graph_returns_unsnapped_infinite_distance() {
        let json = r#"{"id":"m","label":"m","nodes":[],"edges":[],"anchors":[]}"#;
        let map = StoreMap::from_json(json).unwrap();
        let result = snap_to_graph(&map, &Point2::new(1.0, 1.0), None, &SnapConfig::default());
        assert!(result.edge.is_none());
        assert!(result.distance.is_infinite());
        assert_relative_eq!(result.snapped.x, 1.0);
    }

    #[test]
    fn unsnapped_beyond_max_distance_keeps_edge_reference() {
        let map = two_parallel_edges_map();
        let config = SnapConfig {
            max_snap_meters: 0.1,
            ..SnapConfig::default()
        };
        let result = snap_to_graph(&map, &Point2::new(5.0, 5.0), None, &config);
        assert!(result.edge.is_some());
        assert_relative_eq!(result.snapped.x, 5.0);
        assert_relative_eq!(result.snapped.y, 5.0);
    }
}
