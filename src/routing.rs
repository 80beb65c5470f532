//! Shortest path from an arbitrary free point to a graph node, via a
//! virtual start node spliced onto the snapped (or nearest) location.
//!
//! Dijkstra runs over a binary heap rather than the O(V^2) scan a naive
//! port would use — the same `Reverse`-wrapped min-heap idiom the pack's
//! other pathfinding code uses for its open set.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geometry::Point2;
use crate::snap::{snap_to_graph, EdgeRef, SnapConfig};
use crate::store_map::StoreMap;

#[derive(Clone, Debug)]
pub struct PathResult {
    pub node_ids: Vec<String>,
    pub points: Vec<Point2>,
    pub length_meters: f64,
}

#[derive(Clone, Copy, Debug)]
struct HeapEntry {
    dist: f64,
    node: usize,
    order: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.order == other.order
    }
}
impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for a min-heap; break ties by discovery order so the
        // first-enumerated node at equal distance wins deterministically.
        other
            .dist
            .partial_cmp(&self.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.order.cmp(&self.order))
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Run Dijkstra from a free `start` point to `end_node_id`. Returns `None`
/// if the destination is unknown or unreachable.
pub fn shortest_path_from_point(
    map: &StoreMap,
    start: Point2,
    end_node_id: &str,
    snap_config: &SnapConfig,
) -> Option<PathResult> {
    let end_index = map.node_index_of(end_node_id)?;

    let snap = snap_to_graph(map, &start, None, snap_config);
    // virtual node index is one past the last real node.
    let virtual_index = map.nodes.len();

    // virtual_edges: (target node index, weight)
    let virtual_edges: Vec<(usize, f64)> = match snap.edge {
        Some(EdgeRef { from, to }) => {
            let a = map.node_by_index(from).point();
            let b = map.node_by_index(to).point();
            vec![(from, start.distance_to(&a)), (to, start.distance_to(&b))]
        }
        None => {
            let nearest = (0..map.nodes.len()).min_by(|&a, &b| {
                let da = start.distance_to(&map.node_by_index(a).point());
                let db = start.distance_to(&map.node_by_index(b).point());
                da.partial_cmp(&db).unwrap()
            })?;
            vec![(nearest, start.distance_to(&map.node_by_index(nearest).point()))]
        }
    };

    let n = map.nodes.len() + 1;
    let mut dist = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut heap = BinaryHeap::new();
    let mut order_counter = 0usize;

    dist[virtual_index] = 0.0;
    heap.push(HeapEntry {
        dist: 0.0,
        node: virtual_index,
        order: order_counter,
    });

    while let Some(HeapEntry { node: u, .. }) = heap.pop() {
        if visited[u] {
            continue;
        }
        visited[u] = true;
        if u == end_index {
            break;
        }

        let neighbors: Vec<(usize, f64)> = if u == virtual_index {
            virtual_edges.clone()
        } else {
            map.adjacency()[u]
                .iter()
                .map(|e| (e.to, e.weight))
                .collect()
        };

        for (v, w) in neighbors {
            if visited[v] {
                continue;
            }
            let cand = dist[u] + w;
            if cand < dist[v] {
                dist[v] = cand;
                prev[v] = Some(u);
                order_counter += 1;
                heap.push(HeapEntry {
                    dist: cand,
                    node: v,
                    order: order_counter,
                });
            }
        }
    }

    if !dist[end_index].is_finite() {
        return None;
    }

    let mut chain = vec![end_index];
    let mut cur = end_index;
    while let Some(p) = prev[cur] {
        chain.push(p);
        cur = p;
        if cur == virtual_index {
            break;
        }
    }
    chain.reverse();

    let mut node_ids = Vec::with_capacity(chain.len());
    let mut points = Vec::with_capacity(chain.len() + 1);
    points.push(snap.snapped);
    for &idx in &chain {
        if idx == virtual_index {
            continue;
        }
        let node = map.node_by_index(idx);
        node_ids.push(node.id.clone());
        points.push(node.point());
    }

    let mut length_meters = 0.0;
    for w in points.windows(2) {
        length_meters += w[0].distance_to(&w[1]);
    }

    Some(PathResult {
        node_ids,
        points,
        length_meters,
    })
}
