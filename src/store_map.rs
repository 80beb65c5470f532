//! Typed floor graph: nodes, edges, anchors, and a precomputed adjacency
//! list reused by routing. Loaded once per session and treated as
//! read-only thereafter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::geometry::Point2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Entry,
    Exit,
    Aisle,
    Poi,
    Walkway,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreMapNode {
    pub id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub floor: i32,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(rename = "sectionId", skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

impl StoreMapNode {
    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreMapEdge {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default = "default_true")]
    pub bidirectional: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorSource {
    Mock,
    Live,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreMapAnchor {
    pub bssid: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub floor: i32,
    pub source: AnchorSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl StoreMapAnchor {
    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WifiReading {
    pub bssid: String,
    pub level: f64,
}

/// Normalize a BSSID for comparison: trim whitespace, lower-case.
pub fn normalize_bssid(bssid: &str) -> String {
    bssid.trim().to_lowercase()
}

#[derive(Clone, Copy, Debug)]
pub struct AdjEntry {
    pub to: usize,
    pub weight: f64,
    /// index of the edge this entry was derived from, for path reconstruction
    /// bookkeeping if ever needed by callers.
    pub edge_index: usize,
}

/// A floor graph with adjacency precomputed once at load time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreMap {
    pub id: String,
    pub label: String,
    #[serde(rename = "gridSize", skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,
    pub nodes: Vec<StoreMapNode>,
    pub edges: Vec<StoreMapEdge>,
    #[serde(default)]
    pub anchors: Vec<StoreMapAnchor>,

    #[serde(skip)]
    node_index: HashMap<String, usize>,
    #[serde(skip)]
    adjacency: Vec<Vec<AdjEntry>>,
}

impl StoreMap {
    pub fn from_json(raw: &str) -> Result<StoreMap, EngineError> {
        let mut map: StoreMap =
            serde_json::from_str(raw).map_err(|e| EngineError::GraphParse(e.to_string()))?;
        map.rebuild_index();
        Ok(map)
    }

    /// Recompute the node index and adjacency list. Edges referring to
    /// unknown node ids are dropped, with a warning, rather than failing
    /// the whole load.
    fn rebuild_index(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        let mut kept_edges = Vec::with_capacity(self.edges.len());

        for edge in self.edges.drain(..) {
            let (Some(&from_i), Some(&to_i)) = (
                self.node_index.get(&edge.from),
                self.node_index.get(&edge.to),
            ) else {
                log::warn!(
                    "dropping edge {:?} -> {:?}: references an unknown node",
                    edge.from,
                    edge.to
                );
                continue;
            };

            let weight = edge.distance.unwrap_or_else(|| {
                self.nodes[from_i].point().distance_to(&self.nodes[to_i].point())
            });

            let edge_index = kept_edges.len();
            adjacency[from_i].push(AdjEntry {
                to: to_i,
                weight,
                edge_index,
            });
            if edge.bidirectional {
                adjacency[to_i].push(AdjEntry {
                    to: from_i,
                    weight,
                    edge_index,
                });
            }
            kept_edges.push(edge);
        }

        self.edges = kept_edges;
        self.adjacency = adjacency;
    }

    pub fn node_index_of(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn node_by_index(&self, i: usize) -> &StoreMapNode {
        &self.nodes[i]
    }

    pub fn adjacency(&self) -> &[Vec<AdjEntry>] {
        &self.adjacency
    }

    /// Closest node to `point` matching `types_filter` if given, by Euclidean
    /// distance.
    pub fn nearest_node_id(&self, point: &Point2, types_filter: Option<&[NodeType]>) -> Option<String> {
        self.nodes
            .iter()
            .filter(|n| {
                types_filter
                    .map(|types| types.contains(&n.node_type))
                    .unwrap_or(true)
            })
            .min_by(|a, b| {
                a.point()
                    .distance_to(point)
                    .partial_cmp(&b.point().distance_to(point))
                    .unwrap()
            })
            .map(|n| n.id.clone())
    }
}
