//! Road-network surface backed by a petgraph directed graph.
//!
//! Nodes are OSM nodes, edges are road segments weighted by their length.
//! Segment lengths are base costs only; traffic is applied by the cost
//! model per request and never written back into the graph.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{Error, Result};
use crate::geo::{self, GeoPoint};
use crate::traffic::edge_key;
use crate::traits::{RoutingSurface, Step};

/// Farthest a request point may be from the nearest road node.
pub const DEFAULT_SNAP_RADIUS_KM: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct RoadNode {
    pub osm_id: i64,
    pub point: GeoPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadSegment {
    pub key: String,
    pub length_km: f64,
}

/// Directed road graph with nearest-node snapping.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    graph: DiGraph<RoadNode, RoadSegment>,
    by_osm_id: HashMap<i64, NodeIndex>,
    snap_radius_km: f64,
}

impl Default for RoadGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RoadGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            by_osm_id: HashMap::new(),
            snap_radius_km: DEFAULT_SNAP_RADIUS_KM,
        }
    }

    pub fn with_snap_radius(mut self, km: f64) -> Self {
        self.snap_radius_km = km;
        self
    }

    /// Gets or creates the node for an OSM id.
    pub fn add_node(&mut self, osm_id: i64, point: GeoPoint) -> NodeIndex {
        if let Some(&idx) = self.by_osm_id.get(&osm_id) {
            return idx;
        }
        let idx = self.graph.add_node(RoadNode { osm_id, point });
        self.by_osm_id.insert(osm_id, idx);
        idx
    }

    /// Connects two known nodes, in both directions unless `oneway`.
    ///
    /// Returns false when either node is unknown.
    pub fn add_road(&mut self, from: i64, to: i64, oneway: bool) -> bool {
        let (Some(&a), Some(&b)) = (self.by_osm_id.get(&from), self.by_osm_id.get(&to)) else {
            return false;
        };
        let length_km = geo::distance(self.graph[a].point, self.graph[b].point);
        self.graph.add_edge(
            a,
            b,
            RoadSegment {
                key: edge_key(from, to),
                length_km,
            },
        );
        if !oneway {
            self.graph.add_edge(
                b,
                a,
                RoadSegment {
                    key: edge_key(to, from),
                    length_km,
                },
            );
        }
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&RoadNode> {
        self.graph.node_weight(idx)
    }

    /// Nearest node to `point` and its distance in kilometers.
    pub fn snap(&self, point: GeoPoint) -> Option<(NodeIndex, f64)> {
        self.graph
            .node_indices()
            .map(|idx| (idx, geo::distance(point, self.graph[idx].point)))
            .min_by_key(|(idx, km)| (OrderedFloat(*km), *idx))
    }

    fn map(&self, point: GeoPoint) -> Result<NodeIndex> {
        if self.is_empty() {
            return Err(Error::RoutingGraphNotLoaded);
        }
        if !point.is_valid() {
            return Err(Error::InvalidCoordinate(point));
        }
        match self.snap(point) {
            Some((idx, km)) if km <= self.snap_radius_km => Ok(idx),
            _ => Err(Error::OffSurface(point)),
        }
    }
}

impl RoutingSurface for RoadGraph {
    type Node = NodeIndex;

    fn origin(&self, point: GeoPoint) -> Result<NodeIndex> {
        self.map(point)
    }

    fn target(&self, point: GeoPoint) -> Result<NodeIndex> {
        self.map(point)
    }

    fn position(&self, node: NodeIndex) -> GeoPoint {
        self.graph[node].point
    }

    fn neighbours(&self, node: NodeIndex) -> Vec<Step<NodeIndex>> {
        self.graph
            .edges(node)
            .map(|edge| Step {
                to: edge.target(),
                edge_key: edge.weight().key.clone(),
                base_cost: edge.weight().length_km,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> RoadGraph {
        let mut roads = RoadGraph::new();
        roads.add_node(1, GeoPoint::new(16.9927, 81.7800));
        roads.add_node(2, GeoPoint::new(16.9960, 81.7800));
        roads.add_node(3, GeoPoint::new(16.9960, 81.7760));
        assert!(roads.add_road(1, 2, false));
        assert!(roads.add_road(2, 3, true));
        roads
    }

    #[test]
    fn test_add_road_respects_oneway() {
        let roads = triangle();
        assert_eq!(roads.node_count(), 3);
        assert_eq!(roads.edge_count(), 3);

        let from_three = roads.neighbours(roads.by_osm_id[&3]);
        assert!(from_three.is_empty(), "oneway segment should not be reversible");

        let from_two = roads.neighbours(roads.by_osm_id[&2]);
        let keys: Vec<_> = from_two.iter().map(|s| s.edge_key.as_str()).collect();
        assert!(keys.contains(&"2-1"));
        assert!(keys.contains(&"2-3"));
    }

    #[test]
    fn test_add_road_with_unknown_node() {
        let mut roads = triangle();
        assert!(!roads.add_road(1, 99, false));
        assert_eq!(roads.edge_count(), 3);
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut roads = triangle();
        let again = roads.add_node(1, GeoPoint::new(0.0, 0.0));
        assert_eq!(roads.node_count(), 3);
        assert_eq!(roads.position(again), GeoPoint::new(16.9927, 81.7800));
    }

    #[test]
    fn test_snapping() {
        let roads = triangle();
        let idx = roads.origin(GeoPoint::new(16.9928, 81.7801)).unwrap();
        assert_eq!(roads.node(idx).unwrap().osm_id, 1);

        assert!(matches!(
            roads.target(GeoPoint::new(17.05, 81.78)),
            Err(Error::OffSurface(_))
        ));
    }

    #[test]
    fn test_empty_graph_is_not_loaded() {
        let roads = RoadGraph::new();
        assert!(matches!(
            roads.origin(GeoPoint::new(16.99, 81.78)),
            Err(Error::RoutingGraphNotLoaded)
        ));
    }
}
