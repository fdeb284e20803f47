//! Overpass API adapter for loading drivable roads.
//!
//! Fetches OSM ways tagged with a drivable `highway` value inside a bounding
//! box and turns them into a [`RoadGraph`].

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::geo::{BoundingBox, GeoPoint};
use crate::road::RoadGraph;

/// `highway` values a car may drive on.
pub const DRIVABLE_HIGHWAYS: &[&str] = &[
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "residential",
    "unclassified",
    "living_street",
    "service",
];

#[derive(Debug, Clone)]
pub struct OverpassConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: "https://overpass-api.de/api/interpreter".to_string(),
            timeout_secs: 180,
            user_agent: concat!("emergency-router/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverpassClient {
    config: OverpassConfig,
    client: reqwest::blocking::Client,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    /// Downloads the drivable road network inside `area`.
    pub fn fetch(&self, area: &BoundingBox) -> Result<RoadGraph> {
        let query = road_query(area, self.config.timeout_secs);
        debug!(%query, "overpass query");
        info!(
            north = area.north,
            south = area.south,
            east = area.east,
            west = area.west,
            "downloading road network"
        );

        let response: OverpassResponse = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "text/plain")
            .body(query)
            .send()?
            .error_for_status()?
            .json()?;

        info!(elements = response.elements.len(), "received OSM elements");
        Ok(RoadGraph::from_overpass(&response))
    }
}

/// Overpass QL for drivable ways and their nodes inside `area`.
pub fn road_query(area: &BoundingBox, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{timeout}];\n\
         (\n  way[\"highway\"~\"^({highways})$\"]({south},{west},{north},{east});\n);\n\
         (._;>;);\nout body;",
        timeout = timeout_secs,
        highways = DRIVABLE_HIGHWAYS.join("|"),
        south = area.south,
        west = area.west,
        north = area.north,
        east = area.east,
    )
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OsmElement>,
}

impl OverpassResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsmElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl OsmElement {
    fn is_drivable(&self) -> bool {
        self.tags
            .get("highway")
            .is_some_and(|highway| DRIVABLE_HIGHWAYS.contains(&highway.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Both,
    Forward,
    Backward,
}

fn direction(tags: &HashMap<String, String>) -> Direction {
    match tags.get("oneway").map(String::as_str) {
        Some("yes" | "true" | "1") => Direction::Forward,
        Some("-1" | "reverse") => Direction::Backward,
        _ if tags.get("junction").is_some_and(|j| j == "roundabout") => Direction::Forward,
        _ => Direction::Both,
    }
}

impl RoadGraph {
    /// Builds a graph from an Overpass response.
    ///
    /// Non-drivable ways and references to missing nodes are skipped.
    pub fn from_overpass(response: &OverpassResponse) -> Self {
        let points: HashMap<i64, GeoPoint> = response
            .elements
            .iter()
            .filter(|e| e.kind == "node")
            .filter_map(|e| Some((e.id, GeoPoint::new(e.lat?, e.lon?))))
            .collect();

        let mut roads = RoadGraph::new();
        let mut ways = 0;
        for way in response.elements.iter().filter(|e| e.kind == "way" && e.is_drivable()) {
            let direction = direction(&way.tags);
            for pair in way.nodes.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                let (Some(&a), Some(&b)) = (points.get(&from), points.get(&to)) else {
                    continue;
                };
                roads.add_node(from, a);
                roads.add_node(to, b);
                match direction {
                    Direction::Both => roads.add_road(from, to, false),
                    Direction::Forward => roads.add_road(from, to, true),
                    Direction::Backward => roads.add_road(to, from, true),
                };
            }
            ways += 1;
        }

        info!(
            nodes = roads.node_count(),
            edges = roads.edge_count(),
            ways,
            "built road graph"
        );
        roads
    }
}
