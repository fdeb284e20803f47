//! Serializable route description handed to the presentation layer.
//!
//! Conversion from [`RouteResult`] happens at this boundary; the routing
//! core keeps full precision.

use serde::{Deserialize, Serialize};

use crate::facility::Facility;
use crate::router::RouteResult;

/// Note attached to direct-line fallback routes.
pub const DEGRADED_NOTE: &str = "Direct path used - optimal path not found";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub lat: f64,
    pub lng: f64,
    pub traffic_density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilitySummary {
    pub facility_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&Facility> for FacilitySummary {
    fn from(facility: &Facility) -> Self {
        Self {
            facility_id: facility.id.clone(),
            name: facility.name.clone(),
            kind: facility.kind.as_str().to_string(),
        }
    }
}

/// Route response as rendered for map clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub path: Vec<PathPoint>,
    /// Kilometers, rounded to two decimals.
    pub total_distance: f64,
    pub average_traffic_density: f64,
    /// `MEDICAL`, `FIRE` or `POLICE`.
    pub emergency_type: String,
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub eta_seconds: i64,
    pub facility: FacilitySummary,
}

impl RouteResponse {
    /// Path as `(lat, lng)` pairs.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.path.iter().map(|p| (p.lat, p.lng)).collect()
    }
}

impl From<&RouteResult> for RouteResponse {
    fn from(result: &RouteResult) -> Self {
        Self {
            path: result
                .path
                .iter()
                .map(|point| PathPoint {
                    lat: point.position.lat,
                    lng: point.position.lon,
                    traffic_density: point.traffic_density,
                })
                .collect(),
            total_distance: round2(result.total_distance_km),
            average_traffic_density: round2(result.average_traffic_density),
            emergency_type: result.facility.kind.emergency_label().to_string(),
            degraded: result.degraded,
            note: result.degraded.then(|| DEGRADED_NOTE.to_string()),
            eta_seconds: result.eta_seconds,
            facility: FacilitySummary::from(&result.facility),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::FacilityType;
    use crate::geo::GeoPoint;
    use crate::search::RoutePoint;

    fn result(degraded: bool) -> RouteResult {
        let start = GeoPoint::new(16.9927, 81.78);
        let goal = GeoPoint::new(16.9921, 81.7743);
        RouteResult {
            path: vec![
                RoutePoint {
                    position: start,
                    traffic_density: 41.2,
                },
                RoutePoint {
                    position: goal,
                    traffic_density: 41.2,
                },
            ],
            total_distance_km: 0.614_987,
            average_traffic_density: 41.234_5,
            facility: Facility::new("2", "Hope Hospital", FacilityType::Hospital, goal),
            degraded,
            total_cost: 0.614_987,
            eta_seconds: 55,
            iterations: 7,
        }
    }

    #[test]
    fn test_response_rounds_metrics() {
        let response = RouteResponse::from(&result(false));
        assert_eq!(response.total_distance, 0.61);
        assert_eq!(response.average_traffic_density, 41.23);
        assert_eq!(response.emergency_type, "MEDICAL");
        assert_eq!(response.note, None);
        assert_eq!(response.coordinates()[1], (16.9921, 81.7743));
    }

    #[test]
    fn test_degraded_response_has_note() {
        let response = RouteResponse::from(&result(true));
        assert!(response.degraded);
        assert_eq!(response.note.as_deref(), Some(DEGRADED_NOTE));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(RouteResponse::from(&result(false))).unwrap();
        assert_eq!(json["facility"]["type"], "hospital");
        assert_eq!(json["facility"]["facility_id"], "2");
        assert_eq!(json["path"][0]["lng"], 81.78);
        assert!(json.get("note").is_none());
    }
}
