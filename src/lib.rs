//! emergency-router core
//!
//! Routes an emergency vehicle to the best facility of the type it needs,
//! using a budgeted A* search with traffic-aware costs and a parallel
//! evaluation of every candidate facility.

pub mod config;
pub mod error;
pub mod facility;
pub mod geo;
pub mod grid;
pub mod logging;
pub mod nearest;
pub mod overpass;
pub mod response;
pub mod road;
pub mod router;
pub mod search;
pub mod traffic;
pub mod traits;

pub use config::RouterConfig;
pub use error::{Error, Result};
pub use facility::{Facility, FacilityRegistry, FacilityType, VehicleType};
pub use geo::{BoundingBox, GeoPoint};
pub use grid::GridSurface;
pub use nearest::{NearestSelector, SelectionPolicy};
pub use response::RouteResponse;
pub use road::RoadGraph;
pub use router::{CandidateRouter, RouteResult};
pub use search::{RoutePoint, SearchOptions, SearchRoute};
pub use traffic::{CostModel, DensityModel, TrafficSnapshot};
pub use traits::RoutingSurface;
