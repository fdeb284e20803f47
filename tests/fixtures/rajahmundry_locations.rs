//! Rajahmundry locations for realistic test fixtures.
//!
//! All coordinates fall inside `BoundingBox::RAJAHMUNDRY`, so they are
//! routable on the default grid surface.

use std::sync::Arc;

use emergency_router::{
    CandidateRouter, DensityModel, Facility, FacilityRegistry, FacilityType, GeoPoint, GridSurface, RouterConfig,
};

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

// ============================================================================
// Vehicle Positions
// ============================================================================

pub const DISPATCH_POINT: Location = Location::new("Dispatch Point", 16.9927, 81.7800);

pub const POSITIONS: &[Location] = &[
    DISPATCH_POINT,
    Location::new("Kotipalli Bus Stand", 16.9950, 81.7790),
    Location::new("Danavaipeta", 16.9900, 81.7810),
    Location::new("Innespeta", 16.9960, 81.7760),
    Location::new("Aryapuram", 16.9975, 81.7830),
    Location::new("Tilak Road", 16.9890, 81.7780),
];

// ============================================================================
// Facilities
// ============================================================================

pub const GOVERNMENT_HOSPITAL: Location = Location::new("Government General Hospital", 17.0005, 81.7800);
pub const HOPE_HOSPITAL: Location = Location::new("Hope Hospital", 16.9921, 81.7743);

pub const HOSPITALS: &[Location] = &[GOVERNMENT_HOSPITAL, HOPE_HOSPITAL];

pub const FIRE_STATIONS: &[Location] = &[
    Location::new("Fire Station Rajahmundry", 16.9891, 81.7840),
    Location::new("District Fire Office", 16.9927, 81.7756),
];

pub const POLICE_STATIONS: &[Location] = &[
    Location::new("Three Town Police Station", 16.9927, 81.7875),
    Location::new("Two Town Police Station", 16.9867, 81.7830),
];

/// Every fixture location, positions first.
pub fn all_locations() -> Vec<Location> {
    POSITIONS
        .iter()
        .chain(HOSPITALS)
        .chain(FIRE_STATIONS)
        .chain(POLICE_STATIONS)
        .cloned()
        .collect()
}

// ============================================================================
// Builders
// ============================================================================

/// Registry holding every fixture facility, ids `<type>-<index>`.
pub fn registry() -> FacilityRegistry {
    let mut registry = FacilityRegistry::new();
    let groups = [
        (FacilityType::Hospital, HOSPITALS),
        (FacilityType::FireStation, FIRE_STATIONS),
        (FacilityType::PoliceStation, POLICE_STATIONS),
    ];
    for (kind, locations) in groups {
        for (i, location) in locations.iter().enumerate() {
            let id = format!("{}-{}", kind.as_str(), i);
            registry
                .register(Facility::new(id, location.name, kind, location.point()))
                .expect("fixture facilities are valid");
        }
    }
    registry
}

/// Config with a fixed traffic density so routes are reproducible.
pub fn steady_config() -> RouterConfig {
    let mut config = RouterConfig::default();
    config.workers = 4;
    config.cost.density = DensityModel::Constant(40.0);
    config
}

pub fn grid_router(config: RouterConfig) -> CandidateRouter<GridSurface> {
    CandidateRouter::new(Arc::new(registry()), Arc::new(GridSurface::default()), config)
        .expect("router should start")
}
