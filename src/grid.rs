//! Self-contained lattice surface.
//!
//! Cells sit on a fixed-degree lattice inside the service area and connect
//! to their eight neighbours. Cells are keyed by integer micro-degrees so
//! duplicate detection is exact.

use crate::error::{Error, Result};
use crate::geo::{self, BoundingBox, GeoPoint};
use crate::traffic::cell_key;
use crate::traits::{RoutingSurface, Step};

/// Default lattice spacing in degrees (~110 m of latitude).
pub const DEFAULT_STEP_DEG: f64 = 0.001;

const MICRO: f64 = 1_000_000.0;

/// Lattice cell in integer micro-degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub lat_e6: i64,
    pub lon_e6: i64,
}

impl GridCell {
    pub fn from_point(point: GeoPoint) -> Self {
        Self {
            lat_e6: (point.lat * MICRO).round() as i64,
            lon_e6: (point.lon * MICRO).round() as i64,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat_e6 as f64 / MICRO, self.lon_e6 as f64 / MICRO)
    }
}

/// Eight-way lattice bounded by a service area.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSurface {
    area: BoundingBox,
    step_e6: i64,
}

impl GridSurface {
    pub fn new(area: BoundingBox, step_deg: f64) -> Self {
        Self {
            area,
            step_e6: (step_deg * MICRO).round() as i64,
        }
    }

    pub fn area(&self) -> BoundingBox {
        self.area
    }

    pub fn step_deg(&self) -> f64 {
        self.step_e6 as f64 / MICRO
    }

    fn is_loaded(&self) -> bool {
        self.area.is_valid() && self.step_e6 > 0
    }

    fn map(&self, point: GeoPoint) -> Result<GridCell> {
        if !self.is_loaded() {
            return Err(Error::RoutingGraphNotLoaded);
        }
        if !point.is_valid() {
            return Err(Error::InvalidCoordinate(point));
        }
        if !self.area.contains(point) {
            return Err(Error::OffSurface(point));
        }
        Ok(GridCell::from_point(point))
    }
}

impl Default for GridSurface {
    fn default() -> Self {
        Self::new(BoundingBox::RAJAHMUNDRY, DEFAULT_STEP_DEG)
    }
}

impl RoutingSurface for GridSurface {
    type Node = GridCell;

    fn origin(&self, point: GeoPoint) -> Result<GridCell> {
        self.map(point)
    }

    fn target(&self, point: GeoPoint) -> Result<GridCell> {
        self.map(point)
    }

    fn position(&self, node: GridCell) -> GeoPoint {
        node.point()
    }

    fn neighbours(&self, node: GridCell) -> Vec<Step<GridCell>> {
        let here = node.point();
        let mut steps = Vec::with_capacity(8);
        for d_lat in [-self.step_e6, 0, self.step_e6] {
            for d_lon in [-self.step_e6, 0, self.step_e6] {
                if d_lat == 0 && d_lon == 0 {
                    continue;
                }
                let cell = GridCell {
                    lat_e6: node.lat_e6 + d_lat,
                    lon_e6: node.lon_e6 + d_lon,
                };
                let point = cell.point();
                if !self.area.contains(point) {
                    continue;
                }
                steps.push(Step {
                    to: cell,
                    edge_key: cell_key(point),
                    base_cost: geo::distance(here, point),
                });
            }
        }
        steps
    }
}
