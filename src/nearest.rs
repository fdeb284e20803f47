//! Straight-line facility selection without a path search.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{Error, Result};
use crate::facility::{Facility, FacilityRegistry, FacilityType};
use crate::geo::{self, GeoPoint};

/// How `recommend` picks among candidate facilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Closest facility by straight-line distance.
    #[default]
    Nearest,
    /// Uniform pick among all candidates, reproducible for a given seed.
    Spread { seed: u64 },
}

/// Ranks facilities of one type by distance from a location.
#[derive(Debug, Clone, Copy)]
pub struct NearestSelector<'a> {
    registry: &'a FacilityRegistry,
}

impl<'a> NearestSelector<'a> {
    pub fn new(registry: &'a FacilityRegistry) -> Self {
        Self { registry }
    }

    /// Facilities of `kind` with their distance in km, closest first.
    ///
    /// Equal distances keep registration order.
    pub fn nearest(&self, location: GeoPoint, kind: FacilityType) -> Vec<(Facility, f64)> {
        let mut ranked: Vec<(Facility, f64)> = self
            .registry
            .facilities_of(kind)
            .iter()
            .map(|facility| (facility.clone(), geo::distance(location, facility.location)))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked
    }

    /// A single facility of `kind` chosen under `policy`.
    pub fn recommend(
        &self,
        location: GeoPoint,
        kind: FacilityType,
        policy: SelectionPolicy,
    ) -> Result<(Facility, f64)> {
        if !location.is_valid() {
            return Err(Error::InvalidCoordinate(location));
        }
        let mut ranked = self.nearest(location, kind);
        if ranked.is_empty() {
            return Err(Error::NoFacilitiesRegistered {
                facility_type: kind.to_string(),
            });
        }

        let index = match policy {
            SelectionPolicy::Nearest => 0,
            SelectionPolicy::Spread { seed } => ChaCha8Rng::seed_from_u64(seed).gen_range(0..ranked.len()),
        };
        let (facility, km) = ranked.swap_remove(index);
        debug!(facility = %facility.id, distance_km = km, ?policy, "recommended facility");
        Ok((facility, km))
    }
}
