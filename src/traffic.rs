//! Traffic snapshots and the travel cost model.
//!
//! Traffic never touches the shared routing surface. A search asks the
//! [`CostModel`] for the cost of each step, passing the request's
//! [`TrafficSnapshot`], so concurrent searches over one graph cannot see
//! each other's weights.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::f64::consts::PI;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::{self, GeoPoint};

/// Density level around which the estimate oscillates.
const BASE_DENSITY: f64 = 50.0;

/// Amplitude of the distance-driven variation.
const DISTANCE_SWING: f64 = 20.0;

/// Standard deviation of the noise term.
const NOISE_STD_DEV: f64 = 10.0;

/// Upper bound of the density scale.
pub const MAX_DENSITY: f64 = 100.0;

/// Snapshot key of a grid cell.
pub fn cell_key(point: GeoPoint) -> String {
    format!("{:.6},{:.6}", point.lat, point.lon)
}

/// Snapshot key of a directed road segment between two OSM node ids.
pub fn edge_key(from: i64, to: i64) -> String {
    format!("{}-{}", from, to)
}

/// Immutable per-request mapping from edge key to a congestion multiplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, f64>", into = "HashMap<String, f64>")]
pub struct TrafficSnapshot {
    weights: HashMap<String, f64>,
}

impl TrafficSnapshot {
    /// Builds a snapshot, rejecting negative or non-finite weights.
    pub fn new(weights: HashMap<String, f64>) -> Result<Self> {
        if let Some((key, weight)) = weights
            .iter()
            .find(|(_, weight)| !weight.is_finite() || **weight < 0.0)
        {
            return Err(Error::InvalidTrafficWeight {
                key: key.clone(),
                weight: *weight,
            });
        }
        Ok(Self { weights })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let weights: HashMap<String, f64> = serde_json::from_str(json)?;
        Self::new(weights)
    }

    /// Weight for `key`, 1.0 when the snapshot does not mention it.
    pub fn weight(&self, key: &str) -> f64 {
        self.weights.get(key).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl TryFrom<HashMap<String, f64>> for TrafficSnapshot {
    type Error = Error;

    fn try_from(weights: HashMap<String, f64>) -> Result<Self> {
        Self::new(weights)
    }
}

impl From<TrafficSnapshot> for HashMap<String, f64> {
    fn from(snapshot: TrafficSnapshot) -> Self {
        snapshot.weights
    }
}

/// Source of traffic density estimates in `[0, 100]`.
///
/// Stands in for a live traffic feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DensityModel {
    /// Same density everywhere.
    Constant(f64),
    /// Noisy estimate fully determined by the seed and the segment endpoints.
    Seeded(u64),
    /// Noisy estimate from the thread-local RNG.
    Noisy,
}

impl DensityModel {
    /// Estimated density of the segment `from -> to`, clamped to `[0, 100]`.
    pub fn estimate(&self, from: GeoPoint, to: GeoPoint) -> f64 {
        let smooth = BASE_DENSITY + (geo::distance(from, to) * PI).sin() * DISTANCE_SWING;
        let density = match self {
            DensityModel::Constant(value) => *value,
            DensityModel::Seeded(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(segment_seed(*seed, from, to));
                smooth + standard_normal(&mut rng) * NOISE_STD_DEV
            }
            DensityModel::Noisy => {
                smooth + standard_normal(&mut rand::thread_rng()) * NOISE_STD_DEV
            }
        };
        density.clamp(0.0, MAX_DENSITY)
    }

    pub fn is_deterministic(&self) -> bool {
        !matches!(self, DensityModel::Noisy)
    }
}

fn segment_seed(seed: u64, from: GeoPoint, to: GeoPoint) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    from.lat.to_bits().hash(&mut hasher);
    from.lon.to_bits().hash(&mut hasher);
    to.lat.to_bits().hash(&mut hasher);
    to.lon.to_bits().hash(&mut hasher);
    hasher.finish()
}

fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

/// Cost and density of a single search step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepCost {
    pub cost: f64,
    pub density: f64,
}

/// Converts edges and grid steps into scalar travel costs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    /// Density above which a step counts as congested.
    pub congestion_threshold: f64,
    /// Multiplier applied to congested steps.
    pub congestion_penalty: f64,
    pub density: DensityModel,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            congestion_threshold: 70.0,
            congestion_penalty: 2.0,
            density: DensityModel::Noisy,
        }
    }
}

impl CostModel {
    pub fn with_density(density: DensityModel) -> Self {
        Self {
            density,
            ..Self::default()
        }
    }

    /// `base * weight(edge)`; weight defaults to 1.0 without a snapshot entry.
    pub fn edge_cost(&self, base: f64, edge: &str, snapshot: Option<&TrafficSnapshot>) -> f64 {
        base * snapshot.map_or(1.0, |s| s.weight(edge))
    }

    /// Multiplier for a step with the given density.
    pub fn congestion_factor(&self, density: f64) -> f64 {
        if density > self.congestion_threshold {
            self.congestion_penalty
        } else {
            1.0
        }
    }

    /// Full cost of moving `from -> to` along an edge of base cost `base`.
    pub fn step_cost(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        base: f64,
        edge: &str,
        snapshot: Option<&TrafficSnapshot>,
    ) -> StepCost {
        let density = self.density.estimate(from, to);
        StepCost {
            cost: self.edge_cost(base, edge, snapshot) * self.congestion_factor(density),
            density,
        }
    }
}
