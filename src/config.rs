//! Router configuration.
//!
//! Every setting has a default; `from_env` overrides them from `ROUTER_*`
//! environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::grid::DEFAULT_STEP_DEG;
use crate::search::SearchOptions;
use crate::traffic::{CostModel, DensityModel};

/// Average driving speed used for arrival estimates.
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Worker threads in the router pool; 0 uses the available parallelism.
    pub workers: usize,
    /// Caller-level deadline for one routing request.
    pub timeout: Option<Duration>,
    pub search: SearchOptions,
    pub cost: CostModel,
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
    /// Lattice spacing of the default grid surface.
    pub grid_step_deg: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            timeout: None,
            search: SearchOptions::default(),
            cost: CostModel::default(),
            speed_kmh: DEFAULT_SPEED_KMH,
            grid_step_deg: DEFAULT_STEP_DEG,
        }
    }
}

impl RouterConfig {
    /// Defaults for routing over OSM road graphs.
    pub fn roads() -> Self {
        Self {
            search: SearchOptions::roads(),
            ..Self::default()
        }
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    /// Reads overrides through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_lookup(lookup)
    }

    /// Applies environment overrides on top of `self`.
    pub fn with_env(self) -> Result<Self> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup` on top of `self`.
    pub fn with_lookup<F>(self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self;

        if let Some(workers) = parse_var(&lookup, "ROUTER_WORKERS")? {
            config.workers = workers;
        }
        if let Some(millis) = parse_var::<u64, _>(&lookup, "ROUTER_TIMEOUT_MS")? {
            config.timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Some(iterations) = parse_var(&lookup, "ROUTER_MAX_ITERATIONS")? {
            config.search.max_iterations = iterations;
        }
        if let Some(radius) = parse_var(&lookup, "ROUTER_GOAL_RADIUS_KM")? {
            config.search.goal_radius_km = non_negative("ROUTER_GOAL_RADIUS_KM", radius)?;
        }
        if let Some(threshold) = parse_var(&lookup, "ROUTER_CONGESTION_THRESHOLD")? {
            config.cost.congestion_threshold = non_negative("ROUTER_CONGESTION_THRESHOLD", threshold)?;
        }
        if let Some(penalty) = parse_var(&lookup, "ROUTER_CONGESTION_PENALTY")? {
            config.cost.congestion_penalty = non_negative("ROUTER_CONGESTION_PENALTY", penalty)?;
        }
        if let Some(seed) = parse_var(&lookup, "ROUTER_TRAFFIC_SEED")? {
            config.cost.density = DensityModel::Seeded(seed);
        }
        if let Some(speed) = parse_var::<f64, _>(&lookup, "ROUTER_SPEED_KMH")? {
            if speed <= 0.0 {
                return Err(config_error("ROUTER_SPEED_KMH", speed));
            }
            config.speed_kmh = speed;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| config_error(key, raw))
}

fn non_negative(key: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(config_error(key, value))
    }
}

fn config_error(key: &str, value: impl ToString) -> Error {
    Error::Config {
        key: key.to_string(),
        value: value.to_string(),
    }
}
