//! Multi-candidate routing.
//!
//! A request fans out to every facility of the type the vehicle needs. Each
//! candidate is searched on the router's own rayon pool, results are
//! collected in registration order, and the shortest route wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::config::RouterConfig;
use crate::error::{Error, Result};
use crate::facility::{Facility, FacilityRegistry, FacilityType, VehicleType};
use crate::geo::GeoPoint;
use crate::search::{self, RoutePoint, SearchRoute};
use crate::traffic::TrafficSnapshot;
use crate::traits::RoutingSurface;

/// Best route for a request together with the facility it leads to.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub path: Vec<RoutePoint>,
    pub total_distance_km: f64,
    pub average_traffic_density: f64,
    pub facility: Facility,
    /// True when the route is the direct-line fallback.
    pub degraded: bool,
    pub total_cost: f64,
    pub eta_seconds: i64,
    pub iterations: usize,
}

impl RouteResult {
    fn new(route: SearchRoute, facility: Facility, speed_kmh: f64) -> Self {
        Self {
            eta_seconds: km_to_seconds(route.total_distance_km, speed_kmh),
            degraded: route.is_degraded(),
            path: route.path,
            total_distance_km: route.total_distance_km,
            average_traffic_density: route.average_traffic_density,
            facility,
            total_cost: route.total_cost,
            iterations: route.iterations,
        }
    }
}

/// Convert distance in km to travel time in seconds.
pub fn km_to_seconds(km: f64, speed_kmh: f64) -> i64 {
    let hours = km / speed_kmh;
    (hours * 3600.0).round() as i64
}

/// Routes vehicles to the best facility of the type they need.
///
/// The registry and surface are shared read-only; each call brings its own
/// traffic snapshot.
pub struct CandidateRouter<S> {
    registry: Arc<FacilityRegistry>,
    surface: Arc<S>,
    pool: Arc<ThreadPool>,
    config: RouterConfig,
}

impl<S> CandidateRouter<S>
where
    S: RoutingSurface + 'static,
{
    pub fn new(registry: Arc<FacilityRegistry>, surface: Arc<S>, config: RouterConfig) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("routing-worker-{i}"))
            .build()?;
        info!(
            workers = pool.current_num_threads(),
            facilities = registry.len(),
            "router ready"
        );
        Ok(Self {
            registry,
            surface,
            pool: Arc::new(pool),
            config,
        })
    }

    pub fn registry(&self) -> &FacilityRegistry {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Routes from `current` to the closest facility serving `vehicle_type`.
    pub fn route(
        &self,
        current: GeoPoint,
        vehicle_type: &str,
        snapshot: Option<&TrafficSnapshot>,
    ) -> Result<RouteResult> {
        let vehicle: VehicleType = vehicle_type.parse()?;
        let kind = vehicle.facility_type();
        if !current.is_valid() {
            return Err(Error::InvalidCoordinate(current));
        }
        let candidates = self.registry.facilities_of(kind).len();
        if candidates == 0 {
            return Err(Error::NoFacilitiesRegistered {
                facility_type: kind.to_string(),
            });
        }

        info!(
            vehicle = vehicle.as_str(),
            facility_type = %kind,
            candidates,
            lat = current.lat,
            lon = current.lon,
            "routing request"
        );
        let started = Instant::now();

        let result = match self.config.timeout {
            None => self.pool.install(|| {
                evaluate(
                    self.surface.as_ref(),
                    &self.registry,
                    kind,
                    current,
                    snapshot,
                    &self.config,
                    &AtomicBool::new(false),
                )
            }),
            Some(timeout) => {
                let (tx, rx) = mpsc::channel();
                let registry = Arc::clone(&self.registry);
                let surface = Arc::clone(&self.surface);
                let snapshot = snapshot.cloned();
                let config = self.config.clone();
                let cancel = Arc::new(AtomicBool::new(false));
                let job_cancel = Arc::clone(&cancel);
                self.pool.spawn(move || {
                    let outcome = evaluate(
                        surface.as_ref(),
                        &registry,
                        kind,
                        current,
                        snapshot.as_ref(),
                        &config,
                        &job_cancel,
                    );
                    // The receiver is gone once the caller has timed out.
                    let _ = tx.send(outcome);
                });
                match rx.recv_timeout(timeout) {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        // Frees the workers; whatever they finish is discarded.
                        cancel.store(true, Ordering::Relaxed);
                        warn!(timeout_ms = timeout.as_millis() as u64, "routing request timed out");
                        return Err(Error::SearchTimeout {
                            millis: timeout.as_millis(),
                        });
                    }
                }
            }
        }?;

        info!(
            facility = %result.facility.name,
            distance_km = result.total_distance_km,
            degraded = result.degraded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "route selected"
        );
        Ok(result)
    }
}

/// Searches every candidate in parallel and keeps the shortest route.
///
/// Setting `cancel` makes pending and running searches fail with
/// `Error::Cancelled`.
fn evaluate<S>(
    surface: &S,
    registry: &FacilityRegistry,
    kind: FacilityType,
    current: GeoPoint,
    snapshot: Option<&TrafficSnapshot>,
    config: &RouterConfig,
    cancel: &AtomicBool,
) -> Result<RouteResult>
where
    S: RoutingSurface + ?Sized,
{
    let facilities = registry.facilities_of(kind);
    let routes: Vec<Result<SearchRoute>> = facilities
        .par_iter()
        .map(|facility| {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            search::search_cancellable(
                surface,
                current,
                facility.location,
                &config.cost,
                snapshot,
                &config.search,
                cancel,
            )
        })
        .collect();

    let mut best: Option<(usize, SearchRoute)> = None;
    let mut degraded = 0;
    for (index, route) in routes.into_iter().enumerate() {
        let route = route?;
        debug!(
            facility = %facilities[index].id,
            distance_km = route.total_distance_km,
            cost = route.total_cost,
            iterations = route.iterations,
            degraded = route.is_degraded(),
            "candidate evaluated"
        );
        if route.is_degraded() {
            degraded += 1;
        }
        let better = best
            .as_ref()
            .is_none_or(|(_, current_best)| route.total_distance_km < current_best.total_distance_km);
        if better {
            best = Some((index, route));
        }
    }

    if degraded == facilities.len() {
        warn!(candidates = facilities.len(), "all candidate routes degraded to direct paths");
    }

    let (index, route) = best.ok_or_else(|| Error::NoFacilitiesRegistered {
        facility_type: kind.to_string(),
    })?;
    Ok(RouteResult::new(route, facilities[index].clone(), config.speed_kmh))
}
