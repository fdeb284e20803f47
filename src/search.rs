//! Budgeted A* search over a routing surface.
//!
//! The open set is a min-heap on `f = g + h` with insertion order as the
//! tie-break, so equal-cost expansions are reproducible. Open and closed
//! sets live on the stack of one call. When the iteration budget runs out
//! the search returns a degraded two-point route instead of failing.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{self, AtomicBool};

use ordered_float::OrderedFloat;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geo::{self, GeoPoint};
use crate::traffic::{CostModel, StepCost, TrafficSnapshot};
use crate::traits::RoutingSurface;

/// Iteration budget of the lattice search.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Iteration budget for OSM road graphs, whose nodes sit metres apart.
pub const DEFAULT_ROAD_MAX_ITERATIONS: usize = 20_000;

/// Distance at which a node counts as having reached the goal.
pub const DEFAULT_GOAL_RADIUS_KM: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Maximum node expansions before falling back to a direct route.
    pub max_iterations: usize,
    pub goal_radius_km: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            goal_radius_km: DEFAULT_GOAL_RADIUS_KM,
        }
    }
}

impl SearchOptions {
    /// Defaults sized for road graphs.
    pub fn roads() -> Self {
        Self {
            max_iterations: DEFAULT_ROAD_MAX_ITERATIONS,
            ..Self::default()
        }
    }
}

/// Terminal state of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    GoalReached,
    BudgetExhausted,
}

/// A point on a route with the density of the segment it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint {
    pub position: GeoPoint,
    pub traffic_density: f64,
}

/// Route produced by one search, before a facility is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRoute {
    pub path: Vec<RoutePoint>,
    pub total_distance_km: f64,
    pub average_traffic_density: f64,
    /// Accumulated traffic-weighted search cost.
    pub total_cost: f64,
    pub outcome: SearchOutcome,
    pub iterations: usize,
}

impl SearchRoute {
    pub fn is_degraded(&self) -> bool {
        self.outcome == SearchOutcome::BudgetExhausted
    }

    /// Builds a route from points and the densities of the segments between them.
    fn from_segments(
        points: Vec<GeoPoint>,
        segment_densities: Vec<f64>,
        total_cost: f64,
        outcome: SearchOutcome,
        iterations: usize,
    ) -> Self {
        debug_assert_eq!(points.len(), segment_densities.len() + 1);
        let average_traffic_density = if segment_densities.is_empty() {
            0.0
        } else {
            segment_densities.iter().sum::<f64>() / segment_densities.len() as f64
        };
        let total_distance_km = geo::path_length(&points);
        let path = points
            .into_iter()
            .enumerate()
            .map(|(i, position)| RoutePoint {
                position,
                traffic_density: segment_densities
                    .get(i.saturating_sub(1))
                    .copied()
                    .unwrap_or(0.0),
            })
            .collect();

        Self {
            path,
            total_distance_km,
            average_traffic_density,
            total_cost,
            outcome,
            iterations,
        }
    }
}

/// Per-search bookkeeping for a discovered node.
#[derive(Debug, Clone, Copy)]
struct SearchNode<N> {
    g: f64,
    parent: Option<N>,
    /// Density of the segment from `parent` to this node.
    density: f64,
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry<N> {
    f: OrderedFloat<f64>,
    seq: u64,
    g: f64,
    node: N,
}

impl<N> PartialEq for OpenEntry<N> {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl<N> Eq for OpenEntry<N> {}

impl<N> Ord for OpenEntry<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the lowest f, then the oldest entry.
        other.f.cmp(&self.f).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<N> PartialOrd for OpenEntry<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds a route from `start` to `goal` on `surface`.
///
/// Errors only when the surface is not loaded or a point cannot be mapped
/// onto it. Running out of budget yields a degraded direct route.
pub fn search<S>(
    surface: &S,
    start: GeoPoint,
    goal: GeoPoint,
    cost: &CostModel,
    snapshot: Option<&TrafficSnapshot>,
    options: &SearchOptions,
) -> Result<SearchRoute>
where
    S: RoutingSurface + ?Sized,
{
    search_cancellable(surface, start, goal, cost, snapshot, options, &AtomicBool::new(false))
}

/// Like [`search`], but gives up with `Error::Cancelled` once `cancel` is set.
///
/// The flag is checked before every expansion.
pub fn search_cancellable<S>(
    surface: &S,
    start: GeoPoint,
    goal: GeoPoint,
    cost: &CostModel,
    snapshot: Option<&TrafficSnapshot>,
    options: &SearchOptions,
    cancel: &AtomicBool,
) -> Result<SearchRoute>
where
    S: RoutingSurface + ?Sized,
{
    let origin = surface.origin(start)?;
    let target = surface.target(goal)?;

    let mut nodes: HashMap<S::Node, SearchNode<S::Node>> = HashMap::new();
    let mut open = BinaryHeap::new();
    let mut closed: HashSet<S::Node> = HashSet::new();
    let mut seq: u64 = 0;

    nodes.insert(
        origin,
        SearchNode {
            g: 0.0,
            parent: None,
            density: 0.0,
        },
    );
    open.push(OpenEntry {
        f: OrderedFloat(geo::distance(surface.position(origin), goal)),
        seq,
        g: 0.0,
        node: origin,
    });

    let mut iterations = 0;
    while iterations < options.max_iterations {
        if cancel.load(atomic::Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        let Some(current) = open.pop() else {
            break;
        };
        if closed.contains(&current.node) {
            continue;
        }
        if nodes.get(&current.node).is_some_and(|known| known.g < current.g) {
            continue;
        }
        iterations += 1;

        let here = surface.position(current.node);
        if current.node == target || geo::distance(here, goal) < options.goal_radius_km {
            let route = reconstruct(surface, &nodes, current.node, start, goal, cost, iterations);
            debug!(
                iterations,
                distance_km = route.total_distance_km,
                points = route.path.len(),
                "goal reached"
            );
            return Ok(route);
        }
        closed.insert(current.node);

        for step in surface.neighbours(current.node) {
            if closed.contains(&step.to) {
                continue;
            }
            let there = surface.position(step.to);
            let StepCost {
                cost: step_cost,
                density,
            } = cost.step_cost(here, there, step.base_cost, &step.edge_key, snapshot);
            let tentative_g = current.g + step_cost;

            if nodes.get(&step.to).is_none_or(|known| tentative_g < known.g) {
                nodes.insert(
                    step.to,
                    SearchNode {
                        g: tentative_g,
                        parent: Some(current.node),
                        density,
                    },
                );
                seq += 1;
                open.push(OpenEntry {
                    f: OrderedFloat(tentative_g + geo::distance(there, goal)),
                    seq,
                    g: tentative_g,
                    node: step.to,
                });
            }
        }
    }

    info!(
        iterations,
        budget = options.max_iterations,
        "no path within search budget, using direct route"
    );
    Ok(direct_route(start, goal, cost, iterations))
}

/// Two-point fallback route straight from `start` to `goal`.
pub fn direct_route(start: GeoPoint, goal: GeoPoint, cost: &CostModel, iterations: usize) -> SearchRoute {
    let density = cost.density.estimate(start, goal);
    let total_cost = geo::distance(start, goal) * cost.congestion_factor(density);
    SearchRoute::from_segments(
        vec![start, goal],
        vec![density],
        total_cost,
        SearchOutcome::BudgetExhausted,
        iterations,
    )
}

fn reconstruct<S>(
    surface: &S,
    nodes: &HashMap<S::Node, SearchNode<S::Node>>,
    last: S::Node,
    start: GeoPoint,
    goal: GeoPoint,
    cost: &CostModel,
    iterations: usize,
) -> SearchRoute
where
    S: RoutingSurface + ?Sized,
{
    let mut total_cost = nodes.get(&last).map_or(0.0, |node| node.g);

    let mut chain = Vec::new();
    let mut current = Some(last);
    while let Some(node) = current {
        let Some(entry) = nodes.get(&node) else {
            break;
        };
        chain.push((surface.position(node), entry.density));
        current = entry.parent;
    }
    chain.reverse();

    let mut points = Vec::with_capacity(chain.len() + 2);
    let mut densities = Vec::with_capacity(chain.len() + 1);
    points.push(start);
    for (i, (position, density)) in chain.into_iter().enumerate() {
        if i == 0 {
            if position == start {
                continue;
            }
            // The origin node is a snapped point away from the request.
            let density = cost.density.estimate(start, position);
            total_cost += geo::distance(start, position) * cost.congestion_factor(density);
            densities.push(density);
        } else {
            densities.push(density);
        }
        points.push(position);
    }

    let last_point = points[points.len() - 1];
    if points.len() < 2 || last_point != goal {
        let density = cost.density.estimate(last_point, goal);
        total_cost += geo::distance(last_point, goal) * cost.congestion_factor(density);
        densities.push(density);
        points.push(goal);
    }

    SearchRoute::from_segments(
        points,
        densities,
        total_cost,
        SearchOutcome::GoalReached,
        iterations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::BoundingBox;
    use crate::grid::GridSurface;
    use crate::road::RoadGraph;
    use crate::traffic::{DensityModel, cell_key};

    fn calm() -> CostModel {
        CostModel::with_density(DensityModel::Constant(40.0))
    }

    const START: GeoPoint = GeoPoint::new(16.9927, 81.7800);
    const HOPE_HOSPITAL: GeoPoint = GeoPoint::new(16.9921, 81.7743);

    #[test]
    fn test_grid_route_starts_and_ends_exactly() {
        let grid = GridSurface::default();
        let route = search(&grid, START, HOPE_HOSPITAL, &calm(), None, &SearchOptions::default()).unwrap();

        assert_eq!(route.outcome, SearchOutcome::GoalReached);
        assert_eq!(route.path.first().unwrap().position, START);
        assert_eq!(route.path.last().unwrap().position, HOPE_HOSPITAL);
        assert!(route.path.len() > 2);
        assert!(route.total_distance_km >= geo::distance(START, HOPE_HOSPITAL));
        assert_eq!(route.average_traffic_density, 40.0);
    }

    #[test]
    fn test_total_distance_is_sum_of_segments() {
        let grid = GridSurface::default();
        let route = search(&grid, START, HOPE_HOSPITAL, &calm(), None, &SearchOptions::default()).unwrap();
        let points: Vec<GeoPoint> = route.path.iter().map(|p| p.position).collect();
        assert!((route.total_distance_km - geo::path_length(&points)).abs() < 1e-12);
    }

    #[test]
    fn test_total_cost_covers_pinned_segments() {
        let grid = GridSurface::default();
        let route = search(&grid, START, HOPE_HOSPITAL, &calm(), None, &SearchOptions::default()).unwrap();
        // Without traffic or congestion every step costs its length.
        assert!((route.total_cost - route.total_distance_km).abs() < 1e-9);

        let mut roads = RoadGraph::new();
        roads.add_node(1, START);
        roads.add_node(2, GeoPoint::new(16.9927, 81.7770));
        roads.add_road(1, 2, false);
        let off_node = GeoPoint::new(16.9930, 81.7801);
        let near_goal = GeoPoint::new(16.9925, 81.7768);
        let options = SearchOptions {
            max_iterations: 1_000,
            goal_radius_km: 0.01,
        };
        let route = search(&roads, off_node, near_goal, &calm(), None, &options).unwrap();
        assert_eq!(route.path.len(), 4);
        assert!((route.total_cost - route.total_distance_km).abs() < 1e-9);
    }

    #[test]
    fn test_cancelled_search_stops() {
        let grid = GridSurface::default();
        let cancel = AtomicBool::new(true);
        let err = search_cancellable(
            &grid,
            START,
            HOPE_HOSPITAL,
            &calm(),
            None,
            &SearchOptions::default(),
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_road_defaults_raise_budget() {
        assert_eq!(SearchOptions::roads().max_iterations, DEFAULT_ROAD_MAX_ITERATIONS);
        assert_eq!(SearchOptions::roads().goal_radius_km, DEFAULT_GOAL_RADIUS_KM);
    }

    #[test]
    fn test_zero_budget_degrades_to_direct_route() {
        let grid = GridSurface::default();
        let options = SearchOptions {
            max_iterations: 0,
            ..SearchOptions::default()
        };
        let route = search(&grid, START, HOPE_HOSPITAL, &calm(), None, &options).unwrap();

        assert!(route.is_degraded());
        assert_eq!(route.path.len(), 2);
        assert_eq!(route.path[0].position, START);
        assert_eq!(route.path[1].position, HOPE_HOSPITAL);
        assert_eq!(route.total_distance_km, geo::distance(START, HOPE_HOSPITAL));
        assert_eq!(route.iterations, 0);
    }

    #[test]
    fn test_small_budget_exhausts_on_far_goal() {
        let grid = GridSurface::default();
        let far = GeoPoint::new(17.009, 81.751);
        let options = SearchOptions {
            max_iterations: 5,
            ..SearchOptions::default()
        };
        let route = search(&grid, START, far, &calm(), None, &options).unwrap();
        assert!(route.is_degraded());
        assert_eq!(route.iterations, 5);
    }

    #[test]
    fn test_start_inside_goal_radius() {
        let grid = GridSurface::default();
        let near = GeoPoint::new(16.9928, 81.7801);
        let route = search(&grid, START, near, &calm(), None, &SearchOptions::default()).unwrap();
        assert_eq!(route.outcome, SearchOutcome::GoalReached);
        assert_eq!(route.path.len(), 2);
        assert_eq!(route.iterations, 1);

        let same = search(&grid, START, START, &calm(), None, &SearchOptions::default()).unwrap();
        assert_eq!(same.path.len(), 2);
        assert_eq!(same.total_distance_km, 0.0);
    }

    #[test]
    fn test_snapshot_steers_search_around_heavy_cells() {
        let grid = GridSurface::default();
        let goal = GeoPoint::new(16.9987, 81.7800);
        let options = SearchOptions::default();

        let straight = search(&grid, START, goal, &calm(), None, &options).unwrap();
        let straight_cells: Vec<String> = straight.path.iter().map(|p| cell_key(p.position)).collect();
        assert!(straight_cells.contains(&"16.995700,81.780000".to_string()));

        let weights = [
            "16.994700,81.780000",
            "16.995700,81.780000",
            "16.996700,81.780000",
        ]
        .iter()
        .map(|k| (k.to_string(), 50.0))
        .collect();
        let traffic = TrafficSnapshot::new(weights).unwrap();
        let detour = search(&grid, START, goal, &calm(), Some(&traffic), &options).unwrap();

        assert_eq!(detour.outcome, SearchOutcome::GoalReached);
        let detour_cells: Vec<String> = detour.path.iter().map(|p| cell_key(p.position)).collect();
        assert!(!detour_cells.contains(&"16.995700,81.780000".to_string()));
        assert!(detour.total_distance_km >= straight.total_distance_km);
    }

    #[test]
    fn test_congestion_raises_cost() {
        let grid = GridSurface::default();
        let options = SearchOptions::default();
        let free = search(&grid, START, HOPE_HOSPITAL, &calm(), None, &options).unwrap();
        let jammed_model = CostModel::with_density(DensityModel::Constant(95.0));
        let jammed = search(&grid, START, HOPE_HOSPITAL, &jammed_model, None, &options).unwrap();

        assert!(jammed.total_cost > free.total_cost);
        assert_eq!(jammed.average_traffic_density, 95.0);
        assert_eq!(free.average_traffic_density, 40.0);
    }

    #[test]
    fn test_road_graph_route() {
        let mut roads = RoadGraph::new();
        roads.add_node(1, GeoPoint::new(16.9927, 81.7800));
        roads.add_node(2, GeoPoint::new(16.9927, 81.7770));
        roads.add_node(3, GeoPoint::new(16.9921, 81.7743));
        roads.add_node(4, GeoPoint::new(16.9960, 81.7780));
        roads.add_road(1, 2, false);
        roads.add_road(2, 3, false);
        roads.add_road(1, 4, false);
        roads.add_road(4, 3, false);

        let options = SearchOptions {
            max_iterations: 1_000,
            goal_radius_km: 0.01,
        };
        let route = search(&roads, START, HOPE_HOSPITAL, &calm(), None, &options).unwrap();
        let points: Vec<GeoPoint> = route.path.iter().map(|p| p.position).collect();
        assert_eq!(
            points,
            vec![START, GeoPoint::new(16.9927, 81.7770), HOPE_HOSPITAL]
        );
    }

    #[test]
    fn test_disconnected_road_graph_degrades() {
        let mut roads = RoadGraph::new();
        roads.add_node(1, START);
        roads.add_node(2, HOPE_HOSPITAL);
        let options = SearchOptions {
            max_iterations: 1_000,
            goal_radius_km: 0.01,
        };
        let route = search(&roads, START, HOPE_HOSPITAL, &calm(), None, &options).unwrap();
        assert!(route.is_degraded());
        assert_eq!(route.iterations, 1);
    }

    #[test]
    fn test_unmappable_points_fail() {
        let grid = GridSurface::new(BoundingBox::RAJAHMUNDRY, 0.001);
        let outside = GeoPoint::new(17.5, 81.78);
        let err = search(&grid, START, outside, &calm(), None, &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, Error::OffSurface(p) if p == outside));

        let empty = RoadGraph::new();
        let err = search(&empty, START, HOPE_HOSPITAL, &calm(), None, &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, Error::RoutingGraphNotLoaded));
    }
}
