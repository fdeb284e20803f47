use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use emergency_router::logging::{LoggingConfig, init_logging};
use emergency_router::overpass::{OverpassClient, OverpassConfig};
use emergency_router::{
    BoundingBox, CandidateRouter, FacilityRegistry, FacilityType, GeoPoint, GridSurface, NearestSelector,
    RouteResponse, RouterConfig, RoutingSurface, SelectionPolicy, TrafficSnapshot,
};
use serde_json::json;
use tracing::info;

/// Route emergency vehicles to the best matching facility
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Facility catalog as a JSON array (defaults to the built-in Rajahmundry catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the best route to a facility for a vehicle
    Route {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Vehicle label, e.g. ambulance, fire_engine, police
        #[arg(short, long)]
        vehicle: String,

        /// Traffic snapshot as a JSON object of edge key to weight
        #[arg(long)]
        traffic: Option<PathBuf>,

        /// Route over roads downloaded from Overpass instead of the grid
        #[arg(long)]
        roads: bool,
    },
    /// Rank facilities of one type by straight-line distance
    Nearest {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// hospital, fire_station or police_station
        #[arg(short = 't', long = "type")]
        facility_type: String,

        /// Pick a random candidate with this seed instead of the nearest
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging(&LoggingConfig::from_env()?)?;

    let cli = Cli::parse();
    let registry = match &cli.catalog {
        Some(path) => FacilityRegistry::from_json(&fs::read_to_string(path)?)?,
        None => FacilityRegistry::rajahmundry()?,
    };

    match cli.command {
        Command::Route {
            lat,
            lon,
            vehicle,
            traffic,
            roads,
        } => {
            let base = if roads { RouterConfig::roads() } else { RouterConfig::default() };
            let config = base.with_env()?;
            let snapshot = traffic.as_deref().map(load_snapshot).transpose()?;
            let current = GeoPoint::new(lat, lon);

            let response = if roads {
                let client = OverpassClient::new(OverpassConfig::default())?;
                let graph = client.fetch(&BoundingBox::RAJAHMUNDRY.expand(0.1))?;
                route(registry, graph, config, current, &vehicle, snapshot.as_ref())?
            } else {
                let grid = GridSurface::new(BoundingBox::RAJAHMUNDRY, config.grid_step_deg);
                route(registry, grid, config, current, &vehicle, snapshot.as_ref())?
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Nearest {
            lat,
            lon,
            facility_type,
            seed,
        } => {
            let kind: FacilityType = facility_type.parse()?;
            let location = GeoPoint::new(lat, lon);
            let selector = NearestSelector::new(&registry);
            let policy = seed.map_or(SelectionPolicy::Nearest, |seed| SelectionPolicy::Spread { seed });

            let (chosen, _) = selector.recommend(location, kind, policy)?;
            let ranked: Vec<_> = selector
                .nearest(location, kind)
                .into_iter()
                .map(|(facility, km)| json!({ "facility": facility, "distance_km": km }))
                .collect();
            let output = json!({ "recommended": chosen, "candidates": ranked });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn load_snapshot(path: &Path) -> emergency_router::Result<TrafficSnapshot> {
    let snapshot = TrafficSnapshot::from_json(&fs::read_to_string(path)?)?;
    info!(edges = snapshot.len(), path = %path.display(), "loaded traffic snapshot");
    Ok(snapshot)
}

fn route<S>(
    registry: FacilityRegistry,
    surface: S,
    config: RouterConfig,
    current: GeoPoint,
    vehicle: &str,
    snapshot: Option<&TrafficSnapshot>,
) -> emergency_router::Result<RouteResponse>
where
    S: RoutingSurface + 'static,
{
    let router = CandidateRouter::new(Arc::new(registry), Arc::new(surface), config)?;
    let result = router.route(current, vehicle, snapshot)?;
    Ok(RouteResponse::from(&result))
}
