use thiserror::Error;

use crate::geo::GeoPoint;

/// Convenient result alias for the routing engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level routing error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The vehicle label does not map to any facility type.
    #[error("invalid vehicle type: {0}")]
    InvalidVehicleType(String),

    /// A facility type string is not one of hospital, fire_station, police_station.
    #[error("invalid facility type: {0}")]
    InvalidFacilityType(String),

    /// The registry holds no facility of the type the vehicle needs.
    #[error("no {facility_type} facilities registered")]
    NoFacilitiesRegistered { facility_type: String },

    /// A facility with the same id was already registered.
    #[error("facility {id} is already registered")]
    DuplicateFacility { id: String },

    /// Coordinate is NaN, infinite, or outside the valid lat/lon range.
    #[error("invalid coordinate ({}, {})", .0.lat, .0.lon)]
    InvalidCoordinate(GeoPoint),

    /// Traffic weights must be finite and non-negative.
    #[error("invalid traffic weight {weight} for edge {key}")]
    InvalidTrafficWeight { key: String, weight: f64 },

    /// The routing surface has no nodes or an unusable area.
    #[error("routing graph not loaded")]
    RoutingGraphNotLoaded,

    /// A start or goal point cannot be mapped onto the routing surface.
    #[error("point ({}, {}) is outside the routing surface", .0.lat, .0.lon)]
    OffSurface(GeoPoint),

    /// The caller-level deadline expired before all candidates were scored.
    #[error("route search timed out after {millis} ms")]
    SearchTimeout { millis: u128 },

    /// A search was abandoned because its request already timed out.
    #[error("route search cancelled")]
    Cancelled,

    /// Raised when an environment setting cannot be parsed.
    #[error("invalid configuration value for {key}: {value}")]
    Config { key: String, value: String },

    /// The bounded worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// A global log subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    /// Wrapper for catalog and snapshot JSON errors.
    #[error(transparent)]
    Catalog(#[from] serde_json::Error),

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors caused by the request itself rather than the service setup.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidVehicleType(_)
                | Error::NoFacilitiesRegistered { .. }
                | Error::InvalidCoordinate(_)
                | Error::InvalidTrafficWeight { .. }
        )
    }

    /// Errors a caller may retry unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SearchTimeout { .. })
    }
}
