//! Facility catalog and vehicle-to-facility mapping.
//!
//! The registry is filled once at startup and then shared read-only
//! (behind an `Arc`) by every concurrent search.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geo::GeoPoint;

/// Kind of service facility a vehicle can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    Hospital,
    FireStation,
    PoliceStation,
}

impl FacilityType {
    pub const ALL: [FacilityType; 3] = [
        FacilityType::Hospital,
        FacilityType::FireStation,
        FacilityType::PoliceStation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityType::Hospital => "hospital",
            FacilityType::FireStation => "fire_station",
            FacilityType::PoliceStation => "police_station",
        }
    }

    /// Emergency category label used by the response layer.
    pub fn emergency_label(&self) -> &'static str {
        match self {
            FacilityType::Hospital => "MEDICAL",
            FacilityType::FireStation => "FIRE",
            FacilityType::PoliceStation => "POLICE",
        }
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacilityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hospital" => Ok(FacilityType::Hospital),
            "fire_station" => Ok(FacilityType::FireStation),
            "police_station" => Ok(FacilityType::PoliceStation),
            other => Err(Error::InvalidFacilityType(other.to_string())),
        }
    }
}

/// Emergency vehicle classes reported by the detection layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleType {
    Ambulance,
    FireEngine,
    Police,
}

impl VehicleType {
    /// Facility type this vehicle is dispatched to.
    pub fn facility_type(&self) -> FacilityType {
        match self {
            VehicleType::Ambulance => FacilityType::Hospital,
            VehicleType::FireEngine => FacilityType::FireStation,
            VehicleType::Police => FacilityType::PoliceStation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Ambulance => "ambulance",
            VehicleType::FireEngine => "fire_engine",
            VehicleType::Police => "police",
        }
    }
}

impl FromStr for VehicleType {
    type Err = Error;

    /// Accepts the canonical labels plus the detector's spelling variants
    /// (`Ambulance`, `FIRE_ENGINE`, `Fire Engine`, `FireEngine`, ...).
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(*c, '_' | ' ' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "ambulance" => Ok(VehicleType::Ambulance),
            "fireengine" => Ok(VehicleType::FireEngine),
            "police" => Ok(VehicleType::Police),
            _ => Err(Error::InvalidVehicleType(s.to_string())),
        }
    }
}

/// A registered service facility. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FacilityType,
    pub location: GeoPoint,
}

impl Facility {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: FacilityType,
        location: GeoPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            location,
        }
    }
}

/// Untyped catalog entry as it arrives from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: GeoPoint,
}

impl TryFrom<FacilityRecord> for Facility {
    type Error = Error;

    fn try_from(record: FacilityRecord) -> Result<Self> {
        let kind = record.kind.parse()?;
        Ok(Facility::new(record.id, record.name, kind, record.location))
    }
}

/// Catalog of facilities grouped by type, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FacilityRegistry {
    by_type: HashMap<FacilityType, Vec<Facility>>,
    ids: HashSet<String>,
}

impl FacilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a facility to its type's collection.
    pub fn register(&mut self, facility: Facility) -> Result<()> {
        if !facility.location.is_valid() {
            return Err(Error::InvalidCoordinate(facility.location));
        }
        if !self.ids.insert(facility.id.clone()) {
            return Err(Error::DuplicateFacility { id: facility.id });
        }
        debug!(id = %facility.id, kind = %facility.kind, "registered facility");
        self.by_type.entry(facility.kind).or_default().push(facility);
        Ok(())
    }

    /// Parses a record and registers it.
    pub fn register_record(&mut self, record: FacilityRecord) -> Result<()> {
        self.register(Facility::try_from(record)?)
    }

    /// Builds a registry from a JSON array of facility records.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<FacilityRecord> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for record in records {
            registry.register_record(record)?;
        }
        info!(facilities = registry.len(), "loaded facility catalog");
        Ok(registry)
    }

    /// Facilities of one type in insertion order, possibly empty.
    pub fn facilities_of(&self, kind: FacilityType) -> &[Facility] {
        self.by_type.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All facilities, grouped by type in `FacilityType::ALL` order.
    pub fn all(&self) -> impl Iterator<Item = &Facility> {
        FacilityType::ALL
            .into_iter()
            .flat_map(move |kind| self.facilities_of(kind).iter())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Builds a registry from typed facilities, in order.
    pub fn from_facilities<I>(facilities: I) -> Result<Self>
    where
        I: IntoIterator<Item = Facility>,
    {
        let mut registry = Self::new();
        for facility in facilities {
            registry.register(facility)?;
        }
        Ok(registry)
    }

    /// Hospitals, fire stations and police stations of Rajahmundry.
    pub fn rajahmundry() -> Result<Self> {
        Self::from_facilities(rajahmundry_facilities())
    }
}

fn rajahmundry_facilities() -> Vec<Facility> {
    use FacilityType::*;
    vec![
        Facility::new("1", "Government General Hospital", Hospital, GeoPoint::new(17.0005, 81.7800)),
        Facility::new("2", "Hope Hospital", Hospital, GeoPoint::new(16.9921, 81.7743)),
        Facility::new("3", "KIMS Hospital", Hospital, GeoPoint::new(16.9867, 81.7889)),
        Facility::new("4", "Fire Station Rajahmundry", FireStation, GeoPoint::new(16.9891, 81.7840)),
        Facility::new("5", "District Fire Office", FireStation, GeoPoint::new(16.9927, 81.7756)),
        Facility::new("6", "Three Town Police Station", PoliceStation, GeoPoint::new(16.9927, 81.7875)),
        Facility::new("7", "Two Town Police Station", PoliceStation, GeoPoint::new(16.9867, 81.7830)),
        Facility::new("8", "One Town Police Station", PoliceStation, GeoPoint::new(17.0012, 81.7799)),
    ]
}
