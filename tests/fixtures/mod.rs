//! Test fixtures for emergency-router.
//!
//! Provides realistic test data:
//! - Positions and facilities inside the Rajahmundry service area
//! - Registry and router builders shared by the integration tests

pub mod rajahmundry_locations;

pub use rajahmundry_locations::*;
