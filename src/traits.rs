//! Core traits for the routing engine.
//!
//! A search only needs to map points onto nodes and enumerate outgoing
//! steps, so grid lattices and road graphs plug in behind the same trait.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::Result;
use crate::geo::GeoPoint;

/// Node handle on a routing surface.
pub trait SurfaceNode: Copy + Eq + Hash + Debug + Send + Sync {}

impl<T> SurfaceNode for T where T: Copy + Eq + Hash + Debug + Send + Sync {}

/// One outgoing move from a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<N> {
    pub to: N,
    /// Key used to look the move up in a traffic snapshot.
    pub edge_key: String,
    /// Untrafficked cost of the move in kilometers.
    pub base_cost: f64,
}

/// A read-only surface the path search walks over.
///
/// Implementations are shared across concurrent searches and must not
/// carry per-request state.
pub trait RoutingSurface: Send + Sync {
    type Node: SurfaceNode;

    /// Node the search starts from. Fails when the surface is not loaded
    /// or the point cannot be mapped onto it.
    fn origin(&self, point: GeoPoint) -> Result<Self::Node>;

    /// Node that counts as the destination.
    fn target(&self, point: GeoPoint) -> Result<Self::Node>;

    fn position(&self, node: Self::Node) -> GeoPoint;

    fn neighbours(&self, node: Self::Node) -> Vec<Step<Self::Node>>;
}
