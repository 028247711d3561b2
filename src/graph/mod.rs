//! Graph CRDTs.
//!
//! A graph is a pair of sets, vertices and edges, with the extra constraint
//! that an edge may only exist while both of its endpoints exist. Each of the
//! two sets is modelled here as a last-writer-wins element set: every element
//! has an add timestamp and a remove timestamp, and the later of the two
//! decides membership.
//!
//! ##### Graph Types
//!
//! ###### `LwwGraph`
//!
//! A last-writer-wins element graph over undirected edges. Add and remove
//! operations carry caller-supplied timestamps. When an add and a remove of
//! the same element carry equal timestamps the add wins. Removing a vertex
//! hides its incident edges without touching their timestamps, so edges
//! reappear if the vertex is later re-added and the edges themselves were
//! never removed. `LwwGraph` should be preferred when the resolution of the
//! timestamp source is fine compared to the rate of conflicting operations
//! on a single element.

use std::fmt::Debug;
use std::hash::Hash;

pub use self::edge::Edge;
pub use self::lwwgraph::LwwGraph;

mod edge;
mod lwwgraph;

/// A value usable as a graph vertex.
///
/// Implemented for every type with the required bounds.
pub trait Vertex : Clone + Debug + Eq + Hash + Ord {}

impl <T> Vertex for T where T: Clone + Debug + Eq + Hash + Ord {}
