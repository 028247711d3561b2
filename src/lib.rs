//! A last-writer-wins element graph, as a Conflict-free Replicated Data Type.
//!
//! Replicas of an `LwwGraph` add and remove vertices and edges independently,
//! without coordination, using timestamps supplied by the caller. Replica
//! states are exchanged by some outside transport and folded together with
//! `Crdt::merge`; once every replica has seen every update they all agree on
//! the same graph.
//!
//! ###### Further Reading
//!
//! 1. [_A comprehensive study of Convergent and Commutative Replicated Data Types_](http://hal.inria.fr/docs/00/55/55/88/PDF/techreport.pdf) (Shapiro, et al.)

pub mod clock;
pub mod config;
pub mod error;
pub mod graph;
pub mod tombstone;


pub use error::{GraphError, Result};
pub use graph::{Edge, LwwGraph};

/// A point in time attached to every graph mutation.
///
/// Timestamps are totally ordered and supplied by the caller. The bundled
/// `SystemClock` reports microseconds since the Unix epoch.
pub type Timestamp = u64;

/// A Conflict-free Replicated Data Type.
///
/// Conflict-free replicated data types (also called convergent and commutative
/// replicated data types) allow for concurrent updates to distributed replicas
/// with strong eventual consistency and without coordination.
///
/// ###### Replication
///
/// The CRDTs in this library use state-based replication: the entire state of
/// a mutated replica is shipped to other replicas and merged into them. Merge
/// is commutative, associative and idempotent, so states may be delivered in
/// any order, any number of times. The library does not decide when to merge
/// or with whom.
///
/// ###### Partial Ordering
///
/// Replicas of a CRDT are partially-ordered. If every update applied to
/// replica `A` has also been applied to `B` (or, somewhat equivalently, if `A`
/// has been merged into `B`), then `A <= B`.
///
/// ###### Equality
///
/// Equality among CRDT replicas only takes the replicated state into account.
/// Local configuration and derived caches are ignored.
pub trait Crdt : Clone + Eq + PartialOrd {

    /// Merge a replica into this CRDT.
    fn merge(&mut self, other: Self);
}
