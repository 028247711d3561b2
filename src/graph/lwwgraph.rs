use std::cmp::Ordering::{self, Equal, Greater, Less};
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug, Display, Formatter};
use std::mem;
use std::sync::Arc;

#[cfg(any(test, feature = "quickcheck_generators"))]
use quickcheck::{Arbitrary, Gen};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
#[cfg(any(test, feature = "quickcheck_generators"))]
use crate::clock::ManualClock;
use crate::config::GraphConfig;
#[cfg(any(test, feature = "quickcheck_generators"))]
use crate::config::SkewGuard;
use crate::error::Result;
use crate::tombstone::Tombstones;
use crate::{Crdt, Timestamp};
use super::{Edge, Vertex};

/// A last-writer-wins element graph.
///
/// Vertices and edges each keep an add timestamp and a remove timestamp. An
/// element is present when it has been added and its add timestamp is not
/// older than its remove timestamp; equal timestamps resolve in favour of the
/// add. An edge is additionally hidden while either endpoint is absent.
///
/// Neighbour lists are cached per live vertex and kept in step with the
/// timestamps by every mutation and by `merge`.
#[derive(Clone)]
pub struct LwwGraph<V> where V: Vertex {
    vertex_added: Tombstones<V>,
    vertex_removed: Tombstones<V>,
    edge_added: Tombstones<Edge<V>>,
    edge_removed: Tombstones<Edge<V>>,
    adjacency: HashMap<V, Vec<V>>,
    config: GraphConfig,
    clock: Arc<dyn Clock>,
}

impl <V> LwwGraph<V> where V: Vertex {

    /// Create a new, empty graph using the default configuration and the
    /// system clock.
    ///
    /// ### Example
    ///
    /// ```
    /// use crdt_graph::graph::LwwGraph;
    ///
    /// let graph = LwwGraph::<u32>::new();
    /// assert!(graph.is_empty());
    /// ```
    pub fn new() -> LwwGraph<V> {
        LwwGraph::with_config(GraphConfig::default(), Arc::new(SystemClock))
    }

    /// Create a new, empty graph with the provided configuration and clock.
    ///
    /// ### Example
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use crdt_graph::clock::ManualClock;
    /// use crdt_graph::config::GraphConfig;
    /// use crdt_graph::graph::LwwGraph;
    ///
    /// let clock = Arc::new(ManualClock::new(0));
    /// let graph = LwwGraph::<&str>::with_config(GraphConfig::default(), clock);
    /// assert_eq!(0, graph.vertex_count());
    /// ```
    pub fn with_config(config: GraphConfig, clock: Arc<dyn Clock>) -> LwwGraph<V> {
        LwwGraph {
            vertex_added: Tombstones::new(),
            vertex_removed: Tombstones::new(),
            edge_added: Tombstones::new(),
            edge_removed: Tombstones::new(),
            adjacency: HashMap::new(),
            config,
            clock,
        }
    }

    /// Returns true if the vertex is live.
    pub fn vertex_exists(&self, vertex: &V) -> bool {
        match (self.vertex_added.get(vertex), self.vertex_removed.get(vertex)) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(added), Some(removed)) => added >= removed,
        }
    }

    /// Returns true if the edge joining `u` and `v` is live.
    ///
    /// An edge is never live while either endpoint is dead, whatever its own
    /// timestamps say.
    pub fn edge_exists(&self, u: &V, v: &V) -> bool {
        Edge::new(u.clone(), v.clone()).map_or(false, |edge| self.edge_live(&edge))
    }

    fn edge_live(&self, edge: &Edge<V>) -> bool {
        let (low, high) = edge.endpoints();
        if !self.vertex_exists(low) || !self.vertex_exists(high) {
            return false;
        }
        match (self.edge_added.get(edge), self.edge_removed.get(edge)) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(added), Some(removed)) => removed <= added,
        }
    }

    /// Add a vertex to the graph.
    ///
    /// Returns `Ok(false)` without recording anything if the vertex is
    /// already live, or if it was removed at a later time than `timestamp`.
    /// Otherwise the add is recorded, subject to the configured skew guard,
    /// and `Ok(true)` is returned.
    ///
    /// ### Example
    ///
    /// ```
    /// use crdt_graph::graph::LwwGraph;
    ///
    /// let mut graph = LwwGraph::new();
    /// assert!(graph.add_vertex("a", 0).unwrap());
    /// assert!(!graph.add_vertex("a", 0).unwrap());
    /// assert_eq!(Some(&[][..]), graph.neighbors(&"a"));
    /// ```
    pub fn add_vertex(&mut self, vertex: V, timestamp: Timestamp) -> Result<bool> {
        if self.vertex_exists(&vertex) {
            debug!(?vertex, timestamp, "vertex already exists");
            return Ok(false);
        }
        if let Some(removed) = self.vertex_removed.get(&vertex) {
            if timestamp < removed {
                debug!(?vertex, timestamp, removed, "vertex add predates removal");
                return Ok(false);
            }
        }

        let timestamp = self.config.skew_guard.apply(timestamp, &*self.clock);
        self.vertex_added.record(vertex.clone(), timestamp);

        // Edges that were never removed come back with their endpoint.
        let neighbors = self.revived_neighbors(&vertex);
        for neighbor in &neighbors {
            if let Some(list) = self.adjacency.get_mut(neighbor) {
                list.push(vertex.clone());
            }
        }
        debug!(?vertex, timestamp, revived_edges = neighbors.len(), "vertex added");
        self.adjacency.insert(vertex, neighbors);
        Ok(true)
    }

    /// Remove a vertex from the graph.
    ///
    /// The remove timestamp is always recorded. Returns `Ok(true)` only if
    /// the vertex was live and the remove is strictly newer than its add; the
    /// vertex and its cached edges then disappear. Edge timestamps are left
    /// untouched.
    ///
    /// ### Example
    ///
    /// ```
    /// use crdt_graph::config::{GraphConfig, SkewGuard};
    /// use crdt_graph::clock::SystemClock;
    /// use crdt_graph::graph::LwwGraph;
    /// use std::sync::Arc;
    ///
    /// let config = GraphConfig { skew_guard: SkewGuard::Disabled };
    /// let mut graph = LwwGraph::with_config(config, Arc::new(SystemClock));
    /// graph.add_vertex(1, 10).unwrap();
    /// assert!(!graph.remove_vertex(1, 10).unwrap());
    /// assert!(graph.remove_vertex(1, 11).unwrap());
    /// assert!(!graph.vertex_exists(&1));
    /// ```
    pub fn remove_vertex(&mut self, vertex: V, timestamp: Timestamp) -> Result<bool> {
        let was_live = self.vertex_exists(&vertex);
        let removed = self.vertex_removed.record(vertex.clone(), timestamp);
        if !was_live {
            debug!(?vertex, timestamp, "vertex does not exist");
            return Ok(false);
        }
        match self.vertex_added.get(&vertex) {
            Some(added) if removed > added => (),
            _ => {
                debug!(?vertex, timestamp, "add biased over remove");
                return Ok(false);
            },
        }

        self.adjacency.remove(&vertex);
        for neighbors in self.adjacency.values_mut() {
            neighbors.retain(|neighbor| *neighbor != vertex);
        }
        debug!(?vertex, timestamp, "vertex removed");
        Ok(true)
    }

    /// Add the edge joining `u` and `v`.
    ///
    /// Returns `Ok(false)` if either endpoint is dead or the edge is already
    /// live, and without recording anything if the edge was removed at a
    /// later time than `timestamp`. Otherwise the add passes through the same
    /// skew guard as vertex adds and `Ok(true)` is returned.
    ///
    /// A self-loop is rejected with `GraphError::InvalidKey`.
    ///
    /// ### Example
    ///
    /// ```
    /// use crdt_graph::graph::LwwGraph;
    ///
    /// let mut graph = LwwGraph::new();
    /// graph.add_vertex(1, 0).unwrap();
    /// graph.add_vertex(2, 0).unwrap();
    /// assert!(graph.add_edge(1, 2, 0).unwrap());
    /// assert!(graph.edge_exists(&2, &1));
    /// assert!(graph.add_edge(1, 1, 0).is_err());
    /// ```
    pub fn add_edge(&mut self, u: V, v: V, timestamp: Timestamp) -> Result<bool> {
        let edge = edge_key(u, v)?;
        let (low, high) = edge.endpoints();
        if !self.vertex_exists(low) || !self.vertex_exists(high) {
            debug!(?edge, timestamp, "edge endpoint does not exist");
            return Ok(false);
        }
        if self.edge_live(&edge) {
            debug!(?edge, timestamp, "edge already exists");
            return Ok(false);
        }

        if let Some(removed) = self.edge_removed.get(&edge) {
            if timestamp < removed {
                debug!(?edge, timestamp, removed, "edge add predates removal");
                return Ok(false);
            }
        }

        let timestamp = self.config.skew_guard.apply(timestamp, &*self.clock);
        self.edge_added.record(edge.clone(), timestamp);

        let (low, high) = edge.endpoints();
        if let Some(neighbors) = self.adjacency.get_mut(low) {
            neighbors.push(high.clone());
        }
        if let Some(neighbors) = self.adjacency.get_mut(high) {
            neighbors.push(low.clone());
        }
        debug!(?edge, timestamp, "edge added");
        Ok(true)
    }

    /// Remove the edge joining `u` and `v`.
    ///
    /// The remove timestamp is always recorded. Returns `Ok(true)` only if
    /// the edge was live and the remove is strictly newer than its add.
    ///
    /// A self-loop is rejected with `GraphError::InvalidKey`.
    pub fn remove_edge(&mut self, u: V, v: V, timestamp: Timestamp) -> Result<bool> {
        let edge = edge_key(u, v)?;
        let was_live = self.edge_live(&edge);
        let removed = self.edge_removed.record(edge.clone(), timestamp);
        if !was_live {
            debug!(?edge, timestamp, "edge does not exist");
            return Ok(false);
        }
        match self.edge_added.get(&edge) {
            Some(added) if removed > added => (),
            _ => {
                debug!(?edge, timestamp, "add biased over remove");
                return Ok(false);
            },
        }

        let (low, high) = edge.endpoints();
        if let Some(neighbors) = self.adjacency.get_mut(low) {
            neighbors.retain(|neighbor| neighbor != high);
        }
        if let Some(neighbors) = self.adjacency.get_mut(high) {
            neighbors.retain(|neighbor| neighbor != low);
        }
        debug!(?edge, timestamp, "edge removed");
        Ok(true)
    }

    /// Returns the live vertices in the order they were first added.
    pub fn live_vertices(&self) -> Vec<V> {
        self.vertex_added
            .keys()
            .filter(|vertex| self.vertex_exists(vertex))
            .cloned()
            .collect()
    }

    /// Returns the live edges in the order they were first added.
    pub fn live_edges(&self) -> Vec<Edge<V>> {
        self.edge_added
            .keys()
            .filter(|edge| self.edge_live(edge))
            .cloned()
            .collect()
    }

    /// Returns the number of live vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertex_added.keys().filter(|vertex| self.vertex_exists(vertex)).count()
    }

    /// Returns the number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edge_added.keys().filter(|edge| self.edge_live(edge)).count()
    }

    /// Returns true if the graph has no live vertices.
    pub fn is_empty(&self) -> bool { self.vertex_count() == 0 }

    /// Returns the neighbours of a live vertex, in the order their edges
    /// were added, or `None` if the vertex is not live.
    pub fn neighbors(&self, vertex: &V) -> Option<&[V]> {
        if !self.vertex_exists(vertex) {
            return None;
        }
        self.adjacency.get(vertex).map(Vec::as_slice)
    }

    /// Finds a path from `start` to `end`, both inclusive.
    ///
    /// The search is depth-first and follows neighbours in adjacency order,
    /// so the path returned is the first one found, not necessarily the
    /// shortest. Returns `None` if either vertex is dead or they are not
    /// connected.
    ///
    /// ### Example
    ///
    /// ```
    /// use crdt_graph::graph::LwwGraph;
    ///
    /// let mut graph = LwwGraph::new();
    /// for vertex in 1..4 {
    ///     graph.add_vertex(vertex, 0).unwrap();
    /// }
    /// graph.add_edge(1, 2, 0).unwrap();
    /// graph.add_edge(3, 2, 0).unwrap();
    /// assert_eq!(Some(vec![1, 2, 3]), graph.find_path(&1, &3));
    /// ```
    pub fn find_path(&self, start: &V, end: &V) -> Option<Vec<V>> {
        if !self.vertex_exists(start) || !self.vertex_exists(end) {
            return None;
        }
        let mut path = vec![start.clone()];
        if start == end {
            return Some(path);
        }

        let mut visited = HashSet::new();
        visited.insert(start);
        // Each frame is a vertex on the current path and the index of the
        // next neighbour to try.
        let mut frames: Vec<(&V, usize)> = vec![(start, 0)];
        while let Some(frame) = frames.last_mut() {
            let next = self.adjacency.get(frame.0).and_then(|neighbors| neighbors.get(frame.1));
            match next {
                Some(neighbor) => {
                    frame.1 += 1;
                    if !self.vertex_exists(neighbor) || !visited.insert(neighbor) {
                        continue;
                    }
                    path.push(neighbor.clone());
                    if neighbor == end {
                        return Some(path);
                    }
                    frames.push((neighbor, 0));
                },
                None => {
                    frames.pop();
                    path.pop();
                },
            }
        }
        None
    }

    /// Returns the other endpoints of every live edge touching `vertex`.
    ///
    /// Only a vertex that was removed before can have edges waiting for it.
    fn revived_neighbors(&self, vertex: &V) -> Vec<V> {
        if !self.vertex_removed.contains(vertex) {
            return Vec::new();
        }
        self.edge_added
            .keys()
            .filter(|edge| self.edge_live(edge))
            .filter_map(|edge| edge.opposite(vertex))
            .cloned()
            .collect()
    }

    /// Rebuilds the adjacency cache from the timestamps.
    ///
    /// Each live vertex keeps its neighbours in the order of this replica's
    /// cache, then the other replica's, then edge insertion order for any
    /// live edge neither cache knew about. Entries for dead vertices and
    /// neighbours across dead edges are dropped.
    fn rebuild_adjacency(&mut self, mut theirs: HashMap<V, Vec<V>>) {
        let mut live: HashMap<V, Vec<V>> = HashMap::new();
        for edge in self.edge_added.keys().filter(|edge| self.edge_live(edge)) {
            let (low, high) = edge.endpoints();
            live.entry(low.clone()).or_default().push(high.clone());
            live.entry(high.clone()).or_default().push(low.clone());
        }

        let mut ours = mem::take(&mut self.adjacency);
        let mut adjacency = HashMap::new();
        for vertex in self.vertex_added.keys().filter(|vertex| self.vertex_exists(vertex)) {
            let expected = live.remove(vertex).unwrap_or_default();
            let allowed: HashSet<&V> = expected.iter().collect();
            let mut seen = HashSet::new();
            let neighbors: Vec<V> = ours.remove(vertex)
                                        .unwrap_or_default()
                                        .into_iter()
                                        .chain(theirs.remove(vertex).unwrap_or_default())
                                        .chain(expected.iter().cloned())
                                        .filter(|neighbor| {
                                            allowed.contains(neighbor) && seen.insert(neighbor.clone())
                                        })
                                        .collect();
            adjacency.insert(vertex.clone(), neighbors);
        }
        self.adjacency = adjacency;
    }
}

fn edge_key<V>(u: V, v: V) -> Result<Edge<V>> where V: Vertex {
    Edge::new(u, v).map_err(|error| {
        warn!(%error, "rejected edge key");
        error
    })
}

impl <V> Default for LwwGraph<V> where V: Vertex {
    fn default() -> LwwGraph<V> {
        LwwGraph::new()
    }
}

impl <V> Crdt for LwwGraph<V> where V: Vertex {

    /// Merge a replica into the graph.
    ///
    /// Every timestamp store takes the per-key maximum of the two replicas,
    /// then the neighbour cache is re-derived so that it agrees with the
    /// merged timestamps.
    ///
    /// ##### Example
    ///
    /// ```
    /// use crdt_graph::Crdt;
    /// use crdt_graph::graph::LwwGraph;
    ///
    /// let mut local = LwwGraph::new();
    /// let mut remote = LwwGraph::new();
    ///
    /// local.add_vertex(1u32, 0).unwrap();
    /// remote.add_vertex(2, 0).unwrap();
    /// remote.add_vertex(1, 0).unwrap();
    /// remote.add_edge(1, 2, 0).unwrap();
    ///
    /// local.merge(remote);
    /// assert!(local.edge_exists(&1, &2));
    /// assert_eq!(Some(&[2][..]), local.neighbors(&1));
    /// ```
    fn merge(&mut self, other: LwwGraph<V>) {
        let LwwGraph { vertex_added, vertex_removed, edge_added, edge_removed, adjacency, .. } = other;
        self.vertex_added.merge(vertex_added);
        self.vertex_removed.merge(vertex_removed);
        self.edge_added.merge(edge_added);
        self.edge_removed.merge(edge_removed);
        self.rebuild_adjacency(adjacency);
        debug!(vertices = self.vertex_count(), edges = self.edge_count(), "merged replica");
    }
}

impl <V> PartialEq for LwwGraph<V> where V: Vertex {
    fn eq(&self, other: &LwwGraph<V>) -> bool {
        self.vertex_added == other.vertex_added
            && self.vertex_removed == other.vertex_removed
            && self.edge_added == other.edge_added
            && self.edge_removed == other.edge_removed
    }
}

impl <V> Eq for LwwGraph<V> where V: Vertex {}

impl <V> PartialOrd for LwwGraph<V> where V: Vertex {
    fn partial_cmp(&self, other: &LwwGraph<V>) -> Option<Ordering> {
        // Replicas are ordered only if every store agrees on the direction.
        [
            self.vertex_added.partial_cmp(&other.vertex_added),
            self.vertex_removed.partial_cmp(&other.vertex_removed),
            self.edge_added.partial_cmp(&other.edge_added),
            self.edge_removed.partial_cmp(&other.edge_removed),
        ].iter().try_fold(Equal, |acc, &store| match (acc, store?) {
            (Equal, ordering) | (ordering, Equal) => Some(ordering),
            (Less, Less) => Some(Less),
            (Greater, Greater) => Some(Greater),
            _ => None,
        })
    }
}

impl <V> Debug for LwwGraph<V> where V: Vertex {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("LwwGraph")
         .field("vertex_added", &self.vertex_added)
         .field("vertex_removed", &self.vertex_removed)
         .field("edge_added", &self.edge_added)
         .field("edge_removed", &self.edge_removed)
         .finish()
    }
}

/// Writes one line per live vertex: the vertex, a tab, and its neighbours.
impl <V> Display for LwwGraph<V> where V: Vertex {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for vertex in self.vertex_added.keys().filter(|vertex| self.vertex_exists(vertex)) {
            let neighbors = self.adjacency.get(vertex).map(Vec::as_slice).unwrap_or(&[]);
            writeln!(f, "{:?}:\t{:?}", vertex, neighbors)?;
        }
        Ok(())
    }
}

/// Generates a graph by replaying random operations over a small pool of
/// vertices with small timestamps, so that concurrent-looking conflicts and
/// timestamp ties are common. Half of the graphs run with the skew guard
/// clamping to a manual clock that drifts forward between operations.
#[cfg(any(test, feature = "quickcheck_generators"))]
impl <V> Arbitrary for LwwGraph<V> where V: Vertex + Arbitrary {
    fn arbitrary(g: &mut Gen) -> LwwGraph<V> {
        let pool: Vec<V> = (0..5).map(|_| V::arbitrary(g)).collect();
        let clock = Arc::new(ManualClock::new(u64::from(u8::arbitrary(g) % 16)));
        let skew_guard = if bool::arbitrary(g) { SkewGuard::ClampToClock } else { SkewGuard::Disabled };
        let mut graph = LwwGraph::with_config(GraphConfig { skew_guard }, clock.clone());

        let operations = usize::arbitrary(g) % (g.size() + 1);
        for _ in 0..operations {
            let (u, v) = match (g.choose(&pool), g.choose(&pool)) {
                (Some(u), Some(v)) => (u.clone(), v.clone()),
                _ => break,
            };
            if u8::arbitrary(g) % 8 == 0 {
                clock.advance(1);
            }
            let timestamp = u64::from(u8::arbitrary(g) % 16);
            // Self-loops are rejected without touching the state.
            let _ = match u8::arbitrary(g) % 4 {
                0 => graph.add_vertex(u, timestamp),
                1 => graph.remove_vertex(u, timestamp),
                2 => graph.add_edge(u, v, timestamp),
                _ => graph.remove_edge(u, v, timestamp),
            };
        }
        graph
    }

    /// Shrinks by forgetting one timestamp entry at a time.
    fn shrink(&self) -> Box<dyn Iterator<Item = LwwGraph<V>>> {
        let mut shrunk = Vec::new();
        for store in self.vertex_added.without_each() {
            shrunk.push(LwwGraph { vertex_added: store, ..self.clone() });
        }
        for store in self.vertex_removed.without_each() {
            shrunk.push(LwwGraph { vertex_removed: store, ..self.clone() });
        }
        for store in self.edge_added.without_each() {
            shrunk.push(LwwGraph { edge_added: store, ..self.clone() });
        }
        for store in self.edge_removed.without_each() {
            shrunk.push(LwwGraph { edge_removed: store, ..self.clone() });
        }
        for graph in &mut shrunk {
            graph.rebuild_adjacency(HashMap::new());
        }
        Box::new(shrunk.into_iter())
    }
}
