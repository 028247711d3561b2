use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt::{self, Debug, Display, Formatter};

use crate::error::{GraphError, Result};

/// An undirected edge between two distinct vertices.
///
/// Edges are canonicalised on construction, so `Edge::new(a, b)` and
/// `Edge::new(b, a)` are the same key.
///
/// ### Example
///
/// ```
/// use crdt_graph::graph::Edge;
///
/// assert_eq!(Edge::new(3, 2).unwrap(), Edge::new(2, 3).unwrap());
/// assert!(Edge::new(4, 4).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge<V> {
    low: V,
    high: V,
}

impl <V> Edge<V> where V: Debug + Ord {

    /// Creates the edge joining `a` and `b`.
    ///
    /// Self-loops cannot be keyed and are rejected with `InvalidKey`.
    pub fn new(a: V, b: V) -> Result<Edge<V>> {
        match a.cmp(&b) {
            Less => Ok(Edge { low: a, high: b }),
            Greater => Ok(Edge { low: b, high: a }),
            Equal => Err(GraphError::InvalidKey {
                reason: format!("self-loop edge on vertex {:?}", a),
            }),
        }
    }
}

impl <V> Edge<V> where V: Eq {

    /// Returns both endpoints, smaller first.
    pub fn endpoints(&self) -> (&V, &V) {
        (&self.low, &self.high)
    }

    /// Returns the endpoint opposite `vertex`, or `None` if `vertex` is not
    /// an endpoint of this edge.
    pub fn opposite(&self, vertex: &V) -> Option<&V> {
        if *vertex == self.low {
            Some(&self.high)
        } else if *vertex == self.high {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl <V> Display for Edge<V> where V: Display {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}
