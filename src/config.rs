//! Replica configuration.
//!
//! ```
//! use crdt_graph::config::{GraphConfig, SkewGuard};
//!
//! let config = GraphConfig::default();
//! assert_eq!(SkewGuard::ClampToClock, config.skew_guard);
//! ```

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::Timestamp;

/// How add operations treat timestamps older than the replica's clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkewGuard {
    /// Raise an add timestamp that is behind the clock up to the clock's
    /// current reading. Only the lower bound is enforced.
    #[default]
    ClampToClock,
    /// Record add timestamps exactly as supplied.
    Disabled,
}

impl SkewGuard {

    /// Applies the guard to an add timestamp.
    pub fn apply(self, timestamp: Timestamp, clock: &dyn Clock) -> Timestamp {
        match self {
            SkewGuard::ClampToClock => timestamp.max(clock.now()),
            SkewGuard::Disabled => timestamp,
        }
    }
}

/// Configuration for a single graph replica.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Skew guard for vertex and edge adds. Default: clamp to clock.
    pub skew_guard: SkewGuard,
}
