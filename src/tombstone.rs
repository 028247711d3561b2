//! Per-key timestamp stores.
//!
//! A `Tombstones` map is the building block for the graph's add and remove
//! sets. Each key carries the greatest timestamp ever recorded for it, so a
//! store only grows: keys are never deleted and timestamps never decrease.
//! Two stores merge by taking the per-key maximum, which is commutative,
//! associative and idempotent.

use std::cmp::Ordering::{self, Equal, Greater, Less};
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::HashMap;
use std::fmt::{Debug, Error, Formatter};
use std::hash::Hash;

use crate::Timestamp;

/// A grow-only map from keys to their latest timestamp.
///
/// Keys are remembered in the order they were first recorded.
#[derive(Clone)]
pub struct Tombstones<K> where K: Eq + Hash {
    stamps: HashMap<K, Timestamp>,
    order: Vec<K>,
}

impl <K> Tombstones<K> where K: Clone + Eq + Hash {

    /// Creates an empty store.
    ///
    /// ### Example
    ///
    /// ```
    /// use crdt_graph::tombstone::Tombstones;
    ///
    /// let stamps = Tombstones::<&str>::new();
    /// assert!(stamps.is_empty());
    /// ```
    pub fn new() -> Tombstones<K> {
        Tombstones { stamps: HashMap::new(), order: Vec::new() }
    }

    /// Returns the timestamp recorded for `key`, if any.
    pub fn get(&self, key: &K) -> Option<Timestamp> {
        self.stamps.get(key).copied()
    }

    /// Returns true if a timestamp has ever been recorded for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.stamps.contains_key(key)
    }

    /// Records `timestamp` for `key` unless a greater one is already stored.
    ///
    /// Returns the timestamp stored after the call.
    ///
    /// ### Example
    ///
    /// ```
    /// use crdt_graph::tombstone::Tombstones;
    ///
    /// let mut stamps = Tombstones::new();
    /// assert_eq!(5, stamps.record("a", 5));
    /// assert_eq!(5, stamps.record("a", 3));
    /// assert_eq!(9, stamps.record("a", 9));
    /// ```
    pub fn record(&mut self, key: K, timestamp: Timestamp) -> Timestamp {
        match self.stamps.entry(key) {
            Occupied(mut entry) => {
                if timestamp > *entry.get() {
                    entry.insert(timestamp);
                }
                *entry.get()
            },
            Vacant(entry) => {
                self.order.push(entry.key().clone());
                *entry.insert(timestamp)
            },
        }
    }

    /// Iterates over the keys in first-recorded order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// Returns the number of keys in the store.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    /// Folds another store into this one, keeping the per-key maximum.
    ///
    /// Keys new to this store are appended in the other store's order.
    pub fn merge(&mut self, other: Tombstones<K>) {
        let Tombstones { mut stamps, order } = other;
        for key in order {
            if let Some(timestamp) = stamps.remove(&key) {
                self.record(key, timestamp);
            }
        }
    }

    /// Returns one copy of this store per key, each missing that key.
    #[cfg(any(test, feature = "quickcheck_generators"))]
    pub(crate) fn without_each(&self) -> Vec<Tombstones<K>> {
        self.order
            .iter()
            .map(|dropped| {
                let mut store = Tombstones::new();
                for key in self.order.iter().filter(|key| *key != dropped) {
                    if let Some(timestamp) = self.get(key) {
                        store.record(key.clone(), timestamp);
                    }
                }
                store
            })
            .collect()
    }

    /// Returns true if every key in this store is in `other` with a
    /// timestamp at least as large.
    pub fn is_dominated_by(&self, other: &Tombstones<K>) -> bool {
        self.stamps
            .iter()
            .all(|(key, &timestamp)| other.get(key).map_or(false, |theirs| timestamp <= theirs))
    }
}

impl <K> Default for Tombstones<K> where K: Clone + Eq + Hash {
    fn default() -> Tombstones<K> {
        Tombstones::new()
    }
}

impl <K> PartialEq for Tombstones<K> where K: Eq + Hash {
    fn eq(&self, other: &Tombstones<K>) -> bool {
        self.stamps == other.stamps
    }
}

impl <K> Eq for Tombstones<K> where K: Eq + Hash {}

impl <K> PartialOrd for Tombstones<K> where K: Clone + Eq + Hash {
    fn partial_cmp(&self, other: &Tombstones<K>) -> Option<Ordering> {
        match (self.is_dominated_by(other), other.is_dominated_by(self)) {
            (true, true) => Some(Equal),
            (true, false) => Some(Less),
            (false, true) => Some(Greater),
            (false, false) => None,
        }
    }
}

impl <K> Debug for Tombstones<K> where K: Debug + Eq + Hash {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        f.debug_map()
         .entries(self.order.iter().filter_map(|key| self.stamps.get(key).map(|ts| (key, ts))))
         .finish()
    }
}

#[cfg(test)]
mod test {

    use super::Tombstones;

    #[test]
    fn check_record_never_decreases() {
        let mut stamps = Tombstones::new();
        stamps.record(1u8, 10);
        stamps.record(1, 4);
        assert_eq!(Some(10), stamps.get(&1));
        stamps.record(1, 11);
        assert_eq!(Some(11), stamps.get(&1));
        assert_eq!(1, stamps.len());
    }

    #[test]
    fn check_keys_keep_first_recorded_order() {
        let mut stamps = Tombstones::new();
        for key in [6u8, 2, 3, 2, 6] {
            stamps.record(key, 0);
        }
        assert_eq!(vec![6, 2, 3], stamps.keys().copied().collect::<Vec<_>>());
    }

    #[test]
    fn check_merge_takes_maximum() {
        let mut a = Tombstones::new();
        a.record("x", 1);
        a.record("y", 8);

        let mut b = Tombstones::new();
        b.record("y", 3);
        b.record("z", 2);
        b.record("x", 5);

        a.merge(b);
        assert_eq!(Some(5), a.get(&"x"));
        assert_eq!(Some(8), a.get(&"y"));
        assert_eq!(Some(2), a.get(&"z"));
        assert_eq!(vec!["x", "y", "z"], a.keys().copied().collect::<Vec<_>>());
    }

    #[test]
    fn check_without_each() {
        let mut stamps = Tombstones::new();
        stamps.record('a', 1);
        stamps.record('b', 2);
        let shrunk = stamps.without_each();
        assert_eq!(2, shrunk.len());
        assert_eq!(vec!['b'], shrunk[0].keys().copied().collect::<Vec<_>>());
        assert_eq!(Some(2), shrunk[0].get(&'b'));
        assert!(!shrunk[1].contains(&'b'));
        assert!(shrunk.iter().all(|store| *store < stamps));
    }

    #[test]
    fn check_partial_order() {
        let mut a = Tombstones::new();
        a.record(1u8, 1);
        let mut b = a.clone();
        assert!(a == b);
        b.record(1, 2);
        assert!(a < b);
        a.record(2, 1);
        assert_eq!(None, a.partial_cmp(&b));
    }
}
