//! # sparse-veb
//!
//! A space-reduced van Emde Boas set over a fixed integer universe `[0, u)`.
//!
//! Membership, minimum/maximum, successor/predecessor, insert and delete all
//! run in `O(log log u)`. Clusters are allocated only when they receive a
//! value and are freed as soon as they empty, and they live in an
//! open-addressing [`ClusterMap`] instead of a dense array, so memory grows
//! with the number of stored values rather than with `u`.
//!
//! ## Example
//!
//! ```rust
//! use sparse_veb::VebSet;
//!
//! let mut set = VebSet::new(16).unwrap();
//! for x in [2, 3, 4, 5, 7, 14, 15] {
//!     set.insert(x).unwrap();
//! }
//!
//! assert_eq!(set.minimum(), Some(2));
//! assert_eq!(set.successor(5).unwrap(), Some(7));
//! assert_eq!(set.predecessor(14).unwrap(), Some(7));
//! assert!(!set.member(6).unwrap());
//! ```

pub mod cluster_map;
pub mod config;
pub mod error;
mod node;

pub use cluster_map::{ClusterMap, HashParams};
pub use config::Config;
pub use error::{Result, VebError};

use std::fmt;
use std::iter::FusedIterator;

use log::debug;

use node::{Node, NodeAlloc};

// =============================================================================
// VebSet
// =============================================================================

/// Ordered set of integers in `[0, universe)`.
///
/// Single-threaded: mutation updates cached min/max and cluster maps in
/// several steps, so shared use needs an external lock.
#[derive(Clone)]
pub struct VebSet {
    root: Node,
    alloc: NodeAlloc,
    config: Config,
    len: usize,
}

impl VebSet {
    /// Empty set over `[0, universe)` with the default [`Config`].
    pub fn new(universe: u64) -> Result<Self> {
        Self::with_config(universe, Config::default())
    }

    /// `universe` must be a power of two, at least 2.
    pub fn with_config(universe: u64, config: Config) -> Result<Self> {
        if universe < 2 || !universe.is_power_of_two() {
            return Err(VebError::InvalidUniverse(universe));
        }
        config.validate()?;

        let mut alloc = NodeAlloc::new(&config);
        let root = Node::new(universe, &mut alloc);
        let bits = universe.trailing_zeros();
        debug!(
            "vEB set over 2^{bits} (clusters of 2^{}, seed {:#x})",
            bits / 2,
            config.seed
        );
        Ok(Self {
            root,
            alloc,
            config,
            len: 0,
        })
    }

    #[inline]
    pub fn universe(&self) -> u64 {
        self.root.universe()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn check(&self, x: u64) -> Result<()> {
        if x >= self.universe() {
            return Err(VebError::InvalidValue {
                value: x,
                universe: self.universe(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn minimum(&self) -> Option<u64> {
        self.root.minimum()
    }

    #[inline]
    pub fn maximum(&self) -> Option<u64> {
        self.root.maximum()
    }

    pub fn member(&self, x: u64) -> Result<bool> {
        self.check(x)?;
        Ok(self.root.member(x))
    }

    /// Smallest stored value strictly greater than `x`.
    pub fn successor(&self, x: u64) -> Result<Option<u64>> {
        self.check(x)?;
        Ok(self.root.successor(x))
    }

    /// Largest stored value strictly less than `x`.
    pub fn predecessor(&self, x: u64) -> Result<Option<u64>> {
        self.check(x)?;
        Ok(self.root.predecessor(x))
    }

    /// Adds `x`. Returns `false` if it was already present.
    pub fn insert(&mut self, x: u64) -> Result<bool> {
        self.check(x)?;
        if self.root.member(x) {
            return Ok(false);
        }
        self.root.insert(x, &mut self.alloc)?;
        self.len += 1;
        Ok(true)
    }

    /// Removes `x`. Returns `false` if it was not present.
    pub fn delete(&mut self, x: u64) -> Result<bool> {
        self.check(x)?;
        if !self.root.member(x) {
            return Ok(false);
        }
        self.root.delete(x)?;
        self.len -= 1;
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.root = Node::new(self.universe(), &mut self.alloc);
        self.len = 0;
    }

    /// Ascending iterator, one successor query per step.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            root: &self.root,
            next: self.root.minimum(),
        }
    }

    /// All stored values in ascending order, rebuilt by walking the cached
    /// min/max of every node and re-composing cluster indices.
    pub fn enumerate(&self) -> Vec<u64> {
        self.root.values()
    }

    /// Nodes currently allocated, summaries included. An empty set holds only
    /// its root.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}

impl fmt::Debug for VebSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// `Min: 2, C[0]: 3, C[1]: 4, 5, 7, C[3]: 14, 15`: the cached min followed by
/// the contents of every live top-level cluster.
impl fmt::Display for VebSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(min) = self.root.minimum() else {
            return f.write_str("Min: None");
        };
        write!(f, "Min: {min}")?;
        for (high, values) in self.root.cluster_values() {
            write!(f, ", C[{high}]: ")?;
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{v}")?;
            }
        }
        Ok(())
    }
}

pub struct Iter<'a> {
    root: &'a Node,
    next: Option<u64>,
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let current = self.next?;
        self.next = self.root.successor(current);
        Some(current)
    }
}

impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a VebSet {
    type Item = u64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}


#[cfg(test)]
mod proptests;
