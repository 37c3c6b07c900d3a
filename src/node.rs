//! Recursive van Emde Boas node with lazily allocated clusters.
//!
//! A node over universe `u > 2` splits every value into a cluster index
//! (`high`) and an offset (`low`). Only non-empty clusters exist, held in a
//! [`ClusterMap`]; the summary tracks which cluster indices are non-empty.
//! The cached `min` is never stored inside a cluster or the summary, which is
//! what keeps every operation to a single recursive descent.

use log::trace;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cluster_map::{ClusterMap, HashParams};
use crate::config::Config;
use crate::error::Result;

/// Source of fresh nodes: hands every new cluster map its capacity and a
/// pair of hash coefficients from a seeded generator.
#[derive(Debug, Clone)]
pub(crate) struct NodeAlloc {
    rng: StdRng,
    initial_capacity: usize,
}

impl NodeAlloc {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            initial_capacity: config.initial_capacity,
        }
    }

    fn boxed(&mut self, universe: u64) -> Box<Node> {
        Box::new(Node::new(universe, self))
    }
}

/// Recursive part of a non-base node.
#[derive(Debug, Clone)]
struct Branch {
    lower_sqrt: u64,
    upper_sqrt: u64,
    /// Set of non-empty cluster indices, over `upper_sqrt`.
    /// Absent whenever no cluster exists.
    summary: Option<Box<Node>>,
    /// Non-empty clusters only, each over `lower_sqrt`.
    clusters: ClusterMap<Box<Node>>,
}

impl Branch {
    fn new(universe: u64, alloc: &mut NodeAlloc) -> Self {
        let bits = universe.trailing_zeros();
        let params = HashParams::random(&mut alloc.rng);
        Self {
            lower_sqrt: 1 << (bits / 2),
            upper_sqrt: 1 << (bits - bits / 2),
            summary: None,
            clusters: ClusterMap::from_parts(alloc.initial_capacity, params),
        }
    }

    #[inline]
    fn split(&self, x: u64) -> (u64, u64) {
        (x / self.lower_sqrt, x % self.lower_sqrt)
    }

    #[inline]
    fn index(&self, high: u64, low: u64) -> u64 {
        high * self.lower_sqrt + low
    }

    fn cluster(&self, high: u64) -> &Node {
        self.clusters
            .get(high)
            .expect("summary lists a cluster that does not exist")
    }

    fn cluster_mut(&mut self, high: u64) -> &mut Node {
        self.clusters
            .get_mut(high)
            .expect("cluster of a stored value must exist")
    }

    /// Smallest value held in the clusters.
    fn first_element(&self) -> Option<u64> {
        let high = self.summary.as_ref()?.min?;
        Some(self.index(high, self.cluster(high).min?))
    }

    /// Largest value held in the clusters.
    fn last_element(&self) -> Option<u64> {
        let high = self.summary.as_ref()?.max?;
        Some(self.index(high, self.cluster(high).max?))
    }

    /// Stores `x` in its cluster, allocating the cluster (and the summary) if
    /// this is the first value with that index.
    fn push_down(&mut self, x: u64, alloc: &mut NodeAlloc) -> Result<()> {
        let (high, low) = self.split(x);
        if let Some(cluster) = self.clusters.get_mut(high) {
            if !cluster.is_empty() {
                return cluster.insert(low, alloc);
            }
        } else {
            self.clusters.insert(high, alloc.boxed(self.lower_sqrt))?;
        }

        let upper_sqrt = self.upper_sqrt;
        self.summary
            .get_or_insert_with(|| alloc.boxed(upper_sqrt))
            .insert(high, alloc)?;

        // The cluster is known to be empty: set it directly instead of recursing.
        let cluster = self.cluster_mut(high);
        cluster.min = Some(low);
        cluster.max = Some(low);
        Ok(())
    }

    /// Drops the emptied cluster `high` and its summary entry, and the summary
    /// itself once nothing is left in it.
    fn reclaim(&mut self, high: u64) -> Result<()> {
        self.clusters.remove(high)?;
        if let Some(summary) = self.summary.as_mut() {
            summary.delete(high)?;
            if summary.is_empty() {
                trace!("summary over {} emptied, dropping it", self.upper_sqrt);
                self.summary = None;
            }
        }
        Ok(())
    }
}

/// Set of integers in `[0, universe)`.
///
/// Callers must not insert a value that is already present or delete one that
/// is absent; [`VebSet`](crate::VebSet) checks membership first.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    universe: u64,
    min: Option<u64>,
    max: Option<u64>,
    /// `None` iff this is a base node (`universe == 2`).
    branch: Option<Branch>,
}

impl Node {
    pub(crate) fn new(universe: u64, alloc: &mut NodeAlloc) -> Self {
        debug_assert!(universe >= 2 && universe.is_power_of_two());
        let branch = (universe > 2).then(|| Branch::new(universe, alloc));
        Self {
            universe,
            min: None,
            max: None,
            branch,
        }
    }

    #[inline]
    pub(crate) fn universe(&self) -> u64 {
        self.universe
    }

    #[inline]
    pub(crate) fn minimum(&self) -> Option<u64> {
        self.min
    }

    #[inline]
    pub(crate) fn maximum(&self) -> Option<u64> {
        self.max
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.min.is_none()
    }

    pub(crate) fn member(&self, x: u64) -> bool {
        if self.min == Some(x) || self.max == Some(x) {
            return true;
        }
        let Some(branch) = &self.branch else {
            return false;
        };
        let (high, low) = branch.split(x);
        branch.clusters.get(high).is_some_and(|c| c.member(low))
    }

    pub(crate) fn successor(&self, x: u64) -> Option<u64> {
        let Some(branch) = &self.branch else {
            return (x == 0 && self.max == Some(1)).then_some(1);
        };
        // The cached min is invisible to the clusters.
        if let Some(min) = self.min {
            if x < min {
                return Some(min);
            }
        }

        let (high, low) = branch.split(x);
        if let Some(cluster) = branch.clusters.get(high) {
            if cluster.max.is_some_and(|max| low < max) {
                let offset = cluster.successor(low)?;
                return Some(branch.index(high, offset));
            }
        }

        let next = branch.summary.as_ref()?.successor(high)?;
        let offset = branch.cluster(next).min?;
        Some(branch.index(next, offset))
    }

    pub(crate) fn predecessor(&self, x: u64) -> Option<u64> {
        let Some(branch) = &self.branch else {
            return (x == 1 && self.min == Some(0)).then_some(0);
        };
        if let Some(max) = self.max {
            if x > max {
                return Some(max);
            }
        }

        let (high, low) = branch.split(x);
        if let Some(cluster) = branch.clusters.get(high) {
            if cluster.min.is_some_and(|min| low > min) {
                let offset = cluster.predecessor(low)?;
                return Some(branch.index(high, offset));
            }
        }

        match branch.summary.as_ref().and_then(|s| s.predecessor(high)) {
            Some(prev) => {
                let offset = branch.cluster(prev).max?;
                Some(branch.index(prev, offset))
            }
            // Nothing clustered below `x`; only the cached min can precede it.
            None => self.min.filter(|&min| x > min),
        }
    }

    /// Makes `x` the cached min if it is smaller than the current one, and
    /// returns the value that must be stored in the clusters instead.
    fn swap_in_min(&mut self, x: u64) -> u64 {
        match self.min {
            Some(min) if x < min => {
                self.min = Some(x);
                min
            }
            _ => x,
        }
    }

    /// Pulls the smallest clustered value up into the cached min and returns
    /// it; the caller then deletes it from its cluster.
    fn promote_min(&mut self) -> Option<u64> {
        let first = self.branch.as_ref()?.first_element()?;
        self.min = Some(first);
        Some(first)
    }

    pub(crate) fn insert(&mut self, x: u64, alloc: &mut NodeAlloc) -> Result<()> {
        if self.min.is_none() {
            self.min = Some(x);
            self.max = Some(x);
            return Ok(());
        }

        let x = self.swap_in_min(x);
        if let Some(branch) = self.branch.as_mut() {
            branch.push_down(x, alloc)?;
        }
        if self.max.is_some_and(|max| x > max) {
            self.max = Some(x);
        }
        Ok(())
    }

    pub(crate) fn delete(&mut self, x: u64) -> Result<()> {
        if self.min == self.max {
            self.min = None;
            self.max = None;
            return Ok(());
        }
        if self.branch.is_none() {
            // Base node holding {0, 1}.
            let remaining = 1 - x;
            self.min = Some(remaining);
            self.max = Some(remaining);
            return Ok(());
        }

        let mut x = x;
        if self.min == Some(x) {
            match self.promote_min() {
                Some(first) => x = first,
                None => {
                    self.min = self.max;
                    return Ok(());
                }
            }
        }

        let branch = self
            .branch
            .as_mut()
            .expect("non-base node carries a branch");
        let (high, low) = branch.split(x);
        let cluster = branch.cluster_mut(high);
        cluster.delete(low)?;
        let emptied = cluster.is_empty();
        let cluster_max = cluster.max;

        if emptied {
            trace!("cluster {high} of universe {} emptied, reclaiming", self.universe);
            branch.reclaim(high)?;
            if self.max == Some(x) {
                self.max = branch.last_element().or(self.min);
            }
        } else if self.max == Some(x) {
            self.max = cluster_max.map(|low| branch.index(high, low));
        }
        Ok(())
    }

    /// Every stored value, unordered and possibly with duplicates.
    fn collect_into(&self, out: &mut Vec<u64>) {
        let Some(min) = self.min else {
            return;
        };
        out.push(min);
        if let Some(max) = self.max.filter(|&max| max != min) {
            out.push(max);
        }
        let Some(branch) = &self.branch else {
            return;
        };
        let mut lows = Vec::new();
        for (high, cluster) in branch.clusters.iter() {
            lows.clear();
            cluster.collect_into(&mut lows);
            out.extend(lows.iter().map(|&low| branch.index(high, low)));
        }
    }

    /// Sorted, deduplicated reconstruction of the stored values.
    pub(crate) fn values(&self) -> Vec<u64> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Values of each live top-level cluster, re-composed to full values,
    /// ordered by cluster index.
    pub(crate) fn cluster_values(&self) -> Vec<(u64, Vec<u64>)> {
        let Some(branch) = &self.branch else {
            return Vec::new();
        };
        let mut out: Vec<(u64, Vec<u64>)> = branch
            .clusters
            .iter()
            .map(|(high, cluster)| {
                let full = cluster
                    .values()
                    .into_iter()
                    .map(|low| branch.index(high, low))
                    .collect();
                (high, full)
            })
            .collect();
        out.sort_unstable_by_key(|(high, _)| *high);
        out
    }

    /// Nodes allocated in this subtree, including summaries.
    pub(crate) fn node_count(&self) -> usize {
        let Some(branch) = &self.branch else {
            return 1;
        };
        1 + branch.summary.as_ref().map_or(0, |s| s.node_count())
            + branch
                .clusters
                .iter()
                .map(|(_, c)| c.node_count())
                .sum::<usize>()
    }

    /// Walks the subtree asserting the structural invariants and returns the
    /// number of stored values.
    #[cfg(test)]
    pub(crate) fn validate(&self) -> usize {
        assert_eq!(self.min.is_none(), self.max.is_none(), "min/max set together");
        if let (Some(min), Some(max)) = (self.min, self.max) {
            assert!(min <= max, "min {min} > max {max}");
            assert!(max < self.universe, "max {max} outside universe {}", self.universe);
        }

        let Some(branch) = &self.branch else {
            assert_eq!(self.universe, 2);
            return match (self.min, self.max) {
                (None, _) => 0,
                (Some(a), Some(b)) if a == b => 1,
                _ => 2,
            };
        };
        assert_eq!(branch.lower_sqrt * branch.upper_sqrt, self.universe);
        assert!(branch.lower_sqrt <= branch.upper_sqrt);

        if self.min == self.max {
            assert!(branch.clusters.is_empty(), "singleton/empty node with clusters");
            assert!(branch.summary.is_none(), "singleton/empty node with a summary");
            return usize::from(self.min.is_some());
        }

        let summary = branch
            .summary
            .as_ref()
            .expect("node with two values must have a summary");
        assert_eq!(summary.universe, branch.upper_sqrt);
        summary.validate();

        let mut indices: Vec<u64> = branch.clusters.iter().map(|(high, _)| high).collect();
        indices.sort_unstable();
        assert_eq!(summary.values(), indices, "summary disagrees with live clusters");

        let min = self.min.unwrap();
        let mut count = 1;
        let mut clustered_max = 0;
        for (high, cluster) in branch.clusters.iter() {
            assert_eq!(cluster.universe, branch.lower_sqrt);
            assert!(!cluster.is_empty(), "empty cluster {high} left resident");
            for value in cluster.values() {
                let full = branch.index(high, value);
                assert!(full > min, "cached min {min} also stored in a cluster");
                clustered_max = clustered_max.max(full);
            }
            count += cluster.validate();
        }
        assert_eq!(Some(clustered_max), self.max, "max must be the largest clustered value");
        count
    }
}
