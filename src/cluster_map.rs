//! Open-addressing hash table from a cluster index to an owned child.
//!
//! Linear probing over an affine hash `((a * key + b) mod p) mod capacity`,
//! with tombstones for deleted slots. Every insert and remove re-checks the
//! load factor: above 0.75 the table doubles, below 0.25 it halves (never
//! below its initial capacity). A resize re-probes every live entry into a
//! fresh table, which is also the only point where tombstones are reclaimed.

use log::trace;
use rand::Rng;

use crate::config::DEFAULT_INITIAL_CAPACITY;
use crate::error::{Result, VebError};

/// Mersenne prime `2^31 - 1`, modulus of the affine hash.
pub const HASH_PRIME: u64 = (1 << 31) - 1;

// =============================================================================
// Hash function
// =============================================================================

/// Coefficients of the affine hash. Fixed for the lifetime of a map and carried
/// unchanged across resizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Multiplier, in `1..HASH_PRIME`.
    pub a: u64,
    /// Offset, in `0..HASH_PRIME`.
    pub b: u64,
}

impl HashParams {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            a: rng.gen_range(1..HASH_PRIME),
            b: rng.gen_range(0..HASH_PRIME),
        }
    }

    fn is_valid(self) -> bool {
        (1..HASH_PRIME).contains(&self.a) && self.b < HASH_PRIME
    }

    /// Slot probed first for `key`. Keys go up to `2^32`, so the product is
    /// taken in `u128`.
    #[inline]
    fn home(self, key: u64, capacity: usize) -> usize {
        let h = (u128::from(self.a) * u128::from(key) + u128::from(self.b)) % u128::from(HASH_PRIME);
        (h % capacity as u128) as usize
    }
}

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone)]
enum Slot<V> {
    Empty,
    Live { key: u64, value: V },
    Tombstone,
}

fn empty_slots<V>(capacity: usize) -> Vec<Slot<V>> {
    std::iter::repeat_with(|| Slot::Empty).take(capacity).collect()
}

/// Sparse map from cluster index to child, sized by the number of live
/// entries rather than by the key range.
#[derive(Debug, Clone)]
pub struct ClusterMap<V> {
    slots: Vec<Slot<V>>,
    /// Live entries. Tombstones are not counted.
    len: usize,
    /// Capacity the table started with; shrinking stops here.
    min_capacity: usize,
    params: HashParams,
}

impl<V> ClusterMap<V> {
    /// Empty map with the default capacity and coefficients drawn from `rng`.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        Self::from_parts(DEFAULT_INITIAL_CAPACITY, HashParams::random(rng))
    }

    /// Empty map with explicit coefficients.
    ///
    /// `initial_capacity` must be a power of two no smaller than 4, and the
    /// coefficients must satisfy `1 <= a < p`, `0 <= b < p`.
    pub fn with_params(initial_capacity: usize, params: HashParams) -> Result<Self> {
        if initial_capacity < DEFAULT_INITIAL_CAPACITY || !initial_capacity.is_power_of_two() {
            return Err(VebError::InvalidConfig(
                "initial_capacity must be a power of two no smaller than 4",
            ));
        }
        if !params.is_valid() {
            return Err(VebError::InvalidConfig("hash coefficients out of range"));
        }
        Ok(Self::from_parts(initial_capacity, params))
    }

    /// Unchecked constructor for callers holding an already validated config.
    pub(crate) fn from_parts(initial_capacity: usize, params: HashParams) -> Self {
        debug_assert!(initial_capacity.is_power_of_two());
        Self {
            slots: empty_slots(initial_capacity),
            len: 0,
            min_capacity: initial_capacity,
            params,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn params(&self) -> HashParams {
        self.params
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    #[inline]
    fn slot_at(&self, home: usize, probe: usize) -> usize {
        (home + probe) % self.capacity()
    }

    /// Index of the live slot holding `key`.
    fn find(&self, key: u64) -> Option<usize> {
        let cap = self.capacity();
        let home = self.params.home(key, cap);
        for probe in 0..cap {
            let idx = self.slot_at(home, probe);
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Live { key: k, .. } if *k == key => return Some(idx),
                _ => {}
            }
        }
        None
    }

    pub fn get(&self, key: u64) -> Option<&V> {
        match &self.slots[self.find(key)?] {
            Slot::Live { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        let idx = self.find(key)?;
        match &mut self.slots[idx] {
            Slot::Live { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.find(key).is_some()
    }

    /// Inserts or overwrites `key`, returning the previous value.
    ///
    /// The probe run is scanned up to the first empty slot so a live copy of
    /// `key` behind a tombstone is overwritten rather than duplicated; a new
    /// entry then takes the first tombstone seen, or the empty slot.
    pub fn insert(&mut self, key: u64, value: V) -> Result<Option<V>> {
        let cap = self.capacity();
        let home = self.params.home(key, cap);
        let mut first_tombstone = None;
        let mut first_empty = None;
        for probe in 0..cap {
            let idx = self.slot_at(home, probe);
            match &mut self.slots[idx] {
                Slot::Empty => {
                    first_empty = Some(idx);
                    break;
                }
                Slot::Tombstone => {
                    first_tombstone.get_or_insert(idx);
                }
                Slot::Live { key: k, value: v } if *k == key => {
                    return Ok(Some(std::mem::replace(v, value)));
                }
                Slot::Live { .. } => {}
            }
        }

        let idx = first_tombstone
            .or(first_empty)
            .ok_or(VebError::CapacityExhausted { capacity: cap })?;
        self.slots[idx] = Slot::Live { key, value };
        self.len += 1;
        self.check_resize()?;
        Ok(None)
    }

    /// Tombstones `key`, returning its value.
    pub fn remove(&mut self, key: u64) -> Result<Option<V>> {
        let Some(idx) = self.find(key) else {
            return Ok(None);
        };
        let old = std::mem::replace(&mut self.slots[idx], Slot::Tombstone);
        self.len -= 1;
        self.check_resize()?;
        Ok(match old {
            Slot::Live { value, .. } => Some(value),
            _ => None,
        })
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Live { key, value } => Some((*key, value)),
            _ => None,
        })
    }

    fn check_resize(&mut self) -> Result<()> {
        let cap = self.capacity();
        if self.len * 4 > cap * 3 {
            self.resize(cap * 2)
        } else if self.len * 4 < cap && cap > self.min_capacity {
            self.resize(cap / 2)
        } else {
            Ok(())
        }
    }

    fn resize(&mut self, new_capacity: usize) -> Result<()> {
        let old = std::mem::replace(&mut self.slots, empty_slots(new_capacity));
        trace!(
            "cluster map resize {} -> {} ({} live, {} tombstones dropped)",
            old.len(),
            new_capacity,
            self.len,
            old.iter().filter(|s| matches!(s, Slot::Tombstone)).count()
        );
        for slot in old {
            if let Slot::Live { key, value } = slot {
                self.place(key, value)?;
            }
        }
        Ok(())
    }

    /// Rehash path: the fresh table has no tombstones and no duplicate keys,
    /// so the first empty slot wins.
    fn place(&mut self, key: u64, value: V) -> Result<()> {
        let cap = self.capacity();
        let home = self.params.home(key, cap);
        for probe in 0..cap {
            let idx = self.slot_at(home, probe);
            if matches!(self.slots[idx], Slot::Empty) {
                self.slots[idx] = Slot::Live { key, value };
                return Ok(());
            }
        }
        Err(VebError::CapacityExhausted { capacity: cap })
    }

    #[cfg(test)]
    pub(crate) fn tombstone_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Tombstone))
            .count()
    }
}
