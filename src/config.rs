//! Construction-time settings for [`VebSet`](crate::VebSet).

use crate::error::{Result, VebError};

/// Default starting capacity of every cluster map.
pub const DEFAULT_INITIAL_CAPACITY: usize = 4;

/// Default seed for the hash coefficient generator.
pub const DEFAULT_SEED: u64 = 0x7665_625f_7365_6564;

/// Configuration for a [`VebSet`](crate::VebSet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Starting capacity of each cluster map. Maps never shrink below it.
    /// Must be a power of two, at least 4.
    pub initial_capacity: usize,
    /// Seed for the `StdRng` that draws the `(a, b)` hash coefficients of
    /// every cluster map the set allocates.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            seed: DEFAULT_SEED,
        }
    }
}

impl Config {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.initial_capacity < DEFAULT_INITIAL_CAPACITY
            || !self.initial_capacity.is_power_of_two()
        {
            return Err(VebError::InvalidConfig(
                "initial_capacity must be a power of two no smaller than 4",
            ));
        }
        Ok(())
    }
}
