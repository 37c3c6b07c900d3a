use thiserror::Error;

/// Errors reported by [`VebSet`](crate::VebSet) and [`ClusterMap`](crate::ClusterMap).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VebError {
    /// The value lies outside `[0, universe)`. Nothing was mutated.
    #[error("value {value} is outside the universe [0, {universe})")]
    InvalidValue { value: u64, universe: u64 },

    /// The universe size is not a power of two in `2..=2^63`.
    #[error("universe size {0} must be a power of two between 2 and 2^63")]
    InvalidUniverse(u64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Every probe position of a cluster map was taken. The resize policy keeps
    /// the load factor at or below 0.75, so this indicates a broken invariant.
    #[error("cluster map probed all {capacity} slots without finding a free one")]
    CapacityExhausted { capacity: usize },
}

pub type Result<T> = std::result::Result<T, VebError>;
