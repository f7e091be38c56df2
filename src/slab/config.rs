//! Pool configuration

use super::memory::BlockMemory;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`FixedSlabPool`](super::FixedSlabPool)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Requested item size in bytes (rounded up to `alignment`)
    pub item_size: usize,
    /// Item alignment; 0 derives it from the item size
    pub alignment: usize,
    /// Slot count of the next block requested from the environment
    pub next_block_items: usize,
    /// Multiplier applied to `next_block_items` after each growth
    pub growth_factor: f64,
    /// Grow when the best block has fewer free slots than this
    pub min_free: usize,
    /// Advisory: donors should not hand over regions smaller than this (bytes)
    pub min_donation_size: usize,
    /// Total bytes the environment will provide before refusing
    pub memory_limit: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            item_size: 8,
            alignment: 0,
            next_block_items: 1024,
            growth_factor: 2.0,
            min_free: 1,
            min_donation_size: 0,
            memory_limit: None,
        }
    }
}

impl PoolConfig {
    /// Configuration for items of `item_size` bytes with default growth
    pub fn for_items(item_size: usize) -> Self {
        Self {
            item_size,
            ..Self::default()
        }
    }

    /// Check the values a pool cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.next_block_items == 0 {
            return Err(Error::InvalidArgument(
                "next_block_items must be at least 1".to_string(),
            ));
        }
        if self.growth_factor.is_nan() || self.growth_factor < 1.0 {
            return Err(Error::InvalidArgument(format!(
                "growth_factor must be >= 1.0, got {}",
                self.growth_factor
            )));
        }
        Ok(())
    }
}

/// Resolve the effective alignment for an item size.
///
/// Zero picks `min(size, 8)`. The result is a power of two between 1 and
/// [`BlockMemory::ALIGNMENT`].
pub fn effective_alignment(size: usize, alignment: usize) -> usize {
    let requested = if alignment == 0 { size.min(8) } else { alignment };
    requested
        .clamp(1, BlockMemory::ALIGNMENT)
        .next_power_of_two()
}

/// Round `size` up to a multiple of `alignment` (a power of two), minimum one unit
pub fn aligned_size(size: usize, alignment: usize) -> usize {
    let mask = alignment - 1;
    (size.max(1) + mask) & !mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_alignment() {
        assert_eq!(effective_alignment(4, 0), 4);
        assert_eq!(effective_alignment(3, 0), 4);
        assert_eq!(effective_alignment(24, 0), 8);
        assert_eq!(effective_alignment(0, 0), 1);
        assert_eq!(effective_alignment(16, 5), 8);
        assert_eq!(effective_alignment(16, 64), 32);
    }

    #[test]
    fn test_aligned_size() {
        assert_eq!(aligned_size(4, 4), 4);
        assert_eq!(aligned_size(5, 4), 8);
        assert_eq!(aligned_size(24, 16), 32);
        assert_eq!(aligned_size(0, 8), 8);
    }

    #[test]
    fn test_validate() {
        assert!(PoolConfig::default().validate().is_ok());

        let config = PoolConfig {
            growth_factor: 0.5,
            ..PoolConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        let config = PoolConfig {
            next_block_items: 0,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
