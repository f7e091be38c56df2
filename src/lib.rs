// slabkit - Rust Implementation
// Bit vectors, a fixed-size slab pool and a pool-backed chained hash set

#![warn(rust_2018_idioms)]

pub mod bitvec;
pub mod hash;
pub mod hash_set;
pub mod settings;
pub mod slab;

// Re-exports for convenience
pub use bitvec::BitVector;
pub use hash::Hashable;
pub use hash_set::{ChainedHashSet, HashSetConfig, NodePool, SlabBackend, SystemBackend};
pub use settings::Settings;
pub use slab::{BlockMemory, FixedSlabPool, PoolConfig, PoolStats};

/// slabkit error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Format error: {0}")]
        Format(String),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
