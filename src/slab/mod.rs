//! Fixed-Size Slab Pool
//!
//! Hands out memory slots of a single size carved from large blocks.
//! Each block tracks its occupied slots with a [`BitVector`](crate::BitVector).
//!
//! # Architecture
//!
//! ```text
//! FixedSlabPool (item_size = 16)
//!   ├─→ Block 0 (most free)  [1 0 0 0 1 0 0 0]  free=6  first_free=1
//!   ├─→ Block 1              [1 1 0 1]          free=1  first_free=2
//!   └─→ Block 2 (donated)    [1 1 1 1 1 1]      free=0  first_free=6 (stale)
//! ```
//!
//! Allocation takes the first free slot of block 0. When block 0 is full the
//! blocks are re-sorted by free count; when even the best block is below the
//! minimum free threshold a new block is requested from the environment and
//! the growth target is scaled for next time.
//!
//! Freeing finds the owning block by address range and clears its bit. Memory
//! goes back to the environment only through `release_all` or drop.

pub mod block;
pub mod config;
pub mod memory;
pub mod pool;

pub use block::{BlockOrigin, BlockRecord};
pub use config::PoolConfig;
pub use memory::BlockMemory;
pub use pool::{BlockStats, FixedSlabPool, PoolStats};
