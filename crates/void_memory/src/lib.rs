//! # void_memory - Object Pools
//!
//! Pools for objects handed out as [`SharedPtr`](void_object::SharedPtr):
//! - [`ObjectPool`]: recycles the per-object capability table storage
//!   through a lock-free free list, so hot spawn/despawn paths stop
//!   allocating once the pool is warm
//!
//! A recycled table is always cleared before it is handed to the next
//! object; nothing attached to a previous tenant survives.

pub mod pool;

pub use pool::{ObjectPool, PoolStats};

pub mod prelude {
    pub use crate::{ObjectPool, PoolStats};
}
