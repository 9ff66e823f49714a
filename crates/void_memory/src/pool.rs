//! Object pool - recycled capability tables
//!
//! Every [`SharedPtr`] owns an attachment table. Objects obtained from an
//! [`ObjectPool`] return that table to the pool when their last handle is
//! dropped, and the next object obtained from the pool reuses it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_queue::ArrayQueue;
use void_object::{AttachmentTable, Recycler, SharedPtr};

/// Initial capacity of a freshly allocated table
const TABLE_CAPACITY: usize = 4;

struct PoolShared {
    /// Head of free list
    free: ArrayQueue<AttachmentTable>,
    /// Tables allocated because the free list was empty
    created: AtomicUsize,
    /// Tables taken from the free list
    reused: AtomicUsize,
    /// Tables returned to the free list
    recycled: AtomicUsize,
    /// Tables dropped because the free list was full
    discarded: AtomicUsize,
}

impl Recycler for PoolShared {
    fn recycle(&self, mut table: AttachmentTable) {
        table.clear();
        match self.free.push(table) {
            Ok(()) => {
                self.recycled.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Pool handing out [`SharedPtr`]s with recycled capability storage
///
/// Cloning the pool shares the free list. Objects may outlive the pool;
/// their tables are then simply dropped.
#[derive(Clone)]
pub struct ObjectPool {
    shared: Arc<PoolShared>,
}

impl ObjectPool {
    /// Create a pool keeping at most `capacity` free tables
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: ArrayQueue::new(capacity.max(1)),
                created: AtomicUsize::new(0),
                reused: AtomicUsize::new(0),
                recycled: AtomicUsize::new(0),
                discarded: AtomicUsize::new(0),
            }),
        }
    }

    /// Fill the free list with up to `count` empty tables
    pub fn prefill(&self, count: usize) {
        for _ in 0..count {
            if self.shared.free.push(AttachmentTable::with_capacity(TABLE_CAPACITY)).is_err() {
                break;
            }
        }
        log::debug!("Object pool prefilled, {} tables free", self.shared.free.len());
    }

    /// Obtain a default-constructed object
    pub fn obtain<T>(&self) -> SharedPtr<T>
    where
        T: Default + Send + Sync + 'static,
    {
        self.obtain_with(T::default())
    }

    /// Obtain an object wrapping `value`
    pub fn obtain_with<T>(&self, value: T) -> SharedPtr<T>
    where
        T: Send + Sync + 'static,
    {
        let table = match self.shared.free.pop() {
            Some(table) => {
                self.shared.reused.fetch_add(1, Ordering::Relaxed);
                table
            }
            None => {
                self.shared.created.fetch_add(1, Ordering::Relaxed);
                AttachmentTable::with_capacity(TABLE_CAPACITY)
            }
        };
        let weak = Arc::downgrade(&self.shared);
        let recycler: Weak<dyn Recycler> = weak;
        SharedPtr::new_recycled(value, table, recycler)
    }

    /// Maximum number of free tables kept
    pub fn capacity(&self) -> usize {
        self.shared.free.capacity()
    }

    /// Get statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.shared.free.capacity(),
            free: self.shared.free.len(),
            created: self.shared.created.load(Ordering::Relaxed),
            reused: self.shared.reused.load(Ordering::Relaxed),
            recycled: self.shared.recycled.load(Ordering::Relaxed),
            discarded: self.shared.discarded.load(Ordering::Relaxed),
        }
    }
}

impl Default for ObjectPool {
    fn default() -> Self {
        Self::with_capacity(256)
    }
}

/// Pool statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub free: usize,
    pub created: usize,
    pub reused: usize,
    pub recycled: usize,
    pub discarded: usize,
}
