use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::foundation::error::{DrawError, DrawResult};
use crate::surface::buffer::{Surface, SurfaceDesc};

/// Source of layer and scratch buffers for the dispatcher.
///
/// Allocation may fail with [`DrawError::OutOfMemory`]; the dispatcher treats that as "defer the
/// task", never as a dropped task.
pub trait ScratchAllocator: Send + Sync {
    /// Allocate a zeroed surface matching `desc`.
    fn alloc(&self, desc: SurfaceDesc) -> DrawResult<Arc<Surface>>;

    /// Return a surface obtained from [`ScratchAllocator::alloc`].
    fn release(&self, surface: Arc<Surface>);
}

/// Pool configuration for scratch buffers.
#[derive(Debug, Clone, Copy)]
pub struct BufferPoolOpts {
    /// Maximum bytes handed out and not yet released. Exceeding it reports out-of-memory.
    pub max_live_bytes: usize,
    /// Maximum bytes retained for reuse across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained buffers per `(w, h, format, placement)` bucket.
    pub max_buffers_per_bucket: usize,
}

impl Default for BufferPoolOpts {
    fn default() -> Self {
        Self {
            max_live_bytes: 64 * 1024 * 1024,
            max_pool_bytes: 16 * 1024 * 1024,
            max_buffers_per_bucket: 4,
        }
    }
}

/// Counters exposed for tests and the CLI summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Bytes currently handed out.
    pub live_bytes: usize,
    /// Buffers retained for reuse.
    pub retained_buffers: usize,
    /// Bytes retained for reuse.
    pub retained_bytes: usize,
    /// Fresh allocations performed.
    pub alloc_buffers: u64,
    /// Allocations refused because of the live-byte budget.
    pub refused: u64,
    /// Released buffers that were not retained.
    pub dropped_on_release: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BufferKey(SurfaceDesc);

impl BufferKey {
    fn byte_len(self) -> usize {
        self.0.byte_len()
    }
}

#[derive(Default)]
struct PoolState {
    stats: BufferPoolStats,
    // Op-level lookup, not per pixel.
    bucket_idx_by_key: HashMap<BufferKey, usize>,
    buckets: Vec<Vec<Vec<u8>>>,
}

/// Budgeted, bucketed allocator for layer buffers.
pub struct BufferPool {
    opts: BufferPoolOpts,
    state: Mutex<PoolState>,
}

impl BufferPool {
    /// Create an empty pool.
    pub fn new(opts: BufferPoolOpts) -> Self {
        Self {
            opts,
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> BufferPoolStats {
        self.state.lock().stats.clone()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(BufferPoolOpts::default())
    }
}

impl ScratchAllocator for BufferPool {
    fn alloc(&self, desc: SurfaceDesc) -> DrawResult<Arc<Surface>> {
        desc.validate()?;
        let key = BufferKey(desc);
        let bytes = key.byte_len();

        let mut st = self.state.lock();
        if st.stats.live_bytes.saturating_add(bytes) > self.opts.max_live_bytes {
            st.stats.refused = st.stats.refused.saturating_add(1);
            return Err(DrawError::out_of_memory(format!(
                "{bytes} byte buffer exceeds budget ({} of {} bytes live)",
                st.stats.live_bytes, self.opts.max_live_bytes
            )));
        }
        st.stats.live_bytes += bytes;

        let reused = match st.bucket_idx_by_key.get(&key).copied() {
            Some(bi) => st.buckets[bi].pop(),
            None => None,
        };
        let storage = match reused {
            Some(mut storage) => {
                st.stats.retained_buffers = st.stats.retained_buffers.saturating_sub(1);
                st.stats.retained_bytes = st.stats.retained_bytes.saturating_sub(bytes);
                storage.fill(0);
                storage
            }
            None => {
                st.stats.alloc_buffers = st.stats.alloc_buffers.saturating_add(1);
                vec![0; bytes]
            }
        };
        drop(st);

        Ok(Arc::new(Surface::from_storage(desc, storage)))
    }

    fn release(&self, surface: Arc<Surface>) {
        let key = BufferKey(surface.desc());
        let bytes = key.byte_len();

        let mut st = self.state.lock();
        st.stats.live_bytes = st.stats.live_bytes.saturating_sub(bytes);

        let Ok(surface) = Arc::try_unwrap(surface) else {
            st.stats.dropped_on_release = st.stats.dropped_on_release.saturating_add(1);
            return;
        };
        if self.opts.max_pool_bytes == 0
            || self.opts.max_buffers_per_bucket == 0
            || st.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes
        {
            st.stats.dropped_on_release = st.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bi = match st.bucket_idx_by_key.get(&key).copied() {
            Some(i) => i,
            None => {
                let i = st.buckets.len();
                st.buckets.push(Vec::new());
                st.bucket_idx_by_key.insert(key, i);
                i
            }
        };
        if st.buckets[bi].len() >= self.opts.max_buffers_per_bucket {
            st.stats.dropped_on_release = st.stats.dropped_on_release.saturating_add(1);
            return;
        }

        st.buckets[bi].push(surface.into_storage());
        st.stats.retained_buffers += 1;
        st.stats.retained_bytes += bytes;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/pool.rs"]
mod tests;
