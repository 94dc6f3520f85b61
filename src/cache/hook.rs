use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::regions::{CacheRegion, scanline_regions};
use crate::foundation::{
    core::Area,
    error::{DrawError, DrawResult},
};
use crate::surface::buffer::{Surface, SurfaceId};

/// Data-cache maintenance primitives of the host CPU.
pub trait CacheMaintenance: Send + Sync {
    /// Write dirty lines back to memory.
    fn clean(&self, surface: SurfaceId, region: CacheRegion);

    /// Write dirty lines back and drop them.
    fn clean_invalidate(&self, surface: SurfaceId, region: CacheRegion);

    /// Drop lines without writing them back.
    fn invalidate(&self, surface: SurfaceId, region: CacheRegion);
}

/// Maintenance for cache-coherent memory: every operation is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl CacheMaintenance for NoopCache {
    fn clean(&self, _surface: SurfaceId, _region: CacheRegion) {}
    fn clean_invalidate(&self, _surface: SurfaceId, _region: CacheRegion) {}
    fn invalidate(&self, _surface: SurfaceId, _region: CacheRegion) {}
}

/// Maintenance operation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheOp {
    /// See [`CacheMaintenance::clean`].
    Clean,
    /// See [`CacheMaintenance::clean_invalidate`].
    CleanInvalidate,
    /// See [`CacheMaintenance::invalidate`].
    Invalidate,
}

/// One entry of a [`RecordingCache`] log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    /// A maintenance operation.
    Op {
        /// Operation.
        op: CacheOp,
        /// Surface it applied to.
        surface: SurfaceId,
        /// Byte range.
        region: CacheRegion,
    },
    /// A marker recorded by the caller, e.g. around engine starts.
    Note(&'static str),
}

/// Maintenance implementation that only logs what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingCache {
    events: Mutex<Vec<CacheEvent>>,
}

impl RecordingCache {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a marker to the log.
    pub fn note(&self, label: &'static str) {
        self.events.lock().push(CacheEvent::Note(label));
    }

    /// Copy of the log.
    pub fn events(&self) -> Vec<CacheEvent> {
        self.events.lock().clone()
    }

    /// Drain the log.
    pub fn take_events(&self) -> Vec<CacheEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push(&self, op: CacheOp, surface: SurfaceId, region: CacheRegion) {
        self.events.lock().push(CacheEvent::Op {
            op,
            surface,
            region,
        });
    }
}

impl CacheMaintenance for RecordingCache {
    fn clean(&self, surface: SurfaceId, region: CacheRegion) {
        self.push(CacheOp::Clean, surface, region);
    }

    fn clean_invalidate(&self, surface: SurfaceId, region: CacheRegion) {
        self.push(CacheOp::CleanInvalidate, surface, region);
    }

    fn invalidate(&self, surface: SurfaceId, region: CacheRegion) {
        self.push(CacheOp::Invalidate, surface, region);
    }
}

/// Cache maintenance around accelerator memory accesses.
///
/// Areas are buffer-relative. Surfaces that are not DMA-visible are never touched by an engine
/// and are skipped.
#[derive(Clone)]
pub struct CoherencyHook {
    ops: Arc<dyn CacheMaintenance>,
    line_size: usize,
}

impl std::fmt::Debug for CoherencyHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoherencyHook")
            .field("line_size", &self.line_size)
            .finish_non_exhaustive()
    }
}

impl CoherencyHook {
    /// Hook issuing `ops` with a cache line of `line_size` bytes (a power of two).
    pub fn new(ops: Arc<dyn CacheMaintenance>, line_size: usize) -> DrawResult<Self> {
        if line_size == 0 || !line_size.is_power_of_two() {
            return Err(DrawError::config(format!(
                "cache line size must be a power of two, got {line_size}"
            )));
        }
        Ok(Self { ops, line_size })
    }

    /// Hook for coherent memory.
    pub fn coherent() -> Self {
        Self {
            ops: Arc::new(NoopCache),
            line_size: 32,
        }
    }

    /// Cache line size in bytes.
    pub fn line_size(&self) -> usize {
        self.line_size
    }

    /// Make CPU writes to `area` visible before an engine reads it.
    pub fn before_device_read(&self, surface: &Surface, area: Area) {
        self.apply(surface, area, CacheOp::Clean);
    }

    /// Flush and drop lines of `area` before an engine writes it, so no later eviction of a
    /// dirty line clobbers device output.
    pub fn before_device_write(&self, surface: &Surface, area: Area) {
        self.apply(surface, area, CacheOp::CleanInvalidate);
    }

    /// Drop stale lines of `area` after an engine wrote it.
    pub fn after_device_write(&self, surface: &Surface, area: Area) {
        self.apply(surface, area, CacheOp::Invalidate);
    }

    fn apply(&self, surface: &Surface, area: Area, op: CacheOp) {
        if !surface.is_dma_visible() {
            return;
        }
        let regions = scanline_regions(surface, area, self.line_size);
        tracing::trace!(surface = surface.id().0, ?op, regions = regions.len(), "cache maintenance");
        for region in regions {
            match op {
                CacheOp::Clean => self.ops.clean(surface.id(), region),
                CacheOp::CleanInvalidate => self.ops.clean_invalidate(surface.id(), region),
                CacheOp::Invalidate => self.ops.invalidate(surface.id(), region),
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/hook.rs"]
mod tests;
