//! Execution backends: the software rasterizer and the accelerator adapter.

use std::sync::Arc;

use crate::engine::EngineCaps;
use crate::foundation::core::Area;
use crate::surface::buffer::Surface;
use crate::task::model::{DrawDescriptor, DrawTask, TaskId, TaskKind, TaskStateCell};
use crate::task::queue::TargetInfo;

pub(crate) mod accel;
pub(crate) mod capability;
pub(crate) mod geometry;
pub(crate) mod runner;
pub(crate) mod software;
pub(crate) mod wait;
pub(crate) mod worker;

/// Registry-assigned backend identity. `NONE` means "no backend".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(pub u16);

impl BackendId {
    /// No backend; the preferred backend of a task nobody has bid on.
    pub const NONE: Self = Self(0);
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of one dispatch attempt for one backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DispatchOutcome {
    /// The backend already has a task in flight.
    Busy = 0,
    /// A task was claimed and submitted.
    Taken = 1,
    /// Nothing eligible (or the destination buffer could not be allocated yet).
    NoTask = -1,
}

impl DispatchOutcome {
    /// Integer code: `0` busy, `1` taken, `-1` no task.
    pub const fn as_code(self) -> i32 {
        self as i32
    }
}

/// A task claimed by one backend, carrying everything the executor needs.
///
/// This is the only task representation that crosses into worker threads.
#[derive(Debug)]
pub struct ClaimedTask {
    /// Task identity.
    pub id: TaskId,
    /// Task kind.
    pub kind: TaskKind,
    /// Nominal area (screen coordinates).
    pub area: Area,
    /// Clip area (screen coordinates).
    pub clip: Area,
    /// Draw parameters.
    pub descriptor: Arc<DrawDescriptor>,
    /// Destination buffer.
    pub target: Arc<Surface>,
    /// Screen area covered by `target`.
    pub buf_area: Area,
    state: Arc<TaskStateCell>,
}

impl ClaimedTask {
    /// Move `task` from queued to in progress. Returns `None` if it was not queued.
    pub(crate) fn claim(task: &DrawTask, target: Arc<Surface>, buf_area: Area) -> Option<Self> {
        let state = task.shared_state();
        if !state.try_claim() {
            return None;
        }
        Some(Self {
            id: task.id(),
            kind: task.kind(),
            area: task.area(),
            clip: task.clip(),
            descriptor: task.shared_descriptor(),
            target,
            buf_area,
            state,
        })
    }

    /// Screen-space pixels the task may touch: `area ∩ clip ∩ buf_area`.
    pub fn draw_area(&self) -> Option<Area> {
        self.area.intersect(self.clip)?.intersect(self.buf_area)
    }

    /// Mark the task ready.
    pub(crate) fn complete(self) {
        self.state.mark_ready();
    }
}

/// A draw backend: capability predicate plus executor.
///
/// `evaluate` is pure and runs on the renderer thread during the evaluation pass. `execute` runs
/// on the renderer thread (inline) or on the backend's worker thread, one task at a time.
pub trait DrawBackend: Send + Sync {
    /// Short name used in logs and worker thread names.
    fn name(&self) -> &str;

    /// Cost of executing `task` against `target`, `None` when the backend cannot do it.
    fn evaluate(&self, task: &DrawTask, target: &TargetInfo) -> Option<u32>;

    /// Perform the draw. Panics if a task this backend accepted cannot be completed.
    fn execute(&self, task: &ClaimedTask);

    /// Return `true` for the universal software fallback.
    fn is_software(&self) -> bool {
        false
    }

    /// Accelerator capabilities, if any.
    fn caps(&self) -> Option<&EngineCaps> {
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/mod.rs"]
mod tests;
