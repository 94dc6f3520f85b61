use std::sync::Arc;

use crate::backend::BackendId;
use crate::foundation::{
    color::ColorFormat,
    core::Area,
    error::{DrawError, DrawResult},
};
use crate::surface::buffer::{MemoryPlacement, Surface, SurfaceDesc};
use crate::surface::pool::ScratchAllocator;
use crate::task::model::{DrawTask, TaskId, TaskState};

/// Destination properties a capability predicate may inspect before the layer buffer exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetInfo {
    /// Screen area the layer buffer covers.
    pub buf_area: Area,
    /// Pixel layout of the buffer.
    pub format: ColorFormat,
    /// Memory placement of the buffer.
    pub placement: MemoryPlacement,
    /// Row pitch in bytes.
    pub stride: u32,
}

/// An ordered list of draw tasks targeting one buffer.
///
/// The buffer is either supplied up front (a framebuffer) or allocated lazily through a
/// [`ScratchAllocator`] the first time a task is dispatched.
pub struct Layer {
    buf_area: Area,
    format: ColorFormat,
    placement: MemoryPlacement,
    buffer: Option<Arc<Surface>>,
    tasks: Vec<DrawTask>,
    paint_order_guard: bool,
}

impl Layer {
    /// Layer whose buffer is allocated on first dispatch.
    pub fn new(buf_area: Area, format: ColorFormat, placement: MemoryPlacement) -> DrawResult<Self> {
        if buf_area.is_empty() {
            return Err(DrawError::validation("layer buffer area must not be empty"));
        }
        Ok(Self {
            buf_area,
            format,
            placement,
            buffer: None,
            tasks: Vec::new(),
            paint_order_guard: true,
        })
    }

    /// Layer drawing into an existing surface whose top-left pixel sits at `buf_area`'s origin.
    pub fn with_buffer(buf_area: Area, buffer: Arc<Surface>) -> DrawResult<Self> {
        if buf_area.width() != buffer.width() || buf_area.height() != buffer.height() {
            return Err(DrawError::validation(format!(
                "layer area {}x{} does not match buffer {}x{}",
                buf_area.width(),
                buf_area.height(),
                buffer.width(),
                buffer.height()
            )));
        }
        Ok(Self {
            buf_area,
            format: buffer.format(),
            placement: buffer.placement(),
            buffer: Some(buffer),
            tasks: Vec::new(),
            paint_order_guard: true,
        })
    }

    /// Enable or disable the paint-order guard (on by default).
    ///
    /// With the guard on, a task is only handed out once every earlier, overlapping task is
    /// ready, so overlapping draws land in submission order.
    pub fn set_paint_order_guard(&mut self, on: bool) {
        self.paint_order_guard = on;
    }

    /// Append a task and return its id.
    pub fn push(&mut self, task: DrawTask) -> TaskId {
        let id = task.id();
        self.tasks.push(task);
        id
    }

    /// Tasks in submission order.
    pub fn tasks(&self) -> &[DrawTask] {
        &self.tasks
    }

    /// Mutable tasks, for the evaluation pass.
    pub fn tasks_mut(&mut self) -> &mut [DrawTask] {
        &mut self.tasks
    }

    /// Look a task up by id.
    pub fn task(&self, id: TaskId) -> Option<&DrawTask> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// Drop every task, e.g. between frames.
    pub fn clear_tasks(&mut self) {
        self.tasks.clear();
    }

    /// Screen area covered by the buffer.
    pub fn buf_area(&self) -> Area {
        self.buf_area
    }

    /// The buffer, if allocated.
    pub fn buffer(&self) -> Option<&Arc<Surface>> {
        self.buffer.as_ref()
    }

    /// Destination properties for capability predicates.
    pub fn target_info(&self) -> TargetInfo {
        let stride = match &self.buffer {
            Some(b) => b.stride(),
            None => self.desc().stride,
        };
        TargetInfo {
            buf_area: self.buf_area,
            format: self.format,
            placement: self.placement,
            stride,
        }
    }

    fn desc(&self) -> SurfaceDesc {
        SurfaceDesc::packed(
            self.buf_area.width(),
            self.buf_area.height(),
            self.format,
            self.placement,
        )
    }

    /// Return the buffer, allocating it from `alloc` if needed.
    pub fn ensure_buffer(&mut self, alloc: &dyn ScratchAllocator) -> DrawResult<Arc<Surface>> {
        if let Some(b) = &self.buffer {
            return Ok(Arc::clone(b));
        }
        let b = alloc.alloc(self.desc())?;
        tracing::debug!(
            width = b.width(),
            height = b.height(),
            format = ?b.format(),
            "allocated layer buffer"
        );
        self.buffer = Some(Arc::clone(&b));
        Ok(b)
    }

    /// Detach the buffer and hand it back to `alloc`.
    pub fn release_buffer(&mut self, alloc: &dyn ScratchAllocator) {
        if let Some(b) = self.buffer.take() {
            alloc.release(b);
        }
    }

    /// First queued task `preferred` may take.
    ///
    /// A task qualifies when its preferred backend is [`BackendId::NONE`] or `preferred`, it is
    /// not preferred by `exclude`, and (with the paint-order guard on) no earlier unfinished task
    /// overlaps it.
    pub fn next_available_task(
        &self,
        exclude: Option<BackendId>,
        preferred: BackendId,
    ) -> Option<&DrawTask> {
        for (i, t) in self.tasks.iter().enumerate() {
            if t.state() != TaskState::Queued {
                continue;
            }
            let owner = t.preferred_backend();
            if exclude.is_some_and(|ex| ex == owner) {
                continue;
            }
            if owner != BackendId::NONE && owner != preferred {
                continue;
            }
            if self.paint_order_guard && self.blocked_by_earlier(i) {
                continue;
            }
            return Some(t);
        }
        None
    }

    fn blocked_by_earlier(&self, idx: usize) -> bool {
        let area = self.tasks[idx].area();
        self.tasks[..idx]
            .iter()
            .any(|t| t.state() != TaskState::Ready && t.area().overlaps(area))
    }

    /// Tasks not yet ready.
    pub fn pending_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.state() != TaskState::Ready)
            .count()
    }

    /// Tasks currently executing.
    pub fn in_flight_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.state() == TaskState::InProgress)
            .count()
    }

    /// Return `true` when every task is ready.
    pub fn is_complete(&self) -> bool {
        self.pending_count() == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/task/queue.rs"]
mod tests;
