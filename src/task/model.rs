use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crate::backend::BackendId;
use crate::foundation::{
    color::{Color32, OPA_COVER, OPA_MIN},
    core::{Area, Point},
};
use crate::surface::buffer::Surface;

/// Score of a task nobody has bid on yet. Any real offer is lower.
pub const UNCLAIMED_SCORE: u32 = u32::MAX;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl TaskId {
    fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a task draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Solid (or gradient, rounded) rectangle.
    Fill,
    /// Image blit from a source surface.
    Image,
    /// Composite of a child layer's buffer.
    Layer,
}

/// Lifecycle of a task. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskState {
    /// Waiting for a backend.
    Queued = 0,
    /// Claimed by exactly one backend.
    InProgress = 1,
    /// Finished; the destination pixels are final and visible to the CPU.
    Ready = 2,
}

/// Atomic task state shared between the queue and the executing backend.
#[derive(Debug)]
pub struct TaskStateCell(AtomicU8);

impl TaskStateCell {
    fn new() -> Self {
        Self(AtomicU8::new(TaskState::Queued as u8))
    }

    /// Current state.
    pub fn load(&self) -> TaskState {
        match self.0.load(Ordering::Acquire) {
            0 => TaskState::Queued,
            1 => TaskState::InProgress,
            _ => TaskState::Ready,
        }
    }

    /// `Queued -> InProgress`; returns `false` if the task was not queued.
    pub fn try_claim(&self) -> bool {
        self.0
            .compare_exchange(
                TaskState::Queued as u8,
                TaskState::InProgress as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// `InProgress -> Ready`. Publishes the pixel writes of the executing backend.
    pub fn mark_ready(&self) {
        let prev = self.0.swap(TaskState::Ready as u8, Ordering::Release);
        assert_eq!(
            prev,
            TaskState::InProgress as u8,
            "task completed without being claimed"
        );
    }
}

/// Direction of a two-stop gradient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientDir {
    /// Left to right.
    Horizontal,
    /// Top to bottom.
    Vertical,
}

/// Two-stop linear gradient across the task area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Gradient {
    /// Colour at the start edge.
    pub start: Color32,
    /// Colour at the end edge.
    pub end: Color32,
    /// Direction.
    pub dir: GradientDir,
}

/// Fill parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillDsc {
    /// Fill colour.
    pub color: Color32,
    /// Global opacity.
    pub opa: u8,
    /// Corner radius in pixels.
    pub radius: u32,
    /// Optional gradient replacing `color`.
    pub gradient: Option<Gradient>,
}

impl FillDsc {
    /// Opaque, square, flat fill.
    pub fn solid(color: Color32) -> Self {
        Self {
            color,
            opa: OPA_COVER,
            radius: 0,
            gradient: None,
        }
    }
}

/// Rotation and scaling applied to an image around `pivot` (source pixel coordinates).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ImageTransform {
    /// Rotation in 0.1 degree units.
    pub rotation: i32,
    /// Horizontal zoom, 256 = 1.0.
    pub scale_x: u32,
    /// Vertical zoom, 256 = 1.0.
    pub scale_y: u32,
    /// Pivot point relative to the source image.
    pub pivot: Point,
}

impl ImageTransform {
    /// No rotation, unit scale.
    pub const IDENTITY: Self = Self {
        rotation: 0,
        scale_x: 256,
        scale_y: 256,
        pivot: Point::new(0, 0),
    };

    /// Return `true` when the transform leaves pixels in place.
    pub fn is_identity(&self) -> bool {
        self.rotation.rem_euclid(3600) == 0 && self.scale_x == 256 && self.scale_y == 256
    }
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Image blit parameters. Source pixel `(0, 0)` lands on the task area's origin.
#[derive(Clone, Debug)]
pub struct ImageDsc {
    /// Source pixels.
    pub src: Arc<Surface>,
    /// Global opacity.
    pub opa: u8,
    /// Recolour target.
    pub recolor: Color32,
    /// Recolour strength; at or below `OPA_MIN` no recolouring happens.
    pub recolor_opa: u8,
    /// Rotation and scaling.
    pub transform: ImageTransform,
}

impl ImageDsc {
    /// Plain opaque blit of `src`.
    pub fn new(src: Arc<Surface>) -> Self {
        Self {
            src,
            opa: OPA_COVER,
            recolor: Color32::BLACK,
            recolor_opa: 0,
            transform: ImageTransform::IDENTITY,
        }
    }

    /// Return `true` when recolouring changes pixels.
    pub fn has_recolor(&self) -> bool {
        self.recolor_opa > OPA_MIN
    }
}

/// Parameters of a task, shared read-only with the executing backend.
#[derive(Clone, Debug)]
pub enum DrawDescriptor {
    /// See [`FillDsc`].
    Fill(FillDsc),
    /// See [`ImageDsc`]; used by both image and layer tasks.
    Image(ImageDsc),
}

/// One unit of rendering work.
///
/// Areas are in screen coordinates. The score and preferred backend are only touched during
/// the single-threaded evaluation pass; the state is shared atomically with the backend that
/// claims the task.
#[derive(Debug)]
pub struct DrawTask {
    id: TaskId,
    kind: TaskKind,
    area: Area,
    clip: Area,
    descriptor: Arc<DrawDescriptor>,
    preference_score: u32,
    preferred_backend: BackendId,
    state: Arc<TaskStateCell>,
}

impl DrawTask {
    fn new(kind: TaskKind, area: Area, descriptor: DrawDescriptor) -> Self {
        Self {
            id: TaskId::next(),
            kind,
            area,
            clip: area,
            descriptor: Arc::new(descriptor),
            preference_score: UNCLAIMED_SCORE,
            preferred_backend: BackendId::NONE,
            state: Arc::new(TaskStateCell::new()),
        }
    }

    /// Fill task covering `area`.
    pub fn fill(area: Area, dsc: FillDsc) -> Self {
        Self::new(TaskKind::Fill, area, DrawDescriptor::Fill(dsc))
    }

    /// Image task drawing `dsc.src` with its origin at `area`'s origin.
    pub fn image(area: Area, dsc: ImageDsc) -> Self {
        Self::new(TaskKind::Image, area, DrawDescriptor::Image(dsc))
    }

    /// Layer composite; `dsc.src` is the child layer's buffer.
    pub fn layer(area: Area, dsc: ImageDsc) -> Self {
        Self::new(TaskKind::Layer, area, DrawDescriptor::Image(dsc))
    }

    /// Restrict drawing to `clip`.
    pub fn with_clip(mut self, clip: Area) -> Self {
        self.clip = clip;
        self
    }

    /// Identity.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Kind.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Nominal area.
    pub fn area(&self) -> Area {
        self.area
    }

    /// Clip area.
    pub fn clip(&self) -> Area {
        self.clip
    }

    /// `area ∩ clip`, `None` when nothing would be drawn.
    pub fn clipped_area(&self) -> Option<Area> {
        self.area.intersect(self.clip)
    }

    /// Draw parameters.
    pub fn descriptor(&self) -> &DrawDescriptor {
        &self.descriptor
    }

    pub(crate) fn shared_descriptor(&self) -> Arc<DrawDescriptor> {
        Arc::clone(&self.descriptor)
    }

    /// Best cost offered so far (lower is better).
    pub fn preference_score(&self) -> u32 {
        self.preference_score
    }

    /// Backend holding the best offer, [`BackendId::NONE`] until someone bids.
    pub fn preferred_backend(&self) -> BackendId {
        self.preferred_backend
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.state.load()
    }

    pub(crate) fn shared_state(&self) -> Arc<TaskStateCell> {
        Arc::clone(&self.state)
    }

    /// Record `backend`'s bid if it is strictly cheaper than the current best.
    pub fn offer(&mut self, backend: BackendId, cost: u32) -> bool {
        if cost < self.preference_score {
            self.preference_score = cost;
            self.preferred_backend = backend;
            true
        } else {
            false
        }
    }

    /// Forget all bids so the task can be re-evaluated.
    pub fn reset_preference(&mut self) {
        self.preference_score = UNCLAIMED_SCORE;
        self.preferred_backend = BackendId::NONE;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/task/model.rs"]
mod tests;
