//! accel-draw dispatches 2D draw tasks across a software rasterizer and DMA-capable hardware
//! accelerators.
//!
//! - Build a [`BackendRegistry`] (by hand or from a [`BoardConfig`])
//! - Start a [`Dispatcher`]
//! - Push [`DrawTask`]s into a [`Layer`] and call [`Dispatcher::render_layer`], or drive
//!   [`Dispatcher::evaluate_layer`] and [`Dispatcher::dispatch`] from your own render loop
//!
//! Every backend bids on every task; the cheapest bid wins and ties go to the backend registered
//! first. The software backend accepts everything, so no task is ever left without an owner.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod backend;
pub(crate) mod cache;
pub(crate) mod dispatch;
pub(crate) mod engine;
pub(crate) mod surface;
pub(crate) mod task;

pub use crate::foundation::color::{
    Color32, ColorFormat, OPA_COVER, OPA_MAX, OPA_MIN, OPA_TRANSP, blend_pixel, decode_pixel,
    encode_pixel,
};
pub use crate::foundation::core::{Area, Point};
pub use crate::foundation::error::{DrawError, DrawResult};

pub use crate::surface::buffer::{MemoryPlacement, Surface, SurfaceDesc, SurfaceId};
pub use crate::surface::pool::{BufferPool, BufferPoolOpts, BufferPoolStats, ScratchAllocator};

pub use crate::task::model::{
    DrawDescriptor, DrawTask, FillDsc, Gradient, GradientDir, ImageDsc, ImageTransform, TaskId,
    TaskKind, TaskState, UNCLAIMED_SCORE,
};
pub use crate::task::queue::{Layer, TargetInfo};

pub use crate::cache::hook::{
    CacheEvent, CacheMaintenance, CacheOp, CoherencyHook, NoopCache, RecordingCache,
};
pub use crate::cache::regions::CacheRegion;

pub use crate::engine::bitblt::{Bitblt, BitbltRegs};
pub use crate::engine::gdma::{Gdma, GdmaRegs, TransferSize, TransferType};
pub use crate::engine::ge2d::{Ge2d, Ge2dRegs};
pub use crate::engine::{BlitSupport, Engine, EngineCaps, EngineFault, EngineKind, EngineStatus, HwOp};

pub use crate::backend::accel::{AcceleratorBackend, create_accelerator, default_caps};
pub use crate::backend::capability::{Rejection, check as check_capability};
pub use crate::backend::geometry::BlitGeometry;
pub use crate::backend::software::{SOFTWARE_COST, SoftwareBackend};
pub use crate::backend::wait::{HwWait, SPIN_WAIT_MAX_PIXELS, WaitError};
pub use crate::backend::worker::WorkerState;
pub use crate::backend::{BackendId, ClaimedTask, DispatchOutcome, DrawBackend};

pub use crate::dispatch::dispatcher::{BackendStats, Dispatcher, FrameStats};
pub use crate::dispatch::opts::{AcceleratorSpec, BoardConfig, DispatchOpts, SoftwareOpts};
pub use crate::dispatch::registry::BackendRegistry;
pub use crate::dispatch::signal::DispatchSignal;
