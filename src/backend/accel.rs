use std::sync::Arc;
use std::time::Duration;

use crate::backend::{
    ClaimedTask, DrawBackend, capability, geometry::BlitGeometry, wait::HwWait,
};
use crate::cache::hook::CoherencyHook;
use crate::engine::{
    Engine, EngineCaps, EngineKind, HwOp, bitblt::Bitblt, gdma::Gdma, ge2d::Ge2d,
};
use crate::foundation::color::{OPA_COVER, OPA_MAX, OPA_MIN};
use crate::task::model::{DrawDescriptor, DrawTask};
use crate::task::queue::TargetInfo;

/// Backend driving one hardware engine.
///
/// Execution clips the task, keeps caches coherent around the device access, starts the
/// engine and waits for it with a bounded timeout. A task this backend accepted must complete:
/// refusal, fault or timeout panics.
pub struct AcceleratorBackend<E: Engine> {
    name: String,
    engine: E,
    hook: CoherencyHook,
    wait: HwWait,
}

impl<E: Engine> AcceleratorBackend<E> {
    /// Wrap `engine`.
    pub fn new(engine: E, hook: CoherencyHook, wait: HwWait) -> Self {
        Self {
            name: engine.kind().name().to_owned(),
            engine,
            hook,
            wait,
        }
    }

    /// Override the backend name (defaults to the engine family).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn run(&self, op: &HwOp<'_>) {
        if let Err(fault) = self.engine.start(op) {
            panic!("{}: engine refused an accepted task: {fault}", self.name);
        }
        if let Err(err) = self.wait.wait(&self.engine, op.pixels()) {
            panic!("{}: {err}", self.name);
        }
    }
}

impl<E: Engine> DrawBackend for AcceleratorBackend<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, task: &DrawTask, target: &TargetInfo) -> Option<u32> {
        match capability::check(self.engine.caps(), task, target) {
            Ok(cost) => Some(cost),
            Err(reason) => {
                tracing::trace!(backend = %self.name, task = task.id().0, ?reason, "declined");
                None
            }
        }
    }

    fn execute(&self, task: &ClaimedTask) {
        let dst = &task.target;
        match &*task.descriptor {
            DrawDescriptor::Fill(fill) => {
                let Some(g) = BlitGeometry::fill(task.area, task.clip, task.buf_area) else {
                    return;
                };
                self.hook.before_device_write(dst, g.dst);
                self.run(&HwOp::Fill {
                    dst,
                    area: g.dst,
                    color: fill.color.with_alpha(OPA_COVER),
                });
                self.hook.after_device_write(dst, g.dst);
            }
            DrawDescriptor::Image(img) => {
                if img.opa <= OPA_MIN {
                    return;
                }
                let Some(g) =
                    BlitGeometry::blit(task.area, task.clip, task.buf_area, img.src.bounds())
                else {
                    return;
                };
                let Some(src_area) = g.src else {
                    return;
                };
                self.hook.before_device_read(&img.src, src_area);
                self.hook.before_device_write(dst, g.dst);
                self.run(&HwOp::Blit {
                    src: &img.src,
                    src_area,
                    dst,
                    dst_pos: g.dst.origin(),
                    opa: if img.opa >= OPA_MAX { OPA_COVER } else { img.opa },
                });
                self.hook.after_device_write(dst, g.dst);
            }
        }
        tracing::debug!(backend = %self.name, task = task.id.0, "hardware task complete");
    }

    fn caps(&self) -> Option<&EngineCaps> {
        Some(self.engine.caps())
    }
}

/// Build the accelerator backend for `kind`.
pub fn create_accelerator(
    kind: EngineKind,
    caps: EngineCaps,
    latency: Duration,
    hook: CoherencyHook,
    wait: HwWait,
) -> Arc<dyn DrawBackend> {
    match kind {
        EngineKind::Ge2d => Arc::new(AcceleratorBackend::new(Ge2d::new(caps, latency), hook, wait)),
        EngineKind::Bitblt => {
            Arc::new(AcceleratorBackend::new(Bitblt::new(caps, latency), hook, wait))
        }
        EngineKind::Gdma => Arc::new(AcceleratorBackend::new(Gdma::new(caps, latency), hook, wait)),
    }
}

/// Default capabilities of `kind`.
pub fn default_caps(kind: EngineKind) -> EngineCaps {
    match kind {
        EngineKind::Ge2d => Ge2d::default_caps(),
        EngineKind::Bitblt => Bitblt::default_caps(),
        EngineKind::Gdma => Gdma::default_caps(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/accel.rs"]
mod tests;
