use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::cache::hook::{CacheEvent, CacheOp, RecordingCache};
use crate::engine::{EngineFault, EngineStatus};
use crate::foundation::{
    color::{Color32, ColorFormat},
    core::Area,
};
use crate::surface::buffer::{MemoryPlacement, Surface};
use crate::task::model::{FillDsc, ImageDsc};

/// Engine wrapper that drops a marker into the cache log when started.
struct Noting<E> {
    inner: E,
    log: Arc<RecordingCache>,
}

impl<E: Engine> Engine for Noting<E> {
    fn kind(&self) -> EngineKind {
        self.inner.kind()
    }

    fn caps(&self) -> &EngineCaps {
        self.inner.caps()
    }

    fn start(&self, op: &HwOp<'_>) -> Result<(), EngineFault> {
        self.log.note("start");
        self.inner.start(op)
    }

    fn poll(&self) -> EngineStatus {
        self.inner.poll()
    }
}

fn noting<E: Engine>(inner: E) -> (AcceleratorBackend<Noting<E>>, Arc<RecordingCache>) {
    let log = Arc::new(RecordingCache::new());
    let hook = CoherencyHook::new(log.clone(), 32).unwrap();
    let engine = Noting {
        inner,
        log: Arc::clone(&log),
    };
    let backend = AcceleratorBackend::new(engine, hook, HwWait::new(Duration::from_secs(1)));
    (backend, log)
}

fn dma_target(w: u32, h: u32, format: ColorFormat) -> Arc<Surface> {
    Arc::new(Surface::new(w, h, format, MemoryPlacement::Dma).unwrap())
}

fn execute(backend: &dyn DrawBackend, task: &DrawTask, target: &Arc<Surface>) {
    let claimed = ClaimedTask::claim(task, Arc::clone(target), target.bounds()).unwrap();
    backend.execute(&claimed);
    claimed.complete();
}

fn ops(events: &[CacheEvent]) -> Vec<Option<CacheOp>> {
    let mut out: Vec<Option<CacheOp>> = events
        .iter()
        .map(|e| match e {
            CacheEvent::Op { op, .. } => Some(*op),
            CacheEvent::Note(_) => None,
        })
        .collect();
    out.dedup();
    out
}

#[test]
fn fill_is_bracketed_by_cache_maintenance() {
    let (backend, log) = noting(Ge2d::new(Ge2d::default_caps(), Duration::ZERO));
    let dst = dma_target(128, 64, ColorFormat::Rgb565);
    let task = DrawTask::fill(Area::new(0, 0, 63, 63), FillDsc::solid(Color32::WHITE));
    execute(&backend, &task, &dst);

    assert_eq!(
        ops(&log.events()),
        vec![Some(CacheOp::CleanInvalidate), None, Some(CacheOp::Invalidate)]
    );
    assert_eq!(dst.pixel(63, 63), Some(Color32::WHITE));
    assert_eq!(dst.pixel(64, 0), Some(Color32::BLACK));
}

#[test]
fn blit_cleans_source_first() {
    let (backend, log) = noting(Bitblt::new(Bitblt::default_caps(), Duration::ZERO));
    let src = Arc::new(Surface::new(16, 16, ColorFormat::Xrgb8888, MemoryPlacement::Dma).unwrap());
    src.clear(Color32::rgb(10, 20, 30));
    let dst = dma_target(128, 64, ColorFormat::Xrgb8888);
    let task = DrawTask::image(Area::new(8, 8, 23, 23), ImageDsc::new(Arc::clone(&src)));
    execute(&backend, &task, &dst);

    let events = log.events();
    match events.first() {
        Some(CacheEvent::Op { op, surface, .. }) => {
            assert_eq!(*op, CacheOp::Clean);
            assert_eq!(*surface, src.id());
        }
        other => panic!("unexpected first event {other:?}"),
    }
    assert_eq!(
        ops(&events),
        vec![
            Some(CacheOp::Clean),
            Some(CacheOp::CleanInvalidate),
            None,
            Some(CacheOp::Invalidate)
        ]
    );
    assert_eq!(dst.pixel(8, 8), Some(Color32::rgb(10, 20, 30)));
    assert_eq!(dst.pixel(7, 8), Some(Color32::BLACK));
}

#[test]
fn fully_clipped_task_touches_nothing() {
    let (backend, log) = noting(Ge2d::new(Ge2d::default_caps(), Duration::ZERO));
    let dst = dma_target(128, 64, ColorFormat::Rgb565);
    let task = DrawTask::fill(Area::new(0, 0, 15, 15), FillDsc::solid(Color32::WHITE))
        .with_clip(Area::new(32, 32, 40, 40));
    execute(&backend, &task, &dst);
    assert!(log.events().is_empty());
}

#[test]
#[should_panic(expected = "refused")]
fn engine_refusal_panics() {
    let (backend, _log) = noting(Ge2d::new(Ge2d::default_caps(), Duration::ZERO));
    let dst = dma_target(128, 64, ColorFormat::Rgb888);
    let task = DrawTask::fill(Area::new(0, 0, 15, 15), FillDsc::solid(Color32::WHITE));
    execute(&backend, &task, &dst);
}

#[test]
fn evaluate_declines_cpu_targets() {
    let backend = create_accelerator(
        EngineKind::Gdma,
        default_caps(EngineKind::Gdma),
        Duration::ZERO,
        CoherencyHook::coherent(),
        HwWait::new(Duration::from_secs(1)),
    );
    let task = DrawTask::fill(Area::new(0, 0, 127, 127), FillDsc::solid(Color32::WHITE));
    let mut target = TargetInfo {
        buf_area: Area::new(0, 0, 127, 127),
        format: ColorFormat::Rgb565,
        placement: MemoryPlacement::Dma,
        stride: 256,
    };
    assert_eq!(backend.evaluate(&task, &target), Some(60));
    target.placement = MemoryPlacement::Cpu;
    assert_eq!(backend.evaluate(&task, &target), None);
    assert_eq!(backend.name(), "gdma");
    assert_eq!(backend.caps().map(|c| c.cost), Some(60));
}
