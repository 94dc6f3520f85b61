use super::*;
use crate::foundation::color::ColorFormat;
use crate::surface::buffer::MemoryPlacement;

fn recording() -> (Arc<RecordingCache>, CoherencyHook) {
    let rec = Arc::new(RecordingCache::new());
    let hook = CoherencyHook::new(rec.clone(), 32).unwrap();
    (rec, hook)
}

#[test]
fn rejects_non_power_of_two_line() {
    assert!(CoherencyHook::new(Arc::new(NoopCache), 48).is_err());
    assert!(CoherencyHook::new(Arc::new(NoopCache), 0).is_err());
}

#[test]
fn hook_issues_requested_operation_per_region() {
    let (rec, hook) = recording();
    let s = Surface::new(16, 16, ColorFormat::Argb8888, MemoryPlacement::Dma).unwrap();
    hook.before_device_read(&s, Area::new(0, 0, 15, 15));
    hook.before_device_write(&s, Area::new(0, 0, 15, 15));
    hook.after_device_write(&s, Area::new(0, 0, 15, 15));

    let ops: Vec<_> = rec
        .events()
        .into_iter()
        .filter_map(|e| match e {
            CacheEvent::Op { op, surface, region } => {
                assert_eq!(surface, s.id());
                assert_eq!(region, CacheRegion { offset: 0, len: 1024 });
                Some(op)
            }
            CacheEvent::Note(_) => None,
        })
        .collect();
    assert_eq!(
        ops,
        vec![CacheOp::Clean, CacheOp::CleanInvalidate, CacheOp::Invalidate]
    );
}

#[test]
fn cpu_only_surfaces_are_skipped() {
    let (rec, hook) = recording();
    let s = Surface::new(16, 16, ColorFormat::Argb8888, MemoryPlacement::Cpu).unwrap();
    hook.before_device_read(&s, s.bounds());
    assert!(rec.events().is_empty());
}

#[test]
fn notes_interleave_with_operations() {
    let (rec, hook) = recording();
    let s = Surface::new(4, 4, ColorFormat::L8, MemoryPlacement::Dma).unwrap();
    rec.note("start");
    hook.after_device_write(&s, s.bounds());
    let ev = rec.take_events();
    assert_eq!(ev.len(), 2);
    assert_eq!(ev[0], CacheEvent::Note("start"));
    assert!(rec.events().is_empty());
}
