use super::*;

#[test]
fn completion_reports_done_once() {
    let c = Completion::new(Duration::ZERO);
    assert_eq!(c.poll(), EngineStatus::Idle);
    c.begin().unwrap();
    assert_eq!(c.begin(), Err(EngineFault::Busy));
    assert_eq!(c.poll(), EngineStatus::Done);
    assert_eq!(c.poll(), EngineStatus::Idle);
}

#[test]
fn completion_stays_busy_until_latency_elapses() {
    let c = Completion::new(Duration::from_secs(60));
    c.begin().unwrap();
    assert_eq!(c.poll(), EngineStatus::Busy);
}

#[test]
fn engine_kind_names_are_lowercase() {
    assert_eq!(EngineKind::Ge2d.name(), "ge2d");
    assert_eq!(EngineKind::Bitblt.name(), "bitblt");
    assert_eq!(EngineKind::Gdma.name(), "gdma");
    let k: EngineKind = serde_json::from_str("\"gdma\"").unwrap();
    assert_eq!(k, EngineKind::Gdma);
}
