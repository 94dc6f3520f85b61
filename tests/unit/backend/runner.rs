use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::backend::software::SoftwareBackend;
use crate::dispatch::opts::SoftwareOpts;
use crate::foundation::{
    color::{Color32, ColorFormat},
    core::Area,
};
use crate::surface::buffer::{MemoryPlacement, Surface};
use crate::task::model::{DrawTask, FillDsc, TaskState};
use crate::task::queue::TargetInfo;

/// Backend whose `execute` blocks until the test releases it.
struct Gated {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl DrawBackend for Gated {
    fn name(&self) -> &str {
        "gated"
    }

    fn evaluate(&self, _task: &DrawTask, _target: &TargetInfo) -> Option<u32> {
        Some(1)
    }

    fn execute(&self, _task: &ClaimedTask) {
        let _ = self.gate.lock().recv();
    }
}

fn task_and_claim() -> (DrawTask, ClaimedTask) {
    let task = DrawTask::fill(Area::new(0, 0, 7, 7), FillDsc::solid(Color32::WHITE));
    let target = Arc::new(Surface::new(8, 8, ColorFormat::Rgb565, MemoryPlacement::Cpu).unwrap());
    let bounds = target.bounds();
    let claimed = ClaimedTask::claim(&task, Arc::clone(&target), bounds).unwrap();
    (task, claimed)
}

#[test]
fn inline_submit_runs_to_ready() {
    let signal = Arc::new(DispatchSignal::new());
    let runner = BackendRunner::new(
        BackendId(1),
        Arc::new(SoftwareBackend::new(SoftwareOpts::default())),
        Arc::clone(&signal),
    );
    let (task, claimed) = task_and_claim();
    let target = Arc::clone(&claimed.target);
    runner.submit(claimed);

    assert_eq!(task.state(), TaskState::Ready);
    assert!(!runner.is_busy());
    assert_eq!(runner.claimed(), 1);
    assert_eq!(signal.generation(), 1);
    assert_eq!(target.pixel(7, 7), Some(Color32::WHITE));
    assert_eq!(runner.worker_state(), None);
}

#[test]
fn worker_submit_completes_and_signals() {
    let signal = Arc::new(DispatchSignal::new());
    let mut runner = BackendRunner::new(
        BackendId(1),
        Arc::new(SoftwareBackend::new(SoftwareOpts::default())),
        Arc::clone(&signal),
    );
    runner.start_worker().unwrap();

    let seen = signal.generation();
    let (task, claimed) = task_and_claim();
    runner.submit(claimed);
    assert!(signal.wait_for(seen, Duration::from_secs(5)));
    assert_eq!(task.state(), TaskState::Ready);
    assert!(!runner.is_busy());

    runner.stop();
    assert_eq!(runner.worker_state(), None);
    assert_eq!(runner.take_fault(), None);
}

#[test]
fn busy_runner_rejects_second_task() {
    let (tx, rx) = mpsc::channel();
    let signal = Arc::new(DispatchSignal::new());
    let mut runner = BackendRunner::new(
        BackendId(2),
        Arc::new(Gated {
            gate: Mutex::new(rx),
        }),
        Arc::clone(&signal),
    );
    runner.start_worker().unwrap();

    let (first, claimed) = task_and_claim();
    runner.submit(claimed);
    assert!(runner.is_busy());

    let (_second, claimed) = task_and_claim();
    let res = catch_unwind(AssertUnwindSafe(|| runner.submit(claimed)));
    assert!(res.is_err());

    let seen = signal.generation();
    tx.send(()).unwrap();
    assert!(signal.wait_for(seen, Duration::from_secs(5)));
    assert_eq!(first.state(), TaskState::Ready);
    runner.stop();
    assert_eq!(runner.claimed(), 1);
}
