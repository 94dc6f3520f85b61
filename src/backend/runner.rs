use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::backend::worker::{Worker, WorkerState};
use crate::backend::{BackendId, ClaimedTask, DrawBackend};
use crate::dispatch::signal::DispatchSignal;
use crate::foundation::error::DrawResult;

/// A registered backend plus its dispatch bookkeeping: the in-flight flag, the claim counter and
/// the optional worker thread.
pub(crate) struct BackendRunner {
    id: BackendId,
    backend: Arc<dyn DrawBackend>,
    busy: Arc<AtomicBool>,
    claimed: AtomicU64,
    signal: Arc<DispatchSignal>,
    worker: Option<Worker>,
}

impl BackendRunner {
    pub(crate) fn new(
        id: BackendId,
        backend: Arc<dyn DrawBackend>,
        signal: Arc<DispatchSignal>,
    ) -> Self {
        Self {
            id,
            backend,
            busy: Arc::new(AtomicBool::new(false)),
            claimed: AtomicU64::new(0),
            signal,
            worker: None,
        }
    }

    /// Move execution onto a dedicated worker thread.
    pub(crate) fn start_worker(&mut self) -> DrawResult<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let backend = Arc::clone(&self.backend);
        let busy = Arc::clone(&self.busy);
        let signal = Arc::clone(&self.signal);
        let worker = Worker::spawn(
            self.backend.name(),
            Arc::clone(&self.signal),
            move |task| finish(backend.as_ref(), &busy, &signal, task),
        )?;
        self.worker = Some(worker);
        Ok(())
    }

    pub(crate) fn id(&self) -> BackendId {
        self.id
    }

    pub(crate) fn backend(&self) -> &Arc<dyn DrawBackend> {
        &self.backend
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn claimed(&self) -> u64 {
        self.claimed.load(Ordering::Relaxed)
    }

    pub(crate) fn worker_state(&self) -> Option<WorkerState> {
        self.worker.as_ref().map(Worker::state)
    }

    /// Execute `task`, inline or on the worker. The backend must be idle.
    pub(crate) fn submit(&self, task: ClaimedTask) {
        let was_busy = self.busy.swap(true, Ordering::AcqRel);
        assert!(
            !was_busy,
            "backend {} ({}) handed a task while busy",
            self.id,
            self.backend.name()
        );
        self.claimed.fetch_add(1, Ordering::Relaxed);
        match &self.worker {
            Some(worker) => worker.submit(task),
            None => finish(self.backend.as_ref(), &self.busy, &self.signal, task),
        }
    }

    pub(crate) fn take_fault(&self) -> Option<String> {
        self.worker.as_ref().and_then(Worker::take_fault)
    }

    /// Drain and join the worker, if any. Later submissions run inline.
    pub(crate) fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}

fn finish(backend: &dyn DrawBackend, busy: &AtomicBool, signal: &DispatchSignal, task: ClaimedTask) {
    let id = task.id;
    backend.execute(&task);
    task.complete();
    busy.store(false, Ordering::Release);
    tracing::trace!(backend = backend.name(), task = id.0, "task ready");
    signal.request();
}

#[cfg(test)]
#[path = "../../tests/unit/backend/runner.rs"]
mod tests;
