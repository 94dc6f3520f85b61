use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::backend::ClaimedTask;
use crate::dispatch::signal::DispatchSignal;
use crate::foundation::error::{DrawError, DrawResult};

/// Lifecycle of a backend worker thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Spawned, not yet running its loop.
    Uninitialized,
    /// Waiting for or executing tasks.
    Running,
    /// Exit requested; finishing the pending task.
    Draining,
    /// Loop exited.
    Terminated,
}

struct Slot {
    task: Option<ClaimedTask>,
    exit: bool,
    state: WorkerState,
    fault: Option<String>,
}

struct Shared {
    slot: Mutex<Slot>,
    cond: Condvar,
}

/// A dedicated thread executing one claimed task at a time.
///
/// `spawn` returns once the thread is [`WorkerState::Running`]. The slot lock is only held to hand
/// tasks over; `job` runs unlocked. A panicking job is caught, recorded as a fault and ends the
/// thread.
pub(crate) struct Worker {
    name: String,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn<F>(name: &str, signal: Arc<DispatchSignal>, job: F) -> DrawResult<Self>
    where
        F: Fn(ClaimedTask) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                task: None,
                exit: false,
                state: WorkerState::Uninitialized,
                fault: None,
            }),
            cond: Condvar::new(),
        });
        let thread_name = format!("accel-draw-{name}");
        let handle = {
            let shared = Arc::clone(&shared);
            let name = name.to_owned();
            thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(&name, &shared, &signal, job))
                .map_err(|e| {
                    DrawError::Other(anyhow::anyhow!("spawn worker thread '{thread_name}': {e}"))
                })?
        };
        {
            let mut slot = shared.slot.lock();
            while slot.state == WorkerState::Uninitialized {
                shared.cond.wait(&mut slot);
            }
        }
        tracing::info!(thread = %thread_name, "worker spawned");
        Ok(Self {
            name: name.to_owned(),
            shared,
            handle: Some(handle),
        })
    }

    /// Hand `task` to the thread. The slot must be empty.
    pub(crate) fn submit(&self, task: ClaimedTask) {
        let mut slot = self.shared.slot.lock();
        assert!(
            slot.task.is_none(),
            "{}: task submitted while another is pending",
            self.name
        );
        assert!(!slot.exit, "{}: task submitted after shutdown", self.name);
        slot.task = Some(task);
        self.shared.cond.notify_one();
    }

    pub(crate) fn state(&self) -> WorkerState {
        self.shared.slot.lock().state
    }

    pub(crate) fn take_fault(&self) -> Option<String> {
        self.shared.slot.lock().fault.take()
    }

    /// Request exit, let a pending task finish, and join the thread.
    pub(crate) fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        {
            let mut slot = self.shared.slot.lock();
            slot.exit = true;
            if slot.state == WorkerState::Running {
                slot.state = WorkerState::Draining;
            }
            self.shared.cond.notify_all();
        }
        if handle.join().is_err() {
            tracing::warn!(worker = %self.name, "worker thread panicked outside a task");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<F>(name: &str, shared: &Shared, signal: &DispatchSignal, job: F)
where
    F: Fn(ClaimedTask),
{
    {
        let mut slot = shared.slot.lock();
        slot.state = if slot.exit {
            WorkerState::Draining
        } else {
            WorkerState::Running
        };
        shared.cond.notify_all();
    }

    loop {
        let task = {
            let mut slot = shared.slot.lock();
            loop {
                if let Some(task) = slot.task.take() {
                    break Some(task);
                }
                if slot.exit {
                    break None;
                }
                shared.cond.wait(&mut slot);
            }
        };
        let Some(task) = task else {
            break;
        };

        let id = task.id;
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| job(task))) {
            let msg = panic_message(payload.as_ref());
            tracing::error!(worker = %name, task = id.0, %msg, "task panicked");
            shared.slot.lock().fault = Some(msg);
            signal.request();
            break;
        }
    }

    shared.slot.lock().state = WorkerState::Terminated;
    tracing::info!(worker = %name, "worker exited");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/worker.rs"]
mod tests;
