use std::sync::Arc;

use crate::backend::runner::BackendRunner;
use crate::backend::worker::WorkerState;
use crate::backend::{BackendId, ClaimedTask, DispatchOutcome, DrawBackend};
use crate::dispatch::opts::DispatchOpts;
use crate::dispatch::registry::BackendRegistry;
use crate::dispatch::signal::DispatchSignal;
use crate::foundation::error::{DrawError, DrawResult};
use crate::surface::pool::{BufferPool, ScratchAllocator};
use crate::task::model::{DrawTask, TaskState};
use crate::task::queue::{Layer, TargetInfo};

/// Per-backend counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendStats {
    /// Registry id.
    pub id: BackendId,
    /// Backend name.
    pub name: String,
    /// Tasks claimed since init.
    pub claimed: u64,
    /// Worker lifecycle, `None` for inline backends.
    pub worker: Option<WorkerState>,
}

/// Outcome of [`Dispatcher::render_layer`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Tasks in the layer.
    pub tasks: usize,
    /// Dispatch rounds run.
    pub rounds: u64,
    /// Tasks claimed per backend, indexed by `id - 1`.
    pub claimed: Vec<u64>,
}

impl FrameStats {
    /// Tasks `id` claimed during the frame.
    pub fn claimed_by(&self, id: BackendId) -> u64 {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.claimed.get(i))
            .copied()
            .unwrap_or(0)
    }
}

/// Hands queued draw tasks to idle backends.
///
/// Evaluation and dispatch run on the caller's thread. With [`DispatchOpts::threaded`] every
/// hardware backend executes on its own worker and reports completion through [`DispatchSignal`].
/// The software backend always runs inline on the caller's thread.
pub struct Dispatcher {
    registry: BackendRegistry,
    runners: Vec<BackendRunner>,
    opts: DispatchOpts,
    alloc: Arc<dyn ScratchAllocator>,
    signal: Arc<DispatchSignal>,
    running: bool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("opts", &self.opts)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Start every backend of `registry`, allocating layer buffers from a default [`BufferPool`].
    #[tracing::instrument(skip_all, fields(backends = registry.len(), threaded = opts.threaded))]
    pub fn init(registry: BackendRegistry, opts: DispatchOpts) -> DrawResult<Self> {
        Self::init_with_allocator(registry, opts, Arc::new(BufferPool::default()))
    }

    /// Start every backend of `registry` with a caller-supplied allocator.
    pub fn init_with_allocator(
        registry: BackendRegistry,
        opts: DispatchOpts,
        alloc: Arc<dyn ScratchAllocator>,
    ) -> DrawResult<Self> {
        opts.validate()?;
        registry.validate()?;
        let signal = Arc::new(DispatchSignal::new());
        let mut runners: Vec<BackendRunner> = registry
            .iter()
            .map(|(id, b)| BackendRunner::new(id, Arc::clone(b), Arc::clone(&signal)))
            .collect();
        if opts.threaded {
            // Software runs on the caller's thread.
            for runner in runners.iter_mut().filter(|r| !r.backend().is_software()) {
                runner.start_worker()?;
            }
        }
        tracing::info!(
            backends = runners.len(),
            threaded = opts.threaded,
            "dispatcher initialized"
        );
        Ok(Self {
            registry,
            runners,
            opts,
            alloc,
            signal,
            running: true,
        })
    }

    /// Options in effect.
    pub fn opts(&self) -> &DispatchOpts {
        &self.opts
    }

    /// Registered backends.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Completion signal shared with the backends.
    pub fn signal(&self) -> &Arc<DispatchSignal> {
        &self.signal
    }

    /// Backend ids in registration order.
    pub fn backend_ids(&self) -> impl Iterator<Item = BackendId> + '_ {
        self.runners.iter().map(BackendRunner::id)
    }

    /// Return `true` while `id` has a task in flight.
    pub fn is_busy(&self, id: BackendId) -> bool {
        self.runner(id).is_busy()
    }

    /// Let every backend bid on `task`.
    pub fn evaluate(&self, task: &mut DrawTask, target: &TargetInfo) {
        self.registry.evaluate(task, target);
    }

    /// Let one backend bid on `task`. Returns `true` when its bid became the preferred one.
    pub fn evaluate_with(&self, id: BackendId, task: &mut DrawTask, target: &TargetInfo) -> bool {
        let backend = self.runner(id).backend();
        match backend.evaluate(task, target) {
            Some(cost) => task.offer(id, cost),
            None => false,
        }
    }

    /// Evaluate every queued task of `layer` nobody has bid on yet.
    pub fn evaluate_layer(&self, layer: &mut Layer) {
        let target = layer.target_info();
        for task in layer.tasks_mut() {
            if task.state() == TaskState::Queued && task.preferred_backend() == BackendId::NONE {
                self.registry.evaluate(task, &target);
            }
        }
    }

    /// Try to hand backend `id` the next task of `layer`.
    pub fn dispatch(&self, id: BackendId, layer: &mut Layer) -> DispatchOutcome {
        assert!(self.running, "dispatch after deinit");
        self.raise_faults();
        let runner = self.runner(id);
        if runner.is_busy() {
            return DispatchOutcome::Busy;
        }

        let task_id = match layer.next_available_task(None, id) {
            Some(t) if t.preferred_backend() == id => t.id(),
            _ => return DispatchOutcome::NoTask,
        };

        let target = match layer.ensure_buffer(self.alloc.as_ref()) {
            Ok(buf) => buf,
            Err(err) => {
                tracing::warn!(backend = %id, task = task_id.0, %err, "task deferred");
                return DispatchOutcome::NoTask;
            }
        };

        let buf_area = layer.buf_area();
        let Some(task) = layer.task(task_id) else {
            return DispatchOutcome::NoTask;
        };
        let Some(claimed) = ClaimedTask::claim(task, target, buf_area) else {
            panic!("task {} claimed twice (by {id})", task_id.0);
        };
        tracing::debug!(
            backend = %id,
            name = runner.backend().name(),
            task = task_id.0,
            kind = ?claimed.kind,
            "task claimed"
        );
        runner.submit(claimed);
        DispatchOutcome::Taken
    }

    /// Evaluate `layer` and run dispatch rounds until every task is ready.
    ///
    /// Returns [`DrawError::OutOfMemory`] when the layer buffer stays unavailable for
    /// `max_stalled_rounds` rounds with nothing in flight.
    #[tracing::instrument(skip_all, fields(tasks = layer.tasks().len()))]
    pub fn render_layer(&self, layer: &mut Layer) -> DrawResult<FrameStats> {
        layer.set_paint_order_guard(self.opts.paint_order_guard);
        self.evaluate_layer(layer);

        let mut stats = FrameStats {
            tasks: layer.tasks().len(),
            rounds: 0,
            claimed: vec![0; self.runners.len()],
        };
        let mut stalled = 0u32;
        while !layer.is_complete() {
            let seen = self.signal.generation();
            let mut taken = 0usize;
            for (i, runner) in self.runners.iter().enumerate() {
                if self.dispatch(runner.id(), layer) == DispatchOutcome::Taken {
                    stats.claimed[i] += 1;
                    taken += 1;
                }
            }
            stats.rounds += 1;
            if layer.is_complete() {
                break;
            }

            if taken == 0 && layer.in_flight_count() == 0 {
                stalled += 1;
                if stalled >= self.opts.max_stalled_rounds {
                    return Err(DrawError::out_of_memory(format!(
                        "layer stalled for {stalled} rounds with {} tasks pending",
                        layer.pending_count()
                    )));
                }
            } else {
                stalled = 0;
            }
            if taken == 0 {
                self.signal.wait_for(seen, self.opts.round_wait());
            }
        }
        self.raise_faults();
        tracing::debug!(rounds = stats.rounds, "layer complete");
        Ok(stats)
    }

    /// Counters for every backend.
    pub fn stats(&self) -> Vec<BackendStats> {
        self.runners
            .iter()
            .map(|r| BackendStats {
                id: r.id(),
                name: r.backend().name().to_owned(),
                claimed: r.claimed(),
                worker: r.worker_state(),
            })
            .collect()
    }

    /// Drain and join every worker. Idempotent; also run on drop.
    pub fn deinit(&mut self) {
        if !self.running {
            return;
        }
        for runner in &mut self.runners {
            runner.stop();
        }
        self.running = false;
        tracing::info!("dispatcher deinitialized");
    }

    fn runner(&self, id: BackendId) -> &BackendRunner {
        let runner = (id.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.runners.get(i));
        let Some(runner) = runner else {
            panic!("unknown backend {id}");
        };
        runner
    }

    fn raise_faults(&self) {
        for runner in &self.runners {
            if let Some(fault) = runner.take_fault() {
                panic!(
                    "backend {} ({}) worker faulted: {fault}",
                    runner.id(),
                    runner.backend().name()
                );
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.deinit();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/dispatcher.rs"]
mod tests;
