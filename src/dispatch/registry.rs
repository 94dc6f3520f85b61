use std::collections::HashSet;
use std::sync::Arc;

use crate::backend::accel::create_accelerator;
use crate::backend::software::SoftwareBackend;
use crate::backend::wait::HwWait;
use crate::backend::{BackendId, DrawBackend};
use crate::cache::hook::{CacheMaintenance, CoherencyHook};
use crate::dispatch::opts::BoardConfig;
use crate::foundation::error::{DrawError, DrawResult};
use crate::task::model::DrawTask;
use crate::task::queue::TargetInfo;

/// Ordered set of backends. Registration order is evaluation order and decides cost ties.
#[derive(Default, Clone)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn DrawBackend>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.backends.iter().map(|b| b.name()))
            .finish()
    }
}

impl BackendRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `backend`; its id is its position plus one.
    pub fn register(&mut self, backend: Arc<dyn DrawBackend>) -> BackendId {
        self.backends.push(backend);
        BackendId(self.backends.len() as u16)
    }

    /// Builder form of [`Self::register`].
    pub fn with(mut self, backend: Arc<dyn DrawBackend>) -> Self {
        self.register(backend);
        self
    }

    /// Software backend first, then the board's accelerators in order.
    pub fn from_config(cfg: &BoardConfig, cache: Arc<dyn CacheMaintenance>) -> DrawResult<Self> {
        cfg.validate()?;
        let hook = CoherencyHook::new(cache, cfg.dispatch.cache_line_size)?;
        let wait = HwWait::new(cfg.dispatch.hw_timeout());
        let mut reg = Self::new().with(Arc::new(SoftwareBackend::new(cfg.software.clone())));
        for spec in &cfg.accelerators {
            reg.register(create_accelerator(
                spec.kind,
                spec.caps(),
                spec.latency(),
                hook.clone(),
                wait,
            ));
        }
        reg.validate()?;
        Ok(reg)
    }

    /// Number of backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Return `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backend with `id`.
    pub fn get(&self, id: BackendId) -> Option<&Arc<dyn DrawBackend>> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.backends.get(i))
    }

    /// Backends with their ids, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (BackendId, &Arc<dyn DrawBackend>)> + '_ {
        self.backends
            .iter()
            .enumerate()
            .map(|(i, b)| (BackendId(i as u16 + 1), b))
    }

    /// Id of the software backend, if registered.
    pub fn software_id(&self) -> Option<BackendId> {
        self.iter().find(|(_, b)| b.is_software()).map(|(id, _)| id)
    }

    /// Exactly one software backend, unique names, ids fit in `u16`.
    pub fn validate(&self) -> DrawResult<()> {
        let software = self.backends.iter().filter(|b| b.is_software()).count();
        if software != 1 {
            return Err(DrawError::validation(format!(
                "registry needs exactly one software backend, found {software}"
            )));
        }
        if self.backends.len() >= usize::from(u16::MAX) {
            return Err(DrawError::validation("too many backends"));
        }
        let mut names = HashSet::new();
        for b in &self.backends {
            if !names.insert(b.name()) {
                return Err(DrawError::validation(format!(
                    "duplicate backend name '{}'",
                    b.name()
                )));
            }
        }
        Ok(())
    }

    /// Run every backend's predicate on `task` in registration order and keep the cheapest bid.
    pub fn evaluate(&self, task: &mut DrawTask, target: &TargetInfo) {
        for (id, backend) in self.iter() {
            if let Some(cost) = backend.evaluate(task, target) {
                task.offer(id, cost);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/registry.rs"]
mod tests;
