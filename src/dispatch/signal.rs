use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// "Run another dispatch round" request, raised by backends when they finish a task.
///
/// Requests are counted, so a request raised between a round and the wait that follows it still
/// wakes that wait.
#[derive(Debug, Default)]
pub struct DispatchSignal {
    generation: Mutex<u64>,
    cond: Condvar,
}

impl DispatchSignal {
    /// New signal at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the dispatcher for another round. Safe from any thread.
    pub fn request(&self) {
        let mut g = self.generation.lock();
        *g = g.wrapping_add(1);
        self.cond.notify_all();
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Block until the generation moves past `seen` or `timeout` elapses. Returns `true` when a
    /// request arrived.
    pub fn wait_for(&self, seen: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut g = self.generation.lock();
        while *g == seen {
            if self.cond.wait_until(&mut g, deadline).timed_out() {
                return *g != seen;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/signal.rs"]
mod tests;
