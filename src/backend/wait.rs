use std::time::{Duration, Instant};

use crate::engine::{Engine, EngineFault, EngineStatus};

/// Jobs smaller than this many pixels finish faster than a park/wake round trip, so they spin.
pub const SPIN_WAIT_MAX_PIXELS: u64 = 120;

const PARK_INTERVAL: Duration = Duration::from_micros(50);

/// Why waiting for an engine failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The engine reported a fault.
    #[error("engine fault: {0}")]
    Fault(#[from] EngineFault),
    /// The engine did not complete within the timeout.
    #[error("engine did not complete within {0:?}")]
    Timeout(Duration),
}

/// Bounded completion wait for a started engine operation.
#[derive(Clone, Copy, Debug)]
pub struct HwWait {
    timeout: Duration,
}

impl HwWait {
    /// Wait at most `timeout` per operation.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll `engine` until it reports completion. `pixels` selects spinning or parking.
    pub fn wait<E: Engine + ?Sized>(&self, engine: &E, pixels: u64) -> Result<(), WaitError> {
        let spin = pixels < SPIN_WAIT_MAX_PIXELS;
        let deadline = Instant::now() + self.timeout;
        loop {
            match engine.poll() {
                EngineStatus::Done | EngineStatus::Idle => return Ok(()),
                EngineStatus::Faulted(f) => return Err(WaitError::Fault(f)),
                EngineStatus::Busy => {}
            }
            if Instant::now() >= deadline {
                return Err(WaitError::Timeout(self.timeout));
            }
            if spin {
                std::hint::spin_loop();
            } else {
                std::thread::sleep(PARK_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/wait.rs"]
mod tests;
