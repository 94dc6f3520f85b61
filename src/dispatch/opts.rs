use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::backend::accel::default_caps;
use crate::engine::{EngineCaps, EngineKind};
use crate::foundation::error::{DrawError, DrawResult};

/// Dispatcher behaviour.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DispatchOpts {
    /// Run each hardware backend on its own worker thread instead of inline on the caller's
    /// thread. Software always runs inline.
    pub threaded: bool,
    /// Upper bound for one hardware operation; expiry is fatal.
    pub hw_timeout_ms: u64,
    /// Data-cache line size used for maintenance regions.
    pub cache_line_size: usize,
    /// Keep overlapping tasks in submission order.
    pub paint_order_guard: bool,
    /// How long `render_layer` sleeps on the dispatch signal between rounds.
    pub round_wait_ms: u64,
    /// Rounds without progress (and nothing in flight) before `render_layer` gives up.
    pub max_stalled_rounds: u32,
}

impl Default for DispatchOpts {
    fn default() -> Self {
        Self {
            threaded: false,
            hw_timeout_ms: 1000,
            cache_line_size: 32,
            paint_order_guard: true,
            round_wait_ms: 5,
            max_stalled_rounds: 8,
        }
    }
}

impl DispatchOpts {
    /// Hardware timeout as a [`Duration`].
    pub fn hw_timeout(&self) -> Duration {
        Duration::from_millis(self.hw_timeout_ms)
    }

    /// Round wait as a [`Duration`].
    pub fn round_wait(&self) -> Duration {
        Duration::from_millis(self.round_wait_ms)
    }

    /// Reject values the dispatcher cannot run with.
    pub fn validate(&self) -> DrawResult<()> {
        if self.hw_timeout_ms == 0 {
            return Err(DrawError::config("hw_timeout_ms must be > 0"));
        }
        if !self.cache_line_size.is_power_of_two() {
            return Err(DrawError::config(format!(
                "cache_line_size must be a power of two, got {}",
                self.cache_line_size
            )));
        }
        if self.max_stalled_rounds == 0 {
            return Err(DrawError::config("max_stalled_rounds must be > 0"));
        }
        Ok(())
    }
}

/// Software rasterizer tuning.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SoftwareOpts {
    /// Draw areas at least this many rows tall are rasterized with rayon.
    pub parallel_rows_threshold: u32,
}

impl Default for SoftwareOpts {
    fn default() -> Self {
        Self {
            parallel_rows_threshold: 64,
        }
    }
}

/// One accelerator on the board. Unset fields take the engine family defaults.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AcceleratorSpec {
    /// Engine family.
    pub kind: EngineKind,
    /// Bid cost override.
    #[serde(default)]
    pub cost: Option<u32>,
    /// Minimum layer buffer size override, in pixels.
    #[serde(default)]
    pub min_layer_pixels: Option<u64>,
    /// Address/stride alignment override, in bytes.
    #[serde(default)]
    pub align: Option<u32>,
    /// Simulated completion latency.
    #[serde(default)]
    pub latency_us: u64,
}

impl AcceleratorSpec {
    /// Accelerator of `kind` with default capabilities and no latency.
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            cost: None,
            min_layer_pixels: None,
            align: None,
            latency_us: 0,
        }
    }

    /// Effective capabilities.
    pub fn caps(&self) -> EngineCaps {
        let mut caps = default_caps(self.kind);
        if let Some(cost) = self.cost {
            caps.cost = cost;
        }
        if let Some(px) = self.min_layer_pixels {
            caps.min_layer_pixels = px;
        }
        if let Some(align) = self.align {
            caps.align = align;
        }
        caps
    }

    /// Simulated latency as a [`Duration`].
    pub fn latency(&self) -> Duration {
        Duration::from_micros(self.latency_us)
    }

    fn validate(&self) -> DrawResult<()> {
        if let Some(align) = self.align
            && !align.is_power_of_two()
        {
            return Err(DrawError::config(format!(
                "{}: align must be a power of two, got {align}",
                self.kind.name()
            )));
        }
        Ok(())
    }
}

/// Complete board description: dispatcher options plus the backends to register.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Dispatcher options.
    pub dispatch: DispatchOpts,
    /// Software backend tuning.
    pub software: SoftwareOpts,
    /// Accelerators in registration order.
    pub accelerators: Vec<AcceleratorSpec>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchOpts::default(),
            software: SoftwareOpts::default(),
            accelerators: vec![
                AcceleratorSpec::new(EngineKind::Ge2d),
                AcceleratorSpec::new(EngineKind::Bitblt),
                AcceleratorSpec::new(EngineKind::Gdma),
            ],
        }
    }
}

impl BoardConfig {
    /// Software backend only.
    pub fn software_only() -> Self {
        Self {
            accelerators: Vec::new(),
            ..Self::default()
        }
    }

    /// Parse and validate a board config from JSON text.
    pub fn from_json_str(s: &str) -> DrawResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| DrawError::config(format!("parse board config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a board config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> DrawResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            DrawError::config(format!("open board config '{}': {e}", path.display()))
        })?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| DrawError::config(format!("parse board config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the dispatcher cannot run with.
    pub fn validate(&self) -> DrawResult<()> {
        self.dispatch.validate()?;
        self.accelerators.iter().try_for_each(AcceleratorSpec::validate)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/opts.rs"]
mod tests;
