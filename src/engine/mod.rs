//! Emulated 2D accelerators.
//!
//! Each engine is programmed through a small register model and executes against in-process
//! [`Surface`] memory. Completion is reported through [`Engine::poll`], optionally after a
//! simulated latency, so callers exercise the same start/wait protocol as on silicon.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::foundation::{
    color::{Color32, ColorFormat},
    core::{Area, Point},
};
use crate::surface::buffer::Surface;

pub(crate) mod bitblt;
pub(crate) mod gdma;
pub(crate) mod ge2d;
pub(crate) mod mem;

/// Accelerator families shipped with the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Fill-only 2D graphics engine.
    Ge2d,
    /// Bit-block-transfer engine with alpha blending.
    Bitblt,
    /// General-purpose DMA channel with fill and 2D copy.
    Gdma,
}

impl EngineKind {
    /// Lower-case name, used for backend and worker thread names.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ge2d => "ge2d",
            Self::Bitblt => "bitblt",
            Self::Gdma => "gdma",
        }
    }
}

/// What an engine can do with image and layer tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlitSupport {
    /// Fill only.
    None,
    /// Raw copy: opaque, same format on both sides, no source alpha.
    OpaqueCopy,
    /// Copy with global opacity and source alpha blending.
    Blend,
}

/// Static capabilities and tuning of one accelerator instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineCaps {
    /// Destination (and source) formats the engine handles.
    pub formats: &'static [ColorFormat],
    /// Solid rectangle fill.
    pub fill: bool,
    /// Image/layer support.
    pub blit: BlitSupport,
    /// Cost offered for accepted tasks; lower wins.
    pub cost: u32,
    /// Layers smaller than this many pixels are left to software.
    pub min_layer_pixels: u64,
    /// Required byte alignment of strides and row start offsets.
    pub align: u32,
    /// Most rows one operation can cover.
    pub max_rows: u32,
    /// Largest source x or y a blit can start at, in pixels.
    pub max_src_offset: u32,
}

impl EngineCaps {
    /// Return `true` when `format` is in the supported set.
    pub fn supports(&self, format: ColorFormat) -> bool {
        self.formats.contains(&format)
    }
}

/// One programmed operation. Areas are relative to their surface.
#[derive(Clone, Copy, Debug)]
pub enum HwOp<'a> {
    /// Solid fill of `area`.
    Fill {
        /// Destination.
        dst: &'a Surface,
        /// Destination rectangle.
        area: Area,
        /// Fill colour.
        color: Color32,
    },
    /// Copy of `src_area` to `dst_pos`.
    Blit {
        /// Source.
        src: &'a Surface,
        /// Source rectangle.
        src_area: Area,
        /// Destination.
        dst: &'a Surface,
        /// Top-left destination pixel.
        dst_pos: Point,
        /// Global opacity.
        opa: u8,
    },
}

impl HwOp<'_> {
    /// Pixels the operation writes.
    pub fn pixels(&self) -> u64 {
        match self {
            Self::Fill { area, .. } => area.size(),
            Self::Blit { src_area, .. } => src_area.size(),
        }
    }
}

/// Why an engine refused or aborted an operation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineFault {
    /// The operation or format is outside the engine's capabilities.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// An address or pitch violates the transfer alignment.
    #[error("misaligned transfer: {0}")]
    Misaligned(String),
    /// An operation was started while another was in flight.
    #[error("engine busy")]
    Busy,
}

/// Result of polling an engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    /// Nothing in flight.
    Idle,
    /// The last operation is still running.
    Busy,
    /// The last operation finished; reading this status retires it.
    Done,
    /// The last operation aborted.
    Faulted(EngineFault),
}

/// A programmable 2D accelerator.
pub trait Engine: Send + Sync + 'static {
    /// Engine family.
    fn kind(&self) -> EngineKind;

    /// Capabilities used by the capability predicate.
    fn caps(&self) -> &EngineCaps;

    /// Program and start `op`.
    fn start(&self, op: &HwOp<'_>) -> Result<(), EngineFault>;

    /// Completion status of the last started operation.
    fn poll(&self) -> EngineStatus;
}

/// Simulated completion timing shared by the engine models.
#[derive(Debug)]
pub(crate) struct Completion {
    latency: Duration,
    done_at: Mutex<Option<Instant>>,
}

impl Completion {
    pub(crate) fn new(latency: Duration) -> Self {
        Self {
            latency,
            done_at: Mutex::new(None),
        }
    }

    pub(crate) fn begin(&self) -> Result<(), EngineFault> {
        let mut done_at = self.done_at.lock();
        if done_at.is_some() {
            return Err(EngineFault::Busy);
        }
        *done_at = Some(Instant::now() + self.latency);
        Ok(())
    }

    pub(crate) fn poll(&self) -> EngineStatus {
        let mut done_at = self.done_at.lock();
        match *done_at {
            None => EngineStatus::Idle,
            Some(t) if Instant::now() >= t => {
                *done_at = None;
                EngineStatus::Done
            }
            Some(_) => EngineStatus::Busy,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/mod.rs"]
mod tests;
