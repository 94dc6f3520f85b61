/// Convenience result type used across accel-draw.
pub type DrawResult<T> = Result<T, DrawError>;

/// Top-level error taxonomy used by dispatcher and backend APIs.
///
/// Capability rejection is not an error (predicates return `None`), and internal-consistency
/// violations such as a double claim or a hardware timeout panic instead of surfacing here.
#[derive(thiserror::Error, Debug)]
pub enum DrawError {
    /// Invalid caller-provided geometry, surface or registry data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A scratch or layer buffer could not be allocated within the configured budget.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Invalid board or dispatcher configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DrawError {
    /// Build a [`DrawError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DrawError::OutOfMemory`] value.
    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::OutOfMemory(msg.into())
    }

    /// Build a [`DrawError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`DrawError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for allocation failures the dispatcher recovers from by deferring.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory(_))
    }
}

impl From<serde_json::Error> for DrawError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
