//! Task dispatch: board configuration, the backend registry, the completion signal and the
//! dispatcher itself.

pub(crate) mod dispatcher;
pub(crate) mod opts;
pub(crate) mod registry;
pub(crate) mod signal;
