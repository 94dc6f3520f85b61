pub(crate) mod hook;
pub(crate) mod regions;
