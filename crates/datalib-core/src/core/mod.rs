pub(crate) mod config;
pub(crate) mod store;
pub(crate) mod tooling;
