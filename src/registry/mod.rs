pub mod error;
pub mod references;
#[allow(clippy::module_inception)]
pub mod registry;
pub mod registry_model;
pub mod store;
pub mod tracking;
