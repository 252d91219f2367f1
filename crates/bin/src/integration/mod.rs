//! Wiring between the command line and the Basket crates.
//!
//! Resolves the on-disk cache location and builds the price provider the
//! analysis runs against.

pub(crate) mod cache_manager;
pub(crate) mod data_pipeline;
