//! Infrastructure layer: adapters binding the domain ports to the outside
//! world, plus configuration loading and logging setup.

pub mod config;
pub mod logging;
pub mod runtime;
