//! Worker runtime adapters

mod simulated;

pub use simulated::SimulatedWorkerRuntime;
