//! The generate → compile → simulate subprocess pipeline (§4.8), grounded on
//! `simulation/simman.h`/`.cpp` and `simulation/logsocket.h`.

pub mod compilation;
pub mod generation;
pub mod logbus;
pub mod manager;
pub mod run;

pub use logbus::LogBus;
pub use manager::{SimulationManager, TaskHandle, TaskState};
