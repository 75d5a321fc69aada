//! One file per cross-operation property: config DAG cycle detection,
//! undo/redo idempotence, and request/service port-signature enforcement.

pub mod config_cycles;
pub mod port_signatures;
pub mod undo_redo;
