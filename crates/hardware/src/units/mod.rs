//! Execution units dispatched from the Execute stage.

/// Integer Arithmetic Logic Unit (RV64I/M).
pub mod alu;

/// Floating-Point Unit (RV64F/D).
pub mod fpu;

pub use alu::Alu;
pub use fpu::Fpu;
