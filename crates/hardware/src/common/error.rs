//! Trap and translation-result definitions.
//!
//! Covers every synchronous exception and asynchronous interrupt the pipeline
//! can raise, and the outcome of a virtual-to-physical address translation.

use thiserror::Error;

use super::addr::PhysAddr;

/// RISC-V trap types representing exceptions and interrupts.
///
/// A trap redirects the pipeline: WB encodes it into the `(1<<30)|cause`
/// exception-cause slot and `apply_tick` flushes every younger in-flight
/// instruction.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Trap {
    /// Raised when the program counter is not aligned to the instruction size.
    #[error("instruction address misaligned ({0:#x})")]
    InstructionAddressMisaligned(u64),

    /// Raised when an instruction fetch targets memory outside RAM/device space.
    #[error("instruction access fault ({0:#x})")]
    InstructionAccessFault(u64),

    /// Raised when an instruction encoding is invalid or not implemented.
    #[error("illegal instruction ({0:#010x})")]
    IllegalInstruction(u32),

    /// Raised by `ebreak`.
    #[error("breakpoint at {0:#x}")]
    Breakpoint(u64),

    /// Raised when a load instruction accesses a misaligned address.
    #[error("load address misaligned ({0:#x})")]
    LoadAddressMisaligned(u64),

    /// Raised when a load targets memory outside RAM/device space.
    #[error("load access fault ({0:#x})")]
    LoadAccessFault(u64),

    /// Raised when a store instruction accesses a misaligned address.
    #[error("store address misaligned ({0:#x})")]
    StoreAddressMisaligned(u64),

    /// Raised when a store targets memory outside RAM/device space.
    #[error("store access fault ({0:#x})")]
    StoreAccessFault(u64),

    /// Raised by `ecall`.
    #[error("environment call")]
    EnvironmentCall,

    /// Raised when the host reports a floating-point invalid-operation,
    /// used for the deliberate DIV/REM-by-zero deviation (see `units::alu`).
    #[error("invalid operation")]
    InvalidOperation,

    /// Pipeline-internal marker for a trap requested by test harnesses or the
    /// CLI's `run` loop to stop simulation deterministically.
    #[error("requested trap ({0})")]
    RequestedTrap(u64),

    /// Raised when a trap occurs while the pipeline is still retiring a
    /// previous trap's redirect (should never happen; indicates a scheduling
    /// bug in `apply_tick`).
    #[error("double fault ({0:#x})")]
    DoubleFault(u64),
}

/// Result of a virtual-to-physical address translation.
///
/// Translation in this model is always the identity function within RAM and
/// device bounds (§4.6); the type still carries a trap slot so callers don't
/// need a separate fast/slow path.
#[derive(Debug)]
pub struct TranslationResult {
    /// Translated physical address, valid only when `trap.is_none()`.
    pub paddr: PhysAddr,
    /// Cycles this translation consumed (always 0 for identity translation).
    pub cycles: u64,
    /// Trap raised by this translation, if any.
    pub trap: Option<Trap>,
}

impl TranslationResult {
    /// Builds a successful translation result.
    #[inline]
    #[must_use]
    pub fn success(paddr: PhysAddr, cycles: u64) -> Self {
        Self {
            paddr,
            cycles,
            trap: None,
        }
    }

    /// Builds a translation result carrying a fault.
    #[inline]
    #[must_use]
    pub fn fault(trap: Trap, cycles: u64) -> Self {
        Self {
            paddr: PhysAddr::new(0),
            cycles,
            trap: Some(trap),
        }
    }
}
