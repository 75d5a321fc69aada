//! The four progressively-richer pipeline bundle shapes.
//!
//! Every bundle carries `pc`, the raw 32-bit encoding, and an exception slot
//! (`0` = none, else `(1<<30)|cause`, per [`crate::common::constants::EXCEPTION_SLOT_BIT`]).
//! Downstream stages that see a non-zero exception slot pass the bundle
//! through unchanged until WB invokes the redirect/exception handler.

use crate::isa::instruction::Decoded;

/// IF → ID.
#[derive(Clone, Debug)]
pub struct IfBundle {
    /// Program counter of this instruction.
    pub pc: u64,
    /// Raw encoding (16-bit compressed instructions are pre-expanded to 32
    /// bits by IF, so this is always the 32-bit form).
    pub raw: u32,
    /// Exception slot; `0` means no exception.
    pub exception: u64,
    /// True if the original encoding at `pc` was 16 bits. JAL/JALR's link
    /// address is `pc` plus the *original* instruction size, which the
    /// 32-bit-expanded `raw` no longer records.
    pub compressed: bool,
}

/// ID → EX.
#[derive(Clone, Debug)]
pub struct IdBundle {
    /// Program counter of this instruction.
    pub pc: u64,
    /// Raw encoding.
    pub raw: u32,
    /// Exception slot.
    pub exception: u64,
    /// Decoded instruction fields.
    pub decoded: Decoded,
    /// Control signals selected by ID's opcode dispatch.
    pub ctrl: super::signals::ControlSignals,
    /// See [`IfBundle::compressed`].
    pub compressed: bool,
}

/// EX → Mem.
#[derive(Clone, Debug)]
pub struct ExBundle {
    /// Program counter of this instruction.
    pub pc: u64,
    /// Raw encoding.
    pub raw: u32,
    /// Exception slot.
    pub exception: u64,
    /// Decoded instruction fields (Mem/WB need `rd`/funct3/opcode).
    pub decoded: Decoded,
    /// Control signals.
    pub ctrl: super::signals::ControlSignals,
    /// ALU/FPU/address-computation result. For loads/stores/AMOs this is the
    /// computed effective address; for everything else it is the value to
    /// write back (pending Mem's pass-through for non-memory ops).
    pub result: u64,
    /// Data to store, for STORE/STORE-FP/AMO.
    pub store_data: u64,
    /// Branch/jump target or FCSR OR-mask, consumed by WB (arg1 in spec terms).
    pub arg1: u64,
}

/// Mem → WB.
#[derive(Clone, Debug)]
pub struct MemBundle {
    /// Program counter of this instruction.
    pub pc: u64,
    /// Raw encoding.
    pub raw: u32,
    /// Exception slot.
    pub exception: u64,
    /// Decoded instruction fields.
    pub decoded: Decoded,
    /// Control signals.
    pub ctrl: super::signals::ControlSignals,
    /// Final value to write to `rd` (load data for LOAD/LOAD-FP/AMO/LR,
    /// ALU/FPU result otherwise).
    pub result: u64,
    /// Branch/jump target or FCSR OR-mask, consumed by WB.
    pub arg1: u64,
}
