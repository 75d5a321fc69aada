//! Integer Arithmetic Logic Unit.
//!
//! Implements every RV64I/M integer ALU operation EX can dispatch to. Results
//! for the `is32` (`*W`-suffixed) forms are always sign-extended from bit 31,
//! per the RISC-V spec's register-width semantics.
//!
//! DIV/REM-by-zero deliberately signals the invalid-operation flag instead of
//! returning the RISC-V-mandated defined result (all-ones / the dividend):
//! this deviates from the ISA manual on purpose, to give the pipeline a
//! single uniform "helper signalled invalid" path shared with the FPU rather
//! than special-casing division. The flag is read at the EX/Mem boundary and
//! folded into the bundle's exception slot as `ILLEGAL_INST`-adjacent
//! `INVALID_OPERATION`, never silently "fixed" to match the manual.

use crate::pipeline::signals::AluOp;

/// Number of bits in a 32-bit word (used for high-multiply shift amounts).
const WORD_BITS: u32 = 32;
/// Number of bits in XLEN for RV64 (used for high-multiply shift amounts).
const XLEN_BITS: u32 = 64;

/// Integer Arithmetic Logic Unit.
pub struct Alu;

impl Alu {
    /// Executes an integer ALU operation.
    ///
    /// Returns the 64-bit result (sign-extended from bit 31 when `is32`) and
    /// a flag that is `true` only for DIV/DIVU/REM/REMU with a zero divisor —
    /// the deliberate invalid-operation deviation described on this module.
    #[must_use]
    pub fn execute(op: AluOp, a: u64, b: u64, is32: bool) -> (u64, bool) {
        match op {
            AluOp::Add => (
                if is32 {
                    (a as i32).wrapping_add(b as i32) as i64 as u64
                } else {
                    a.wrapping_add(b)
                },
                false,
            ),
            AluOp::Sub => (
                if is32 {
                    (a as i32).wrapping_sub(b as i32) as i64 as u64
                } else {
                    a.wrapping_sub(b)
                },
                false,
            ),
            AluOp::Mul => (
                if is32 {
                    (a as i32).wrapping_mul(b as i32) as i64 as u64
                } else {
                    a.wrapping_mul(b)
                },
                false,
            ),
            AluOp::Mulh => (
                if is32 {
                    ((i64::from(a as i32) * i64::from(b as i32)) >> WORD_BITS) as u64
                } else {
                    (((a as i64 as i128) * (b as i64 as i128)) >> XLEN_BITS) as u64
                },
                false,
            ),
            AluOp::Mulhsu => (
                if is32 {
                    (i64::from(a as i32) * i64::from(b as u32) >> WORD_BITS) as u64
                } else {
                    (((a as i64 as i128) * i128::from(b)) >> XLEN_BITS) as u64
                },
                false,
            ),
            AluOp::Mulhu => (
                if is32 {
                    (u64::from(a as u32) * u64::from(b as u32) >> WORD_BITS) as i32 as i64 as u64
                } else {
                    ((u128::from(a) * u128::from(b)) >> XLEN_BITS) as u64
                },
                false,
            ),
            AluOp::Div => {
                let zero = if is32 { (b as u32) == 0 } else { b == 0 };
                if zero {
                    (0, true)
                } else if is32 {
                    (((a as i32).wrapping_div(b as i32)) as i64 as u64, false)
                } else {
                    ((a as i64).wrapping_div(b as i64) as u64, false)
                }
            }
            AluOp::Divu => {
                let zero = if is32 { (b as u32) == 0 } else { b == 0 };
                if zero {
                    (0, true)
                } else if is32 {
                    (((a as u32) / (b as u32)) as i32 as i64 as u64, false)
                } else {
                    (a / b, false)
                }
            }
            AluOp::Rem => {
                let zero = if is32 { (b as u32) == 0 } else { b == 0 };
                if zero {
                    (0, true)
                } else if is32 {
                    (((a as i32).wrapping_rem(b as i32)) as i64 as u64, false)
                } else {
                    ((a as i64).wrapping_rem(b as i64) as u64, false)
                }
            }
            AluOp::Remu => {
                let zero = if is32 { (b as u32) == 0 } else { b == 0 };
                if zero {
                    (0, true)
                } else if is32 {
                    (((a as u32) % (b as u32)) as i32 as i64 as u64, false)
                } else {
                    (a % b, false)
                }
            }
            AluOp::Or => (if is32 { ((a | b) as i32) as i64 as u64 } else { a | b }, false),
            AluOp::And => (if is32 { ((a & b) as i32) as i64 as u64 } else { a & b }, false),
            AluOp::Xor => (if is32 { ((a ^ b) as i32) as i64 as u64 } else { a ^ b }, false),
            AluOp::Slt => (u64::from((a as i64) < (b as i64)), false),
            AluOp::Sltu => (u64::from(a < b), false),
            AluOp::Sll => (
                if is32 {
                    (a as i32).wrapping_shl(b as u32 & 0x1F) as i64 as u64
                } else {
                    a.wrapping_shl(b as u32 & 0x3F)
                },
                false,
            ),
            AluOp::Srl => (
                if is32 {
                    crate::common::bits::srlw_then_sext(a as u32, b as u32) as u64
                } else {
                    a.wrapping_shr(b as u32 & 0x3F)
                },
                false,
            ),
            AluOp::Sra => (
                if is32 {
                    ((a as i32).wrapping_shr(b as u32 & 0x1F)) as i64 as u64
                } else {
                    ((a as i64).wrapping_shr(b as u32 & 0x3F)) as u64
                },
                false,
            ),
            _ => (0, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub_wrap() {
        assert_eq!(Alu::execute(AluOp::Add, 42, 8, false).0, 50);
        assert_eq!(Alu::execute(AluOp::Add, 0xFFFF_FFFF, 1, true).0, 0);
    }

    #[test]
    fn div_by_zero_signals_invalid() {
        let (_, invalid) = Alu::execute(AluOp::Div, 10, 0, false);
        assert!(invalid);
        let (_, invalid) = Alu::execute(AluOp::Remu, 10, 0, true);
        assert!(invalid);
    }

    #[test]
    fn slt_signed_comparison() {
        assert_eq!(Alu::execute(AluOp::Slt, (-5i64) as u64, 10, false).0, 1);
    }

    #[test]
    fn divu_unsigned() {
        assert_eq!(Alu::execute(AluOp::Divu, 100, 7, false).0, 14);
    }
}
