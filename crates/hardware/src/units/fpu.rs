//! Floating-Point Unit.
//!
//! Implements the F/D-extension operations EX can dispatch to. Every
//! operation clears the host's IEEE exception flags first, performs the work
//! in the host's native `f32`/`f64` arithmetic, then reads the flags back and
//! maps them onto [`FpFlags`] for the caller to OR into `fcsr`. Any NaN
//! produced by ADD/SUB/MUL/DIV/SQRT/SGNJ/MIN/MAX/MVF2I/CVTI2F is rewritten to
//! the canonical quiet-NaN pattern for its width before being returned.

use crate::common::bits::{
    canonicalize_f32, canonicalize_f64, clear_host_fp_flags, nan_box, nan_unbox,
    read_host_fp_flags, FpFlags,
};
use crate::pipeline::signals::FpuOp;

/// Outcome of a single FPU dispatch.
#[derive(Clone, Copy, Debug)]
pub struct FpuResult {
    /// Result bits — a NaN-boxed `f32` or raw `f64` bit pattern when
    /// `is_int` is false, or an integer value when `is_int` is true
    /// (FCVT-to-int, FCLASS, FMV.X.*, FEQ/FLT/FLE).
    pub bits: u64,
    /// IEEE exception flags raised by this operation.
    pub flags: FpFlags,
    /// True if `bits` should be written to an integer register rather than
    /// an FP register.
    pub is_int: bool,
}

/// Floating-Point Unit.
pub struct Fpu;

impl Fpu {
    /// Executes a floating-point operation.
    ///
    /// `rs2_sel` carries the `rs2` field's raw value for the conversion
    /// opcodes, which encode signed/unsigned and word/doubleword target
    /// selection in that field rather than in `funct3` (`0`=W, `1`=WU,
    /// `2`=L, `3`=LU, matching the F/D extension's FCVT encoding).
    #[must_use]
    pub fn execute(op: FpuOp, a: u64, b: u64, c: u64, is_double: bool, rs2_sel: u32) -> FpuResult {
        clear_host_fp_flags();
        let result = if is_double {
            Self::execute_f64(op, a, b, c, rs2_sel)
        } else {
            Self::execute_f32(op, a, b, c, rs2_sel)
        };
        let flags = read_host_fp_flags();
        FpuResult { flags, ..result }
    }

    #[allow(clippy::too_many_lines)]
    fn execute_f64(op: FpuOp, a: u64, b: u64, c: u64, rs2_sel: u32) -> FpuResult {
        let fa = f64::from_bits(a);
        let fb = f64::from_bits(b);
        let fc = f64::from_bits(c);
        let fp = |v: f64| FpuResult {
            bits: canonicalize_f64(v).to_bits(),
            flags: FpFlags::NONE,
            is_int: false,
        };
        let int = |v: u64| FpuResult {
            bits: v,
            flags: FpFlags::NONE,
            is_int: true,
        };
        match op {
            FpuOp::Add => fp(fa + fb),
            FpuOp::Sub => fp(fa - fb),
            FpuOp::Mul => fp(fa * fb),
            FpuOp::Div => fp(fa / fb),
            FpuOp::Sqrt => fp(fa.sqrt()),
            FpuOp::MAdd => fp(fa.mul_add(fb, fc)),
            FpuOp::MSub => fp(fa.mul_add(fb, -fc)),
            FpuOp::NMSub => fp(-fa.mul_add(fb, -fc)),
            FpuOp::NMAdd => fp(-fa.mul_add(fb, fc)),
            FpuOp::SgnJ => fp(fa.abs().copysign(fb)),
            FpuOp::SgnJn => fp(fa.abs().copysign(-fb)),
            FpuOp::SgnJx => {
                let sign = if (fa.is_sign_negative()) != (fb.is_sign_negative()) {
                    -1.0
                } else {
                    1.0
                };
                fp(fa.abs() * sign)
            }
            FpuOp::Min => fp(fmin(fa, fb)),
            FpuOp::Max => fp(fmax(fa, fb)),
            FpuOp::Eq => int(u64::from(fa == fb)),
            FpuOp::Lt => int(u64::from(fa < fb)),
            FpuOp::Le => int(u64::from(fa <= fb)),
            FpuOp::Class => int(u64::from(classify_f64(fa))),
            FpuOp::MvToX => int(a),
            FpuOp::MvToF => fp(f64::from_bits(a)),
            FpuOp::CvtToInt => int(cvt_f64_to_int(fa, rs2_sel)),
            FpuOp::CvtFromInt => fp(cvt_int_to_f64(a, rs2_sel)),
            FpuOp::CvtDS => fp(f64::from(nan_unbox(a))),
            FpuOp::CvtSD => FpuResult {
                bits: u64::from(canonicalize_f32(fa as f32).to_bits()),
                flags: FpFlags::NONE,
                is_int: false,
            },
        }
    }

    #[allow(clippy::too_many_lines)]
    fn execute_f32(op: FpuOp, a: u64, b: u64, c: u64, rs2_sel: u32) -> FpuResult {
        let fa = nan_unbox(a);
        let fb = nan_unbox(b);
        let fc = nan_unbox(c);
        let fp = |v: f32| FpuResult {
            bits: nan_box(canonicalize_f32(v)),
            flags: FpFlags::NONE,
            is_int: false,
        };
        let int = |v: u64| FpuResult {
            bits: v,
            flags: FpFlags::NONE,
            is_int: true,
        };
        match op {
            FpuOp::Add => fp(fa + fb),
            FpuOp::Sub => fp(fa - fb),
            FpuOp::Mul => fp(fa * fb),
            FpuOp::Div => fp(fa / fb),
            FpuOp::Sqrt => fp(fa.sqrt()),
            FpuOp::MAdd => fp(fa.mul_add(fb, fc)),
            FpuOp::MSub => fp(fa.mul_add(fb, -fc)),
            FpuOp::NMSub => fp(-fa.mul_add(fb, -fc)),
            FpuOp::NMAdd => fp(-fa.mul_add(fb, fc)),
            FpuOp::SgnJ => fp(fa.abs().copysign(fb)),
            FpuOp::SgnJn => fp(fa.abs().copysign(-fb)),
            FpuOp::SgnJx => {
                let sign = if (fa.is_sign_negative()) != (fb.is_sign_negative()) {
                    -1.0
                } else {
                    1.0
                };
                fp(fa.abs() * sign)
            }
            FpuOp::Min => fp(fmin32(fa, fb)),
            FpuOp::Max => fp(fmax32(fa, fb)),
            FpuOp::Eq => int(u64::from(fa == fb)),
            FpuOp::Lt => int(u64::from(fa < fb)),
            FpuOp::Le => int(u64::from(fa <= fb)),
            FpuOp::Class => int(u64::from(classify_f32(fa))),
            FpuOp::MvToX => int(u64::from(a as u32)),
            FpuOp::MvToF => fp(f32::from_bits(a as u32)),
            FpuOp::CvtToInt => int(cvt_f32_to_int(fa, rs2_sel)),
            FpuOp::CvtFromInt => fp(cvt_int_to_f32(a, rs2_sel)),
            FpuOp::CvtDS => fp(fa),
            FpuOp::CvtSD => fp(fa),
        }
    }
}

fn fmin(a: f64, b: f64) -> f64 {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.min(b)
    }
}
fn fmax(a: f64, b: f64) -> f64 {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.max(b)
    }
}
fn fmin32(a: f32, b: f32) -> f32 {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.min(b)
    }
}
fn fmax32(a: f32, b: f32) -> f32 {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.max(b)
    }
}

/// RISC-V FCLASS result for f64: classifies into one of 10 categories.
fn classify_f64(v: f64) -> u32 {
    let bits = v.to_bits();
    let sign = bits >> 63;
    let exp = (bits >> 52) & 0x7FF;
    let frac = bits & 0xF_FFFF_FFFF_FFFF;
    if exp == 0x7FF && frac != 0 {
        return if frac & (1 << 51) != 0 { 1 << 9 } else { 1 << 8 };
    }
    if exp == 0x7FF {
        return if sign == 1 { 1 << 0 } else { 1 << 7 };
    }
    if exp == 0 && frac == 0 {
        return if sign == 1 { 1 << 3 } else { 1 << 4 };
    }
    if exp == 0 {
        return if sign == 1 { 1 << 2 } else { 1 << 5 };
    }
    if sign == 1 { 1 << 1 } else { 1 << 6 }
}

/// RISC-V FCLASS result for f32.
fn classify_f32(v: f32) -> u32 {
    let bits = v.to_bits();
    let sign = bits >> 31;
    let exp = (bits >> 23) & 0xFF;
    let frac = bits & 0x007F_FFFF;
    if exp == 0xFF && frac != 0 {
        return if frac & 0x0040_0000 != 0 { 1 << 9 } else { 1 << 8 };
    }
    if exp == 0xFF {
        return if sign == 1 { 1 << 0 } else { 1 << 7 };
    }
    if exp == 0 && frac == 0 {
        return if sign == 1 { 1 << 3 } else { 1 << 4 };
    }
    if exp == 0 {
        return if sign == 1 { 1 << 2 } else { 1 << 5 };
    }
    if sign == 1 { 1 << 1 } else { 1 << 6 }
}

// Rust's `f as i32` (etc.) saturates correctly for +-Inf and out-of-range
// values, but produces 0 for NaN. RISC-V requires positive-max for NaN.

/// Converts an f64 to i32 per RISC-V conversion semantics (NaN -> `i32::MAX`).
fn f64_to_i32_rv(v: f64) -> i32 {
    if v.is_nan() { i32::MAX } else { v as i32 }
}

/// Converts an f64 to u32 per RISC-V conversion semantics (NaN -> `u32::MAX`).
fn f64_to_u32_rv(v: f64) -> u32 {
    if v.is_nan() { u32::MAX } else { v as u32 }
}

/// Converts an f64 to i64 per RISC-V conversion semantics (NaN -> `i64::MAX`).
fn f64_to_i64_rv(v: f64) -> i64 {
    if v.is_nan() { i64::MAX } else { v as i64 }
}

/// Converts an f64 to u64 per RISC-V conversion semantics (NaN -> `u64::MAX`).
fn f64_to_u64_rv(v: f64) -> u64 {
    if v.is_nan() { u64::MAX } else { v as u64 }
}

fn cvt_f64_to_int(v: f64, rs2_sel: u32) -> u64 {
    match rs2_sel & 0x3 {
        0 => f64_to_i32_rv(v) as i64 as u64,
        1 => u64::from(f64_to_u32_rv(v)),
        3 => f64_to_u64_rv(v),
        _ => f64_to_i64_rv(v) as u64,
    }
}
fn cvt_int_to_f64(bits: u64, rs2_sel: u32) -> f64 {
    match rs2_sel & 0x3 {
        0 => f64::from(bits as i32),
        1 => f64::from(bits as u32),
        3 => bits as f64,
        _ => (bits as i64) as f64,
    }
}
fn cvt_f32_to_int(v: f32, rs2_sel: u32) -> u64 {
    cvt_f64_to_int(f64::from(v), rs2_sel)
}
fn cvt_int_to_f32(bits: u64, rs2_sel: u32) -> f32 {
    match rs2_sel & 0x3 {
        0 => (bits as i32) as f32,
        1 => (bits as u32) as f32,
        3 => bits as f32,
        _ => (bits as i64) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_f64_canonicalizes_nan() {
        let r = Fpu::execute(FpuOp::Add, f64::INFINITY.to_bits(), (-f64::INFINITY).to_bits(), 0, true, 0);
        assert!(f64::from_bits(r.bits).is_nan());
        assert_eq!(r.bits, crate::common::bits::CANONICAL_NAN_F64);
    }

    #[test]
    fn sgnj_f32_copies_sign() {
        let r = Fpu::execute(FpuOp::SgnJ, nan_box(1.5), nan_box(-1.0), 0, false, 0);
        assert_eq!(nan_unbox(r.bits), -1.5);
    }

    #[test]
    fn feq_integer_result() {
        let r = Fpu::execute(FpuOp::Eq, nan_box(2.0), nan_box(2.0), 0, false, 0);
        assert!(r.is_int);
        assert_eq!(r.bits, 1);
    }
}
