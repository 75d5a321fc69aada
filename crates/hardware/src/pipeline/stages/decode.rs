//! ID: the pipeline's one-shot opcode dispatch.
//!
//! A bundle carrying an exception passes straight through untouched. Otherwise
//! ID decodes the raw 32-bit word (IF has already expanded any compressed
//! encoding) and builds the [`ControlSignals`] EX/Mem/WB will act on without
//! re-examining the opcode themselves. ID never reads a register and never
//! stalls on data hazards — only on `id_ex` already being full.

use crate::common::constants::EXCEPTION_SLOT_BIT;
use crate::isa::cause::exception;
use crate::isa::instruction::Decoded;
use crate::isa::rv64a::{funct3 as a_funct3, funct5, opcodes as a_opcodes};
use crate::isa::rv64d::funct7 as d_funct7;
use crate::isa::rv64f::{funct3 as f_funct3, funct7 as f_funct7, opcodes as f_opcodes};
use crate::isa::rv64i::{funct3, funct7, opcodes};
use crate::isa::rv64m::opcodes as m_opcodes;
use crate::isa::system;
use crate::pipeline::bundle::{IdBundle, IfBundle};
use crate::pipeline::channel::PipeChannel;
use crate::pipeline::signals::{AluOp, ControlSignals, CsrOp, FpuOp};

/// Runs one tick of ID. Returns `true` if ID had work but stalled because
/// `id_ex` was already occupied.
pub fn decode_stage(if_id: &mut PipeChannel<IfBundle>, id_ex: &mut PipeChannel<IdBundle>) -> bool {
    let Some(bundle) = if_id.peek() else {
        return false;
    };
    if !id_ex.can_accept() {
        return true;
    }
    let bundle = bundle.clone();
    if_id.clear();

    if bundle.exception != 0 {
        id_ex.push(IdBundle {
            pc: bundle.pc,
            raw: bundle.raw,
            exception: bundle.exception,
            decoded: Decoded::default(),
            ctrl: ControlSignals::default(),
            compressed: bundle.compressed,
        });
        return false;
    }

    let decoded = crate::isa::decode(bundle.raw);
    let (ctrl, illegal) = build_signals(&decoded);
    let exception = if illegal {
        EXCEPTION_SLOT_BIT | exception::ILLEGAL_INSTRUCTION
    } else {
        0
    };
    id_ex.push(IdBundle {
        pc: bundle.pc,
        raw: bundle.raw,
        exception,
        decoded,
        ctrl,
        compressed: bundle.compressed,
    });
    false
}

/// Builds control signals for a decoded instruction. Returns `(signals,
/// illegal)`; `illegal` is true for any opcode/funct combination this model
/// does not implement.
fn build_signals(d: &Decoded) -> (ControlSignals, bool) {
    let mut c = ControlSignals::default();
    match d.opcode {
        opcodes::OP_LUI => {
            c.alu_op = Some(AluOp::Pass);
            c.is_lui = true;
            c.writes_rd = true;
        }
        opcodes::OP_AUIPC => {
            c.alu_op = Some(AluOp::Pass);
            c.is_auipc = true;
            c.writes_rd = true;
        }
        opcodes::OP_JAL => {
            c.is_jump = true;
            c.writes_rd = true;
        }
        opcodes::OP_JALR => {
            c.is_jump = true;
            c.is_jalr = true;
            c.reads_rs1 = true;
            c.writes_rd = true;
        }
        opcodes::OP_BRANCH => {
            c.is_branch = true;
            c.reads_rs1 = true;
            c.reads_rs2 = true;
        }
        opcodes::OP_LOAD => {
            c.is_load = true;
            c.reads_rs1 = true;
            c.writes_rd = true;
            c.alu_op = Some(AluOp::Add);
        }
        f_opcodes::OP_LOAD_FP => {
            c.is_load = true;
            c.reads_rs1 = true;
            c.writes_rd = true;
            c.rd_is_fp = true;
            c.alu_op = Some(AluOp::Add);
            c.is_double = d.funct3 == funct3::LD;
        }
        opcodes::OP_STORE => {
            c.is_store = true;
            c.reads_rs1 = true;
            c.reads_rs2 = true;
            c.alu_op = Some(AluOp::Add);
        }
        f_opcodes::OP_STORE_FP => {
            c.is_store = true;
            c.reads_rs1 = true;
            c.reads_rs2 = true;
            c.rs2_is_fp = true;
            c.alu_op = Some(AluOp::Add);
            c.is_double = d.funct3 == funct3::SD;
        }
        opcodes::OP_MISC_MEM => {}
        opcodes::OP_IMM | opcodes::OP_IMM_32 => {
            c.reads_rs1 = true;
            c.writes_rd = true;
            c.is32 = d.opcode == opcodes::OP_IMM_32;
            let Some(op) = int_op(d.funct3, d.funct7, true) else {
                return (c, true);
            };
            c.alu_op = Some(op);
        }
        opcodes::OP_REG | opcodes::OP_REG_32 => {
            c.reads_rs1 = true;
            c.reads_rs2 = true;
            c.writes_rd = true;
            c.is32 = d.opcode == opcodes::OP_REG_32;
            if d.funct7 == m_opcodes::M_EXTENSION {
                let Some(op) = m_op(d.funct3) else {
                    return (c, true);
                };
                c.alu_op = Some(op);
            } else {
                let Some(op) = int_op(d.funct3, d.funct7, false) else {
                    return (c, true);
                };
                c.alu_op = Some(op);
            }
        }
        a_opcodes::OP_AMO => {
            c.is_amo = true;
            c.reads_rs1 = true;
            c.writes_rd = true;
            c.is32 = match d.funct3 {
                a_funct3::WIDTH_32 => true,
                a_funct3::WIDTH_64 => false,
                _ => return (c, true),
            };
            let amo_kind = d.funct7 >> 2;
            match amo_kind {
                funct5::LR => c.is_lr = true,
                funct5::SC => {
                    c.is_sc = true;
                    c.reads_rs2 = true;
                }
                _ => c.reads_rs2 = true,
            }
        }
        f_opcodes::OP_FP => {
            if let Some((op, is_double)) = fp_binary_op(d.funct3, d.funct7) {
                c.fpu_op = Some(op);
                c.is_double = is_double;
                set_fp_operand_shapes(&mut c, op);
                if matches!(op, FpuOp::CvtToInt | FpuOp::CvtFromInt) {
                    c.fcvt_sel = d.rs2 as u32;
                }
            } else {
                return (c, true);
            }
        }
        f_opcodes::OP_FMADD | f_opcodes::OP_FMSUB | f_opcodes::OP_FNMSUB | f_opcodes::OP_FNMADD => {
            c.fpu_op = Some(match d.opcode {
                f_opcodes::OP_FMADD => FpuOp::MAdd,
                f_opcodes::OP_FMSUB => FpuOp::MSub,
                f_opcodes::OP_FNMSUB => FpuOp::NMSub,
                _ => FpuOp::NMAdd,
            });
            c.is_double = (d.funct7 & 0b11) == 0b01;
            c.rs1_is_fp = true;
            c.rs2_is_fp = true;
            c.rs3_is_fp = true;
            c.rd_is_fp = true;
            c.reads_rs1 = true;
            c.reads_rs2 = true;
            c.reads_rs3 = true;
            c.writes_rd = true;
        }
        system::OP_SYSTEM => {
            c.writes_rd = true;
            match d.funct3 {
                system::FUNCT3_PRIV => match d.imm {
                    system::IMM_ECALL => c.is_ecall = true,
                    system::IMM_EBREAK => c.is_ebreak = true,
                    _ => return (c, true),
                },
                system::FUNCT3_CSRRW => {
                    c.csr_op = Some(CsrOp::Rw);
                    c.reads_rs1 = true;
                }
                system::FUNCT3_CSRRS => {
                    c.csr_op = Some(CsrOp::Rs);
                    c.reads_rs1 = true;
                }
                system::FUNCT3_CSRRC => {
                    c.csr_op = Some(CsrOp::Rc);
                    c.reads_rs1 = true;
                }
                system::FUNCT3_CSRRWI => {
                    c.csr_op = Some(CsrOp::Rw);
                    c.csr_imm = true;
                }
                system::FUNCT3_CSRRSI => {
                    c.csr_op = Some(CsrOp::Rs);
                    c.csr_imm = true;
                }
                system::FUNCT3_CSRRCI => {
                    c.csr_op = Some(CsrOp::Rc);
                    c.csr_imm = true;
                }
                _ => return (c, true),
            }
        }
        _ => return (c, true),
    }
    (c, false)
}

/// Shared ADD/SUB/logic/shift decode for `OP_IMM`/`OP_IMM_32`/`OP_REG`/`OP_REG_32`.
/// `is_imm` disables the SUB/ADD distinction (immediate forms have no SUB).
fn int_op(f3: u32, f7: u32, is_imm: bool) -> Option<AluOp> {
    Some(match f3 {
        funct3::ADD_SUB => {
            if !is_imm && f7 & funct7::SUB != 0 {
                AluOp::Sub
            } else {
                AluOp::Add
            }
        }
        funct3::SLL => AluOp::Sll,
        funct3::SLT => AluOp::Slt,
        funct3::SLTU => AluOp::Sltu,
        funct3::XOR => AluOp::Xor,
        funct3::SRL_SRA => {
            if f7 & funct7::SUB != 0 {
                AluOp::Sra
            } else {
                AluOp::Srl
            }
        }
        funct3::OR => AluOp::Or,
        funct3::AND => AluOp::And,
        _ => return None,
    })
}

fn m_op(f3: u32) -> Option<AluOp> {
    use crate::isa::rv64m::funct3 as m;
    Some(match f3 {
        m::MUL => AluOp::Mul,
        m::MULH => AluOp::Mulh,
        m::MULHSU => AluOp::Mulhsu,
        m::MULHU => AluOp::Mulhu,
        m::DIV => AluOp::Div,
        m::DIVU => AluOp::Divu,
        m::REM => AluOp::Rem,
        m::REMU => AluOp::Remu,
        _ => return None,
    })
}

/// Decodes `OP_FP`'s non-FMA operations. Returns `(op, is_double)`. The two
/// cross-width conversions (`fcvt.d.s`/`fcvt.s.d`) are special-cased since
/// their funct7 encodings don't follow the single/double low-bit convention
/// every other `OP_FP` funct7 pair does.
fn fp_binary_op(f3: u32, f7: u32) -> Option<(FpuOp, bool)> {
    if f7 == f_funct7::FCVT_DS {
        return Some((FpuOp::CvtDS, true));
    }
    if f7 == d_funct7::FCVT_S_D {
        return Some((FpuOp::CvtSD, true));
    }
    let is_double = f7 & 1 != 0;
    let base = f7 & !1;
    let op = match base {
        f_funct7::FADD => FpuOp::Add,
        f_funct7::FSUB => FpuOp::Sub,
        f_funct7::FMUL => FpuOp::Mul,
        f_funct7::FDIV => FpuOp::Div,
        f_funct7::FSQRT => FpuOp::Sqrt,
        f_funct7::FSGNJ => match f3 {
            f_funct3::FSGNJ => FpuOp::SgnJ,
            f_funct3::FSGNJN => FpuOp::SgnJn,
            f_funct3::FSGNJX => FpuOp::SgnJx,
            _ => return None,
        },
        f_funct7::FMIN_MAX => {
            if f3 == f_funct3::FMIN {
                FpuOp::Min
            } else {
                FpuOp::Max
            }
        }
        f_funct7::FCMP => match f3 {
            f_funct3::FEQ => FpuOp::Eq,
            f_funct3::FLT => FpuOp::Lt,
            f_funct3::FLE => FpuOp::Le,
            _ => return None,
        },
        f_funct7::FCLASS_MV_X_F => {
            if f3 == f_funct3::FCLASS {
                FpuOp::Class
            } else {
                FpuOp::MvToX
            }
        }
        f_funct7::FCVT_W_F => FpuOp::CvtToInt,
        f_funct7::FCVT_F_W => FpuOp::CvtFromInt,
        f_funct7::FMV_F_X => FpuOp::MvToF,
        _ => return None,
    };
    Some((op, is_double))
}

fn set_fp_operand_shapes(c: &mut ControlSignals, op: FpuOp) {
    c.writes_rd = true;
    match op {
        FpuOp::Add | FpuOp::Sub | FpuOp::Mul | FpuOp::Div | FpuOp::SgnJ | FpuOp::SgnJn | FpuOp::SgnJx | FpuOp::Min
        | FpuOp::Max => {
            c.rs1_is_fp = true;
            c.rs2_is_fp = true;
            c.rd_is_fp = true;
            c.reads_rs1 = true;
            c.reads_rs2 = true;
        }
        FpuOp::Sqrt => {
            c.rs1_is_fp = true;
            c.rd_is_fp = true;
            c.reads_rs1 = true;
        }
        FpuOp::Eq | FpuOp::Lt | FpuOp::Le => {
            c.rs1_is_fp = true;
            c.rs2_is_fp = true;
            c.reads_rs1 = true;
            c.reads_rs2 = true;
        }
        FpuOp::Class | FpuOp::MvToX | FpuOp::CvtToInt => {
            c.rs1_is_fp = true;
            c.reads_rs1 = true;
        }
        FpuOp::MvToF | FpuOp::CvtFromInt => {
            c.rd_is_fp = true;
            c.reads_rs1 = true;
        }
        FpuOp::CvtDS | FpuOp::CvtSD => {
            c.rs1_is_fp = true;
            c.rd_is_fp = true;
            c.reads_rs1 = true;
        }
        FpuOp::MAdd | FpuOp::MSub | FpuOp::NMSub | FpuOp::NMAdd => unreachable!("FMA handled separately"),
    }
}
