//! EX: reads up to three sources, locks the destination, and dispatches the
//! ALU/FPU/AMO-address computation control signals selected.
//!
//! EX is where the scoreboard's structural hazard is actually enforced: if
//! any source register this instruction reads is still locked by an older
//! in-flight instruction, EX stalls — it neither pops `id_ex` nor pushes
//! `ex_mem` — until that register clears. This is the only place the pipeline
//! stalls on data, as opposed to structural (channel-full), hazards.

use crate::common::RegisterFile;
use crate::isa::rv64i::funct3;
use crate::pipeline::bundle::{ExBundle, IdBundle};
use crate::pipeline::channel::PipeChannel;
use crate::pipeline::scoreboard::BusyMask;
use crate::pipeline::signals::{AluOp, ControlSignals};
use crate::units::{Alu, Fpu};

/// Runs one tick of EX. Returns `true` if EX had work but stalled — either on
/// `ex_mem` being full, or on a source register the scoreboard reports busy.
pub fn execute_stage(
    regs: &RegisterFile,
    busy: &mut BusyMask,
    id_ex: &mut PipeChannel<IdBundle>,
    ex_mem: &mut PipeChannel<ExBundle>,
) -> bool {
    let Some(bundle) = id_ex.peek() else {
        return false;
    };
    if !ex_mem.can_accept() {
        return true;
    }

    if bundle.exception != 0 {
        let bundle = bundle.clone();
        id_ex.clear();
        ex_mem.push(ExBundle {
            pc: bundle.pc,
            raw: bundle.raw,
            exception: bundle.exception,
            decoded: bundle.decoded,
            ctrl: bundle.ctrl,
            result: 0,
            store_data: 0,
            arg1: 0,
        });
        return false;
    }

    let ctrl = &bundle.ctrl;
    let d = &bundle.decoded;
    if (ctrl.reads_rs1 && busy.is_busy(ctrl.rs1_is_fp, d.rs1))
        || (ctrl.reads_rs2 && busy.is_busy(ctrl.rs2_is_fp, d.rs2))
        || (ctrl.reads_rs3 && busy.is_busy(ctrl.rs3_is_fp, d.rs3))
    {
        return true;
    }

    let bundle = bundle.clone();
    id_ex.clear();

    let read1 = |is_fp: bool, idx: usize| if is_fp { regs.read_f(idx) } else { regs.read(idx) };
    let rs1 = read1(ctrl.rs1_is_fp, d.rs1);
    let rs2 = read1(ctrl.rs2_is_fp, d.rs2);
    let rs3 = read1(ctrl.rs3_is_fp, d.rs3);

    if ctrl.writes_rd && d.rd != 0 {
        busy.lock(ctrl.rd_is_fp, d.rd);
    }

    let (result, store_data, arg1, invalid) = dispatch(&bundle.pc, bundle.compressed, d, ctrl, rs1, rs2, rs3);
    let exception = if invalid {
        crate::common::constants::EXCEPTION_SLOT_BIT | crate::isa::cause::exception::ILLEGAL_INSTRUCTION
    } else {
        0
    };

    ex_mem.push(ExBundle {
        pc: bundle.pc,
        raw: bundle.raw,
        exception,
        decoded: bundle.decoded,
        ctrl: bundle.ctrl,
        result,
        store_data,
        arg1,
    });
    false
}

/// Computes `(result, store_data, arg1, invalid)` for every control-signal
/// shape EX can see. `invalid` mirrors the ALU/FPU invalid-operation signal
/// (see `units::alu`), folded into an exception by the caller.
fn dispatch(
    pc: &u64,
    compressed: bool,
    d: &crate::isa::instruction::Decoded,
    ctrl: &ControlSignals,
    rs1: u64,
    rs2: u64,
    rs3: u64,
) -> (u64, u64, u64, bool) {
    if ctrl.is_lui {
        return (d.imm as u64, 0, 0, false);
    }
    if ctrl.is_auipc {
        return (pc.wrapping_add(d.imm as u64), 0, 0, false);
    }
    if ctrl.is_branch {
        let taken = branch_taken(d.funct3, rs1, rs2);
        let target = pc.wrapping_add(d.imm as u64);
        return (u64::from(taken), 0, target, false);
    }
    let link = pc.wrapping_add(if compressed { 2 } else { 4 });
    if ctrl.is_jalr {
        let target = rs1.wrapping_add(d.imm as u64) & !1u64;
        return (link, 0, target, false);
    }
    if ctrl.is_jump {
        // Plain JAL/C.J: IF already predicted and committed this target, so
        // WB must not redirect again — only the link value matters here.
        let target = pc.wrapping_add(d.imm as u64);
        return (link, 0, target, false);
    }
    if ctrl.is_amo {
        return (rs1, rs2, 0, false);
    }
    if ctrl.is_load || ctrl.is_store {
        let (addr, _) = Alu::execute(AluOp::Add, rs1, d.imm as u64, false);
        return (addr, rs2, 0, false);
    }
    if let Some(op) = ctrl.fpu_op {
        let r = Fpu::execute(op, rs1, rs2, rs3, ctrl.is_double, ctrl.fcvt_sel);
        return (r.bits, 0, u64::from(r.flags.0), false);
    }
    if let Some(op) = ctrl.alu_op {
        let b = if ctrl.reads_rs2 { rs2 } else { d.imm as u64 };
        let (value, invalid) = Alu::execute(op, rs1, b, ctrl.is32);
        return (value, 0, 0, invalid);
    }
    if ctrl.csr_op.is_some() {
        let value = if ctrl.csr_imm { d.rs1 as u64 } else { rs1 };
        return (value, 0, 0, false);
    }
    // FENCE/FENCE.I/ECALL/EBREAK: nothing to compute, WB acts on the flags.
    (0, 0, 0, false)
}

fn branch_taken(f3: u32, a: u64, b: u64) -> bool {
    match f3 {
        funct3::BEQ => a == b,
        funct3::BNE => a != b,
        funct3::BLT => (a as i64) < (b as i64),
        funct3::BGE => (a as i64) >= (b as i64),
        funct3::BLTU => a < b,
        funct3::BGEU => a >= b,
        _ => false,
    }
}
