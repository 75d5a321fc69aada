//! WB: retires at most one instruction per tick — the serialization point for
//! register writes, CSR service, redirects, and exceptions.
//!
//! A taken branch or JALR is never predicted by IF, so WB always redirects
//! and flushes for those; a plain JAL/C.J was already predicted correctly at
//! fetch time, so WB only supplies the link value, never a redirect. An
//! exception (whether raised upstream or by ECALL/EBREAK here) always
//! redirects and flushes, handing the cause to an [`ExceptionHook`] the
//! embedding `Cpu` supplies.

use crate::common::constants::EXCEPTION_SLOT_BIT;
use crate::common::RegisterFile;
use crate::csr::CsrFile;
use crate::isa::cause::exception;
use crate::mem::atomic::ReservationSet;
use crate::pipeline::bundle::{ExBundle, IdBundle, IfBundle, MemBundle};
use crate::pipeline::channel::PipeChannel;
use crate::pipeline::nextcell::NextCell;
use crate::pipeline::scoreboard::BusyMask;
use crate::pipeline::signals::CsrOp;

/// Environment hook invoked whenever WB retires an exception (upstream fault,
/// `ecall`, or `ebreak`). Returns the PC to resume at, or `None` to halt the
/// simulation — this model has no trap-vector CSR, so resumption is entirely
/// up to the embedder (a test harness might resume at `pc+4`; a `run` loop
/// might always halt).
pub trait ExceptionHook {
    /// `cause` is the plain RISC-V exception code (the slot's low bits, with
    /// [`crate::common::constants::EXCEPTION_SLOT_BIT`] already stripped).
    fn on_exception(&mut self, pc: u64, cause: u64) -> Option<u64>;
}

/// What WB did this tick, for the engine's stats counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct WritebackOutcome {
    /// True if an instruction retired (committed state, trapped or not).
    pub retired: bool,
    /// True if this tick's redirect was a branch/jump misprediction or a trap.
    pub flushed: bool,
    /// True if this tick serviced an exception (upstream fault, `ecall`, or
    /// `ebreak`), regardless of whether the hook chose to resume.
    pub trapped: bool,
    /// True if the hook declined to resume — the caller should stop ticking.
    pub halted: bool,
}

/// Runs one tick of WB.
#[allow(clippy::too_many_arguments)]
pub fn writeback_stage(
    regs: &mut RegisterFile,
    busy: &mut BusyMask,
    csr: &mut CsrFile,
    reservations: &mut ReservationSet,
    pc: &mut NextCell<u64>,
    if_id: &mut PipeChannel<IfBundle>,
    id_ex: &mut PipeChannel<IdBundle>,
    ex_mem: &mut PipeChannel<ExBundle>,
    mem_wb: &mut PipeChannel<MemBundle>,
    hook: &mut dyn ExceptionHook,
) -> WritebackOutcome {
    let Some(bundle) = mem_wb.peek() else {
        return WritebackOutcome::default();
    };
    let bundle = bundle.clone();
    mem_wb.clear();

    let flush_in_flight = |if_id: &mut PipeChannel<IfBundle>,
                            id_ex: &mut PipeChannel<IdBundle>,
                            ex_mem: &mut PipeChannel<ExBundle>,
                            busy: &mut BusyMask,
                            reservations: &mut ReservationSet| {
        if_id.flush();
        id_ex.flush();
        ex_mem.flush();
        busy.flush();
        reservations.clear();
    };

    if bundle.exception != 0 {
        let cause = bundle.exception & !EXCEPTION_SLOT_BIT;
        let resume = hook.on_exception(bundle.pc, cause);
        flush_in_flight(if_id, id_ex, ex_mem, busy, reservations);
        return match resume {
            Some(target) => {
                pc.write(0, target);
                WritebackOutcome {
                    retired: false,
                    flushed: true,
                    trapped: true,
                    halted: false,
                }
            }
            None => WritebackOutcome {
                retired: false,
                flushed: true,
                trapped: true,
                halted: true,
            },
        };
    }

    let ctrl = &bundle.ctrl;
    let d = &bundle.decoded;

    if ctrl.is_ecall || ctrl.is_ebreak {
        let cause = if ctrl.is_ecall {
            exception::ENVIRONMENT_CALL_FROM_M_MODE
        } else {
            exception::BREAKPOINT
        };
        let resume = hook.on_exception(bundle.pc, cause);
        flush_in_flight(if_id, id_ex, ex_mem, busy, reservations);
        csr.instret += 1;
        return match resume {
            Some(target) => {
                pc.write(0, target);
                WritebackOutcome {
                    retired: true,
                    flushed: true,
                    trapped: true,
                    halted: false,
                }
            }
            None => WritebackOutcome {
                retired: true,
                flushed: true,
                trapped: true,
                halted: true,
            },
        };
    }

    let mut flushed = false;
    if ctrl.is_branch {
        if bundle.result == 1 {
            pc.write(0, bundle.arg1);
            flush_in_flight(if_id, id_ex, ex_mem, busy, reservations);
            flushed = true;
        }
    } else if ctrl.is_jalr {
        pc.write(0, bundle.arg1);
        flush_in_flight(if_id, id_ex, ex_mem, busy, reservations);
        flushed = true;
    }

    if ctrl.fpu_op.is_some() {
        csr.or_fflags(bundle.arg1 as u32);
    }

    if let Some(csr_op) = ctrl.csr_op {
        let addr = d.csr;
        let old = csr.read(addr);
        let operand = bundle.result;
        let new = match csr_op {
            CsrOp::Rw => operand,
            CsrOp::Rs => old | operand,
            CsrOp::Rc => old & !operand,
        };
        // csrrs/csrrc (and their *i forms) with a zero source perform the
        // read without writing, matching the Zicsr "no side effect" rule.
        let skip_write = matches!(csr_op, CsrOp::Rs | CsrOp::Rc) && operand == 0;
        if !skip_write {
            csr.write(addr, new);
        }
        if d.rd != 0 {
            regs.write(d.rd, old);
        }
    } else if ctrl.writes_rd && d.rd != 0 {
        if ctrl.rd_is_fp {
            regs.write_f(d.rd, bundle.result);
        } else {
            regs.write(d.rd, bundle.result);
        }
    }

    if ctrl.writes_rd {
        busy.clear(ctrl.rd_is_fp, d.rd);
    }

    csr.instret += 1;
    WritebackOutcome {
        retired: true,
        flushed,
        trapped: false,
        halted: false,
    }
}
