//! Mem: the only stage that touches data memory. Resolves LOAD/STORE/AMO
//! addresses EX computed into actual reads/writes, including LR/SC
//! reservation tracking; everything else passes through unchanged.

use crate::common::{AccessType, PhysAddr, Trap, VirtAddr};
use crate::isa::rv64a::funct3 as a_funct3;
use crate::isa::rv64i::funct3;
use crate::mem::atomic::{amo_op, ReservationSet};
use crate::mem::Mem;
use crate::pipeline::bundle::{ExBundle, MemBundle};
use crate::pipeline::channel::PipeChannel;

/// Runs one tick of Mem. Returns `true` if Mem had work but `mem_wb` was full.
pub fn memory_stage(
    mem: &mut Mem,
    reservations: &mut ReservationSet,
    ex_mem: &mut PipeChannel<ExBundle>,
    mem_wb: &mut PipeChannel<MemBundle>,
) -> bool {
    let Some(bundle) = ex_mem.peek() else {
        return false;
    };
    if !mem_wb.can_accept() {
        return true;
    }
    let bundle = bundle.clone();
    ex_mem.clear();

    if bundle.exception != 0 {
        mem_wb.push(MemBundle {
            pc: bundle.pc,
            raw: bundle.raw,
            exception: bundle.exception,
            decoded: bundle.decoded,
            ctrl: bundle.ctrl,
            result: 0,
            arg1: 0,
        });
        return false;
    }

    let ctrl = &bundle.ctrl;
    let d = &bundle.decoded;
    let (result, exception) = if ctrl.is_amo {
        dispatch_amo(mem, reservations, ctrl, d, bundle.result, bundle.store_data)
    } else if ctrl.is_load {
        dispatch_load(mem, ctrl, d, bundle.result)
    } else if ctrl.is_store {
        dispatch_store(mem, ctrl, d, bundle.result, bundle.store_data)
    } else {
        (bundle.result, 0)
    };

    mem_wb.push(MemBundle {
        pc: bundle.pc,
        raw: bundle.raw,
        exception,
        decoded: bundle.decoded,
        ctrl: bundle.ctrl,
        result,
        arg1: bundle.arg1,
    });
    false
}

fn dispatch_amo(
    mem: &mut Mem,
    reservations: &mut ReservationSet,
    ctrl: &crate::pipeline::signals::ControlSignals,
    d: &crate::isa::instruction::Decoded,
    addr: u64,
    operand: u64,
) -> (u64, u64) {
    let len = if d.funct3 == a_funct3::WIDTH_32 { 4 } else { 8 };
    let is32 = len == 4;
    if let Some(trap) = translate_fault(mem, addr, AccessType::Read) {
        return (0, trap);
    }
    let paddr = PhysAddr::new(addr);

    if ctrl.is_lr {
        reservations.reserve(addr);
        let raw = mem.read(paddr, len);
        return (sign_extend_load(raw, len, true), 0);
    }
    if ctrl.is_sc {
        return if reservations.consume(addr) {
            mem.write(paddr, len, operand);
            (0, 0)
        } else {
            (1, 0)
        };
    }

    let funct5_val = d.funct7 >> 2;
    let old = mem.read(paddr, len);
    let new = amo_op(funct5_val, is32, old, operand);
    mem.write(paddr, len, new);
    (sign_extend_load(old, len, true), 0)
}

fn dispatch_load(
    mem: &Mem,
    ctrl: &crate::pipeline::signals::ControlSignals,
    d: &crate::isa::instruction::Decoded,
    addr: u64,
) -> (u64, u64) {
    if let Some(trap) = translate_fault(mem, addr, AccessType::Read) {
        return (0, trap);
    }
    let paddr = PhysAddr::new(addr);
    if ctrl.rd_is_fp {
        let len = if ctrl.is_double { 8 } else { 4 };
        return (mem.read(paddr, len), 0);
    }
    let (len, signed) = match d.funct3 {
        funct3::LB => (1, true),
        funct3::LH => (2, true),
        funct3::LW => (4, true),
        funct3::LD => (8, true),
        funct3::LBU => (1, false),
        funct3::LHU => (2, false),
        funct3::LWU => (4, false),
        _ => (8, false),
    };
    (sign_extend_load(mem.read(paddr, len), len, signed), 0)
}

fn dispatch_store(
    mem: &mut Mem,
    ctrl: &crate::pipeline::signals::ControlSignals,
    d: &crate::isa::instruction::Decoded,
    addr: u64,
    data: u64,
) -> (u64, u64) {
    if let Some(trap) = translate_fault(mem, addr, AccessType::Write) {
        return (0, trap);
    }
    let len = if ctrl.rs2_is_fp {
        if ctrl.is_double { 8 } else { 4 }
    } else {
        match d.funct3 {
            funct3::SB => 1,
            funct3::SH => 2,
            funct3::SW => 4,
            _ => 8,
        }
    };
    mem.write(PhysAddr::new(addr), len, data);
    (0, 0)
}

fn translate_fault(mem: &Mem, addr: u64, access: AccessType) -> Option<u64> {
    let result = mem.translate(VirtAddr::new(addr), access);
    result
        .trap
        .map(|trap: Trap| crate::common::constants::EXCEPTION_SLOT_BIT | super::super::trap_cause(&trap))
}

fn sign_extend_load(raw: u64, len: u32, signed: bool) -> u64 {
    if !signed || len == 8 {
        return raw;
    }
    let bits = len * 8;
    crate::common::bits::sign_extend(raw as u32, bits) as u64
}
