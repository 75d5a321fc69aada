//! IF: translate, fetch a half-word, expand compressed encodings, and predict
//! the next PC.
//!
//! Every tick IF can push writes the sequential successor (`pc+2` or `pc+4`)
//! at [`NextCell`] priority 1. JAL's target needs no register read, so IF
//! computes and predicts it directly rather than stalling for EX; every other
//! control-flow instruction's real target is resolved later and, if it
//! differs from this guess, overwrites it at WB's priority 0.

use crate::common::constants::{
    COMPRESSED_INSTRUCTION_MASK, COMPRESSED_INSTRUCTION_VALUE, EXCEPTION_SLOT_BIT, INSTRUCTION_SIZE_16,
    INSTRUCTION_SIZE_32,
};
use crate::common::{AccessType, PhysAddr, VirtAddr};
use crate::isa::instruction::InstructionBits;
use crate::isa::rv64i::opcodes;
use crate::isa::rvc::expand::expand;
use crate::mem::Mem;
use crate::pipeline::bundle::IfBundle;
use crate::pipeline::channel::PipeChannel;
use crate::pipeline::nextcell::NextCell;

/// Runs one tick of IF. Returns `true` if IF had nothing to push because
/// `if_id` was already occupied (a structural stall).
pub fn fetch_stage(pc: &mut NextCell<u64>, mem: &Mem, if_id: &mut PipeChannel<IfBundle>) -> bool {
    if !if_id.can_accept() {
        return true;
    }
    let cur_pc = pc.get();
    let translation = mem.translate(VirtAddr::new(cur_pc), AccessType::Fetch);
    if let Some(trap) = translation.trap {
        let exception = EXCEPTION_SLOT_BIT | super::trap_cause(&trap);
        if_id.push(IfBundle {
            pc: cur_pc,
            raw: 0,
            exception,
            compressed: false,
        });
        pc.write(1, cur_pc.wrapping_add(INSTRUCTION_SIZE_32));
        return false;
    }

    let lo = mem.read_u16(translation.paddr);
    let is_compressed = (lo & COMPRESSED_INSTRUCTION_MASK) != COMPRESSED_INSTRUCTION_VALUE;
    let (raw, size) = if is_compressed {
        (expand(lo), INSTRUCTION_SIZE_16)
    } else {
        let hi = mem.read_u16(PhysAddr::new(translation.paddr.val() + 2));
        ((u32::from(hi) << 16) | u32::from(lo), INSTRUCTION_SIZE_32)
    };

    let exception = if is_compressed && raw == 0 {
        EXCEPTION_SLOT_BIT | crate::isa::cause::exception::ILLEGAL_INSTRUCTION
    } else {
        0
    };
    if_id.push(IfBundle {
        pc: cur_pc,
        raw,
        exception,
        compressed: is_compressed,
    });

    let next_pc = if exception == 0 && raw.opcode() == opcodes::OP_JAL {
        let imm = crate::isa::decode(raw).imm;
        cur_pc.wrapping_add(imm as u64)
    } else {
        cur_pc.wrapping_add(size)
    };
    pc.write(1, next_pc);
    false
}
