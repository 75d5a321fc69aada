//! Hand-rolled R/I/S/B-type encoders for the handful of instructions the
//! integration tests need, mirroring the field layouts `isa/decode.rs`
//! extracts. Not a general assembler — just enough to write short test
//! programs without hex soup.

use vulsim_hw::isa::rv64a::{funct3 as a_funct3, funct5, opcodes as a_opcodes};
use vulsim_hw::isa::rv64i::{funct3, opcodes};

#[must_use]
pub fn r_type(opcode: u32, funct3: u32, funct7: u32, rd: u32, rs1: u32, rs2: u32) -> u32 {
    (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

#[must_use]
pub fn i_type(opcode: u32, funct3: u32, rd: u32, rs1: u32, imm: i32) -> u32 {
    ((imm as u32) << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

#[must_use]
pub fn s_type(opcode: u32, funct3: u32, rs1: u32, rs2: u32, imm: i32) -> u32 {
    let imm = imm as u32;
    let high = (imm >> 5) & 0x7F;
    let low = imm & 0x1F;
    (high << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (low << 7) | opcode
}

#[must_use]
pub fn u_type(opcode: u32, rd: u32, imm: u32) -> u32 {
    (imm & 0xFFFF_F000) | (rd << 7) | opcode
}

#[must_use]
pub fn auipc(rd: u32, imm: u32) -> u32 {
    u_type(opcodes::OP_AUIPC, rd, imm)
}

#[must_use]
pub fn b_type(funct3: u32, rs1: u32, rs2: u32, rd_offset: i32) -> u32 {
    let imm = rd_offset as u32;
    let bit_12 = (imm >> 12) & 1;
    let bit_11 = (imm >> 11) & 1;
    let bits_10_5 = (imm >> 5) & 0x3F;
    let bits_4_1 = (imm >> 1) & 0xF;
    (bit_12 << 31) | (bits_10_5 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (bits_4_1 << 8) | (bit_11 << 7) | opcodes::OP_BRANCH
}

#[must_use]
pub fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(opcodes::OP_IMM, funct3::ADD_SUB, rd, rs1, imm)
}

#[must_use]
pub fn add(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(opcodes::OP_REG, funct3::ADD_SUB, 0, rd, rs1, rs2)
}

#[must_use]
pub fn sub(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(opcodes::OP_REG, funct3::ADD_SUB, 0b0100000, rd, rs1, rs2)
}

#[must_use]
pub fn beq(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(funct3::BEQ, rs1, rs2, offset)
}

#[must_use]
pub fn sd(rs1: u32, rs2: u32, imm: i32) -> u32 {
    s_type(opcodes::OP_STORE, funct3::SD, rs1, rs2, imm)
}

#[must_use]
pub fn ld(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(opcodes::OP_LOAD, funct3::LD, rd, rs1, imm)
}

#[must_use]
pub fn lr_d(rd: u32, rs1: u32) -> u32 {
    r_type(a_opcodes::OP_AMO, a_funct3::WIDTH_64, funct5::LR << 2, rd, rs1, 0)
}

#[must_use]
pub fn sc_d(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(a_opcodes::OP_AMO, a_funct3::WIDTH_64, funct5::SC << 2, rd, rs1, rs2)
}

/// An encoding no opcode table claims, for exception-path tests.
#[must_use]
pub fn illegal() -> u32 {
    0xFFFF_FFFF
}
