//! A short arithmetic-plus-memory program run end to end through all five
//! stages: compute a sum, stash it past the program image, and read it back.

use crate::common::encode::{add, addi, auipc, ld, sd};
use crate::common::harness::TestContext;

#[test]
fn add_store_load_round_trip() {
    let scratch_offset = 64i32;
    let program = [
        addi(1, 0, 5),               // x1 = 5
        addi(2, 0, 37),              // x2 = 37
        add(3, 1, 2),                // x3 = x1 + x2 = 42
        auipc(5, 0),                 // x5 = pc of this instruction
        addi(5, 5, scratch_offset),  // x5 += scratch_offset, past the program image
        sd(5, 3, 0),                 // [x5] = x3
        ld(4, 5, 0),                 // x4 = [x5]
    ];
    let mut ctx = TestContext::new().load_program(&program);
    assert!(ctx.run(200), "program never halted");
    assert_eq!(ctx.get_reg(3), 42);
    assert_eq!(ctx.get_reg(4), 42);
    assert!(ctx.cpu.stats.instret >= program.len() as u64);
}
