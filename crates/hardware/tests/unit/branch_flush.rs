//! A taken backward branch must flush the two wrong-path instructions
//! already fetched behind it and bump `stats.flushes`, never retiring them.

use crate::common::encode::{addi, beq};
use crate::common::harness::TestContext;

#[test]
fn taken_branch_flushes_wrong_path_and_skips_it() {
    let program = [
        addi(1, 0, 1),    // 0: x1 = 1
        addi(2, 0, 1),    // 4: x2 = 1
        beq(1, 2, 12),    // 8: x1 == x2, branch to 8+12=20
        addi(3, 0, 99),   // 12: wrong path — must never retire
        addi(3, 0, 99),   // 16: wrong path — must never retire
        addi(4, 0, 7),    // 20: branch target
    ];
    let mut ctx = TestContext::new().load_program(&program);
    assert!(ctx.run(200));

    assert_eq!(ctx.get_reg(3), 0, "wrong-path instructions must not have retired");
    assert_eq!(ctx.get_reg(4), 7, "branch target must have executed");
    assert!(ctx.cpu.stats.flushes >= 1, "taken branch must record a flush");
}
