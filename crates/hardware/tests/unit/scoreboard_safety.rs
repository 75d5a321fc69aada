//! A RAW hazard must stall decode until the producing instruction writes
//! back, never letting the consumer read a stale value.

use crate::common::encode::{add, addi};
use crate::common::harness::TestContext;

#[test]
fn dependent_add_waits_for_producer_writeback() {
    let program = [
        addi(1, 0, 11), // x1 = 11
        addi(2, 0, 31), // x2 = 31
        add(3, 1, 2),   // x3 = x1 + x2, depends on both above
        add(4, 3, 3),   // x4 = x3 + x3, depends on the add just issued
    ];
    let mut ctx = TestContext::new().load_program(&program);
    assert!(ctx.run(200));

    assert_eq!(ctx.get_reg(3), 42);
    assert_eq!(ctx.get_reg(4), 84, "must observe x3's committed value, not a stale or partial one");
    assert!(ctx.cpu.stats.stalls > 0, "a five-stage in-order pipe must stall on a back-to-back RAW dependency");
}
