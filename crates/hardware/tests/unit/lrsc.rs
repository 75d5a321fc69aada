//! Load-reserved/store-conditional: a matching `sc.d` after `lr.d` succeeds
//! (writes zero to `rd`); one whose reservation was already consumed fails
//! (writes one, memory unchanged).

use crate::common::encode::{addi, auipc, lr_d, sc_d};
use crate::common::harness::TestContext;

#[test]
fn sc_succeeds_once_then_fails_on_reuse() {
    let scratch_offset = 64i32;
    let program = [
        auipc(5, 0),                 // x5 = pc of this instruction
        addi(5, 5, scratch_offset),  // x5 += scratch_offset, a scratch cell past the program
        addi(1, 0, 7),               // x1 = 7, the value to store
        lr_d(2, 5),                  // x2 = [x5], reserve x5
        sc_d(3, 5, 1),                // [x5] = x1 if reservation holds; x3 = 0 on success
        sc_d(4, 5, 1),                // reservation already consumed: x4 = 1, memory unchanged
    ];
    let mut ctx = TestContext::new().load_program(&program);
    assert!(ctx.run(200));

    assert_eq!(ctx.get_reg(3), 0, "first sc.d after lr.d must succeed");
    assert_eq!(ctx.get_reg(4), 1, "second sc.d with no outstanding reservation must fail");
}
