//! Shared test infrastructure: a small instruction encoder and a
//! [`harness::TestContext`] that owns a [`vulsim_hw::Cpu`] and a capturing
//! exception hook.

pub mod encode;
pub mod harness;
