//! The five stage functions, one module each, invoked in reverse pipeline
//! order every tick (WB before Mem before EX before ID before IF) so that a
//! stage's structural-stall check always sees its downstream channel's state
//! as committed by the *previous* tick, never a write recorded earlier in the
//! same tick.

pub mod decode;
pub mod execute;
pub mod fetch;
pub mod memory;
pub mod writeback;

pub use decode::decode_stage;
pub use execute::execute_stage;
pub use fetch::fetch_stage;
pub use memory::memory_stage;
pub use writeback::{writeback_stage, ExceptionHook, WritebackOutcome};
