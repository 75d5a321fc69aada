//! A thin [`TestContext`] wrapping [`Cpu`] plus a recording [`ExceptionHook`],
//! grounded on the teacher's `tests/common/harness.rs` `TestContext` builder
//! (`with_memory`/`load_program`/`set_reg`/`get_reg`/`run`), adapted to this
//! crate's `Cpu::new(&SimConfig, entry)` + `tick(&mut dyn ExceptionHook)` API
//! in place of the teacher's `System`/`Bus`-backed construction.

use vulsim_hw::cpu::HaltOnTrap;
use vulsim_hw::pipeline::stages::ExceptionHook;
use vulsim_hw::{Cpu, SimConfig};

/// Records every exception the CPU raises and, if `resume_at` is set,
/// redirects to it once and then halts on any further exception.
#[derive(Default)]
pub struct RecordingHook {
    pub exceptions: Vec<(u64, u64)>,
    pub resume_at: Option<u64>,
}

impl ExceptionHook for RecordingHook {
    fn on_exception(&mut self, pc: u64, cause: u64) -> Option<u64> {
        self.exceptions.push((pc, cause));
        self.resume_at.take()
    }
}

pub struct TestContext {
    pub cpu: Cpu,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let cfg = SimConfig::default();
        Self { cpu: Cpu::new(&cfg, cfg.ram_base) }
    }

    /// Loads `instructions` as a flat program at the CPU's entry point.
    #[must_use]
    pub fn load_program(mut self, instructions: &[u32]) -> Self {
        let bytes: Vec<u8> = instructions.iter().flat_map(|i| i.to_le_bytes()).collect();
        self.cpu.load_image(&bytes);
        self
    }

    pub fn set_reg(&mut self, reg: usize, val: u64) {
        self.cpu.regs.write(reg, val);
    }

    #[must_use]
    pub fn get_reg(&self, reg: usize) -> u64 {
        self.cpu.regs.read(reg)
    }

    /// Ticks until halted or `max_cycles` is exhausted, halting on the first
    /// exception via [`HaltOnTrap`]. Returns whether the CPU halted.
    pub fn run(&mut self, max_cycles: u64) -> bool {
        let mut hook = HaltOnTrap;
        for _ in 0..max_cycles {
            if self.cpu.tick(&mut hook) {
                return true;
            }
        }
        false
    }

    /// Ticks `cycles` times against a caller-supplied hook, useful for tests
    /// that need to observe or resume from a trap.
    pub fn run_with_hook(&mut self, hook: &mut dyn ExceptionHook, cycles: u64) -> bool {
        for _ in 0..cycles {
            if self.cpu.tick(hook) {
                return true;
            }
        }
        false
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
