//! The simulation stage proper (§4.8.3), grounded on `simulation/simman.h`'s
//! `SimulationConfig`/`SimulationStepInfo`: loads the compiled image into a
//! [`vulsim_hw::Cpu`] and ticks it, honoring a step budget and the manager's
//! cooperative cancel flag.

use std::sync::atomic::{AtomicBool, Ordering};

use vulsim_hw::cpu::HaltOnTrap;
use vulsim_hw::{Cpu, SimConfig};

use crate::persistence::RunPaths;
use crate::protocol::{LogCategory, LogLevel};
use crate::simulation::logbus::LogBus;

/// Simulation stage options (§4.8.3).
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Upper bound on ticks, so a program that never halts can't run forever.
    pub max_cycles: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { max_cycles: 10_000_000 }
    }
}

/// Per-run simulation outcome, carrying the final [`vulsim_hw::stats::Stats`]
/// snapshot on success.
#[derive(Debug, Clone, Default)]
pub struct SimulationStepInfo {
    pub started: bool,
    pub finished: bool,
    pub finished_us: Option<u64>,
    pub errors: Vec<String>,
    pub stats: Option<vulsim_hw::stats::Stats>,
}

/// Loads `paths.binary_path()` and ticks a [`Cpu`] until it halts, the cycle
/// budget is exhausted, or `cancel` is set.
pub fn run(paths: &RunPaths, config: &SimulationConfig, cancel: &AtomicBool, log: &LogBus, now_us: u64) -> SimulationStepInfo {
    let mut info = SimulationStepInfo { started: true, ..SimulationStepInfo::default() };
    log.push(now_us, LogLevel::Info, LogCategory::Simulation, "simulation started");

    let image = match std::fs::read(paths.binary_path()) {
        Ok(image) => image,
        Err(e) => {
            info.errors.push(e.to_string());
            return info;
        }
    };

    let sim_config = SimConfig::default();
    let mut cpu = Cpu::new(&sim_config, sim_config.ram_base);
    cpu.load_image(&image);
    let mut hook = HaltOnTrap;

    let mut halted = false;
    for _ in 0..config.max_cycles {
        if cancel.load(Ordering::Relaxed) {
            info.errors.push("cancelled".into());
            break;
        }
        if cpu.tick(&mut hook) {
            halted = true;
            break;
        }
    }
    if !halted && !cancel.load(Ordering::Relaxed) {
        info.errors.push("cycle budget exhausted before halt".into());
    }

    info.stats = Some(cpu.stats);
    info.finished = info.errors.is_empty();
    info.finished_us = Some(now_us);
    log.push(
        now_us,
        if info.finished { LogLevel::Info } else { LogLevel::Error },
        LogCategory::Simulation,
        format!("simulation {}", if info.finished { "finished" } else { "failed" }),
    );
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn runs_a_tiny_image_to_halt() {
        let dir = tempdir().unwrap();
        let paths = RunPaths::new(dir.path(), "run-1");
        std::fs::create_dir_all(paths.build_dir()).unwrap();
        std::fs::write(paths.binary_path(), 0xFFFF_FFFFu32.to_le_bytes()).unwrap();
        let log = LogBus::new();
        let cancel = AtomicBool::new(false);
        let info = run(&paths, &SimulationConfig::default(), &cancel, &log, 0);
        assert!(info.finished);
        assert!(info.stats.unwrap().traps >= 1);
    }

    #[test]
    fn missing_image_reports_error() {
        let dir = tempdir().unwrap();
        let paths = RunPaths::new(dir.path(), "run-1");
        let log = LogBus::new();
        let cancel = AtomicBool::new(false);
        let info = run(&paths, &SimulationConfig::default(), &cancel, &log, 0);
        assert!(!info.finished);
    }
}
