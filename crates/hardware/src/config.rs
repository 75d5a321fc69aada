//! Simulator configuration.
//!
//! Trimmed from the teacher's much larger SoC/cache/prefetcher config tree to
//! the handful of knobs this memory/device model actually has: RAM placement,
//! the device-space boundary, and a trace toggle. Deserializable from JSON so
//! a `vulsim-engine` `SimulationConfig` can forward project-level overrides.

use serde::{Deserialize, Serialize};

use crate::common::constants::DEVICE_BASE;

/// Default base address of main system RAM (2 GiB).
pub const DEFAULT_RAM_BASE: u64 = 0x8000_0000;
/// Default RAM size (128 MiB).
pub const DEFAULT_RAM_SIZE: u64 = 128 * 1024 * 1024;

/// Simulator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Base physical address of RAM.
    pub ram_base: u64,
    /// RAM size in bytes.
    pub ram_size: u64,
    /// Base physical address of device space (§4.6).
    pub device_base: u64,
    /// Emit a per-stage trace line to stderr every tick.
    pub trace: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ram_base: DEFAULT_RAM_BASE,
            ram_size: DEFAULT_RAM_SIZE,
            device_base: DEVICE_BASE,
            trace: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SimConfig;

    #[test]
    fn default_matches_documented_constants() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.ram_base, super::DEFAULT_RAM_BASE);
        assert_eq!(cfg.ram_size, super::DEFAULT_RAM_SIZE);
        assert!(!cfg.trace);
    }
}
