//! Flat system memory: a single RAM array plus a device-space stub, with
//! identity address translation.
//!
//! This model has no MMU, no page tables, and no privilege levels — `translate`
//! always returns `vaddr` as `paddr` when the address falls within RAM or the
//! device-space window, and faults otherwise. `Mem` owns the RAM bytes; LR/SC
//! reservation tracking lives in [`atomic`].

/// Load-reserved/store-conditional reservation tracking and AMO dispatch.
pub mod atomic;

use crate::common::{AccessType, PhysAddr, TranslationResult, Trap, VirtAddr, constants::DEVICE_BASE};

/// Flat system memory.
pub struct Mem {
    ram: Vec<u8>,
    ram_base: u64,
    device_base: u64,
}

impl Mem {
    /// Builds a zero-initialized RAM of `ram_size` bytes starting at
    /// `ram_base`, with the device-space stub starting at `device_base`.
    #[must_use]
    pub fn new(ram_base: u64, ram_size: u64, device_base: u64) -> Self {
        Self {
            ram: vec![0; ram_size as usize],
            ram_base,
            device_base,
        }
    }

    /// Builds memory with the default device-space base ([`DEVICE_BASE`]).
    #[must_use]
    pub fn with_defaults(ram_base: u64, ram_size: u64) -> Self {
        Self::new(ram_base, ram_size, DEVICE_BASE)
    }

    /// Loads a flat binary image into RAM starting at `ram_base`.
    ///
    /// # Panics
    ///
    /// Panics if `image` does not fit in the configured RAM size — this is a
    /// setup-time programming error, not a runtime simulator condition.
    pub fn load_image(&mut self, image: &[u8]) {
        assert!(
            image.len() <= self.ram.len(),
            "image of {} bytes does not fit in {}-byte RAM",
            image.len(),
            self.ram.len()
        );
        self.ram[..image.len()].copy_from_slice(image);
    }

    fn ram_end(&self) -> u64 {
        self.ram_base + self.ram.len() as u64
    }

    /// Identity-translates a virtual address, faulting if it falls outside
    /// RAM and the device-space window, or (for fetches) inside device space.
    #[must_use]
    pub fn translate(&self, vaddr: VirtAddr, access: AccessType) -> TranslationResult {
        let addr = vaddr.val();
        let in_ram = addr >= self.ram_base && addr < self.ram_end();
        let in_device = addr >= self.device_base;
        if in_ram || (in_device && access != AccessType::Fetch) {
            return TranslationResult::success(PhysAddr::new(addr), 0);
        }
        let trap = match access {
            AccessType::Fetch => Trap::InstructionAccessFault(addr),
            AccessType::Read => Trap::LoadAccessFault(addr),
            AccessType::Write => Trap::StoreAccessFault(addr),
        };
        TranslationResult::fault(trap, 0)
    }

    fn in_ram(&self, paddr: u64) -> bool {
        paddr >= self.ram_base && paddr < self.ram_end()
    }

    /// Reads `len` bytes (1/2/4/8) at `paddr`. Device-space reads return 0.
    #[must_use]
    pub fn read(&self, paddr: PhysAddr, len: u32) -> u64 {
        let addr = paddr.val();
        if !self.in_ram(addr) {
            return 0;
        }
        let offset = (addr - self.ram_base) as usize;
        let mut bytes = [0u8; 8];
        bytes[..len as usize].copy_from_slice(&self.ram[offset..offset + len as usize]);
        u64::from_le_bytes(bytes)
    }

    /// Writes the low `len` bytes (1/2/4/8) of `value` at `paddr`.
    /// Device-space writes are discarded.
    pub fn write(&mut self, paddr: PhysAddr, len: u32, value: u64) {
        let addr = paddr.val();
        if !self.in_ram(addr) {
            return;
        }
        let offset = (addr - self.ram_base) as usize;
        let bytes = value.to_le_bytes();
        self.ram[offset..offset + len as usize].copy_from_slice(&bytes[..len as usize]);
    }

    /// Reads a 16-bit half-word; used by fetch for compressed-instruction
    /// peeking and 32-bit instruction assembly.
    #[must_use]
    pub fn read_u16(&self, paddr: PhysAddr) -> u16 {
        self.read(paddr, 2) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_translation_within_ram() {
        let mem = Mem::with_defaults(0x8000_0000, 4096);
        let result = mem.translate(VirtAddr::new(0x8000_0010), AccessType::Read);
        assert!(result.trap.is_none());
        assert_eq!(result.paddr.val(), 0x8000_0010);
    }

    #[test]
    fn fetch_outside_ram_faults() {
        let mem = Mem::with_defaults(0x8000_0000, 4096);
        let result = mem.translate(VirtAddr::new(0x1000), AccessType::Fetch);
        assert!(matches!(result.trap, Some(Trap::InstructionAccessFault(_))));
    }

    #[test]
    fn read_write_round_trip() {
        let mut mem = Mem::with_defaults(0x8000_0000, 4096);
        mem.write(PhysAddr::new(0x8000_0000), 8, 0x1122_3344_5566_7788);
        assert_eq!(mem.read(PhysAddr::new(0x8000_0000), 8), 0x1122_3344_5566_7788);
    }

    #[test]
    fn device_space_read_is_zero_write_is_discarded() {
        let mut mem = Mem::new(0x8000_0000, 4096, 0x9000_0000);
        mem.write(PhysAddr::new(0x9000_0000), 4, 0xdead_beef);
        assert_eq!(mem.read(PhysAddr::new(0x9000_0000), 4), 0);
    }
}
