//! Memory bus and mapping
//!
//! The CPU address space:
//! $0000-$07FF - 2KB Internal RAM
//! $0800-$1FFF - RAM mirroring (repeats every $0800 bytes)
//! $2000-$2007 - PPU registers
//! $2008-$3FFF - PPU register mirroring (every $08 bytes)
//! $4000-$4017 - APU and I/O registers
//! $4018-$401F - APU test registers (not backed, read as 0)
//! $4020-$7FFF - Unmapped (reads 0, writes ignored)
//! $8000-$FFFF - Cartridge PRG ROM, mirrored when smaller than 32KB
//!
//! Registers are plain storage; reads and writes have no side effects.

use std::fmt::Write as _;

use crate::cartridge::Cartridge;
use crate::cpu::MemoryAccess;

/// RAM size in bytes
pub const RAM_SIZE: usize = 2048; // 2KB

/// PPU register count
pub const PPU_REGISTER_COUNT: usize = 8;

/// APU/IO register count
pub const APU_REGISTER_COUNT: usize = 24;

/// Bytes per row in [`hex_dump`]
pub const HEX_DUMP_WIDTH: usize = 16;

/// Memory bus structure
#[derive(Debug, Clone)]
pub struct Bus {
    /// 2KB internal RAM (with mirroring)
    ram: [u8; RAM_SIZE],
    /// PPU registers
    ppu_registers: [u8; PPU_REGISTER_COUNT],
    /// APU/IO registers
    apu_registers: [u8; APU_REGISTER_COUNT],
    /// Cartridge providing PRG ROM
    cartridge: Option<Cartridge>,
}

impl Bus {
    /// Create a new bus with no cartridge
    pub fn new() -> Self {
        Self {
            ram: [0; RAM_SIZE],
            ppu_registers: [0; PPU_REGISTER_COUNT],
            apu_registers: [0; APU_REGISTER_COUNT],
            cartridge: None,
        }
    }

    /// Create a bus with fresh RAM around a cartridge
    pub fn with_cartridge(cartridge: Cartridge) -> Self {
        Self {
            cartridge: Some(cartridge),
            ..Self::new()
        }
    }

    /// Get a reference to the cartridge, if present
    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    /// Internal RAM, for debuggers and viewers
    pub fn ram(&self) -> &[u8; RAM_SIZE] {
        &self.ram
    }

    /// Copy of `len` RAM bytes starting at `start`, clamped to the RAM size
    pub fn ram_slice(&self, start: usize, len: usize) -> Vec<u8> {
        let start = start.min(RAM_SIZE);
        let end = start.saturating_add(len).min(RAM_SIZE);
        self.ram[start..end].to_vec()
    }

    /// Get a PPU register value by index (0-7)
    pub fn ppu_register(&self, index: usize) -> u8 {
        self.ppu_registers[index % PPU_REGISTER_COUNT]
    }

    /// Get an APU/IO register value by index (0-23)
    pub fn apu_register(&self, index: usize) -> Option<u8> {
        self.apu_registers.get(index).copied()
    }

    fn read_prg(&self, address: u16) -> Option<u8> {
        let prg = self.cartridge.as_ref()?.prg_rom();
        if prg.is_empty() {
            return None;
        }
        let offset = (address - 0x8000) as usize;
        Some(prg[offset % prg.len()])
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccess for Bus {
    /// Read a byte from the given address
    fn read(&mut self, address: u16) -> u8 {
        self.try_read(address).unwrap_or(0)
    }

    /// Write a byte to the given address
    fn write(&mut self, address: u16, value: u8) {
        match address {
            // $0000-$1FFF - Internal RAM and mirrors
            0x0000..=0x1FFF => {
                self.ram[(address & 0x07FF) as usize] = value;
            }
            // $2000-$3FFF - PPU registers and mirrors
            0x2000..=0x3FFF => {
                self.ppu_registers[(address & 0x0007) as usize] = value;
            }
            // $4000-$4017 - APU and I/O registers
            0x4000..=0x4017 => {
                self.apu_registers[(address - 0x4000) as usize] = value;
            }
            // $4018-$7FFF - Unbacked
            0x4018..=0x7FFF => {}
            // $8000-$FFFF - Cartridge PRG ROM (write-protected, ignore)
            0x8000..=0xFFFF => {}
        }
    }

    /// `None` for unbacked addresses and for the PRG window with no cartridge
    fn try_read(&mut self, address: u16) -> Option<u8> {
        match address {
            0x0000..=0x1FFF => Some(self.ram[(address & 0x07FF) as usize]),
            0x2000..=0x3FFF => Some(self.ppu_registers[(address & 0x0007) as usize]),
            0x4000..=0x4017 => Some(self.apu_registers[(address - 0x4000) as usize]),
            0x4018..=0x7FFF => None,
            0x8000..=0xFFFF => self.read_prg(address),
        }
    }
}

/// Format bytes as 16-byte rows under a column header, addresses starting at `base`
pub fn hex_dump(bytes: &[u8], base: u16) -> String {
    let mut out = String::from("     ");
    for col in 0..HEX_DUMP_WIDTH {
        let _ = write!(out, " {:02X}", col);
    }
    out.push('\n');
    out.push_str("     +");
    out.push_str(&"-".repeat(HEX_DUMP_WIDTH * 3));
    out.push('\n');

    for (row, chunk) in bytes.chunks(HEX_DUMP_WIDTH).enumerate() {
        let address = base.wrapping_add((row * HEX_DUMP_WIDTH) as u16);
        let _ = write!(out, "${:04X}|", address);
        for byte in chunk {
            let _ = write!(out, " {:02X}", byte);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cartridge_with_prg(prg: Vec<u8>) -> Cartridge {
        let mut rom = Vec::new();
        rom.extend_from_slice(b"NES\x1A");
        rom.push((prg.len() / 16384) as u8);
        rom.extend_from_slice(&[0u8; 11]);
        rom.extend_from_slice(&prg);
        Cartridge::from_bytes(&rom).unwrap()
    }

    #[test]
    fn test_bus_read_write() {
        let mut bus = Bus::new();

        bus.write(0x0000, 0x42);
        assert_eq!(bus.read(0x0000), 0x42);

        // RAM mirroring
        bus.write(0x0001, 0x43);
        assert_eq!(bus.read(0x0801), 0x43);
        assert_eq!(bus.read(0x1801), 0x43);
    }

    #[test]
    fn test_ppu_register_mirroring() {
        let mut bus = Bus::new();
        bus.write(0x3FFE, 0x5A);
        assert_eq!(bus.read(0x2006), 0x5A);
        assert_eq!(bus.ppu_register(6), 0x5A);
        assert_eq!(bus.read(0x200E), 0x5A);
    }

    #[test]
    fn test_apu_window_is_linear() {
        let mut bus = Bus::new();
        bus.write(0x4000, 0x01);
        bus.write(0x4017, 0x17);
        assert_eq!(bus.read(0x4000), 0x01);
        assert_eq!(bus.read(0x4017), 0x17);
        assert_eq!(bus.apu_register(0x17), Some(0x17));

        bus.write(0x401F, 0xFF);
        assert_eq!(bus.read(0x401F), 0);
        assert_eq!(bus.apu_register(24), None);
    }

    #[test]
    fn test_unmapped_region() {
        let mut bus = Bus::new();
        bus.write(0x6000, 0x99);
        assert_eq!(bus.read(0x6000), 0);
        assert_eq!(bus.read(0x4020), 0);
        assert_eq!(bus.try_read(0x5000), None);
    }

    #[test]
    fn test_prg_mirrors_16k_image() {
        let mut prg = vec![0u8; 16384];
        prg[0] = 0xA9;
        prg[0x3FFF] = 0x80;
        let mut bus = Bus::with_cartridge(cartridge_with_prg(prg));

        assert_eq!(bus.read(0x8000), 0xA9);
        assert_eq!(bus.read(0xC000), 0xA9);
        assert_eq!(bus.read(0xBFFF), 0x80);
        assert_eq!(bus.read(0xFFFF), 0x80);
    }

    #[test]
    fn test_prg_is_read_only() {
        let mut bus = Bus::with_cartridge(Cartridge::test_cartridge());
        bus.write(0x8000, 0x00);
        assert_eq!(bus.read(0x8000), 0xA9);
    }

    #[test]
    fn test_prg_without_cartridge() {
        let mut bus = Bus::new();
        assert_eq!(bus.read(0xFFFC), 0);
        assert_eq!(bus.try_read(0xFFFC), None);
    }

    #[test]
    fn test_ram_slice_clamps() {
        let mut bus = Bus::new();
        bus.write(0x07FF, 0xEE);
        assert_eq!(bus.ram_slice(0x07FE, 16), vec![0x00, 0xEE]);
        assert!(bus.ram_slice(4096, 4).is_empty());
        assert_eq!(bus.ram()[0x07FF], 0xEE);
    }

    #[test]
    fn test_hex_dump_rows() {
        let bytes: Vec<u8> = (0..20).collect();
        let dump = hex_dump(&bytes, 0x0010);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("      00 01 02"));
        assert!(lines[0].ends_with("0E 0F"));
        assert_eq!(lines[2], "$0010| 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F");
        assert_eq!(lines[3], "$0020| 10 11 12 13");
    }
}
