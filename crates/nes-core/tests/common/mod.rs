//! Builders for minimal iNES images used across the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

/// Build an iNES image with pattern-filled PRG/CHR banks
pub fn build_ines(prg_16k: u8, chr_8k: u8, flags6: u8, flags7: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"NES\x1A");
    bytes.extend_from_slice(&[prg_16k, chr_8k, flags6, flags7]);
    bytes.extend_from_slice(&[0u8; 8]);

    for i in 0..prg_16k as usize * 16 * 1024 {
        bytes.push((i % 251) as u8);
    }
    bytes.extend(std::iter::repeat(0xCC).take(chr_8k as usize * 8 * 1024));
    bytes
}

/// Single 16 KiB bank NROM image running `program` from $8000
pub fn build_nrom_with_prg(program: &[u8]) -> Vec<u8> {
    assert!(program.len() <= 0x3FFA, "program overlaps the vectors");
    let mut rom = build_ines(1, 0, 0, 0);
    let prg = &mut rom[16..16 + 16 * 1024];
    prg.fill(0xEA);
    prg[..program.len()].copy_from_slice(program);
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;
    rom
}

/// Write `bytes` to a per-process temp file and return its path
pub fn write_temp_rom(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("nes-core-{}-{}", std::process::id(), name));
    fs::write(&path, bytes).expect("write temp ROM");
    path
}

/// Path that does not exist
pub fn missing_rom_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("nes-core-missing-{}-{}.nes", std::process::id(), name))
}
