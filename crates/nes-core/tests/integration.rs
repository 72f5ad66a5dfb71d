//! Integration tests for the NES system

mod common;

use nes_core::bus::Bus;
use nes_core::cartridge::Cartridge;
use nes_core::config::{EmulatorConfig, NTSC_CYCLES_PER_FRAME};
use nes_core::cpu::MemoryAccess;
use nes_core::ppu::{Ppu, TestPattern};
use nes_core::system::NesSystem;

#[test]
fn test_ram_mirroring() {
    let mut bus = Bus::new();
    for a in 0..0x0800u16 {
        bus.write(a, (a as u8) ^ 0x5A);
    }
    for a in 0..0x2000u16 {
        let base = a % 0x0800;
        for k in 0..4u16 {
            let mirror = base + 0x0800 * k;
            assert_eq!(bus.read(a), bus.read(mirror), "address ${:04X}", a);
        }
    }
}

#[test]
fn test_ppu_register_window_mirroring() {
    let mut bus = Bus::new();
    for i in 0..8u16 {
        bus.write(0x2000 + i, 0xA0 | i as u8);
    }
    for a in 0x2000..0x4000u16 {
        assert_eq!(bus.read(a), bus.read(0x2000 + (a % 8)));
    }
}

#[test]
fn test_prg_window_wraps_small_images() {
    for banks in [1u8, 2] {
        let rom = common::build_ines(banks, 0, 0, 0);
        let cart = Cartridge::from_bytes(&rom).unwrap();
        let prg = cart.prg_rom().to_vec();
        let mut bus = Bus::with_cartridge(cart);

        for i in 0..0x8000usize {
            assert_eq!(bus.read(0x8000 + i as u16), prg[i % prg.len()]);
        }
    }
}

#[test]
fn test_halted_system_still_produces_frames() {
    let mut system = NesSystem::new();
    system.load_test_cartridge();

    let first = system.step_frame().clone();
    assert!(system.cpu().halted());
    let cycles = system.cpu().cycles();

    let second = system.step_frame().clone();
    assert_eq!(system.tick(), 2);
    assert_eq!(system.frame_count(), 2);
    assert_ne!(first, second);
    assert_eq!(system.cpu().cycles(), cycles);
}

#[test]
fn test_frame_matches_pattern_for_tick() {
    let mut system = NesSystem::new();
    system.load_test_cartridge();
    for _ in 0..3 {
        system.step_frame();
    }

    let mut reference = Ppu::with_source(TestPattern);
    assert_eq!(system.frame(), reference.render_frame(3));
}

#[test]
fn test_step_frame_honours_cycle_budget() {
    // INX; JMP $8000 - never halts
    let rom = common::build_nrom_with_prg(&[0xE8, 0x4C, 0x00, 0x80]);
    let mut system = NesSystem::new();
    system.load_rom(&rom).unwrap();

    let start = system.cpu().cycles();
    system.step_frame();
    let used = system.cpu().cycles() - start;

    assert!(!system.cpu().halted());
    assert!(used >= NTSC_CYCLES_PER_FRAME);
    // Longest implemented instruction is 7 cycles
    assert!(used < NTSC_CYCLES_PER_FRAME + 7);
    assert_eq!(system.cpu().total_cycles(), system.cpu().cycles() - 7);
}

#[test]
fn test_custom_cycle_budget() {
    let rom = common::build_nrom_with_prg(&[0xE8, 0x4C, 0x00, 0x80]);
    let config = EmulatorConfig {
        cycles_per_frame: 10,
        ..EmulatorConfig::default()
    };
    let mut system = NesSystem::with_config(config);
    system.load_rom(&rom).unwrap();
    system.step_frame();

    // INX (2) + JMP (3) + INX (2) + JMP (3) = 10
    assert_eq!(system.cpu().total_cycles(), 10);
    assert_eq!(system.cpu().registers().x, 2);
    // Four instructions, three dots each
    assert_eq!(system.ppu().dot(), 12);
}

#[test]
fn test_program_writes_visible_in_ram() {
    // LDA #$99; STA $10; BRK
    let rom = common::build_nrom_with_prg(&[0xA9, 0x99, 0x85, 0x10, 0x00]);
    let mut system = NesSystem::new();
    system.load_rom(&rom).unwrap();
    system.step_frame();

    assert_eq!(system.bus().ram()[0x10], 0x99);
    assert_eq!(system.read_memory(0x0810), 0x99);
}

#[test]
fn test_loading_new_rom_clears_ram() {
    let mut system = NesSystem::new();
    system.load_test_cartridge();
    system.write_memory(0x0000, 0x77);

    system.load_test_cartridge();
    assert_eq!(system.read_memory(0x0000), 0);
}
