//! NES System Integration
//!
//! Owns the cartridge (through the bus), CPU and PPU, and exposes the two
//! entry points a host needs: load a cartridge and advance one frame.
//! Single threaded; hosts that share a system across threads must lock it.

use std::path::Path;

use crate::bus::Bus;
use crate::cartridge::{Cartridge, CartridgeError};
use crate::config::EmulatorConfig;
use crate::cpu::{self, Cpu, CpuError, MemoryAccess};
use crate::ppu::{FrameBuffer, FrameSource, Ppu, TestPattern};

/// PPU dots per CPU step
pub const PPU_STEPS_PER_CPU_STEP: usize = 3;

/// NES System - integrates all components
#[derive(Debug, Clone)]
pub struct NesSystem<S = TestPattern> {
    config: EmulatorConfig,
    cpu: Cpu,
    ppu: Ppu<S>,
    bus: Bus,
    /// Frames produced since reset, drives the frame source
    tick: u64,
}

impl NesSystem<TestPattern> {
    /// Create a new NES system with no cartridge
    pub fn new() -> Self {
        Self::with_config(EmulatorConfig::default())
    }

    pub fn with_config(config: EmulatorConfig) -> Self {
        Self::with_source(config, TestPattern)
    }
}

impl Default for NesSystem<TestPattern> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FrameSource> NesSystem<S> {
    /// Create a system rendering through a custom frame source
    pub fn with_source(config: EmulatorConfig, source: S) -> Self {
        Self {
            config,
            cpu: Cpu::with_policy(config.opcode_policy),
            ppu: Ppu::with_source(source),
            bus: Bus::new(),
            tick: 0,
        }
    }

    /// Load an iNES image from memory
    pub fn load_rom(&mut self, rom_data: &[u8]) -> Result<(), CartridgeError> {
        let cartridge = Cartridge::from_bytes(rom_data)?;
        self.load_cartridge(cartridge);
        Ok(())
    }

    /// Load an iNES file, honouring the configured missing-ROM policy
    pub fn load_rom_file(&mut self, path: impl AsRef<Path>) -> Result<(), CartridgeError> {
        let cartridge = Cartridge::open(path, self.config.missing_rom)?;
        self.load_cartridge(cartridge);
        Ok(())
    }

    /// Insert the synthesized test cartridge
    pub fn load_test_cartridge(&mut self) {
        self.load_cartridge(Cartridge::test_cartridge());
    }

    /// Replace the cartridge, rebuild bus and CPU, then reset
    pub fn load_cartridge(&mut self, cartridge: Cartridge) {
        self.bus = Bus::with_cartridge(cartridge);
        self.cpu = Cpu::with_policy(self.config.opcode_policy);
        self.reset();
    }

    /// Reset the NES system
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        self.ppu.reset_frame_count();
        self.tick = 0;
    }

    /// Execute one CPU instruction followed by three PPU dots
    pub fn step_instruction(&mut self) -> Result<u8, CpuError> {
        let result = self.cpu.step(&mut self.bus);
        for _ in 0..PPU_STEPS_PER_CPU_STEP {
            self.ppu.step();
        }
        result
    }

    /// Run one frame's CPU budget (or until halted) and render the next frame.
    ///
    /// Without a cartridge the CPU does not run; frames are still produced.
    pub fn step_frame(&mut self) -> &FrameBuffer {
        if self.bus.cartridge().is_some() {
            let target_cycles = self.cpu.cycles() + self.config.cycles_per_frame;
            while self.cpu.cycles() < target_cycles && !self.cpu.halted() {
                // Strict-mode errors leave the CPU halted, which ends the loop
                if self.step_instruction().is_err() {
                    break;
                }
            }
        }

        self.tick += 1;
        self.ppu.render_frame(self.tick)
    }

    /// Nestest-style trace line for the instruction at PC
    pub fn trace_line(&mut self) -> String {
        let regs = *self.cpu.registers();
        let disasm = cpu::disassemble(&mut self.bus, regs.pc);
        format!(
            "{:04X}  {:<8}  {:<12}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            disasm.pc,
            disasm.hex_bytes(),
            disasm.text,
            regs.a,
            regs.x,
            regs.y,
            self.cpu.p_register(),
            regs.sp,
            self.cpu.cycles()
        )
    }

    /// Get CPU reference
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Get mutable CPU reference
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// Get PPU reference
    pub fn ppu(&self) -> &Ppu<S> {
        &self.ppu
    }

    /// Get bus reference
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.bus.cartridge()
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Last rendered frame
    pub fn frame(&self) -> &FrameBuffer {
        self.ppu.frame()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Get frame count
    pub fn frame_count(&self) -> u64 {
        self.ppu.frame_count()
    }

    /// Read a byte from memory via the bus
    pub fn read_memory(&mut self, address: u16) -> u8 {
        self.bus.read(address)
    }

    /// Write a byte to memory via the bus
    pub fn write_memory(&mut self, address: u16, value: u8) {
        self.bus.write(address, value);
    }
}
