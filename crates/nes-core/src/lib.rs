//! NES Core - Pure Rust NES emulator library
//!
//! Cartridge loading, a 6502 interpreter for a working opcode subset, the CPU
//! memory bus, and a PPU timing stepper with a pluggable frame source. Hosts
//! drive it through [`system::NesSystem`]: load a cartridge, then call
//! `step_frame` once per display refresh.

#![forbid(unsafe_code)]

/// CPU module containing the 2A03 (6502 variant) interpreter
pub mod cpu;
/// Memory bus and mapping
pub mod bus;
/// PPU timing and frame sources
pub mod ppu;
/// Cartridge (iNES) loading
pub mod cartridge;
/// Runtime configuration and policies
pub mod config;
/// Integration module for complete NES system
pub mod system;

pub use cartridge::{Cartridge, CartridgeError};
pub use config::{EmulatorConfig, MissingRomPolicy, OpcodePolicy};
pub use cpu::{Cpu, CpuError, HaltReason, MemoryAccess, StatusFlags};
pub use ppu::{FrameBuffer, FrameSource, Ppu, TestPattern};
pub use system::NesSystem;
