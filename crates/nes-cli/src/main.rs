//! NES CLI - headless runner for the NES emulator core

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use nes_core::bus::hex_dump;
use nes_core::config::{EmulatorConfig, MissingRomPolicy, OpcodePolicy};
use nes_core::cpu::HaltReason;
use nes_core::system::NesSystem;

/// NES Emulator CLI
#[derive(Parser, Debug)]
#[command(name = "nes-cli")]
#[command(about = "A NES emulator CLI", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    #[arg(short, long)]
    rom: Option<PathBuf>,

    /// Fall back to the built-in test ROM when --rom is missing or absent
    #[arg(short, long)]
    test_rom: bool,

    /// Number of frames to run
    #[arg(short, long, default_value = "60")]
    frames: u64,

    /// Halt on opcodes outside the implemented subset instead of skipping them
    #[arg(short, long)]
    strict: bool,

    /// Print a trace line for each of the first N instructions
    #[arg(long, value_name = "N")]
    trace: Option<usize>,

    /// Dump CPU state after execution
    #[arg(short = 'c', long)]
    dump_cpu: bool,

    /// Dump PPU state after execution
    #[arg(short = 'p', long)]
    dump_ppu: bool,

    /// Dump the first 256 bytes of CPU RAM after execution
    #[arg(short = 'm', long)]
    dump_ram: bool,

    /// Save the last frame as an image (format from the extension, e.g. .png)
    #[arg(long, value_name = "PATH")]
    screenshot: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> EmulatorConfig {
        EmulatorConfig {
            opcode_policy: if self.strict {
                OpcodePolicy::Strict
            } else {
                OpcodePolicy::BestEffort
            },
            missing_rom: if self.test_rom {
                MissingRomPolicy::UseTestCartridge
            } else {
                MissingRomPolicy::Fail
            },
            ..EmulatorConfig::default()
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut system = NesSystem::with_config(args.config());

    match (&args.rom, args.test_rom) {
        (Some(path), _) => system
            .load_rom_file(path)
            .with_context(|| format!("failed to load ROM {}", path.display()))?,
        (None, true) => system.load_test_cartridge(),
        (None, false) => bail!("no ROM given; pass --rom PATH or --test-rom"),
    }

    if let Some(cartridge) = system.cartridge() {
        println!("Loaded cartridge:");
        println!("  {}", cartridge);
    }

    if let Some(count) = args.trace {
        trace(&mut system, count);
    }

    println!("\nRunning {} frames...", args.frames);
    for _ in 0..args.frames {
        system.step_frame();
    }
    println!("Completed {} frames.", system.frame_count());

    match system.cpu().halt_reason() {
        Some(HaltReason::Brk) => println!("CPU halted on BRK"),
        Some(HaltReason::UnknownOpcode { opcode, pc }) => {
            println!("CPU halted on unknown opcode ${:02X} at ${:04X}", opcode, pc)
        }
        None => {}
    }

    if args.dump_cpu {
        dump_cpu_state(&system);
    }

    if args.dump_ppu {
        dump_ppu_state(&system);
    }

    if args.dump_ram {
        println!("\nCPU RAM:");
        print!("{}", hex_dump(&system.bus().ram_slice(0, 256), 0x0000));
    }

    if let Some(path) = &args.screenshot {
        save_screenshot(&system, path)?;
        println!("Saved frame to {}", path.display());
    }

    Ok(())
}

fn trace(system: &mut NesSystem, count: usize) {
    for _ in 0..count {
        if system.cpu().halted() {
            break;
        }
        println!("{}", system.trace_line());
        if let Err(e) = system.step_instruction() {
            println!("{}", e);
            break;
        }
    }
}

fn dump_cpu_state(system: &NesSystem) {
    let cpu = system.cpu();
    let regs = cpu.registers();
    let status = cpu.status();

    println!("\nCPU State:");
    println!("  A:    ${:02X}", regs.a);
    println!("  X:    ${:02X}", regs.x);
    println!("  Y:    ${:02X}", regs.y);
    println!("  PC:   ${:04X}", regs.pc);
    println!("  SP:   ${:02X}", regs.sp);
    println!("  P:    ${:02X} ({})", status.bits(), status);
    println!("  Cycles: {}", cpu.total_cycles());
    println!("  {}", if cpu.halted() { "[HALTED]" } else { "[RUNNING]" });
}

fn dump_ppu_state(system: &NesSystem) {
    let ppu = system.ppu();

    println!("\nPPU State:");
    println!("  Scanline: {}", ppu.scanline());
    println!("  Dot: {}", ppu.dot());
    println!("  Frames: {}", ppu.frame_count());
}

fn save_screenshot(system: &NesSystem, path: &Path) -> Result<()> {
    let frame = system.frame();
    let image = image::RgbImage::from_raw(
        frame.width() as u32,
        frame.height() as u32,
        frame.as_bytes().to_vec(),
    )
    .context("frame buffer size does not match its dimensions")?;

    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}
