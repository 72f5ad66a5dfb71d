//! CPU module - 2A03 (6502 variant) interpreter
//!
//! Only a working subset of the instruction set is decoded. Everything else
//! goes through the configured [`OpcodePolicy`].

use std::fmt;

use thiserror::Error;

use crate::config::OpcodePolicy;

/// Reset vector location
pub const RESET_VECTOR: u16 = 0xFFFC;

/// PC used when the reset vector cannot be read
pub const DEFAULT_RESET_PC: u16 = 0x8000;

/// Cycles consumed by the reset sequence
pub const RESET_CYCLES: u64 = 7;

/// Cost of an unknown opcode under the best-effort policy
const UNKNOWN_OPCODE_CYCLES: u8 = 2;

/// Memory access seam between the CPU and whatever backs its address space
pub trait MemoryAccess {
    /// Read a byte from the given address
    fn read(&mut self, address: u16) -> u8;
    /// Write a byte to the given address
    fn write(&mut self, address: u16, value: u8);

    /// Read a byte, or `None` when nothing backs the address
    fn try_read(&mut self, address: u16) -> Option<u8> {
        Some(self.read(address))
    }
}

/// 2A03 CPU registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuRegisters {
    pub a: u8,    // Accumulator
    pub x: u8,    // X index register
    pub y: u8,    // Y index register
    pub sp: u8,   // Stack pointer
    pub pc: u16,  // Program counter
}

impl Default for CpuRegisters {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD, // Stack starts at $01FD
            pc: 0,    // Will be set by reset vector
        }
    }
}

/// CPU status flags (`N V - B D I Z C`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub const CARRY: u8 = 0b00000001;
    pub const ZERO: u8 = 0b00000010;
    pub const INTERRUPT: u8 = 0b00000100;
    pub const DECIMAL: u8 = 0b00001000;
    pub const BREAK: u8 = 0b00010000;
    pub const UNUSED: u8 = 0b00100000;
    pub const OVERFLOW: u8 = 0b01000000;
    pub const NEGATIVE: u8 = 0b10000000;

    /// Power-up / reset value: interrupt disable and the unused bit
    pub const RESET: u8 = 0x24;

    pub fn new(flags: u8) -> Self {
        Self(flags)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn carry(&self) -> bool {
        (self.0 & Self::CARRY) != 0
    }

    pub fn zero(&self) -> bool {
        (self.0 & Self::ZERO) != 0
    }

    pub fn interrupt(&self) -> bool {
        (self.0 & Self::INTERRUPT) != 0
    }

    pub fn decimal(&self) -> bool {
        (self.0 & Self::DECIMAL) != 0
    }

    pub fn brk(&self) -> bool {
        (self.0 & Self::BREAK) != 0
    }

    pub fn overflow(&self) -> bool {
        (self.0 & Self::OVERFLOW) != 0
    }

    pub fn negative(&self) -> bool {
        (self.0 & Self::NEGATIVE) != 0
    }

    /// Update Zero and Negative from `value`; other bits are untouched
    pub fn set_zn(&mut self, value: u8) {
        self.0 &= !(Self::ZERO | Self::NEGATIVE);
        if value == 0 {
            self.0 |= Self::ZERO;
        }
        self.0 |= value & Self::NEGATIVE;
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = |set: bool, c: char| if set { c } else { c.to_ascii_lowercase() };
        write!(
            f,
            "{}{}-{}{}{}{}{}",
            letter(self.negative(), 'N'),
            letter(self.overflow(), 'V'),
            letter(self.brk(), 'B'),
            letter(self.decimal(), 'D'),
            letter(self.interrupt(), 'I'),
            letter(self.zero(), 'Z'),
            letter(self.carry(), 'C'),
        )
    }
}

/// Implemented instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    NOPImplied,
    LDAImmediate,
    LDXImmediate,
    LDYImmediate,
    STAZeroPage,
    STXZeroPage,
    STYZeroPage,
    TAXImplied,
    TAYImplied,
    INXImplied,
    INYImplied,
    DEXImplied,
    DEYImplied,
    JMPAbsolute,
    BRKImplied,
}

/// Addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Immediate,
    ZeroPage,
    Absolute,
}

impl AddressingMode {
    /// Operand bytes following the opcode
    pub fn operand_len(&self) -> u16 {
        match self {
            AddressingMode::Implied => 0,
            AddressingMode::Immediate | AddressingMode::ZeroPage => 1,
            AddressingMode::Absolute => 2,
        }
    }
}

/// CPU instruction info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionInfo {
    pub opcode: Opcode,
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub cycles: u8,
}

/// Decode an opcode byte, `None` for anything outside the implemented subset
pub fn decode_opcode(byte: u8) -> Option<InstructionInfo> {
    use AddressingMode::*;
    use Opcode::*;

    let (opcode, mnemonic, mode, cycles) = match byte {
        0xEA => (NOPImplied, "NOP", Implied, 2),
        0xA9 => (LDAImmediate, "LDA", Immediate, 2),
        0xA2 => (LDXImmediate, "LDX", Immediate, 2),
        0xA0 => (LDYImmediate, "LDY", Immediate, 2),
        0x85 => (STAZeroPage, "STA", ZeroPage, 3),
        0x86 => (STXZeroPage, "STX", ZeroPage, 3),
        0x84 => (STYZeroPage, "STY", ZeroPage, 3),
        0xAA => (TAXImplied, "TAX", Implied, 2),
        0xA8 => (TAYImplied, "TAY", Implied, 2),
        0xE8 => (INXImplied, "INX", Implied, 2),
        0xC8 => (INYImplied, "INY", Implied, 2),
        0xCA => (DEXImplied, "DEX", Implied, 2),
        0x88 => (DEYImplied, "DEY", Implied, 2),
        0x4C => (JMPAbsolute, "JMP", Absolute, 3),
        0x00 => (BRKImplied, "BRK", Implied, 7),
        _ => return None,
    };

    Some(InstructionInfo { opcode, mnemonic, mode, cycles })
}

/// Why the CPU stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Executed BRK ($00)
    Brk,
    /// Hit an undecodable opcode under [`OpcodePolicy::Strict`]
    UnknownOpcode { opcode: u8, pc: u16 },
}

/// CPU emulator state
#[derive(Debug, Clone)]
pub struct Cpu {
    registers: CpuRegisters,
    status: StatusFlags,
    /// Running cycle counter, seeded with the reset sequence cost
    cycles: u64,
    /// Cycles executed since reset
    total_cycles: u64,
    halt: Option<HaltReason>,
    policy: OpcodePolicy,
}

impl Cpu {
    /// Create a new CPU instance
    pub fn new() -> Self {
        Self::with_policy(OpcodePolicy::default())
    }

    pub fn with_policy(policy: OpcodePolicy) -> Self {
        Self {
            registers: CpuRegisters::default(),
            status: StatusFlags::new(StatusFlags::RESET),
            cycles: 0,
            total_cycles: 0,
            halt: None,
            policy,
        }
    }

    /// Reset the CPU to its initial state and load PC from the reset vector
    pub fn reset(&mut self, mem: &mut impl MemoryAccess) {
        let lo = mem.try_read(RESET_VECTOR);
        let hi = mem.try_read(RESET_VECTOR.wrapping_add(1));

        self.registers = CpuRegisters::default();
        self.registers.pc = match (lo, hi) {
            (Some(lo), Some(hi)) => u16::from_le_bytes([lo, hi]),
            _ => DEFAULT_RESET_PC,
        };
        self.status = StatusFlags::new(StatusFlags::RESET);
        self.cycles = RESET_CYCLES;
        self.total_cycles = 0;
        self.halt = None;
    }

    /// Execute one instruction and return the cycles it took.
    ///
    /// A halted CPU burns one cycle per call. Under the strict policy an
    /// unknown opcode halts the CPU and is returned as an error.
    pub fn step(&mut self, mem: &mut impl MemoryAccess) -> Result<u8, CpuError> {
        if self.halt.is_some() {
            self.account(1);
            return Ok(1);
        }

        let opcode_pc = self.registers.pc;
        let opcode_byte = mem.read(opcode_pc);
        self.registers.pc = opcode_pc.wrapping_add(1);

        let Some(info) = decode_opcode(opcode_byte) else {
            return match self.policy {
                OpcodePolicy::BestEffort => {
                    self.account(UNKNOWN_OPCODE_CYCLES);
                    Ok(UNKNOWN_OPCODE_CYCLES)
                }
                OpcodePolicy::Strict => {
                    self.halt = Some(HaltReason::UnknownOpcode {
                        opcode: opcode_byte,
                        pc: opcode_pc,
                    });
                    Err(CpuError::UnknownOpcode {
                        opcode: opcode_byte,
                        pc: opcode_pc,
                    })
                }
            };
        };

        self.execute(info.opcode, mem);
        self.account(info.cycles);
        Ok(info.cycles)
    }

    fn execute(&mut self, opcode: Opcode, mem: &mut impl MemoryAccess) {
        let regs = &mut self.registers;
        match opcode {
            Opcode::NOPImplied => {}
            Opcode::LDAImmediate => {
                regs.a = Self::fetch(regs, mem);
                self.status.set_zn(regs.a);
            }
            Opcode::LDXImmediate => {
                regs.x = Self::fetch(regs, mem);
                self.status.set_zn(regs.x);
            }
            Opcode::LDYImmediate => {
                regs.y = Self::fetch(regs, mem);
                self.status.set_zn(regs.y);
            }
            Opcode::STAZeroPage => {
                let addr = Self::fetch(regs, mem) as u16;
                mem.write(addr, regs.a);
            }
            Opcode::STXZeroPage => {
                let addr = Self::fetch(regs, mem) as u16;
                mem.write(addr, regs.x);
            }
            Opcode::STYZeroPage => {
                let addr = Self::fetch(regs, mem) as u16;
                mem.write(addr, regs.y);
            }
            Opcode::TAXImplied => {
                regs.x = regs.a;
                self.status.set_zn(regs.x);
            }
            Opcode::TAYImplied => {
                regs.y = regs.a;
                self.status.set_zn(regs.y);
            }
            Opcode::INXImplied => {
                regs.x = regs.x.wrapping_add(1);
                self.status.set_zn(regs.x);
            }
            Opcode::INYImplied => {
                regs.y = regs.y.wrapping_add(1);
                self.status.set_zn(regs.y);
            }
            Opcode::DEXImplied => {
                regs.x = regs.x.wrapping_sub(1);
                self.status.set_zn(regs.x);
            }
            Opcode::DEYImplied => {
                regs.y = regs.y.wrapping_sub(1);
                self.status.set_zn(regs.y);
            }
            Opcode::JMPAbsolute => {
                let lo = Self::fetch(regs, mem);
                let hi = Self::fetch(regs, mem);
                regs.pc = u16::from_le_bytes([lo, hi]);
            }
            Opcode::BRKImplied => {
                self.halt = Some(HaltReason::Brk);
            }
        }
    }

    /// Read the byte at PC and advance PC
    fn fetch(regs: &mut CpuRegisters, mem: &mut impl MemoryAccess) -> u8 {
        let value = mem.read(regs.pc);
        regs.pc = regs.pc.wrapping_add(1);
        value
    }

    fn account(&mut self, cycles: u8) {
        self.cycles += cycles as u64;
        self.total_cycles += cycles as u64;
    }

    /// Get CPU registers
    pub fn registers(&self) -> &CpuRegisters {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut CpuRegisters {
        &mut self.registers
    }

    /// Get CPU status flags
    pub fn status(&self) -> &StatusFlags {
        &self.status
    }

    /// Raw P register
    pub fn p_register(&self) -> u8 {
        self.status.bits()
    }

    /// Running cycle counter (starts at 7 after reset)
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Cycles executed since reset, excluding the reset sequence
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn halted(&self) -> bool {
        self.halt.is_some()
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt
    }

    pub fn policy(&self) -> OpcodePolicy {
        self.policy
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

/// One decoded instruction, for traces and debuggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    pub pc: u16,
    pub bytes: Vec<u8>,
    pub text: String,
}

impl Disassembly {
    /// Opcode and operand bytes as space separated hex
    pub fn hex_bytes(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Decode the instruction at `pc` without executing it
pub fn disassemble(mem: &mut impl MemoryAccess, pc: u16) -> Disassembly {
    let opcode_byte = mem.read(pc);
    let Some(info) = decode_opcode(opcode_byte) else {
        return Disassembly {
            pc,
            bytes: vec![opcode_byte],
            text: format!(".db ${:02X}", opcode_byte),
        };
    };

    let mut bytes = vec![opcode_byte];
    for i in 1..=info.mode.operand_len() {
        bytes.push(mem.read(pc.wrapping_add(i)));
    }

    let text = match info.mode {
        AddressingMode::Implied => info.mnemonic.to_string(),
        AddressingMode::Immediate => format!("{} #${:02X}", info.mnemonic, bytes[1]),
        AddressingMode::ZeroPage => format!("{} ${:02X}", info.mnemonic, bytes[1]),
        AddressingMode::Absolute => format!(
            "{} ${:04X}",
            info.mnemonic,
            u16::from_le_bytes([bytes[1], bytes[2]])
        ),
    };

    Disassembly { pc, bytes, text }
}

/// CPU error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("unknown opcode ${opcode:02X} at ${pc:04X}")]
    UnknownOpcode { opcode: u8, pc: u16 },
}
