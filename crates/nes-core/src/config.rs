//! Emulator configuration
//!
//! Runtime knobs for the console. Hosts build an [`EmulatorConfig`] (the CLI
//! fills one from its arguments) and hand it to
//! [`NesSystem::with_config`](crate::system::NesSystem::with_config).

/// NTSC CPU cycles per video frame
pub const NTSC_CYCLES_PER_FRAME: u64 = 29780;

/// How the CPU treats opcodes outside the implemented subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpcodePolicy {
    /// Execute as a 2-cycle no-op and keep running
    #[default]
    BestEffort,
    /// Halt the CPU and report the opcode
    Strict,
}

/// What to do when a ROM path does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingRomPolicy {
    /// Propagate `CartridgeError::NotFound`
    #[default]
    Fail,
    /// Substitute the synthesized test cartridge
    UseTestCartridge,
}

/// Console configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// CPU cycle budget for one `step_frame` call
    pub cycles_per_frame: u64,
    pub opcode_policy: OpcodePolicy,
    pub missing_rom: MissingRomPolicy,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            cycles_per_frame: NTSC_CYCLES_PER_FRAME,
            opcode_policy: OpcodePolicy::default(),
            missing_rom: MissingRomPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmulatorConfig::default();
        assert_eq!(config.cycles_per_frame, 29780);
        assert_eq!(config.opcode_policy, OpcodePolicy::BestEffort);
        assert_eq!(config.missing_rom, MissingRomPolicy::Fail);
    }
}
