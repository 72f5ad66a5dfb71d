//! Cartridge loading
//!
//! Parses iNES images into PRG/CHR buffers plus the mapper number. Only the
//! mapper number is recorded; no bank switching is modeled.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::MissingRomPolicy;

/// iNES header size
pub const HEADER_SIZE: usize = 16;

/// iNES magic: "NES\x1A"
pub const INES_MAGIC: [u8; 4] = [b'N', b'E', b'S', 0x1A];

/// PRG ROM bank size (header byte 4 unit)
pub const PRG_BANK_SIZE: usize = 16 * 1024;

/// CHR ROM bank size (header byte 5 unit)
pub const CHR_BANK_SIZE: usize = 8 * 1024;

/// Name reported by the synthesized cartridge
pub const TEST_ROM_NAME: &str = "Test ROM";

/// iNES header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InesHeader {
    /// PRG ROM size in 16KB units
    pub prg_rom_banks: u8,
    /// CHR ROM size in 8KB units
    pub chr_rom_banks: u8,
    /// Flags 6 (high nibble = mapper low bits)
    pub flags_6: u8,
    /// Flags 7 (high nibble = mapper high bits)
    pub flags_7: u8,
}

impl InesHeader {
    /// Parse an iNES header from the first 16 bytes of an image
    pub fn parse(bytes: &[u8]) -> Result<Self, CartridgeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CartridgeError::InvalidFormat("header shorter than 16 bytes"));
        }
        if bytes[0..4] != INES_MAGIC {
            return Err(CartridgeError::InvalidFormat("missing NES\\x1A magic"));
        }

        Ok(Self {
            prg_rom_banks: bytes[4],
            chr_rom_banks: bytes[5],
            flags_6: bytes[6],
            flags_7: bytes[7],
        })
    }

    /// Get the mapper number from flags
    pub fn mapper_number(&self) -> u8 {
        (self.flags_6 >> 4) | (self.flags_7 & 0xF0)
    }

    pub fn prg_size(&self) -> usize {
        self.prg_rom_banks as usize * PRG_BANK_SIZE
    }

    pub fn chr_size(&self) -> usize {
        self.chr_rom_banks as usize * CHR_BANK_SIZE
    }
}

/// Cartridge structure
///
/// Immutable once loaded. `prg_rom.len() == 16384 * header[4]` and
/// `chr_rom.len() == 8192 * header[5]` hold for every loaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cartridge {
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    mapper_id: u8,
    name: String,
    path: Option<PathBuf>,
}

impl Cartridge {
    /// Parse an in-memory iNES image
    pub fn from_bytes(rom_data: &[u8]) -> Result<Self, CartridgeError> {
        let header = InesHeader::parse(rom_data)?;

        let prg_start = HEADER_SIZE;
        let prg_end = prg_start + header.prg_size();
        let prg_rom = slice_section(rom_data, prg_start, prg_end, "PRG ROM")?.to_vec();

        let chr_end = prg_end + header.chr_size();
        let chr_rom = slice_section(rom_data, prg_end, chr_end, "CHR ROM")?.to_vec();

        Ok(Self {
            prg_rom,
            chr_rom,
            mapper_id: header.mapper_number(),
            name: String::from("Unnamed ROM"),
            path: None,
        })
    }

    /// Load an iNES image from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let rom_data = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CartridgeError::NotFound(path.to_path_buf()),
            _ => CartridgeError::Io(e),
        })?;

        let mut cartridge = Self::from_bytes(&rom_data)?;
        cartridge.name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        cartridge.path = Some(path.to_path_buf());
        Ok(cartridge)
    }

    /// Load from disk, substituting the test cartridge for a missing file when
    /// the policy allows it. Format and read errors always propagate.
    pub fn open(path: impl AsRef<Path>, policy: MissingRomPolicy) -> Result<Self, CartridgeError> {
        match Self::from_file(path) {
            Err(CartridgeError::NotFound(_)) if policy == MissingRomPolicy::UseTestCartridge => {
                Ok(Self::test_cartridge())
            }
            result => result,
        }
    }

    /// Minimal in-memory cartridge: `LDA #$42; NOP; BRK` at $8000, the rest of
    /// the 16KB bank filled with NOP, reset vector pointing at $8000.
    pub fn test_cartridge() -> Self {
        let mut prg_rom = vec![0xEA; PRG_BANK_SIZE];
        prg_rom[..4].copy_from_slice(&[0xA9, 0x42, 0xEA, 0x00]);
        prg_rom[0x3FFC] = 0x00;
        prg_rom[0x3FFD] = 0x80;

        Self {
            prg_rom,
            chr_rom: Vec::new(),
            mapper_id: 0,
            name: String::from(TEST_ROM_NAME),
            path: None,
        }
    }

    /// Get PRG ROM data
    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    /// Get CHR ROM data
    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    pub fn prg_size(&self) -> usize {
        self.prg_rom.len()
    }

    pub fn chr_size(&self) -> usize {
        self.chr_rom.len()
    }

    pub fn mapper_id(&self) -> u8 {
        self.mapper_id
    }

    /// File name the cartridge was loaded from
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Display for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: mapper {}, PRG {} KiB, CHR {} KiB",
            self.name,
            self.mapper_id,
            self.prg_size() / 1024,
            self.chr_size() / 1024
        )
    }
}

fn slice_section<'a>(
    data: &'a [u8],
    start: usize,
    end: usize,
    section: &'static str,
) -> Result<&'a [u8], CartridgeError> {
    data.get(start..end).ok_or(CartridgeError::Truncated {
        section,
        expected: end - start,
        found: data.len().saturating_sub(start),
    })
}

/// Cartridge error types
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("ROM file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("invalid iNES image: {0}")]
    InvalidFormat(&'static str),
    #[error("truncated iNES image: {section} needs {expected} bytes, found {found}")]
    Truncated {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("failed to read ROM file")]
    Io(#[from] io::Error),
}
