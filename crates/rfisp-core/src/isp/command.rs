//! 4-byte ISP instruction builders

use super::opcodes;
use crate::flash::PAGE_WORD_MASK;

/// A single 4-byte serial programming instruction
///
/// The response to an instruction is shifted out by the target while the
/// fourth byte is clocked in, so only that byte is ever meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IspCommand(pub [u8; 4]);

impl IspCommand {
    /// Programming Enable
    pub const fn programming_enable() -> Self {
        Self([opcodes::PROG_ENABLE, opcodes::PROG_ENABLE_ARG, 0x00, 0x00])
    }

    /// Read one signature byte (`offset` is 0, 1 or 2)
    pub const fn read_signature(offset: u8) -> Self {
        Self([opcodes::READ_SIGNATURE, 0x00, offset & 0x03, 0x00])
    }

    /// Read the high fuse byte
    pub const fn read_high_fuse() -> Self {
        Self([opcodes::READ_FUSE_HIGH, opcodes::FUSE_SELECT_HIGH, 0x00, 0x00])
    }

    /// Read the low fuse byte
    pub const fn read_low_fuse() -> Self {
        Self([opcodes::READ_FUSE, opcodes::FUSE_SELECT_LOW, 0x00, 0x00])
    }

    /// Read the extended fuse byte
    pub const fn read_extended_fuse() -> Self {
        Self([opcodes::READ_FUSE, opcodes::FUSE_SELECT_HIGH, 0x00, 0x00])
    }

    /// Read the lock bits
    pub const fn read_lock_bits() -> Self {
        Self([opcodes::READ_FUSE_HIGH, opcodes::FUSE_SELECT_LOW, 0x00, 0x00])
    }

    /// Write the high fuse byte, exactly as given
    ///
    /// Callers are expected to go through the fuse accessor, which applies
    /// the safety mask first.
    pub const fn write_high_fuse(value: u8) -> Self {
        Self([opcodes::WRITE_PREFIX, opcodes::WRITE_HIGH_FUSE, 0x00, value])
    }

    /// Write the low fuse byte
    pub const fn write_low_fuse(value: u8) -> Self {
        Self([opcodes::WRITE_PREFIX, opcodes::WRITE_LOW_FUSE, 0x00, value])
    }

    /// Chip Erase (flash and EEPROM)
    pub const fn chip_erase() -> Self {
        Self([opcodes::WRITE_PREFIX, opcodes::CHIP_ERASE, 0x00, 0x00])
    }

    /// Load the low byte of a word into the page buffer
    pub const fn load_low_byte(word_addr: u32, value: u8) -> Self {
        Self([
            opcodes::LOAD_LOW_BYTE,
            0x00,
            (word_addr & PAGE_WORD_MASK) as u8,
            value,
        ])
    }

    /// Load the high byte of a word into the page buffer
    pub const fn load_high_byte(word_addr: u32, value: u8) -> Self {
        Self([
            opcodes::LOAD_HIGH_BYTE,
            0x00,
            (word_addr & PAGE_WORD_MASK) as u8,
            value,
        ])
    }

    /// Write the page buffer to the flash page starting at `page` (word address)
    pub const fn write_page(page: u32) -> Self {
        Self([
            opcodes::WRITE_PAGE,
            ((page >> 8) & 0xFF) as u8,
            (page & 0xFF) as u8,
            0x00,
        ])
    }

    /// Raw instruction bytes
    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }

    /// First byte of the instruction
    pub const fn opcode(&self) -> u8 {
        self.0[0]
    }
}

impl From<IspCommand> for [u8; 4] {
    fn from(cmd: IspCommand) -> Self {
        cmd.0
    }
}
