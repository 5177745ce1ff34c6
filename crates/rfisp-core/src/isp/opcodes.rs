//! AVR Serial Programming Algorithm opcodes
//!
//! Values are taken from the serial programming instruction set table of the
//! ATmega48A/88A/168A/328P family datasheet. Each constant is the first byte
//! of a 4-byte instruction; the second byte is listed where it is fixed.

// ============================================================================
// Programming mode
// ============================================================================

/// Programming Enable, first byte
pub const PROG_ENABLE: u8 = 0xAC;
/// Programming Enable, second byte
pub const PROG_ENABLE_ARG: u8 = 0x53;

// ============================================================================
// Identification
// ============================================================================

/// Read Signature Byte (third byte selects offset 0..=2)
pub const READ_SIGNATURE: u8 = 0x30;

// ============================================================================
// Fuse and lock bits
// ============================================================================

/// Read Fuse bits (low fuse with 0x00, extended fuse with 0x08)
pub const READ_FUSE: u8 = 0x50;
/// Read Fuse High bits (high fuse with 0x08, lock bits with 0x00)
pub const READ_FUSE_HIGH: u8 = 0x58;
/// Second byte selecting the extended fuse / high fuse
pub const FUSE_SELECT_HIGH: u8 = 0x08;
/// Second byte selecting the low fuse / lock bits
pub const FUSE_SELECT_LOW: u8 = 0x00;

/// Write instruction prefix (shared by fuse writes and chip erase)
pub const WRITE_PREFIX: u8 = 0xAC;
/// Write Fuse bits (low fuse), second byte
pub const WRITE_LOW_FUSE: u8 = 0xA0;
/// Write Fuse High bits, second byte
pub const WRITE_HIGH_FUSE: u8 = 0xA8;

// ============================================================================
// Flash programming
// ============================================================================

/// Chip Erase, second byte (after `WRITE_PREFIX`)
pub const CHIP_ERASE: u8 = 0x80;
/// Load Program Memory Page, low byte
pub const LOAD_LOW_BYTE: u8 = 0x40;
/// Load Program Memory Page, high byte
pub const LOAD_HIGH_BYTE: u8 = 0x48;
/// Write Program Memory Page
pub const WRITE_PAGE: u8 = 0x4C;

// ============================================================================
// Timing (milliseconds unless noted)
// ============================================================================

/// Hold time with SCK low before the reset pulse (datasheet minimum is 20)
pub const T_SETTLE_MS: u32 = 40;
/// Width of the positive reset pulse in microseconds
pub const T_RESET_PULSE_US: u32 = 100;
/// Wait after the reset pulse before Programming Enable
pub const T_ENABLE_MS: u32 = 50;
/// Page write completion time (tWD_FLASH is 4.5 ms, 10 kept as margin)
pub const T_WD_FLASH_MS: u32 = 10;
/// Chip erase completion time (tWD_ERASE is 9 ms, doubled)
pub const T_WD_ERASE_MS: u32 = 18;
