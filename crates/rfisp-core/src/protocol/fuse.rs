//! Fuse byte access
//!
//! Fuse bits are active low: a programmed bit reads 0. Two bits of the high
//! fuse decide whether this programmer can ever reach the target again, so
//! every high fuse write goes through [`HighFuse::make_safe`].

use bitflags::bitflags;

use crate::error::Result;
use crate::isp::IspCommand;
use crate::programmer::IspMaster;

use super::{enter_programming_mode, leave_programming_mode};

bitflags! {
    /// High fuse bits (ATmega328P)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HighFuse: u8 {
        /// Reset vector selects the boot loader section when programmed
        const BOOTRST  = 1 << 0;
        /// Boot section size, bit 0
        const BOOTSZ0  = 1 << 1;
        /// Boot section size, bit 1
        const BOOTSZ1  = 1 << 2;
        /// Preserve EEPROM through chip erase
        const EESAVE   = 1 << 3;
        /// Watchdog always on
        const WDTON    = 1 << 4;
        /// Serial programming enabled (must stay programmed)
        const SPIEN    = 1 << 5;
        /// debugWIRE enabled
        const DWEN     = 1 << 6;
        /// External reset disabled (must stay unprogrammed)
        const RSTDISBL = 1 << 7;
    }
}

impl HighFuse {
    /// Force external reset and serial programming to stay enabled
    ///
    /// Programming RSTDISBL or unprogramming SPIEN locks this programmer out
    /// of the target for good.
    pub fn make_safe(self) -> Self {
        self.union(Self::RSTDISBL).difference(Self::SPIEN)
    }
}

bitflags! {
    /// Low fuse bits (ATmega328P)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LowFuse: u8 {
        /// Clock source select, bit 0
        const CKSEL0 = 1 << 0;
        /// Clock source select, bit 1
        const CKSEL1 = 1 << 1;
        /// Clock source select, bit 2
        const CKSEL2 = 1 << 2;
        /// Clock source select, bit 3
        const CKSEL3 = 1 << 3;
        /// Start-up time, bit 0
        const SUT0   = 1 << 4;
        /// Start-up time, bit 1
        const SUT1   = 1 << 5;
        /// Clock output on PORTB0
        const CKOUT  = 1 << 6;
        /// Divide clock by 8
        const CKDIV8 = 1 << 7;
    }
}

/// Read the high fuse byte
pub fn read_high_fuse<M: IspMaster + ?Sized>(master: &mut M) -> Result<u8> {
    read_fuse(master, IspCommand::read_high_fuse())
}

/// Read the low fuse byte
pub fn read_low_fuse<M: IspMaster + ?Sized>(master: &mut M) -> Result<u8> {
    read_fuse(master, IspCommand::read_low_fuse())
}

/// Read the extended fuse byte
pub fn read_extended_fuse<M: IspMaster + ?Sized>(master: &mut M) -> Result<u8> {
    read_fuse(master, IspCommand::read_extended_fuse())
}

/// Read the lock bits
pub fn read_lock_bits<M: IspMaster + ?Sized>(master: &mut M) -> Result<u8> {
    read_fuse(master, IspCommand::read_lock_bits())
}

fn read_fuse<M: IspMaster + ?Sized>(master: &mut M, cmd: IspCommand) -> Result<u8> {
    enter_programming_mode(master)?;
    let value = master.transaction(cmd);
    leave_programming_mode(master);
    Ok(value)
}

/// Write the high fuse byte with the safety mask applied
///
/// Returns the value actually written.
pub fn write_high_fuse<M: IspMaster + ?Sized>(master: &mut M, value: u8) -> Result<u8> {
    let safe = HighFuse::from_bits_retain(value).make_safe().bits();
    if safe != value {
        log::warn!(
            "isp: high fuse 0x{:02X} would lock out ISP, writing 0x{:02X}",
            value,
            safe
        );
    }

    enter_programming_mode(master)?;
    master.transaction(IspCommand::write_high_fuse(safe));
    leave_programming_mode(master);
    Ok(safe)
}

/// Write the low fuse byte
pub fn write_low_fuse<M: IspMaster + ?Sized>(master: &mut M, value: u8) -> Result<()> {
    enter_programming_mode(master)?;
    master.transaction(IspCommand::write_low_fuse(value));
    leave_programming_mode(master);
    Ok(())
}
