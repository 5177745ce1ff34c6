//! Flash programming primitives

use crate::error::Result;
use crate::isp::{opcodes, IspCommand};
use crate::programmer::IspMaster;

use super::{enter_programming_mode, leave_programming_mode};

/// Load one flash word into the page buffer, low byte first
pub fn load_word<M: IspMaster + ?Sized>(master: &mut M, word_addr: u32, low: u8, high: u8) {
    master.transaction(IspCommand::load_low_byte(word_addr, low));
    master.transaction(IspCommand::load_high_byte(word_addr, high));
}

/// Write the page buffer to flash and wait for the write to complete
///
/// `page` is the word address of the first word in the page.
pub fn commit_page<M: IspMaster + ?Sized>(master: &mut M, page: u32) {
    log::debug!("isp: committing page 0x{:04X}", page);
    master.transaction(IspCommand::write_page(page));
    master.delay_ms(opcodes::T_WD_FLASH_MS);
}

/// Erase the whole chip in its own programming cycle
///
/// Flash reads back as 0xFF afterwards; fuses are not affected.
pub fn chip_erase<M: IspMaster + ?Sized>(master: &mut M) -> Result<()> {
    enter_programming_mode(master)?;

    log::info!("isp: erasing target");
    master.transaction(IspCommand::chip_erase());
    master.delay_ms(opcodes::T_WD_ERASE_MS);

    leave_programming_mode(master);
    Ok(())
}
