//! Reset handshake and device identification

use crate::error::{Error, Result};
use crate::isp::{opcodes, IspCommand};
use crate::programmer::IspMaster;

/// Signature of the only supported target (ATmega328P)
pub const ATMEGA328P_SIGNATURE: [u8; 3] = [0x1E, 0x95, 0x0F];

/// Read the three signature bytes
///
/// The target must already be in programming mode.
pub fn read_signature<M: IspMaster + ?Sized>(master: &mut M) -> [u8; 3] {
    let mut signature = [0u8; 3];
    for (offset, byte) in signature.iter_mut().enumerate() {
        *byte = master.transaction(IspCommand::read_signature(offset as u8));
    }
    signature
}

/// Reset the target into programming mode and verify its identity
///
/// On success the target stays in programming mode and the bus stays
/// acquired; the caller must finish with [`leave_programming_mode`]. On a
/// signature mismatch the bus is released and the target let out of reset
/// before [`Error::DeviceNotResponding`] is returned.
pub fn enter_programming_mode<M: IspMaster + ?Sized>(master: &mut M) -> Result<()> {
    master.drive_reset(false);

    master.acquire();
    master.set_sck(false);
    master.delay_ms(opcodes::T_SETTLE_MS);

    // A positive pulse while SCK is low is what selects programming mode
    master.drive_reset(true);
    master.delay_us(opcodes::T_RESET_PULSE_US);
    master.drive_reset(false);

    master.delay_ms(opcodes::T_ENABLE_MS);
    master.transaction(IspCommand::programming_enable());

    let signature = read_signature(master);
    if signature != ATMEGA328P_SIGNATURE {
        log::warn!(
            "isp: bad signature {:02X} {:02X} {:02X} (expected {:02X} {:02X} {:02X})",
            signature[0],
            signature[1],
            signature[2],
            ATMEGA328P_SIGNATURE[0],
            ATMEGA328P_SIGNATURE[1],
            ATMEGA328P_SIGNATURE[2]
        );
        leave_programming_mode(master);
        return Err(Error::DeviceNotResponding);
    }

    log::debug!("isp: target in programming mode");
    Ok(())
}

/// Release the bus and let the target boot
pub fn leave_programming_mode<M: IspMaster + ?Sized>(master: &mut M) {
    master.release();
    master.float_reset();
    log::debug!("isp: target released");
}

/// Identity and configuration read back from a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Signature bytes
    pub signature: [u8; 3],
    /// Low fuse byte
    pub low_fuse: u8,
    /// High fuse byte
    pub high_fuse: u8,
    /// Extended fuse byte
    pub extended_fuse: u8,
    /// Lock bits
    pub lock_bits: u8,
}

/// Enter programming mode once and read everything identifying the target
pub fn probe<M: IspMaster + ?Sized>(master: &mut M) -> Result<DeviceInfo> {
    enter_programming_mode(master)?;
    let info = DeviceInfo {
        signature: read_signature(master),
        low_fuse: master.transaction(IspCommand::read_low_fuse()),
        high_fuse: master.transaction(IspCommand::read_high_fuse()),
        extended_fuse: master.transaction(IspCommand::read_extended_fuse()),
        lock_bits: master.transaction(IspCommand::read_lock_bits()),
    };
    leave_programming_mode(master);
    Ok(info)
}
