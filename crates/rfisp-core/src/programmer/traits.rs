//! Programmer trait definitions

use crate::isp::IspCommand;

/// ISP master trait
///
/// This is the electrical layer beneath the serial programming protocol:
/// control of the target's reset line, bus ownership, byte transfers and
/// blocking delays. The protocol code never touches pins directly, so a
/// simulated target can implement this trait and stand in for hardware.
///
/// All operations are blocking and run to completion.
pub trait IspMaster {
    /// Claim the bus: SCK and MOSI driven low as outputs, MISO left as input
    fn acquire(&mut self);

    /// Release the bus: SCK and MOSI return to inputs so the target may use
    /// its SPI pins again
    fn release(&mut self);

    /// Drive the reset line as an output at the given level
    fn drive_reset(&mut self, high: bool);

    /// Turn the reset line into an input and pull it logically high
    ///
    /// This ends the reset condition and lets the target boot.
    fn float_reset(&mut self);

    /// Set the SCK level (only meaningful while the bus is acquired)
    fn set_sck(&mut self, high: bool);

    /// Shift one byte out MSB first, returning the byte shifted in
    fn transfer_byte(&mut self, byte: u8) -> u8;

    /// Run one 4-byte instruction and return the response to the last byte
    ///
    /// The responses to the first three bytes are discarded.
    fn transaction(&mut self, cmd: IspCommand) -> u8 {
        let [a, b, c, d] = cmd.bytes();
        self.transfer_byte(a);
        self.transfer_byte(b);
        self.transfer_byte(c);
        self.transfer_byte(d)
    }

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Delay for the specified number of milliseconds
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1000);
        }
    }
}

impl<M: IspMaster + ?Sized> IspMaster for &mut M {
    fn acquire(&mut self) {
        (**self).acquire()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn drive_reset(&mut self, high: bool) {
        (**self).drive_reset(high)
    }

    fn float_reset(&mut self) {
        (**self).float_reset()
    }

    fn set_sck(&mut self, high: bool) {
        (**self).set_sck(high)
    }

    fn transfer_byte(&mut self, byte: u8) -> u8 {
        (**self).transfer_byte(byte)
    }

    fn transaction(&mut self, cmd: IspCommand) -> u8 {
        (**self).transaction(cmd)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

// Lets the CLI hold whichever backend it opened as a trait object
#[cfg(feature = "alloc")]
impl<M: IspMaster + ?Sized> IspMaster for alloc::boxed::Box<M> {
    fn acquire(&mut self) {
        (**self).acquire()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn drive_reset(&mut self, high: bool) {
        (**self).drive_reset(high)
    }

    fn float_reset(&mut self) {
        (**self).float_reset()
    }

    fn set_sck(&mut self, high: bool) {
        (**self).set_sck(high)
    }

    fn transfer_byte(&mut self, byte: u8) -> u8 {
        (**self).transfer_byte(byte)
    }

    fn transaction(&mut self, cmd: IspCommand) -> u8 {
        (**self).transaction(cmd)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

/// Information about a programmer backend
#[derive(Debug, Clone)]
pub struct ProgrammerInfo {
    /// Name of the programmer
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Description
    pub description: &'static str,
    /// Whether this programmer requires elevated privileges
    pub requires_root: bool,
}
