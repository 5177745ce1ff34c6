//! Target handle tying a master to a programming session

use super::session::{self, Session, Status};
use crate::error::{Error, Result};
use crate::programmer::IspMaster;
use crate::protocol::{self, DeviceInfo};

/// A programming target reached through an ISP master
///
/// Owning the master makes the pin set exclusive to one session at a time.
/// Dropping the target releases the bus so the target can run.
///
/// # Example
///
/// ```ignore
/// let mut target = Target::new(master);
/// while let Some(packet) = radio.receive() {
///     match target.ingest(&packet) {
///         Ok(Status::Accepted) => continue,
///         Ok(Status::FlashComplete) => {
///             target.write_high_fuse(0xDB)?;
///             break;
///         }
///         Err(e) => return Err(e),
///     }
/// }
/// ```
pub struct Target<M: IspMaster> {
    master: M,
    session: Session,
}

impl<M: IspMaster> Target<M> {
    /// Wrap a master with a fresh, inactive session
    pub fn new(master: M) -> Self {
        Self {
            master,
            session: Session::new(),
        }
    }

    /// Current session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Access the underlying master
    pub fn master(&self) -> &M {
        &self.master
    }

    /// Mutable access to the underlying master
    pub fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    /// Process one received packet, see [`session::ingest`]
    pub fn ingest(&mut self, packet: &[u8]) -> Result<Status> {
        session::ingest(&mut self.master, &mut self.session, packet)
    }

    /// Abandon the current session
    ///
    /// If a programming cycle is open the target is taken out of
    /// programming mode: the bus is released and reset floated so it boots
    /// whatever is in flash, possibly a partial image.
    pub fn abort(&mut self) {
        if self.session.is_active() {
            log::warn!("isp: session abandoned, target may be partially programmed");
            protocol::leave_programming_mode(&mut self.master);
        }
        self.session.reset();
    }

    /// Standalone operations run their own handshake, which would end an
    /// open programming cycle behind the session's back
    fn ensure_idle(&self) -> Result<()> {
        if self.session.is_active() {
            log::warn!("isp: refusing operation while a programming session is open");
            return Err(Error::SessionActive);
        }
        Ok(())
    }

    /// Erase the target's flash
    pub fn erase(&mut self) -> Result<()> {
        self.ensure_idle()?;
        protocol::chip_erase(&mut self.master)
    }

    /// Read signature, fuses and lock bits
    pub fn probe(&mut self) -> Result<DeviceInfo> {
        self.ensure_idle()?;
        protocol::probe(&mut self.master)
    }

    /// Read the high fuse byte
    pub fn read_high_fuse(&mut self) -> Result<u8> {
        self.ensure_idle()?;
        protocol::read_high_fuse(&mut self.master)
    }

    /// Read the low fuse byte
    pub fn read_low_fuse(&mut self) -> Result<u8> {
        self.ensure_idle()?;
        protocol::read_low_fuse(&mut self.master)
    }

    /// Write the high fuse byte with the safety mask applied, returning the
    /// value written
    pub fn write_high_fuse(&mut self, value: u8) -> Result<u8> {
        self.ensure_idle()?;
        protocol::write_high_fuse(&mut self.master, value)
    }

    /// Write the low fuse byte
    pub fn write_low_fuse(&mut self, value: u8) -> Result<()> {
        self.ensure_idle()?;
        protocol::write_low_fuse(&mut self.master, value)
    }
}

impl<M: IspMaster> Drop for Target<M> {
    fn drop(&mut self) {
        self.master.release();
    }
}
