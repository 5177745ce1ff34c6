//! Programming session state and packet ingestion

use super::packet::{Packet, RecordType};
use super::page::PageTracker;
use crate::error::Result;
use crate::programmer::IspMaster;
use crate::protocol;

/// Outcome of ingesting one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Packet processed, more are expected
    Accepted,
    /// EndOfFile processed: last page committed and target released
    FlashComplete,
}

/// State carried between packets of one image transfer
///
/// A fresh session is inactive. The first valid packet erases the target
/// and opens a programming cycle; EndOfFile closes it and resets the
/// session so the next image starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    active: bool,
    pages: PageTracker,
}

impl Session {
    /// Create an inactive session
    pub const fn new() -> Self {
        Self {
            active: false,
            pages: PageTracker::new(),
        }
    }

    /// Whether a programming cycle is open
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Word address of the page the session will commit next
    pub fn last_committed_page(&self) -> u32 {
        self.pages.last_committed_page()
    }

    /// Forget any open programming cycle
    ///
    /// This does not touch the target. A target abandoned mid-image may be
    /// left partially programmed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Process one received packet
///
/// `buf` must contain exactly the bytes received for this packet. Framing
/// and record type are validated before the target is touched, so a
/// rejected packet leaves `session` unchanged.
///
/// The first packet of an inactive session erases the target and enters
/// programming mode; a handshake failure is reported as
/// [`Error::DeviceNotResponding`](crate::Error::DeviceNotResponding) with
/// the session still inactive.
pub fn ingest<M: IspMaster + ?Sized>(
    master: &mut M,
    session: &mut Session,
    buf: &[u8],
) -> Result<Status> {
    let packet = Packet::parse(buf).inspect_err(|e| {
        log::warn!("isp: rejecting {} byte packet: {}", buf.len(), e);
    })?;

    if !session.active {
        protocol::chip_erase(master)?;
        protocol::enter_programming_mode(master)?;
        session.active = true;
        session.pages = PageTracker::new();
        log::info!("isp: programming session started");
    }

    match packet.record_type {
        RecordType::EndOfFile => {
            protocol::commit_page(master, session.pages.flush());
            protocol::leave_programming_mode(master);
            session.reset();
            log::info!("isp: programming session complete");
            Ok(Status::FlashComplete)
        }
        RecordType::Data => {
            for (word_addr, low, high) in packet.words() {
                if let Some(page) = session.pages.advance(word_addr) {
                    protocol::commit_page(master, page);
                }
                protocol::load_word(master, word_addr, low, high);
            }
            Ok(Status::Accepted)
        }
    }
}
