//! Error types for rfisp-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The target did not answer the handshake with the expected signature
    ///
    /// Either the wiring is broken, the target is held by something else, or
    /// a different part is attached. No flash or fuse mutation happens after
    /// this is reported.
    DeviceNotResponding,
    /// Packet framing is broken (too short, length byte disagrees with the
    /// received size, or odd payload length)
    InvalidPacket,
    /// Packet carries a record type other than Data or EndOfFile
    UnsupportedRecordType,
    /// A standalone operation was requested while an image transfer is open
    ///
    /// Its own handshake would take the target out of programming mode and
    /// the rest of the image would be lost. Finish or abort the session
    /// first.
    SessionActive,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotResponding => write!(f, "target device not responding"),
            Self::InvalidPacket => write!(f, "invalid packet framing"),
            Self::UnsupportedRecordType => write!(f, "unsupported record type"),
            Self::SessionActive => write!(f, "programming session in progress"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
