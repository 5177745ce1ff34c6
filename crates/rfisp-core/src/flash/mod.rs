//! Streaming flash programming
//!
//! Firmware reaches the programmer as a sequence of small packets. This
//! module decodes them, tracks which flash page is open in the target's
//! page buffer, and commits pages as the address stream crosses page
//! boundaries.
//!
//! The pieces, leaves first:
//! - [`packet`] - wire format decoding and encoding
//! - [`page`] - pure page boundary tracking
//! - [`session`] - cross-packet state and the per-packet ingest routine
//! - [`Target`] - owns a master and a session, the usual entry point

pub mod packet;
pub mod page;
pub mod session;
mod target;

pub use packet::{Packet, PacketReader, RecordType};
pub use page::{page_of, PageTracker, PAGE_BYTES, PAGE_WORDS, PAGE_WORD_MASK};
pub use session::{ingest, Session, Status};
pub use target::Target;
