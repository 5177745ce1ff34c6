//! rfisp-core - Core library for remote AVR in-system programming
//!
//! This crate drives an AVR target through its Serial Programming Algorithm
//! over a software (bit-banged) SPI bus. Firmware arrives as a stream of
//! small binary packets, is loaded word by word into the target's page
//! buffer and committed page by page. It is designed to be `no_std`
//! compatible so it can run on the receiving microcontroller itself.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation (`IspMaster` for boxed masters)
//!
//! # Example
//!
//! ```ignore
//! use rfisp_core::flash::{Status, Target};
//! use rfisp_core::programmer::IspMaster;
//!
//! fn run<M: IspMaster>(master: M, packets: &[&[u8]]) -> rfisp_core::Result<()> {
//!     let mut target = Target::new(master);
//!     for packet in packets {
//!         if target.ingest(packet)? == Status::FlashComplete {
//!             // disable the bootloader
//!             target.write_high_fuse(0xDB)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod error;
pub mod flash;
pub mod isp;
pub mod programmer;
pub mod protocol;

pub use error::{Error, Result};
