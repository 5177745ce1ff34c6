//! AVR Serial Programming Algorithm
//!
//! Command sequences built on [`IspMaster`](crate::programmer::IspMaster):
//! entering and leaving programming mode, flash page programming, chip
//! erase and fuse access. Every function here is blocking and follows the
//! datasheet timing as fixed minimum delays; nothing polls the target.

mod fuse;
mod handshake;
mod program;

pub use fuse::*;
pub use handshake::*;
pub use program::*;
