//! AVR serial programming command layer
//!
//! Every instruction of the Serial Programming Algorithm is a fixed 4-byte
//! transaction. This module holds the opcodes and the builders that place
//! addresses and data into their positional slots.

mod command;
pub mod opcodes;

pub use command::*;
