//! Programmer traits and abstractions
//!
//! This module defines the trait the programming protocol is written
//! against, and the bit-banged implementation of it.

pub mod bitbang;
mod traits;

pub use bitbang::{BitbangIsp, Direction, IspConfig, IspPins, Pin};
pub use traits::*;
