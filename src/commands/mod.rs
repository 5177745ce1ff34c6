//! CLI command implementations
//!
//! Every command takes ownership of an opened master and wraps it in a
//! [`Target`](rfisp_core::flash::Target), so the bus is released when the
//! command returns, successful or not.

mod erase;
mod fuse;
mod list;
mod probe;
mod write;

pub use erase::run_erase;
pub use fuse::{run_read_fuses, run_set_fuse};
pub use list::list_programmers;
pub use probe::run_probe;
pub use write::{run_replay, run_write};

use crate::error::CliError;
use std::path::Path;

/// Read a whole input file
fn read_input(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
