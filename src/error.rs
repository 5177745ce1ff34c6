//! CLI error type

use std::path::PathBuf;

/// Errors raised by the command-line front end
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Programmer name did not match any compiled-in backend
    #[error("Unknown programmer: {name}\n\n{available}\nUse 'rfisp list-programmers' for more details")]
    UnknownProgrammer {
        /// Name as given on the command line
        name: String,
        /// Help text listing the available programmers
        available: String,
    },

    /// Invalid programmer option
    #[error("Invalid option {key}={value}: {reason}")]
    InvalidOption {
        /// Option key
        key: String,
        /// Option value
        value: String,
        /// What was wrong with it
        reason: &'static str,
    },

    /// Failed to read an input file
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Image does not fit in the 16-bit packet address space
    #[error("Image of {len} bytes at base 0x{base:04X} exceeds the 64 KiB address space")]
    ImageTooLarge {
        /// Image length in bytes
        len: usize,
        /// Base byte address
        base: u16,
    },

    /// The stream ended before the EndOfFile record
    #[error("Packet stream ended without an EndOfFile record")]
    MissingEndOfFile,
}
