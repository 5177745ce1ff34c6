//! Error types for Linux GPIO ISP operations

use thiserror::Error;

/// Linux GPIO ISP specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request GPIO lines
    #[error("Failed to request GPIO lines on '{path}': {source}")]
    LineRequestFailed {
        path: String,
        #[source]
        source: gpiocdev::Error,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Missing required parameter
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,

    /// The same line was assigned to two ISP signals
    #[error("GPIO line {0} is assigned to more than one signal")]
    DuplicateLine(u32),
}

/// Result type for Linux GPIO ISP operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
