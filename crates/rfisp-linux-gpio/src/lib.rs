//! rfisp-linux-gpio - Linux GPIO bitbang ISP support
//!
//! This crate drives an AVR target's ISP header from four GPIO lines using
//! the Linux character device GPIO interface (gpiocdev). It supplies the
//! pin backend and a sleeping delay for
//! [`BitbangIsp`](rfisp_core::programmer::BitbangIsp).
//!
//! # Example
//!
//! ```no_run
//! use rfisp_linux_gpio::{open, LinuxGpioIspConfig};
//! use rfisp_core::flash::Target;
//!
//! let config = LinuxGpioIspConfig::new("/dev/gpiochip0", 25, 11, 10, 9);
//! //                                    device          RST SCK MOSI MISO
//! let mut target = Target::new(open(&config)?);
//! let high = target.read_high_fuse()?;
//! println!("high fuse: 0x{:02X}", high);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with rfisp CLI
//!
//! ```bash
//! rfisp probe -p linux_gpio:dev=/dev/gpiochip0,rst=25,sck=11,mosi=10,miso=9
//! rfisp write -p linux_gpio:gpiochip=0,rst=25,sck=11,mosi=10,miso=9,spispeed=50 -i app.bin
//! ```
//!
//! # Wiring
//!
//! | Target pin | GPIO function | Notes |
//! |------------|---------------|-------|
//! | RESET      | RST           | Floats (pulled up) when idle |
//! | SCK        | SCK           | Driven only while programming |
//! | MOSI       | MOSI          | Driven only while programming |
//! | MISO       | MISO          | Always an input |
//! | GND        | GND           | Common ground is required |

pub mod device;
pub mod error;

// Re-exports
pub use device::{open, parse_options, LinuxGpioIsp, LinuxGpioIspConfig, LinuxGpioPins, StdDelay};
pub use error::{LinuxGpioError, Result};

/// Open a Linux GPIO ISP master from programmer string options
///
/// This is a convenience function for use in the CLI programmer dispatch.
///
/// # Options
///
/// - `dev=/dev/gpiochip0` - GPIO chip device path (or use gpiochip=N)
/// - `gpiochip=0` - GPIO chip number (alternative to dev)
/// - `rst=25` - target RESET line offset (required)
/// - `sck=11` - SCK line offset (required)
/// - `mosi=10` - MOSI line offset (required)
/// - `miso=9` - MISO line offset (required)
/// - `spispeed=100` - SPI speed in kHz (optional, default ~166 kHz)
pub fn open_linux_gpio_isp(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn rfisp_core::programmer::IspMaster + Send>, Box<dyn std::error::Error>>
{
    let config = parse_options(options)?;
    let isp = open(&config)?;
    Ok(Box::new(isp))
}
