//! Fuse commands implementation

use super::probe::{programmed_high, programmed_low};
use crate::programmers::BoxedMaster;
use rfisp_core::flash::Target;

/// Read and print the low and high fuses
pub fn run_read_fuses(master: BoxedMaster) -> Result<(), Box<dyn std::error::Error>> {
    let mut target = Target::new(master);

    let low = target.read_low_fuse()?;
    let high = target.read_high_fuse()?;
    println!("Low fuse:  0x{:02X}  programmed: {}", low, programmed_low(low));
    println!("High fuse: 0x{:02X}  programmed: {}", high, programmed_high(high));

    Ok(())
}

/// Write the requested fuses, low fuse first
pub fn run_set_fuse(
    master: BoxedMaster,
    high: Option<u8>,
    low: Option<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    if high.is_none() && low.is_none() {
        return Err("Nothing to write: pass --high and/or --low".into());
    }

    let mut target = Target::new(master);

    if let Some(value) = low {
        target.write_low_fuse(value)?;
        println!("Low fuse written: 0x{:02X}", value);
    }
    if let Some(value) = high {
        let written = target.write_high_fuse(value)?;
        if written != value {
            println!(
                "High fuse written: 0x{:02X} (requested 0x{:02X}, reset and SPI kept enabled)",
                written, value
            );
        } else {
            println!("High fuse written: 0x{:02X}", written);
        }
    }

    Ok(())
}
