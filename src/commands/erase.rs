//! Erase command implementation

use crate::programmers::BoxedMaster;
use rfisp_core::flash::Target;

/// Chip erase the target
pub fn run_erase(master: BoxedMaster) -> Result<(), Box<dyn std::error::Error>> {
    let mut target = Target::new(master);

    println!("Erasing flash...");
    target.erase()?;
    println!("Erase complete!");

    Ok(())
}
