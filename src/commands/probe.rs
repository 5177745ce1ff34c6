//! Probe command implementation

use crate::programmers::BoxedMaster;
use rfisp_core::flash::Target;
use rfisp_core::protocol::{HighFuse, LowFuse, ATMEGA328P_SIGNATURE};

/// Names of the programmed (zero) bits of a fuse byte
pub(crate) fn programmed_high(value: u8) -> String {
    names(HighFuse::from_bits_retain(!value).iter_names().map(|(n, _)| n))
}

pub(crate) fn programmed_low(value: u8) -> String {
    names(LowFuse::from_bits_retain(!value).iter_names().map(|(n, _)| n))
}

fn names<'a>(iter: impl Iterator<Item = &'a str>) -> String {
    let v: Vec<&str> = iter.collect();
    if v.is_empty() {
        "-".to_string()
    } else {
        v.join(" ")
    }
}

/// Identify the target and dump its configuration bytes
pub fn run_probe(master: BoxedMaster) -> Result<(), Box<dyn std::error::Error>> {
    let mut target = Target::new(master);

    match target.probe() {
        Ok(info) => {
            let [s0, s1, s2] = info.signature;
            println!("Found target:");
            println!(
                "  Signature:     {:02X} {:02X} {:02X}{}",
                s0,
                s1,
                s2,
                if info.signature == ATMEGA328P_SIGNATURE {
                    " (ATmega328P)"
                } else {
                    ""
                }
            );
            println!(
                "  Low fuse:      0x{:02X}  programmed: {}",
                info.low_fuse,
                programmed_low(info.low_fuse)
            );
            println!(
                "  High fuse:     0x{:02X}  programmed: {}",
                info.high_fuse,
                programmed_high(info.high_fuse)
            );
            println!("  Extended fuse: 0x{:02X}", info.extended_fuse);
            println!("  Lock bits:     0x{:02X}", info.lock_bits);
            Ok(())
        }
        Err(e) => {
            eprintln!("Probe failed: {}", e);
            Err(Box::new(e))
        }
    }
}
