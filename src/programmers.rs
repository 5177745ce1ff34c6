//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use crate::error::CliError;
use rfisp_core::programmer::{IspMaster, ProgrammerInfo};

/// Boxed master handed to the commands
pub type BoxedMaster = Box<dyn IspMaster + Send>;

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &["sim"],
        description: "Simulated ATmega328P with in-memory flash (signature=<hex>)",
        requires_root: false,
    });

    #[cfg(feature = "linux-gpio")]
    programmers.push(ProgrammerInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio", "gpio"],
        description:
            "Linux GPIO bitbang ISP (dev=/dev/gpiochipN,rst=,sck=,mosi=,miso=,spispeed=<kHz>)",
        requires_root: false,
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the canonical programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.iter().any(|a| *a == name))
        .map(|p| p.name)
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Open the programmer named by a programmer string
pub fn open_programmer(programmer: &str) -> Result<BoxedMaster, Box<dyn std::error::Error>> {
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = find_programmer(name).ok_or_else(|| CliError::UnknownProgrammer {
        name: name.to_string(),
        available: programmer_help(),
    })?;

    match canonical_name {
        #[cfg(feature = "dummy")]
        "dummy" => {
            let config = parse_dummy_options(&options)?;
            log::info!(
                "Opening simulated target (signature {:02X} {:02X} {:02X})",
                config.signature[0],
                config.signature[1],
                config.signature[2]
            );
            Ok(Box::new(rfisp_dummy::DummyTarget::new(config)))
        }

        #[cfg(feature = "linux-gpio")]
        "linux_gpio" => {
            log::info!("Opening Linux GPIO programmer...");
            rfisp_linux_gpio::open_linux_gpio_isp(&options).map_err(|e| {
                format!(
                    "Failed to open Linux GPIO device: {}\n\
                     Make sure the gpiochip exists and you have read/write permissions.",
                    e
                )
                .into()
            })
        }

        _ => Err(CliError::UnknownProgrammer {
            name: name.to_string(),
            available: programmer_help(),
        }
        .into()),
    }
}

/// Parse a 3-byte signature written as six hex digits
#[cfg(feature = "dummy")]
fn parse_signature(value: &str) -> Option<[u8; 3]> {
    if value.len() != 6 {
        return None;
    }
    let mut signature = [0u8; 3];
    for (i, byte) in signature.iter_mut().enumerate() {
        *byte = u8::from_str_radix(value.get(i * 2..i * 2 + 2)?, 16).ok()?;
    }
    Some(signature)
}

#[cfg(feature = "dummy")]
fn parse_dummy_options(options: &[(&str, &str)]) -> Result<rfisp_dummy::DummyConfig, CliError> {
    let mut config = rfisp_dummy::DummyConfig::default();

    for (key, value) in options {
        match *key {
            "signature" => {
                config.signature =
                    parse_signature(value).ok_or_else(|| CliError::InvalidOption {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason: "expected six hex digits",
                    })?;
            }
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    Ok(config)
}
