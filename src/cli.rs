//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};
use rfisp_core::flash::packet::MAX_PAYLOAD_LEN;
use std::path::PathBuf;

/// Parse a string as a hex (0x-prefixed) or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a fuse byte, hex with or without the 0x prefix
fn parse_fuse(s: &str) -> Result<u8, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid fuse byte: {}", e))
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "rfisp")]
#[command(author, version, about = "AVR in-system programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the target and read its fuses
    Probe {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Read the high and low fuse bytes
    Fuses {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Write fuse bytes (the high fuse always keeps SPI programming enabled)
    SetFuse {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// High fuse value (hex, e.g. DA)
        #[arg(long, value_parser = parse_fuse)]
        high: Option<u8>,

        /// Low fuse value (hex, e.g. FF)
        #[arg(long, value_parser = parse_fuse)]
        low: Option<u8>,
    },

    /// Chip erase
    Erase {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Program a raw binary image, packetized as the radio link would send it
    Write {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Input file path (raw binary)
        #[arg(short, long)]
        input: PathBuf,

        /// Byte address of the first image byte (hex or decimal)
        #[arg(long, default_value = "0", value_parser = parse_hex_u16)]
        base: u16,

        /// Payload bytes per packet
        #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u16).range(2..=MAX_PAYLOAD_LEN as i64))]
        chunk: u16,

        /// High fuse to write after programming (hex)
        #[arg(long, value_parser = parse_fuse)]
        high_fuse: Option<u8>,
    },

    /// Replay a captured packet stream into the target
    Replay {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Capture file of back-to-back length-prefixed packets
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List supported programmers
    ListProgrammers,
}
