//! rfisp - remote AVR in-system programmer
//!
//! Drives an ATmega328P's serial programming interface through a
//! bit-banged SPI transport. Firmware images are fed to the target as the
//! same small length-prefixed packets a radio link would deliver, so a
//! captured packet stream can be replayed exactly as it arrived.
//!
//! # Architecture
//!
//! Every backend produces an [`IspMaster`](rfisp_core::programmer::IspMaster):
//! - **dummy** - simulated target with an in-memory flash
//! - **linux_gpio** - four GPIO lines on a Linux gpiochip
//!
//! The commands wrap that master in a [`Target`](rfisp_core::flash::Target)
//! and never touch pins themselves.

mod cli;
mod commands;
mod error;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Probe { programmer } => {
            let master = programmers::open_programmer(&programmer)?;
            commands::run_probe(master)
        }
        Commands::Fuses { programmer } => {
            let master = programmers::open_programmer(&programmer)?;
            commands::run_read_fuses(master)
        }
        Commands::SetFuse {
            programmer,
            high,
            low,
        } => {
            let master = programmers::open_programmer(&programmer)?;
            commands::run_set_fuse(master, high, low)
        }
        Commands::Erase { programmer } => {
            let master = programmers::open_programmer(&programmer)?;
            commands::run_erase(master)
        }
        Commands::Write {
            programmer,
            input,
            base,
            chunk,
            high_fuse,
        } => {
            let master = programmers::open_programmer(&programmer)?;
            commands::run_write(master, &input, base, chunk, high_fuse)
        }
        Commands::Replay { programmer, input } => {
            let master = programmers::open_programmer(&programmer)?;
            commands::run_replay(master, &input)
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    }
}
