//! Write and replay command implementation

use super::read_input;
use crate::error::CliError;
use indicatif::{ProgressBar, ProgressStyle};
use rfisp_core::flash::packet::{chunk_image, HEADER_LEN};
use rfisp_core::flash::{PacketReader, Status, Target};
use rfisp_core::programmer::IspMaster;
use rfisp_core::Error;
use std::path::Path;

fn progress_bar(total: u64, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Program a raw binary image
///
/// The image is cut into Data packets followed by EndOfFile, exactly what
/// the sending side of the radio link produces, and fed to the target.
pub fn run_write<M: IspMaster>(
    master: M,
    input: &Path,
    base: u16,
    chunk: u16,
    high_fuse: Option<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = read_input(input)?;
    println!("Read {} bytes from {:?}", image.len(), input);

    let packets = chunk_image(&image, base, chunk as usize).map_err(|_| CliError::ImageTooLarge {
        len: image.len(),
        base,
    })?;
    log::debug!("Sending {} packets", packets.remaining());

    let mut target = Target::new(master);
    let pb = progress_bar(image.len() as u64, "Writing");

    for packet in packets {
        match target.ingest(&packet) {
            Ok(Status::Accepted) => pb.inc((packet.len() - HEADER_LEN) as u64),
            Ok(Status::FlashComplete) => break,
            Err(e) => {
                pb.abandon_with_message("Write failed!");
                target.abort();
                return Err(Box::new(e));
            }
        }
    }
    pb.finish_with_message("Write complete");

    if let Some(value) = high_fuse {
        let written = target.write_high_fuse(value)?;
        println!("High fuse written: 0x{:02X}", written);
    }

    println!("Write complete!");
    Ok(())
}

/// Replay a packet capture
///
/// Malformed and unsupported packets are reported and skipped, as the radio
/// loop would; a target that stops answering ends the replay.
pub fn run_replay<M: IspMaster>(master: M, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let stream = read_input(input)?;
    println!("Read {} bytes of packets from {:?}", stream.len(), input);

    let mut target = Target::new(master);
    let pb = progress_bar(stream.len() as u64, "Replaying");

    let mut accepted = 0usize;
    let mut rejected = 0usize;
    let mut complete = false;
    let mut reader = PacketReader::new(&stream);

    for packet in reader.by_ref() {
        pb.inc(packet.len() as u64);
        match target.ingest(packet) {
            Ok(Status::Accepted) => accepted += 1,
            Ok(Status::FlashComplete) => {
                complete = true;
                break;
            }
            Err(e @ (Error::InvalidPacket | Error::UnsupportedRecordType)) => {
                rejected += 1;
                log::warn!("Skipping packet {}: {}", accepted + rejected, e);
            }
            Err(e) => {
                pb.abandon_with_message("Replay failed!");
                target.abort();
                return Err(Box::new(e));
            }
        }
    }

    let trailing = reader.count();
    if trailing > 0 {
        log::warn!("Ignoring {} packets after EndOfFile", trailing);
    }

    if !complete {
        pb.abandon_with_message("Replay incomplete");
        target.abort();
        return Err(Box::new(CliError::MissingEndOfFile));
    }

    pb.finish_with_message("Replay complete");
    println!(
        "Replay complete: {} data packets accepted, {} rejected",
        accepted, rejected
    );
    Ok(())
}
