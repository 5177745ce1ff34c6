//! rfisp-dummy - Simulated ATmega328P programming target
//!
//! This crate provides an [`IspMaster`] that, instead of driving pins,
//! emulates the target at the other end of the wires: an in-memory flash
//! array with a page buffer, fuse bytes, and a virtual clock. It is used by
//! the CLI's `dummy` programmer and by tests that need to check what the
//! protocol actually did to the chip.
//!
//! The simulation is strict where the real part is: instructions are
//! ignored until programming mode has been entered with reset held low,
//! and an instruction that arrives while a page write or chip erase is still
//! in progress is dropped and counted as a timing violation.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use rfisp_core::flash::{page_of, PAGE_BYTES, PAGE_WORD_MASK};
use rfisp_core::isp::{opcodes, IspCommand};
use rfisp_core::programmer::IspMaster;
use rfisp_core::protocol::ATMEGA328P_SIGNATURE;

/// Page write time of the part (tWD_FLASH) in microseconds
const PAGE_WRITE_US: u64 = 4_500;
/// Chip erase time of the part (tWD_ERASE) in microseconds
const CHIP_ERASE_US: u64 = 9_000;

/// Configuration for the simulated target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Signature bytes reported to Read Signature
    pub signature: [u8; 3],
    /// Initial low fuse
    pub low_fuse: u8,
    /// Initial high fuse
    pub high_fuse: u8,
    /// Initial extended fuse
    pub extended_fuse: u8,
    /// Initial lock bits
    pub lock_bits: u8,
    /// Flash size in bytes
    pub flash_size: usize,
}

impl Default for DummyConfig {
    /// Arduino Pro Mini 5V/16MHz as shipped
    fn default() -> Self {
        Self {
            signature: ATMEGA328P_SIGNATURE,
            low_fuse: 0xFF,
            high_fuse: 0xDA,
            extended_fuse: 0xFD,
            lock_bits: 0xCF,
            flash_size: 32 * 1024,
        }
    }
}

/// An instruction as seen by the target, stamped with the virtual time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedCommand {
    /// Virtual time in microseconds when the last byte arrived
    pub at_us: u64,
    /// The four instruction bytes
    pub bytes: [u8; 4],
    /// Whether the target was in programming mode and idle, i.e. acted on it
    pub accepted: bool,
}

impl LoggedCommand {
    /// First instruction byte
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    /// Whether this is a Load Program Memory Page instruction
    pub fn is_load(&self) -> bool {
        matches!(self.opcode(), opcodes::LOAD_LOW_BYTE | opcodes::LOAD_HIGH_BYTE)
    }

    /// Whether this is a Write Program Memory Page instruction
    pub fn is_page_write(&self) -> bool {
        self.opcode() == opcodes::WRITE_PAGE
    }

    /// Whether this is a Chip Erase instruction
    pub fn is_chip_erase(&self) -> bool {
        self.bytes == IspCommand::chip_erase().bytes()
    }
}

/// Simulated ATmega328P
#[cfg(feature = "alloc")]
pub struct DummyTarget {
    config: DummyConfig,
    flash: Vec<u8>,
    page_buffer: [u8; PAGE_BYTES],
    low_fuse: u8,
    high_fuse: u8,
    extended_fuse: u8,
    lock_bits: u8,
    reset_low: bool,
    bus_acquired: bool,
    programming: bool,
    shift: [u8; 4],
    shift_len: usize,
    now_us: u64,
    busy_until_us: u64,
    log: Vec<LoggedCommand>,
    page_writes: Vec<u32>,
    timing_violations: usize,
}

#[cfg(feature = "alloc")]
impl DummyTarget {
    /// Create a simulated target with erased flash
    pub fn new(config: DummyConfig) -> Self {
        let flash = vec![0xFF; config.flash_size];
        Self {
            flash,
            page_buffer: [0xFF; PAGE_BYTES],
            low_fuse: config.low_fuse,
            high_fuse: config.high_fuse,
            extended_fuse: config.extended_fuse,
            lock_bits: config.lock_bits,
            config,
            reset_low: false,
            bus_acquired: false,
            programming: false,
            shift: [0; 4],
            shift_len: 0,
            now_us: 0,
            busy_until_us: 0,
            log: Vec::new(),
            page_writes: Vec::new(),
            timing_violations: 0,
        }
    }

    /// Create a simulated target with the default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a simulated target whose flash already holds `image`
    pub fn with_flash(config: DummyConfig, image: &[u8]) -> Self {
        let mut target = Self::new(config);
        let len = core::cmp::min(image.len(), target.flash.len());
        target.flash[..len].copy_from_slice(&image[..len]);
        target
    }

    /// Flash contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Every instruction received, in order
    pub fn commands(&self) -> &[LoggedCommand] {
        &self.log
    }

    /// Page word addresses written to flash, in order
    pub fn page_writes(&self) -> &[u32] {
        &self.page_writes
    }

    /// Instructions dropped because the target was still busy
    pub fn timing_violations(&self) -> usize {
        self.timing_violations
    }

    /// Current low fuse
    pub fn low_fuse(&self) -> u8 {
        self.low_fuse
    }

    /// Current high fuse
    pub fn high_fuse(&self) -> u8 {
        self.high_fuse
    }

    /// Whether the reset line is held low
    pub fn in_reset(&self) -> bool {
        self.reset_low
    }

    /// Whether the host currently drives SCK/MOSI
    pub fn bus_acquired(&self) -> bool {
        self.bus_acquired
    }

    /// Virtual time elapsed in microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.now_us
    }

    /// Forget the instruction log and page write history
    pub fn clear_log(&mut self) {
        self.log.clear();
        self.page_writes.clear();
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    fn leave_programming(&mut self) {
        self.programming = false;
        self.shift_len = 0;
        self.page_buffer = [0xFF; PAGE_BYTES];
    }

    fn execute(&mut self, bytes: [u8; 4]) -> u8 {
        let busy = self.now_us < self.busy_until_us;
        let accepted = self.programming && !busy;
        if self.programming && busy {
            log::warn!(
                "dummy: {:02X?} arrived {} us before the target was ready",
                bytes,
                self.busy_until_us - self.now_us
            );
            self.timing_violations += 1;
        }

        // Programming Enable is the only instruction outside programming mode
        let enable = bytes == IspCommand::programming_enable().bytes();
        self.log.push(LoggedCommand {
            at_us: self.now_us,
            bytes,
            accepted: accepted || (enable && self.reset_low),
        });

        if enable {
            if self.reset_low {
                self.programming = true;
            }
            return 0;
        }
        if !accepted {
            return 0;
        }

        match bytes {
            [opcodes::READ_SIGNATURE, _, offset, _] => self
                .config
                .signature
                .get(offset as usize)
                .copied()
                .unwrap_or(0xFF),
            [opcodes::READ_FUSE, opcodes::FUSE_SELECT_LOW, _, _] => self.low_fuse,
            [opcodes::READ_FUSE, opcodes::FUSE_SELECT_HIGH, _, _] => self.extended_fuse,
            [opcodes::READ_FUSE_HIGH, opcodes::FUSE_SELECT_HIGH, _, _] => self.high_fuse,
            [opcodes::READ_FUSE_HIGH, opcodes::FUSE_SELECT_LOW, _, _] => self.lock_bits,
            [opcodes::WRITE_PREFIX, opcodes::WRITE_HIGH_FUSE, _, value] => {
                self.high_fuse = value;
                0
            }
            [opcodes::WRITE_PREFIX, opcodes::WRITE_LOW_FUSE, _, value] => {
                self.low_fuse = value;
                0
            }
            [opcodes::WRITE_PREFIX, opcodes::CHIP_ERASE, _, _] => {
                self.flash.fill(0xFF);
                self.lock_bits = 0xFF;
                self.busy_until_us = self.now_us + CHIP_ERASE_US;
                0
            }
            [opcodes::LOAD_LOW_BYTE, _, offset, value] => {
                let word = (offset as u32 & PAGE_WORD_MASK) as usize;
                self.page_buffer[word * 2] = value;
                0
            }
            [opcodes::LOAD_HIGH_BYTE, _, offset, value] => {
                let word = (offset as u32 & PAGE_WORD_MASK) as usize;
                self.page_buffer[word * 2 + 1] = value;
                0
            }
            [opcodes::WRITE_PAGE, hi, lo, _] => {
                let page = page_of(u32::from_be_bytes([0, 0, hi, lo]));
                let start = page as usize * 2;
                if let Some(dest) = self.flash.get_mut(start..start + PAGE_BYTES) {
                    // Programming can only clear bits
                    for (cell, &byte) in dest.iter_mut().zip(self.page_buffer.iter()) {
                        *cell &= byte;
                    }
                } else {
                    log::warn!("dummy: page 0x{:04X} beyond flash", page);
                }
                self.page_buffer = [0xFF; PAGE_BYTES];
                self.page_writes.push(page);
                self.busy_until_us = self.now_us + PAGE_WRITE_US;
                0
            }
            _ => {
                log::debug!("dummy: ignoring instruction {:02X?}", bytes);
                0
            }
        }
    }
}

#[cfg(feature = "alloc")]
impl IspMaster for DummyTarget {
    fn acquire(&mut self) {
        self.bus_acquired = true;
    }

    fn release(&mut self) {
        self.bus_acquired = false;
        self.shift_len = 0;
    }

    fn drive_reset(&mut self, high: bool) {
        if high {
            // Any time spent out of reset ends programming mode
            self.leave_programming();
        }
        self.reset_low = !high;
    }

    fn float_reset(&mut self) {
        self.leave_programming();
        self.reset_low = false;
    }

    fn set_sck(&mut self, _high: bool) {}

    fn transfer_byte(&mut self, byte: u8) -> u8 {
        if !self.bus_acquired {
            return 0xFF;
        }
        self.shift[self.shift_len] = byte;
        self.shift_len += 1;
        if self.shift_len < self.shift.len() {
            return 0;
        }
        self.shift_len = 0;
        self.execute(self.shift)
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us += us as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfisp_core::error::Error;
    use rfisp_core::flash::packet::{chunk_image, encode_data, encode_eof};
    use rfisp_core::flash::{Status, Target};
    use rfisp_core::protocol;

    fn run_image(dummy: &mut DummyTarget, packets: &[&[u8]]) -> Vec<Result<Status, Error>> {
        let mut target = Target::new(dummy);
        packets.iter().map(|p| target.ingest(p)).collect()
    }

    #[test]
    fn test_single_word_end_to_end() {
        let mut dummy = DummyTarget::new_default();
        let data = encode_data(0x0000, &[0x0C, 0x94]).unwrap();
        let eof = encode_eof();

        let mut target = Target::new(&mut dummy);
        assert_eq!(target.ingest(&data), Ok(Status::Accepted));
        assert_eq!(target.ingest(&eof), Ok(Status::FlashComplete));
        assert!(!target.session().is_active());
        drop(target);

        assert_eq!(dummy.page_writes(), [0]);
        assert_eq!(&dummy.flash()[..2], [0x0C, 0x94]);
        assert!(dummy.flash()[2..].iter().all(|&b| b == 0xFF));
        assert!(!dummy.in_reset());
        assert!(!dummy.bus_acquired());
        assert_eq!(dummy.timing_violations(), 0);
    }

    #[test]
    fn test_erase_precedes_first_write() {
        let mut dummy = DummyTarget::with_flash(DummyConfig::default(), &[0x00; 256]);
        let data = encode_data(0x0000, &[0xAA, 0x55]).unwrap();
        let eof = encode_eof();
        run_image(&mut dummy, &[&data, &eof]);

        let erase = dummy.commands().iter().position(|c| c.is_chip_erase()).unwrap();
        let load = dummy.commands().iter().position(|c| c.is_load()).unwrap();
        assert!(erase < load);
        assert_eq!(&dummy.flash()[..2], [0xAA, 0x55]);
        // Stale contents of the rest of the first page are gone
        assert!(dummy.flash()[2..256].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_load_pairs_match_payload() {
        let mut dummy = DummyTarget::new_default();
        let payload: Vec<u8> = (0..32).collect();
        let data = encode_data(0x0040, &payload).unwrap();
        run_image(&mut dummy, &[&data]);

        let loads: Vec<[u8; 4]> = dummy
            .commands()
            .iter()
            .filter(|c| c.is_load())
            .map(|c| c.bytes)
            .collect();
        assert_eq!(loads.len(), payload.len());
        for (i, pair) in loads.chunks(2).enumerate() {
            let offset = 0x20 + i as u8;
            assert_eq!(pair[0], [0x40, 0x00, offset, payload[2 * i]]);
            assert_eq!(pair[1], [0x48, 0x00, offset, payload[2 * i + 1]]);
        }
    }

    #[test]
    fn test_page_crossing_commits_before_next_load() {
        let mut dummy = DummyTarget::new_default();
        // Words 62..=65 straddle the boundary between page 0 and page 64
        let data = encode_data(62 * 2, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        run_image(&mut dummy, &[&data]);

        let log = dummy.commands();
        let commit = log.iter().position(|c| c.bytes == [0x4C, 0, 0, 0]).unwrap();
        // Word 64 is offset 0 of the next page; the third load pair targets it
        let first_load_64 = log
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_load())
            .nth(4)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(log[first_load_64].bytes, [0x40, 0x00, 0x00, 5]);
        assert!(commit < first_load_64);
        // Nothing loaded into page 0 after it was committed
        assert!(log[commit..]
            .iter()
            .filter(|c| c.is_load())
            .all(|c| c.bytes[2] < 2));
    }

    #[test]
    fn test_page_crossing_between_packets() {
        let mut dummy = DummyTarget::new_default();
        // First packet ends at word 63, the next one starts at word 64
        let first = encode_data(62 * 2, &[1, 2, 3, 4]).unwrap();
        let second = encode_data(64 * 2, &[5, 6, 7, 8]).unwrap();
        let eof = encode_eof();
        let results = run_image(&mut dummy, &[&first, &second, &eof]);
        assert_eq!(
            results,
            [
                Ok(Status::Accepted),
                Ok(Status::Accepted),
                Ok(Status::FlashComplete)
            ]
        );

        let log = dummy.commands();
        let commit = log.iter().position(|c| c.bytes == [0x4C, 0, 0, 0]).unwrap();
        let first_load_64 = log
            .iter()
            .position(|c| c.bytes == [0x40, 0x00, 0x00, 5])
            .unwrap();
        assert!(commit < first_load_64);
        // The first packet alone does not commit page 0
        assert_eq!(log[..commit].iter().filter(|c| c.is_load()).count(), 4);

        assert_eq!(dummy.page_writes(), [0, 64]);
        assert_eq!(&dummy.flash()[124..132], [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(dummy.timing_violations(), 0);
    }

    #[test]
    fn test_standalone_ops_refused_during_session() {
        let mut dummy = DummyTarget::new_default();
        let first = encode_data(0, &[0x11, 0x22]).unwrap();
        let second = encode_data(2, &[0x33, 0x44]).unwrap();
        let eof = encode_eof();

        let mut target = Target::new(&mut dummy);
        assert_eq!(target.ingest(&first), Ok(Status::Accepted));

        assert_eq!(target.write_high_fuse(0xDA), Err(Error::SessionActive));
        assert_eq!(target.write_low_fuse(0x62), Err(Error::SessionActive));
        assert_eq!(target.read_high_fuse(), Err(Error::SessionActive));
        assert_eq!(target.read_low_fuse(), Err(Error::SessionActive));
        assert_eq!(target.erase(), Err(Error::SessionActive));
        assert!(matches!(target.probe(), Err(Error::SessionActive)));
        assert!(target.session().is_active());

        assert_eq!(target.ingest(&second), Ok(Status::Accepted));
        assert_eq!(target.ingest(&eof), Ok(Status::FlashComplete));

        // Once the session is closed the fuse is reachable again
        assert_eq!(target.write_high_fuse(0xDA), Ok(0xDA));
        drop(target);

        assert_eq!(dummy.page_writes(), [0]);
        assert_eq!(&dummy.flash()[..4], [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(dummy.high_fuse(), 0xDA);
        assert_eq!(dummy.low_fuse(), 0xFF);
        assert_eq!(dummy.timing_violations(), 0);
    }

    #[test]
    fn test_abort_then_fuse_access() {
        let mut dummy = DummyTarget::new_default();
        let data = encode_data(0, &[0x11, 0x22]).unwrap();

        let mut target = Target::new(&mut dummy);
        assert_eq!(target.ingest(&data), Ok(Status::Accepted));
        target.abort();
        assert!(!target.session().is_active());
        assert_eq!(target.read_high_fuse(), Ok(0xDA));
        drop(target);

        assert!(!dummy.in_reset());
        assert!(!dummy.bus_acquired());
        assert!(dummy.page_writes().is_empty());
    }

    #[test]
    fn test_each_page_committed_once() {
        let mut dummy = DummyTarget::new_default();
        let image: Vec<u8> = (0..1000u32).map(|i| (i * 7 + 3) as u8).collect();
        let packets: Vec<_> = chunk_image(&image, 0, 16).unwrap().collect();
        let packet_refs: Vec<&[u8]> = packets.iter().map(|p| p.as_slice()).collect();

        let results = run_image(&mut dummy, &packet_refs);
        assert_eq!(results.last(), Some(&Ok(Status::FlashComplete)));
        assert!(results[..results.len() - 1]
            .iter()
            .all(|r| *r == Ok(Status::Accepted)));

        // 1000 bytes = 500 words = pages 0, 64, ..., 448
        let expected: Vec<u32> = (0..8).map(|p| p * 64).collect();
        assert_eq!(dummy.page_writes(), expected.as_slice());
        assert_eq!(&dummy.flash()[..1000], image.as_slice());
        assert_eq!(dummy.timing_violations(), 0);
    }

    #[test]
    fn test_final_page_flushed_only_by_eof() {
        let mut dummy = DummyTarget::new_default();
        let data = encode_data(0x0100, &[0x12, 0x34]).unwrap();
        let eof = encode_eof();

        let mut target = Target::new(&mut dummy);
        target.ingest(&data).unwrap();
        drop(target);
        // Entering page 128 committed the untouched page 0, not page 128
        assert_eq!(dummy.page_writes(), [0]);
        assert_eq!(&dummy.flash()[0x100..0x102], [0xFF, 0xFF]);

        let mut target = Target::new(&mut dummy);
        // A new Target starts a new session and erases again
        assert_eq!(target.ingest(&eof), Ok(Status::FlashComplete));
        drop(target);
        assert_eq!(dummy.page_writes(), [0, 0]);
    }

    #[test]
    fn test_page_write_waits_for_completion() {
        let mut dummy = DummyTarget::new_default();
        let image = [0x5Au8; 300];
        let packets: Vec<_> = chunk_image(&image, 0, 32).unwrap().collect();
        let packet_refs: Vec<&[u8]> = packets.iter().map(|p| p.as_slice()).collect();
        run_image(&mut dummy, &packet_refs);

        let log = dummy.commands();
        for pair in log.windows(2) {
            if pair[0].is_page_write() {
                assert!(pair[1].at_us - pair[0].at_us >= 10_000);
            }
        }
        assert!(log.iter().all(|c| c.accepted));
    }

    #[test]
    fn test_wrong_signature_stops_everything() {
        let config = DummyConfig {
            signature: [0x1E, 0x95, 0x14],
            ..Default::default()
        };
        let mut dummy = DummyTarget::new(config);
        let data = encode_data(0, &[0x11, 0x22]).unwrap();

        let results = run_image(&mut dummy, &[&data]);
        assert_eq!(results, [Err(Error::DeviceNotResponding)]);
        assert!(!dummy
            .commands()
            .iter()
            .any(|c| c.is_chip_erase() || c.is_load() || c.is_page_write()));
        assert!(!dummy.in_reset());
        assert!(!dummy.bus_acquired());
    }

    #[test]
    fn test_malformed_packet_keeps_session() {
        let mut dummy = DummyTarget::new_default();
        let mut target = Target::new(&mut dummy);
        target.ingest(&encode_data(0x0200, &[1, 2]).unwrap()).unwrap();
        let before = *target.session();

        assert_eq!(target.ingest(&[0x05, 0x00, 0x00, 0x00]), Err(Error::InvalidPacket));
        assert_eq!(*target.session(), before);
        assert!(target.session().is_active());
        assert_eq!(target.session().last_committed_page(), 0x100);
    }

    #[test]
    fn test_high_fuse_mask_applied() {
        let mut dummy = DummyTarget::new_default();
        assert_eq!(protocol::write_high_fuse(&mut dummy, 0x00), Ok(0x80));
        assert_eq!(dummy.high_fuse(), 0x80);
        let written = dummy
            .commands()
            .iter()
            .find(|c| c.bytes[..2] == [0xAC, 0xA8])
            .map(|c| c.bytes[3]);
        assert_eq!(written, Some(0x80));

        assert_eq!(protocol::write_high_fuse(&mut dummy, 0xFF), Ok(0xDF));
        assert_eq!(dummy.high_fuse(), 0xDF);
    }

    #[test]
    fn test_low_fuse_written_verbatim() {
        let mut dummy = DummyTarget::new_default();
        protocol::write_low_fuse(&mut dummy, 0x62).unwrap();
        assert_eq!(dummy.low_fuse(), 0x62);
        assert_eq!(protocol::read_low_fuse(&mut dummy), Ok(0x62));
    }

    #[test]
    fn test_fuse_reads_and_probe() {
        let mut dummy = DummyTarget::new_default();
        assert_eq!(protocol::read_high_fuse(&mut dummy), Ok(0xDA));
        assert_eq!(protocol::read_low_fuse(&mut dummy), Ok(0xFF));

        let info = protocol::probe(&mut dummy).unwrap();
        assert_eq!(info.signature, ATMEGA328P_SIGNATURE);
        assert_eq!(info.high_fuse, 0xDA);
        assert_eq!(info.extended_fuse, 0xFD);
        assert_eq!(info.lock_bits, 0xCF);
        assert!(!dummy.in_reset());
    }

    #[test]
    fn test_fuse_ops_fail_on_wrong_device() {
        let config = DummyConfig {
            signature: [0x1E, 0x95, 0x14],
            ..Default::default()
        };
        let mut dummy = DummyTarget::new(config);
        assert_eq!(protocol::read_high_fuse(&mut dummy), Err(Error::DeviceNotResponding));
        assert_eq!(
            protocol::write_high_fuse(&mut dummy, 0xDB),
            Err(Error::DeviceNotResponding)
        );
        assert_eq!(dummy.high_fuse(), 0xDA);
    }

    #[test]
    fn test_handshake_timing() {
        let mut dummy = DummyTarget::new_default();
        protocol::enter_programming_mode(&mut dummy).unwrap();
        let enable = dummy.commands()[0];
        assert_eq!(enable.bytes, [0xAC, 0x53, 0x00, 0x00]);
        // Settle, reset pulse and enable wait all precede the enable
        assert!(enable.at_us >= 20_000 + 100 + 50_000);
        assert!(dummy.in_reset());
        protocol::leave_programming_mode(&mut dummy);
        assert!(!dummy.in_reset());
    }

    #[test]
    fn test_commands_ignored_outside_programming_mode() {
        let mut dummy = DummyTarget::new_default();
        dummy.acquire();
        let response = dummy.transaction(IspCommand::read_signature(0));
        assert_eq!(response, 0);
        assert!(!dummy.commands()[0].accepted);
    }
}
