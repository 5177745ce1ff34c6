//! Bit-banged ISP transport
//!
//! This module implements [`IspMaster`] on top of four plain digital I/O
//! lines, the way an Arduino-style host programs a neighbouring AVR without
//! a hardware SPI controller.
//!
//! ## Wiring
//!
//! | Line  | Host direction | Target pin |
//! |-------|----------------|------------|
//! | RESET | output while programming, floating otherwise | RESET |
//! | SCK   | output while acquired | SCK |
//! | MOSI  | output while acquired | MOSI |
//! | MISO  | always input | MISO |
//!
//! ## Timing
//!
//! Bits are clocked MSB first in SPI mode 0. Every bit costs two
//! half-periods, so a byte transfer blocks for `16 * half_period_us`. The
//! target samples MOSI on the rising edge and must see a clock no faster
//! than a quarter of its own system clock, so the default is deliberately
//! slow.

use super::IspMaster;
use embedded_hal::delay::DelayNs;

/// Default SPI clock: 1 MHz / 6, safe for targets running from 1 MHz up
pub const DEFAULT_SPI_CLOCK_HZ: u32 = 1_000_000 / 6;

/// The four ISP lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    /// Target reset (active low)
    Reset,
    /// Serial clock
    Sck,
    /// Host data out, target data in
    Mosi,
    /// Host data in, target data out
    Miso,
}

/// Electrical direction of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// High impedance; a high level on an input means "pulled up"
    Input,
    /// Actively driven
    Output,
}

/// Raw digital I/O used by the bit-banged transport
///
/// Implementations map [`Pin`] to whatever identifies a line on the host
/// (an Arduino pin number, a gpiochip offset, ...). Errors are the
/// implementation's to report; the transport treats pin operations as
/// infallible, the same way a microcontroller port write is.
pub trait IspPins {
    /// Set the output latch of a line
    ///
    /// On a line configured as input, a high level enables the pull-up.
    fn set_level(&mut self, pin: Pin, high: bool);

    /// Change the direction of a line
    fn set_direction(&mut self, pin: Pin, direction: Direction);

    /// Sample the level of a line
    fn read_level(&self, pin: Pin) -> bool;
}

/// Configuration consumed when constructing a [`BitbangIsp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IspConfig {
    /// Target SPI clock in Hz
    pub spi_clock_hz: u32,
}

impl Default for IspConfig {
    fn default() -> Self {
        Self {
            spi_clock_hz: DEFAULT_SPI_CLOCK_HZ,
        }
    }
}

impl IspConfig {
    /// Create a configuration for the given SPI clock
    pub fn new(spi_clock_hz: u32) -> Self {
        Self { spi_clock_hz }
    }

    /// Half clock period in microseconds, rounded up and never below 1
    pub fn half_period_us(&self) -> u32 {
        let clock = self.spi_clock_hz.max(1);
        let half = 500_000u32.div_ceil(clock);
        half.max(1)
    }
}

/// Bit-banged ISP master
///
/// Owns the pin set and the delay provider. Construct it once per physical
/// wiring; the protocol acquires and releases the bus around every
/// programming cycle.
pub struct BitbangIsp<P, D> {
    pins: P,
    delay: D,
    half_period_us: u32,
}

impl<P: IspPins, D: DelayNs> BitbangIsp<P, D> {
    /// Create a transport from a pin set, a delay provider and a clock config
    pub fn new(pins: P, delay: D, config: IspConfig) -> Self {
        let half_period_us = config.half_period_us();
        log::debug!(
            "bitbang_isp: {} Hz requested, half period {} us",
            config.spi_clock_hz,
            half_period_us
        );
        Self {
            pins,
            delay,
            half_period_us,
        }
    }

    /// Set the half clock period directly (clamped to at least 1 us)
    pub fn configure(&mut self, half_period_us: u32) {
        self.half_period_us = half_period_us.max(1);
    }

    /// Current half clock period in microseconds
    pub fn half_period_us(&self) -> u32 {
        self.half_period_us
    }

    /// Access the underlying pin set
    pub fn pins(&self) -> &P {
        &self.pins
    }

    /// Access the delay provider
    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Split the transport back into its parts
    pub fn into_parts(self) -> (P, D) {
        (self.pins, self.delay)
    }
}

impl<P: IspPins, D: DelayNs> IspMaster for BitbangIsp<P, D> {
    fn acquire(&mut self) {
        self.pins.set_level(Pin::Sck, false);
        self.pins.set_level(Pin::Mosi, false);
        self.pins.set_direction(Pin::Sck, Direction::Output);
        self.pins.set_direction(Pin::Mosi, Direction::Output);
        self.pins.set_direction(Pin::Miso, Direction::Input);
    }

    fn release(&mut self) {
        self.pins.set_direction(Pin::Sck, Direction::Input);
        self.pins.set_direction(Pin::Mosi, Direction::Input);
    }

    fn drive_reset(&mut self, high: bool) {
        self.pins.set_level(Pin::Reset, high);
        self.pins.set_direction(Pin::Reset, Direction::Output);
    }

    fn float_reset(&mut self) {
        self.pins.set_direction(Pin::Reset, Direction::Input);
        self.pins.set_level(Pin::Reset, true);
    }

    fn set_sck(&mut self, high: bool) {
        self.pins.set_level(Pin::Sck, high);
    }

    fn transfer_byte(&mut self, byte: u8) -> u8 {
        let mut shift = byte;
        for _ in 0..8 {
            self.pins.set_level(Pin::Mosi, shift & 0x80 != 0);
            self.pins.set_level(Pin::Sck, true);
            self.delay.delay_us(self.half_period_us);
            shift = (shift << 1) | self.pins.read_level(Pin::Miso) as u8;
            self.pins.set_level(Pin::Sck, false);
            self.delay.delay_us(self.half_period_us);
        }
        shift
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isp::IspCommand;
    use core::cell::Cell;
    use std::vec::Vec;

    /// Pin set that records MOSI on every rising SCK edge and plays back a
    /// scripted MISO byte stream
    #[derive(Default)]
    struct ScriptedPins {
        levels: [bool; 4],
        directions: [Option<Direction>; 4],
        sent_bits: Vec<bool>,
        miso_bytes: Vec<u8>,
        miso_bit: Cell<usize>,
    }

    impl ScriptedPins {
        fn index(pin: Pin) -> usize {
            match pin {
                Pin::Reset => 0,
                Pin::Sck => 1,
                Pin::Mosi => 2,
                Pin::Miso => 3,
            }
        }

        fn direction(&self, pin: Pin) -> Option<Direction> {
            self.directions[Self::index(pin)]
        }

        fn level(&self, pin: Pin) -> bool {
            self.levels[Self::index(pin)]
        }

        fn sent_bytes(&self) -> Vec<u8> {
            self.sent_bits
                .chunks(8)
                .map(|bits| bits.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
                .collect()
        }
    }

    impl IspPins for ScriptedPins {
        fn set_level(&mut self, pin: Pin, high: bool) {
            let rising = pin == Pin::Sck && high && !self.level(Pin::Sck);
            self.levels[Self::index(pin)] = high;
            if rising {
                let mosi = self.level(Pin::Mosi);
                self.sent_bits.push(mosi);
            }
        }

        fn set_direction(&mut self, pin: Pin, direction: Direction) {
            self.directions[Self::index(pin)] = Some(direction);
        }

        fn read_level(&self, pin: Pin) -> bool {
            assert_eq!(pin, Pin::Miso);
            let bit = self.miso_bit.get();
            self.miso_bit.set(bit + 1);
            match self.miso_bytes.get(bit / 8) {
                Some(byte) => byte & (0x80 >> (bit % 8)) != 0,
                None => false,
            }
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        total_ns: u64,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    fn transport(miso: &[u8], clock_hz: u32) -> BitbangIsp<ScriptedPins, RecordingDelay> {
        let pins = ScriptedPins {
            miso_bytes: miso.iter().copied().collect(),
            ..Default::default()
        };
        BitbangIsp::new(pins, RecordingDelay::default(), IspConfig::new(clock_hz))
    }

    #[test]
    fn test_half_period_derivation() {
        assert_eq!(IspConfig::default().half_period_us(), 4);
        assert_eq!(IspConfig::new(500_000).half_period_us(), 1);
        assert_eq!(IspConfig::new(100_000).half_period_us(), 5);
        // Faster than the delay resolution still clamps to one unit
        assert_eq!(IspConfig::new(10_000_000).half_period_us(), 1);
        assert_eq!(IspConfig::new(0).half_period_us(), 500_000);
    }

    #[test]
    fn test_transfer_shifts_msb_first_and_samples_miso() {
        let mut isp = transport(&[0x3C], DEFAULT_SPI_CLOCK_HZ);
        isp.acquire();
        let response = isp.transfer_byte(0xA5);

        assert_eq!(response, 0x3C);
        assert_eq!(isp.pins().sent_bytes(), [0xA5]);
        // SCK idles low after every byte
        assert!(!isp.pins().level(Pin::Sck));
    }

    #[test]
    fn test_transfer_blocks_for_sixteen_half_periods() {
        let mut isp = transport(&[], 100_000);
        isp.transfer_byte(0x00);
        assert_eq!(isp.delay().total_ns, 16 * 5 * 1000);
    }

    #[test]
    fn test_transaction_returns_only_fourth_response() {
        let mut isp = transport(&[0x11, 0x22, 0x33, 0x1E], DEFAULT_SPI_CLOCK_HZ);
        let response = isp.transaction(IspCommand::read_signature(0));
        assert_eq!(response, 0x1E);
        assert_eq!(isp.pins().sent_bytes(), [0x30, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_acquire_and_release_pin_states() {
        let mut isp = transport(&[], DEFAULT_SPI_CLOCK_HZ);
        isp.acquire();
        assert_eq!(isp.pins().direction(Pin::Sck), Some(Direction::Output));
        assert_eq!(isp.pins().direction(Pin::Mosi), Some(Direction::Output));
        assert_eq!(isp.pins().direction(Pin::Miso), Some(Direction::Input));
        assert!(!isp.pins().level(Pin::Sck));
        assert!(!isp.pins().level(Pin::Mosi));

        isp.release();
        assert_eq!(isp.pins().direction(Pin::Sck), Some(Direction::Input));
        assert_eq!(isp.pins().direction(Pin::Mosi), Some(Direction::Input));
        assert_eq!(isp.pins().direction(Pin::Miso), Some(Direction::Input));
    }

    #[test]
    fn test_float_reset_leaves_line_pulled_high() {
        let mut isp = transport(&[], DEFAULT_SPI_CLOCK_HZ);
        isp.drive_reset(false);
        assert_eq!(isp.pins().direction(Pin::Reset), Some(Direction::Output));
        assert!(!isp.pins().level(Pin::Reset));

        isp.float_reset();
        assert_eq!(isp.pins().direction(Pin::Reset), Some(Direction::Input));
        assert!(isp.pins().level(Pin::Reset));
    }

    #[test]
    fn test_configure_clamps_to_one() {
        let mut isp = transport(&[], DEFAULT_SPI_CLOCK_HZ);
        isp.configure(0);
        assert_eq!(isp.half_period_us(), 1);
    }
}
