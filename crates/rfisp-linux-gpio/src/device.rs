//! Linux GPIO pin backend for the bit-banged ISP transport
//!
//! The four ISP lines are requested once, all as inputs, so the target runs
//! undisturbed until a programming cycle starts. Direction changes rebuild
//! the configuration of the whole request, which keeps the kernel's view
//! and ours in step.

use crate::error::{LinuxGpioError, Result};

use embedded_hal::delay::DelayNs;
use gpiocdev::line::{Bias, Offset, Value};
use gpiocdev::request::{Config, Request};

use rfisp_core::programmer::bitbang::DEFAULT_SPI_CLOCK_HZ;
use rfisp_core::programmer::{BitbangIsp, Direction, IspConfig, IspPins, Pin};

/// Number of GPIO lines used
const LINES: usize = 4;

/// Bit-banged ISP master on Linux GPIO
pub type LinuxGpioIsp = BitbangIsp<LinuxGpioPins, StdDelay>;

/// Configuration for opening a Linux GPIO ISP device
#[derive(Debug, Clone)]
pub struct LinuxGpioIspConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// Target RESET line offset
    pub rst: Offset,
    /// SCK line offset
    pub sck: Offset,
    /// MOSI line offset
    pub mosi: Offset,
    /// MISO line offset
    pub miso: Offset,
    /// Transport clock configuration
    pub isp: IspConfig,
}

impl Default for LinuxGpioIspConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            rst: 0,
            sck: 0,
            mosi: 0,
            miso: 0,
            isp: IspConfig::new(DEFAULT_SPI_CLOCK_HZ),
        }
    }
}

impl LinuxGpioIspConfig {
    /// Create a new configuration with the given device path and pins
    pub fn new(
        device: impl Into<String>,
        rst: Offset,
        sck: Offset,
        mosi: Offset,
        miso: Offset,
    ) -> Self {
        Self {
            device: device.into(),
            rst,
            sck,
            mosi,
            miso,
            ..Default::default()
        }
    }

    /// Set SPI speed in Hz
    pub fn with_speed_hz(mut self, hz: u32) -> Self {
        self.isp = IspConfig::new(hz);
        self
    }

    fn offsets(&self) -> [Offset; LINES] {
        [self.rst, self.sck, self.mosi, self.miso]
    }
}

fn index(pin: Pin) -> usize {
    match pin {
        Pin::Reset => 0,
        Pin::Sck => 1,
        Pin::Mosi => 2,
        Pin::Miso => 3,
    }
}

fn value(high: bool) -> Value {
    if high {
        Value::Active
    } else {
        Value::Inactive
    }
}

/// The four ISP lines of one gpiochip
pub struct LinuxGpioPins {
    request: Request,
    offsets: [Offset; LINES],
    levels: [bool; LINES],
    directions: [Direction; LINES],
}

impl LinuxGpioPins {
    /// Request the ISP lines, all as inputs
    pub fn open(config: &LinuxGpioIspConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }

        let offsets = config.offsets();
        for (i, offset) in offsets.iter().enumerate() {
            if offsets[i + 1..].contains(offset) {
                return Err(LinuxGpioError::DuplicateLine(*offset));
            }
        }

        log::debug!("linux_gpio: Opening device {}", config.device);

        let levels = [false; LINES];
        let directions = [Direction::Input; LINES];
        let req_config = Self::build_config(&offsets, &levels, &directions);

        let request = Request::from_config(req_config)
            .on_chip(&config.device)
            .with_consumer("rfisp")
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                path: config.device.clone(),
                source,
            })?;

        log::info!(
            "linux_gpio: Opened {} (rst={}, sck={}, mosi={}, miso={})",
            config.device,
            config.rst,
            config.sck,
            config.mosi,
            config.miso
        );

        Ok(Self {
            request,
            offsets,
            levels,
            directions,
        })
    }

    fn build_config(
        offsets: &[Offset; LINES],
        levels: &[bool; LINES],
        directions: &[Direction; LINES],
    ) -> Config {
        let mut cfg = Config::default();
        for i in 0..LINES {
            match directions[i] {
                Direction::Output => {
                    cfg.with_line(offsets[i]).as_output(value(levels[i]));
                }
                Direction::Input => {
                    // A high latch on an input means "pulled up", as on an AVR port
                    let bias = if levels[i] { Bias::PullUp } else { Bias::Disabled };
                    cfg.with_line(offsets[i]).as_input().with_bias(bias);
                }
            }
        }
        cfg
    }

    fn reconfigure(&self) {
        let cfg = Self::build_config(&self.offsets, &self.levels, &self.directions);
        if let Err(e) = self.request.reconfigure(&cfg) {
            log::error!("Failed to reconfigure ISP lines: {}", e);
        }
    }
}

impl IspPins for LinuxGpioPins {
    fn set_level(&mut self, pin: Pin, high: bool) {
        let i = index(pin);
        let changed = self.levels[i] != high;
        self.levels[i] = high;
        match self.directions[i] {
            Direction::Output => {
                if let Err(e) = self.request.set_value(self.offsets[i], value(high)) {
                    log::error!("Failed to set {:?}: {}", pin, e);
                }
            }
            Direction::Input if changed => self.reconfigure(),
            Direction::Input => {}
        }
    }

    fn set_direction(&mut self, pin: Pin, direction: Direction) {
        let i = index(pin);
        if self.directions[i] != direction {
            self.directions[i] = direction;
            self.reconfigure();
        }
    }

    fn read_level(&self, pin: Pin) -> bool {
        match self.request.value(self.offsets[index(pin)]) {
            Ok(Value::Active) => true,
            Ok(Value::Inactive) => false,
            Err(e) => {
                log::error!("Failed to get {:?}: {}", pin, e);
                false
            }
        }
    }
}

/// Blocking delay backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}

/// Open the ISP lines and wrap them in a bit-banged transport
pub fn open(config: &LinuxGpioIspConfig) -> Result<LinuxGpioIsp> {
    let pins = LinuxGpioPins::open(config)?;
    Ok(BitbangIsp::new(pins, StdDelay, config.isp))
}

fn parse_offset(name: &'static str, value: &str) -> Result<Offset> {
    value
        .parse()
        .map_err(|_| LinuxGpioError::InvalidParameter(format!("{}={}", name, value)))
}

/// Parse programmer options into a configuration
///
/// See [`open_linux_gpio_isp`](crate::open_linux_gpio_isp) for the keys.
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxGpioIspConfig> {
    let mut config = LinuxGpioIspConfig::default();
    let mut rst = None;
    let mut sck = None;
    let mut mosi = None;
    let mut miso = None;
    let mut gpiochip: Option<u32> = None;

    for (key, value) in options {
        match *key {
            "dev" => config.device = value.to_string(),
            "gpiochip" => gpiochip = Some(parse_offset("gpiochip", value)?),
            "rst" | "reset" => rst = Some(parse_offset("rst", value)?),
            "sck" => sck = Some(parse_offset("sck", value)?),
            "mosi" => mosi = Some(parse_offset("mosi", value)?),
            "miso" => miso = Some(parse_offset("miso", value)?),
            "spispeed" => {
                let speed_khz: u32 = value.parse().map_err(|_| {
                    LinuxGpioError::InvalidParameter(format!("spispeed={}", value))
                })?;
                config = config.with_speed_hz(speed_khz.saturating_mul(1000));
            }
            _ => {
                log::warn!("linux_gpio: Unknown option: {}={}", key, value);
            }
        }
    }

    // Handle dev vs gpiochip
    if config.device.is_empty() {
        match gpiochip {
            Some(n) => config.device = format!("/dev/gpiochip{}", n),
            None => return Err(LinuxGpioError::NoDevice),
        }
    } else if gpiochip.is_some() {
        return Err(LinuxGpioError::InvalidParameter(
            "only one of 'dev' or 'gpiochip' can be specified".to_string(),
        ));
    }

    config.rst = rst.ok_or(LinuxGpioError::MissingParameter("rst"))?;
    config.sck = sck.ok_or(LinuxGpioError::MissingParameter("sck"))?;
    config.mosi = mosi.ok_or(LinuxGpioError::MissingParameter("mosi"))?;
    config.miso = miso.ok_or(LinuxGpioError::MissingParameter("miso"))?;

    Ok(config)
}
