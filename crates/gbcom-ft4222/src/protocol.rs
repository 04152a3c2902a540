//! FT4222H protocol constants and configuration
//!
//! The FT4222H is driven over plain USB vendor requests and bulk transfers;
//! no LibFT4222 is involved. In its default chip mode it exposes two USB
//! interfaces: interface A is the SPI master, interface B carries the GPIO
//! port.

use std::time::Duration;

// ============================================================================
// USB device identifiers
// ============================================================================

/// FTDI vendor ID
pub const FTDI_VID: u16 = 0x0403;
/// FT4222H product ID
pub const FT4222H_PID: u16 = 0x601C;

/// Interface string of the SPI master interface
pub const MASTER_DESC: &str = "FT4222 A";
/// Interface string of the GPIO interface
pub const GPIO_DESC: &str = "FT4222 B";

// ============================================================================
// Vendor requests
// ============================================================================

/// USB request codes for FT4222H
pub const FT4222_RESET_REQUEST: u8 = 0x00;
pub const FT4222_INFO_REQUEST: u8 = 0x20;
pub const FT4222_CONFIG_REQUEST: u8 = 0x21;

/// Reset command values (wValue for RESET_REQUEST)
pub const FT4222_RESET_SIO: u16 = 0x0000;
pub const FT4222_OUTPUT_FLUSH: u16 = 0x0001;
pub const FT4222_INPUT_FLUSH: u16 = 0x0002;

/// Info command values (wValue for INFO_REQUEST)
pub const FT4222_GET_VERSION: u16 = 0x0000;
pub const FT4222_GET_CONFIG: u16 = 0x0001;

/// Config command codes (lower byte of wValue for CONFIG_REQUEST)
/// The data byte goes in the upper byte: wValue = (data << 8) | cmd
pub const FT4222_SET_CLOCK: u8 = 0x04;
pub const FT4222_SET_MODE: u8 = 0x05;
pub const FT4222_GPIO_SET_DIR: u8 = 0x06;
pub const FT4222_SPI_SET_IO_LINES: u8 = 0x42;
pub const FT4222_SPI_SET_CS_ACTIVE: u8 = 0x43;
pub const FT4222_SPI_SET_CLK_DIV: u8 = 0x44;
pub const FT4222_SPI_SET_CLK_IDLE: u8 = 0x45;
pub const FT4222_SPI_SET_CAPTURE: u8 = 0x46;
pub const FT4222_SPI_SET_CS_MASK: u8 = 0x48;
pub const FT4222_SPI_RESET_TRANSACTION: u8 = 0x49;

/// Mode values (data byte for SET_MODE)
pub const FT4222_MODE_SPI_MASTER: u8 = 3;

/// Clock polarity (data byte for SPI_SET_CLK_IDLE)
pub const FT4222_CLK_IDLE_LOW: u8 = 0;

/// CS polarity (data byte for SPI_SET_CS_ACTIVE)
pub const FT4222_CS_ACTIVE_LOW: u8 = 0;

/// GPIO0 bit in the port direction and level masks
pub const GPIO_P0: u8 = 1 << 0;

// ============================================================================
// Transfer sizes and defaults
// ============================================================================

/// Modem status bytes at the start of each IN packet
pub const MODEM_STATUS_SIZE: usize = 2;

/// Read buffer size for bulk IN transfers
pub const READ_BUFFER_SIZE: usize = 2048;

/// Default SPI clock in kHz: 24 MHz system clock divided by 512
pub const DEFAULT_SPI_SPEED_KHZ: u32 = 46;

/// Default per-transfer timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

// ============================================================================
// Clock configuration
// ============================================================================

/// System clock options (base frequencies)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemClock {
    /// 60 MHz system clock
    Clock60MHz = 0,
    /// 24 MHz system clock
    Clock24MHz = 1,
    /// 48 MHz system clock
    Clock48MHz = 2,
    /// 80 MHz system clock
    Clock80MHz = 3,
}

impl SystemClock {
    /// Get the frequency in kHz
    pub fn to_khz(self) -> u32 {
        match self {
            SystemClock::Clock60MHz => 60_000,
            SystemClock::Clock24MHz => 24_000,
            SystemClock::Clock48MHz => 48_000,
            SystemClock::Clock80MHz => 80_000,
        }
    }

    /// Get the register index value
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Clock divisor (power of 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockDivisor {
    /// System clock / 2
    Div2 = 1,
    /// System clock / 4
    Div4 = 2,
    /// System clock / 8
    Div8 = 3,
    /// System clock / 16
    Div16 = 4,
    /// System clock / 32
    Div32 = 5,
    /// System clock / 64
    Div64 = 6,
    /// System clock / 128
    Div128 = 7,
    /// System clock / 256
    Div256 = 8,
    /// System clock / 512
    Div512 = 9,
}

impl ClockDivisor {
    const ALL: [ClockDivisor; 9] = [
        ClockDivisor::Div2,
        ClockDivisor::Div4,
        ClockDivisor::Div8,
        ClockDivisor::Div16,
        ClockDivisor::Div32,
        ClockDivisor::Div64,
        ClockDivisor::Div128,
        ClockDivisor::Div256,
        ClockDivisor::Div512,
    ];

    /// Get the actual divisor value
    pub fn divisor(self) -> u32 {
        1 << (self as u32)
    }

    /// Get the register value
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// System clock plus divisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// System clock selection
    pub sys_clock: SystemClock,
    /// Clock divisor
    pub divisor: ClockDivisor,
}

impl ClockConfig {
    /// Resulting SPI clock frequency in kHz
    pub fn spi_clock_khz(&self) -> u32 {
        self.sys_clock.to_khz() / self.divisor.divisor()
    }
}

/// Fastest clock configuration not exceeding `target_khz`
///
/// Falls back to the slowest possible clock (24 MHz / 512) when nothing fits.
pub fn find_clock_config(target_khz: u32) -> ClockConfig {
    const SYS_CLOCKS: [SystemClock; 4] = [
        SystemClock::Clock24MHz,
        SystemClock::Clock48MHz,
        SystemClock::Clock60MHz,
        SystemClock::Clock80MHz,
    ];

    let slowest = ClockConfig {
        sys_clock: SystemClock::Clock24MHz,
        divisor: ClockDivisor::Div512,
    };

    SYS_CLOCKS
        .iter()
        .flat_map(|&sys_clock| {
            ClockDivisor::ALL
                .iter()
                .map(move |&divisor| ClockConfig { sys_clock, divisor })
        })
        .filter(|c| c.spi_clock_khz() <= target_khz)
        // first maximum wins, so the slower system clock is kept on ties
        .fold(None, |best: Option<ClockConfig>, c| match best {
            Some(b) if b.spi_clock_khz() >= c.spi_clock_khz() => Some(b),
            _ => Some(c),
        })
        .unwrap_or(slowest)
}

// ============================================================================
// SPI configuration
// ============================================================================

/// Clock edge on which MISO is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockPhase {
    /// Sample on the leading edge (CPHA = 0)
    Leading = 0,
    /// Sample on the trailing edge (CPHA = 1)
    #[default]
    Trailing = 1,
}

impl ClockPhase {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "leading" | "0" => Some(ClockPhase::Leading),
            "trailing" | "1" => Some(ClockPhase::Trailing),
            _ => None,
        }
    }

    /// Register value for SPI_SET_CAPTURE
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// SPI master configuration for the FT4222H
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiConfig {
    /// Chip select number (0-3)
    pub cs: u8,
    /// Target SPI speed in kHz
    pub speed_khz: u32,
    /// Sampling edge (clock idles low)
    pub clock_phase: ClockPhase,
    /// Timeout applied to every USB transfer
    pub timeout: Duration,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            cs: 0,
            speed_khz: DEFAULT_SPI_SPEED_KHZ,
            clock_phase: ClockPhase::Trailing,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SpiConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chip select number
    pub fn with_cs(mut self, cs: u8) -> Self {
        self.cs = cs;
        self
    }

    /// Set the SPI speed in kHz
    pub fn with_speed_khz(mut self, speed: u32) -> Self {
        self.speed_khz = speed;
        self
    }

    /// Set the sampling edge
    pub fn with_clock_phase(mut self, phase: ClockPhase) -> Self {
        self.clock_phase = phase;
        self
    }

    /// Set the transfer timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Which interfaces to open and how to configure them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Index among the SPI master interfaces
    pub spi_index: usize,
    /// Index among the GPIO interfaces
    pub gpio_index: usize,
    /// SPI master settings
    pub spi: SpiConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clock_is_24mhz_div512() {
        let config = find_clock_config(DEFAULT_SPI_SPEED_KHZ);
        assert_eq!(config.sys_clock, SystemClock::Clock24MHz);
        assert_eq!(config.divisor, ClockDivisor::Div512);
    }

    #[test]
    fn test_find_clock_config() {
        let config = find_clock_config(10_000);
        let actual = config.spi_clock_khz();
        assert!(actual <= 10_000);
        assert!(actual >= 7_500);

        let config = find_clock_config(40_000);
        assert_eq!(config.spi_clock_khz(), 40_000);

        // Nothing fits: slowest possible
        let config = find_clock_config(1);
        assert_eq!(config.spi_clock_khz(), 24_000 / 512);
    }

    #[test]
    fn test_divisor_values() {
        assert_eq!(ClockDivisor::Div2.divisor(), 2);
        assert_eq!(ClockDivisor::Div512.divisor(), 512);
        assert_eq!(ClockDivisor::Div512.value(), 9);
    }

    #[test]
    fn test_clock_phase_parse() {
        assert_eq!(ClockPhase::parse("leading"), Some(ClockPhase::Leading));
        assert_eq!(ClockPhase::parse("Trailing"), Some(ClockPhase::Trailing));
        assert_eq!(ClockPhase::parse("1"), Some(ClockPhase::Trailing));
        assert_eq!(ClockPhase::parse("both"), None);
    }

    #[test]
    fn test_spi_config_defaults() {
        let config = SpiConfig::new();
        assert_eq!(config.cs, 0);
        assert_eq!(config.clock_phase, ClockPhase::Trailing);
        assert_eq!(config.timeout, Duration::from_millis(500));

        let config = config.with_cs(2).with_speed_khz(1000);
        assert_eq!(config.cs, 2);
        assert_eq!(config.speed_khz, 1000);
    }
}
