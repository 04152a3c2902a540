//! Paired SPI master and GPIO handles

use std::time::Duration;

use crate::error::{Ft4222Error, Result};
use crate::gpio::Ft4222Gpio;
use crate::protocol::{BridgeConfig, ClockPhase};
use crate::spi::Ft4222Spi;

/// Both FT4222H handles a run needs
///
/// The SPI master is opened first. If the GPIO interface then fails to open,
/// the SPI handle is dropped (and so reset) before the error is returned.
/// Dropping the bridge releases both handles; [`close`](Self::close) does
/// the same but reports failures.
pub struct Ft4222Bridge {
    /// SPI master carrying bus frames
    pub spi: Ft4222Spi,
    /// GPIO output
    pub gpio: Ft4222Gpio,
}

impl Ft4222Bridge {
    /// Open both interfaces
    pub fn open(config: &BridgeConfig) -> Result<Self> {
        let spi = Ft4222Spi::open_nth(config.spi_index, config.spi.clone()).map_err(|e| {
            log::error!("can't open SPI interface: {}", e);
            e
        })?;
        let gpio = Ft4222Gpio::open_nth(config.gpio_index, &config.spi).map_err(|e| {
            log::error!("can't open GPIO interface: {}", e);
            e
        })?;
        Ok(Self { spi, gpio })
    }

    /// Borrow both handles for a run
    pub fn split(&mut self) -> (&mut Ft4222Spi, &mut Ft4222Gpio) {
        (&mut self.spi, &mut self.gpio)
    }

    /// Release the GPIO interface, then reset and release the SPI master
    ///
    /// Both are attempted; the first error is returned.
    pub fn close(self) -> Result<()> {
        let Self { spi, gpio } = self;
        let gpio_result = gpio.close();
        let spi_result = spi.close();
        gpio_result.and(spi_result)
    }
}

/// Parse FT4222 programmer options
///
/// Supported options:
/// - `spi=<idx>`: SPI master interface index (default: 0)
/// - `gpio=<idx>`: GPIO interface index (default: 0)
/// - `spispeed=<khz>`: Target SPI clock in kHz (default: 46)
/// - `cs=<0-3>`: Chip select (default: 0)
/// - `cpha=<leading|trailing>`: Sampling edge (default: trailing)
/// - `timeout=<ms>`: USB transfer timeout (default: 500)
///
/// # Example
///
/// ```
/// let options = [("spispeed", "1000"), ("gpio", "1")];
/// let config = gbcom_ft4222::parse_options(&options).unwrap();
/// assert_eq!(config.gpio_index, 1);
/// ```
pub fn parse_options(options: &[(&str, &str)]) -> Result<BridgeConfig> {
    let mut config = BridgeConfig::default();

    for (key, value) in options {
        match *key {
            "spi" => config.spi_index = parse_num(key, value)?,
            "gpio" => config.gpio_index = parse_num(key, value)?,
            "spispeed" => {
                let khz: u32 = parse_num(key, value)?;
                if khz == 0 {
                    return Err(Ft4222Error::InvalidParameter(
                        "spispeed must be non-zero".into(),
                    ));
                }
                config.spi.speed_khz = khz;
                log::debug!("Setting target SPI speed to {} kHz", khz);
            }
            "cs" => {
                let cs: u8 = parse_num(key, value)?;
                if cs > 3 {
                    return Err(Ft4222Error::InvalidParameter(format!(
                        "Invalid cs: {} (must be 0-3)",
                        cs
                    )));
                }
                config.spi.cs = cs;
            }
            "cpha" => {
                config.spi.clock_phase = ClockPhase::parse(value).ok_or_else(|| {
                    Ft4222Error::InvalidParameter(format!(
                        "Invalid cpha: {} (must be leading or trailing)",
                        value
                    ))
                })?;
            }
            "timeout" => {
                let ms: u64 = parse_num(key, value)?;
                config.spi.timeout = Duration::from_millis(ms);
            }
            _ => {
                log::warn!("Unknown FT4222 option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Ft4222Error::InvalidParameter(format!("Invalid {} value: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SpiConfig, DEFAULT_SPI_SPEED_KHZ};

    #[test]
    fn test_parse_defaults() {
        let config = parse_options(&[]).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.spi, SpiConfig::default());
        assert_eq!(config.spi.speed_khz, DEFAULT_SPI_SPEED_KHZ);
    }

    #[test]
    fn test_parse_all_options() {
        let config = parse_options(&[
            ("spi", "1"),
            ("gpio", "2"),
            ("spispeed", "10000"),
            ("cs", "3"),
            ("cpha", "leading"),
            ("timeout", "1000"),
            ("bogus", "x"),
        ])
        .unwrap();

        assert_eq!(config.spi_index, 1);
        assert_eq!(config.gpio_index, 2);
        assert_eq!(config.spi.speed_khz, 10_000);
        assert_eq!(config.spi.cs, 3);
        assert_eq!(config.spi.clock_phase, ClockPhase::Leading);
        assert_eq!(config.spi.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(parse_options(&[("cs", "4")]).is_err());
        assert!(parse_options(&[("spi", "-1")]).is_err());
        assert!(parse_options(&[("spispeed", "0")]).is_err());
        assert!(parse_options(&[("cpha", "maybe")]).is_err());
        assert!(parse_options(&[("timeout", "soon")]).is_err());
    }
}
