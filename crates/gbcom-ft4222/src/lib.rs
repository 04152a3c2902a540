//! gbcom-ft4222 - FT4222H USB SPI/GPIO bridge transport
//!
//! This crate drives the FTDI FT4222H as the link to a gbcom bus controller:
//! interface A carries opcode frames as an SPI master, interface B provides
//! the GPIO0 output. Both are driven over raw USB (no LibFT4222 required).
//!
//! # Reference setup
//!
//! - 24 MHz system clock divided by 512 (about 47 kHz SPI clock)
//! - Clock idle low, data sampled on the trailing edge (SPI mode 1)
//! - Chip select CS0, active low
//! - 500 ms timeout on every USB transfer
//!
//! # Example
//!
//! ```no_run
//! use gbcom_core::{Runner, Script};
//! use gbcom_ft4222::{parse_options, Ft4222Bridge};
//!
//! let config = parse_options(&[("spi", "0"), ("gpio", "0")])?;
//! let mut bridge = Ft4222Bridge::open(&config)?;
//!
//! let script = Script::from_file("bringup.txt")?;
//! let (spi, gpio) = bridge.split();
//! Runner::new(spi, gpio, std::io::stdout()).run(&script)?;
//!
//! bridge.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Programmer Options
//!
//! See [`parse_options`]: `spi`, `gpio`, `spispeed`, `cs`, `cpha`, `timeout`.

mod bridge;
mod device;
mod error;
mod gpio;
mod protocol;
mod spi;

pub use bridge::{parse_options, Ft4222Bridge};
pub use device::{find_interface, list_interfaces, Ft4222Interface, InterfaceKind};
pub use error::{Ft4222Error, Result};
pub use gpio::Ft4222Gpio;
pub use protocol::{
    find_clock_config, BridgeConfig, ClockConfig, ClockDivisor, ClockPhase, SpiConfig,
    SystemClock,
};
pub use spi::Ft4222Spi;
