//! FT4222H GPIO port
//!
//! Only GPIO0 is used. It is switched to output on open and driven by
//! writing the port level mask to the interface's bulk OUT endpoint.

use gbcom_core::bus::GpioOutput;

use crate::device::{find_interface, Ft4222Interface, InterfaceKind, UsbLink};
use crate::error::{Ft4222Error, Result};
use crate::protocol::*;

/// FT4222H interface B with GPIO0 as output
pub struct Ft4222Gpio {
    link: UsbLink,
    level: Option<bool>,
}

impl Ft4222Gpio {
    /// Open the `index`th GPIO interface
    pub fn open_nth(index: usize, config: &SpiConfig) -> Result<Self> {
        let target = find_interface(InterfaceKind::Gpio, index)?;
        Self::open(&target, config)
    }

    /// Open a specific interface
    ///
    /// Only the timeout is taken from `config`.
    pub fn open(target: &Ft4222Interface, config: &SpiConfig) -> Result<Self> {
        if target.kind != InterfaceKind::Gpio {
            return Err(Ft4222Error::InvalidParameter(format!(
                "{} is not a GPIO interface",
                target
            )));
        }

        let link = UsbLink::open(target, config.timeout)?;
        link.config_request(FT4222_GPIO_SET_DIR, GPIO_P0)?;
        log::info!("FT4222H GPIO0 configured as output");

        Ok(Self { link, level: None })
    }

    /// Last level written, if any
    pub fn level(&self) -> Option<bool> {
        self.level
    }

    /// Drive GPIO0
    pub fn write(&mut self, level: bool) -> Result<()> {
        let mask = if level { GPIO_P0 } else { 0 };
        self.link.bulk_write(&[mask])?;
        self.level = Some(level);
        log::debug!("GPIO0 = {}", level as u8);
        Ok(())
    }

    /// Release the interface
    ///
    /// GPIO0 keeps its last level. The USB interface is released when the
    /// claimed link is dropped at the end of this call, which is also what
    /// happens if the handle is simply dropped; nothing here can fail.
    pub fn close(self) -> Result<()> {
        log::debug!(
            "Closing FT4222H GPIO interface (GPIO0 left {})",
            self.level.map_or("undriven", |l| if l { "high" } else { "low" })
        );
        drop(self.link);
        Ok(())
    }
}

impl GpioOutput for Ft4222Gpio {
    fn set_pin(&mut self, level: bool) -> gbcom_core::Result<()> {
        Ok(self.write(level)?)
    }
}
