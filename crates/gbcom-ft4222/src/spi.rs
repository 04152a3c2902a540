//! FT4222H SPI master
//!
//! Frames are sent as single-I/O, full-duplex transactions: the frame is
//! written, an empty packet ends the transaction (CS deasserts), and the
//! same number of bytes is read back. The chip returns a byte for every
//! byte clocked out, so the response is always drained even when the
//! caller does not want it; otherwise it would surface in the next read.

use gbcom_core::bus::BusMaster;

use crate::device::{find_interface, Ft4222Interface, InterfaceKind, UsbLink};
use crate::error::{Ft4222Error, Result};
use crate::protocol::*;

/// FT4222H interface A configured as SPI master
pub struct Ft4222Spi {
    link: UsbLink,
    config: SpiConfig,
    clock_config: ClockConfig,
    released: bool,
}

impl Ft4222Spi {
    /// Open the `index`th SPI master interface
    pub fn open_nth(index: usize, config: SpiConfig) -> Result<Self> {
        let target = find_interface(InterfaceKind::SpiMaster, index)?;
        Self::open(&target, config)
    }

    /// Open a specific interface
    pub fn open(target: &Ft4222Interface, config: SpiConfig) -> Result<Self> {
        if target.kind != InterfaceKind::SpiMaster {
            return Err(Ft4222Error::InvalidParameter(format!(
                "{} is not an SPI master interface",
                target
            )));
        }

        let link = UsbLink::open(target, config.timeout)?;
        let clock_config = find_clock_config(config.speed_khz);

        let mut spi = Self {
            link,
            config,
            clock_config,
            released: false,
        };
        spi.init()?;
        Ok(spi)
    }

    fn init(&mut self) -> Result<()> {
        let (chip_version, version2, version3) = self.link.get_version()?;
        log::info!(
            "FT4222H version: chip=0x{:08X} (0x{:08X} 0x{:08X})",
            chip_version,
            version2,
            version3
        );

        let channels = self.link.get_num_channels()?;
        if self.config.cs >= channels {
            return Err(Ft4222Error::InvalidParameter(format!(
                "CS{} not available (device has {} channels)",
                self.config.cs, channels
            )));
        }

        self.link.chip_reset()?;

        let sys_clock = self.clock_config.sys_clock;
        self.link.config_request(FT4222_SET_CLOCK, sys_clock.index())?;
        log::debug!("Set system clock to {} MHz", sys_clock.to_khz() / 1000);

        self.configure_spi_master()?;

        log::info!(
            "FT4222H configured: SPI clock = {} kHz, CS = {}, CPHA = {:?}, timeout = {:?}",
            self.clock_config.spi_clock_khz(),
            self.config.cs,
            self.config.clock_phase,
            self.config.timeout
        );
        Ok(())
    }

    fn configure_spi_master(&mut self) -> Result<()> {
        let cs = self.config.cs;
        let link = &self.link;

        link.config_request(FT4222_SPI_RESET_TRANSACTION, cs)?;
        link.config_request(FT4222_SPI_SET_IO_LINES, 1)?;
        link.config_request(FT4222_SPI_SET_CLK_DIV, self.clock_config.divisor.value())?;
        link.config_request(FT4222_SPI_SET_CLK_IDLE, FT4222_CLK_IDLE_LOW)?;
        link.config_request(FT4222_SPI_SET_CAPTURE, self.config.clock_phase.value())?;
        link.config_request(FT4222_SPI_SET_CS_ACTIVE, FT4222_CS_ACTIVE_LOW)?;
        link.config_request(FT4222_SPI_SET_CS_MASK, 1 << cs)?;
        link.config_request(FT4222_SET_MODE, FT4222_MODE_SPI_MASTER)?;
        Ok(())
    }

    /// Clock out `data` as one transaction and return the bytes shifted in
    pub fn transfer(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        self.link.bulk_write(data)?;
        self.link.bulk_write(&[])?;
        let response = self.link.bulk_read(data.len())?;

        if response.len() != data.len() {
            return Err(Ft4222Error::InvalidResponse(format!(
                "Expected {} bytes, got {}",
                data.len(),
                response.len()
            )));
        }
        Ok(response)
    }

    /// Get the current SPI configuration
    pub fn config(&self) -> &SpiConfig {
        &self.config
    }

    /// Get the actual SPI clock speed in kHz
    pub fn actual_speed_khz(&self) -> u32 {
        self.clock_config.spi_clock_khz()
    }

    /// Reset the chip and release the interface
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        log::debug!("Resetting FT4222H SPI master");
        self.link.chip_reset()
    }
}

impl Drop for Ft4222Spi {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("can't close FT4222H SPI master: {}", e);
        }
    }
}

impl BusMaster for Ft4222Spi {
    fn send(&mut self, frame: &[u8], read_back: bool) -> gbcom_core::Result<Option<Vec<u8>>> {
        let response = self.transfer(frame)?;
        Ok(read_back.then_some(response))
    }
}
