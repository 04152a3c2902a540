//! Opcode framing for the bus controller

use super::opcodes::{
    self, BUS_READ, BUS_WRITE, GET_BUS_DATA, PAYLOAD_LEN, SET_ADDR, SET_BUS_DATA,
};
use super::traits::{BusMaster, GpioOutput};
use crate::command::BusWord;
use crate::error::{Error, Result};

/// Bus protocol encoder
///
/// Translates logical bus operations into opcode frames on the master link,
/// and gpio requests into writes on the output line.
pub struct GbProto<M, G> {
    master: M,
    gpio: G,
}

impl<M: BusMaster, G: GpioOutput> GbProto<M, G> {
    /// Create an encoder over the given transports
    pub fn new(master: M, gpio: G) -> Self {
        Self { master, gpio }
    }

    /// Give the transports back
    pub fn into_inner(self) -> (M, G) {
        (self.master, self.gpio)
    }

    /// Latch the bus address
    pub fn set_addr(&mut self, addr: BusWord) -> Result<()> {
        self.send(SET_ADDR, addr.bytes(), false).map(drop)
    }

    /// Strobe the bus read line
    pub fn bus_read(&mut self) -> Result<()> {
        self.send(BUS_READ, [0; PAYLOAD_LEN], false).map(drop)
    }

    /// Strobe the bus write line
    pub fn bus_write(&mut self) -> Result<()> {
        self.send(BUS_WRITE, [0; PAYLOAD_LEN], false).map(drop)
    }

    /// Latch the bus data
    pub fn set_data(&mut self, data: BusWord) -> Result<()> {
        self.send(SET_BUS_DATA, data.bytes(), false).map(drop)
    }

    /// Fetch the latched bus data
    ///
    /// The value is the last four bytes of the response; the first byte is
    /// shifted in while the opcode goes out.
    pub fn get_data(&mut self) -> Result<BusWord> {
        let response = self.send(GET_BUS_DATA, [0; PAYLOAD_LEN], true)?;
        let response = response.unwrap_or_default();

        if response.len() < PAYLOAD_LEN {
            return Err(Error::ShortResponse {
                expected: PAYLOAD_LEN,
                got: response.len(),
            });
        }

        let tail = &response[response.len() - PAYLOAD_LEN..];
        Ok(BusWord::from_bytes([tail[0], tail[1], tail[2], tail[3]]))
    }

    /// Read one word: address, read strobe, fetch
    pub fn read_int(&mut self, addr: BusWord) -> Result<BusWord> {
        self.set_addr(addr)?;
        self.bus_read()?;
        self.get_data()
    }

    /// Write one word: address, data, write strobe
    pub fn write_int(&mut self, addr: BusWord, data: BusWord) -> Result<()> {
        self.set_addr(addr)?;
        self.set_data(data)?;
        self.bus_write()
    }

    /// Drive the gpio line
    ///
    /// The bridge has a single output, so `pin` is informational.
    pub fn set_gpio(&mut self, pin: &str, level: bool) -> Result<()> {
        log::debug!("GPIO {} -> {}", pin, level as u8);
        self.gpio.set_pin(level)
    }

    /// Block for `ms` milliseconds on the master's clock
    pub fn delay_ms(&mut self, ms: u64) {
        self.master.delay_ms(ms)
    }

    fn send(
        &mut self,
        opcode: u8,
        payload: [u8; PAYLOAD_LEN],
        read_back: bool,
    ) -> Result<Option<Vec<u8>>> {
        let frame = opcodes::frame(opcode, payload);
        log::trace!("{:<12} {:02X?}", opcodes::name(opcode), frame);
        let response = self.master.send(&frame, read_back)?;
        if let Some(rx) = &response {
            log::trace!("{:<12} {:02X?}", "  <-", rx);
        }
        Ok(response)
    }
}
