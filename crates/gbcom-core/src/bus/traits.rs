//! Transport trait definitions
//!
//! The bridge exposes two independent channels: a synchronous serial master
//! that carries opcode frames, and a single digital output. Implementations
//! are blocking and must bound every call with a timeout.

use std::time::Duration;

use crate::error::Result;

/// Bus master link (the bridge's SPI master)
///
/// The link is full duplex: every byte clocked out shifts one byte in.
pub trait BusMaster {
    /// Send one frame
    ///
    /// With `read_back` set, returns the bytes shifted in while the frame
    /// was clocked out (same length as `frame`). Otherwise returns `None`.
    fn send(&mut self, frame: &[u8], read_back: bool) -> Result<Option<Vec<u8>>>;

    /// Block for `ms` milliseconds
    ///
    /// Used for script sleeps. The default sleeps the calling thread.
    fn delay_ms(&mut self, ms: u64) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }
}

/// Single digital output line on the bridge
pub trait GpioOutput {
    /// Drive the output to `level`
    fn set_pin(&mut self, level: bool) -> Result<()>;
}

impl<T: BusMaster + ?Sized> BusMaster for &mut T {
    fn send(&mut self, frame: &[u8], read_back: bool) -> Result<Option<Vec<u8>>> {
        (**self).send(frame, read_back)
    }

    fn delay_ms(&mut self, ms: u64) {
        (**self).delay_ms(ms)
    }
}

impl<T: GpioOutput + ?Sized> GpioOutput for &mut T {
    fn set_pin(&mut self, level: bool) -> Result<()> {
        (**self).set_pin(level)
    }
}

impl<T: BusMaster + ?Sized> BusMaster for Box<T> {
    fn send(&mut self, frame: &[u8], read_back: bool) -> Result<Option<Vec<u8>>> {
        (**self).send(frame, read_back)
    }

    fn delay_ms(&mut self, ms: u64) {
        (**self).delay_ms(ms)
    }
}

impl<T: GpioOutput + ?Sized> GpioOutput for Box<T> {
    fn set_pin(&mut self, level: bool) -> Result<()> {
        (**self).set_pin(level)
    }
}
