//! gbcom-dummy - In-memory bus controller emulator for testing
//!
//! This crate provides a fake bridge that decodes gbcom opcode frames the
//! way the bus controller does, backed by a sparse in-memory address space.
//! It's useful for testing scripts and the protocol engine without hardware.

use std::collections::HashMap;
use std::time::Duration;

use gbcom_core::bus::opcodes::{
    self, BUS_READ, BUS_WRITE, FRAME_LEN, GET_BUS_DATA, SET_ADDR, SET_BUS_DATA,
};
use gbcom_core::bus::{BusMaster, GpioOutput};
use gbcom_core::error::{Error, Result};

/// Configuration for the dummy bus
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Value returned for addresses that were never written
    pub fill: u32,
    /// Whether sleeps actually block
    pub real_delay: bool,
    /// Fail every frame after this many have been accepted
    pub fail_after: Option<usize>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            fill: 0xFFFF_FFFF,
            real_delay: true,
            fail_after: None,
        }
    }
}

/// Dummy bus master
///
/// Emulates the bus controller behind the bridge: an address latch, a data
/// latch and a memory that bus strobes move data in and out of.
pub struct DummyBus {
    config: DummyConfig,
    memory: HashMap<u32, u32>,
    addr_latch: u32,
    data_latch: u32,
    frames: Vec<[u8; FRAME_LEN]>,
    delayed_ms: u64,
}

impl DummyBus {
    /// Create a new dummy bus with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            config,
            memory: HashMap::new(),
            addr_latch: 0,
            data_latch: 0,
            frames: Vec::new(),
            delayed_ms: 0,
        }
    }

    /// Create a new dummy bus with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Value stored at `addr`, if it was ever written
    pub fn peek(&self, addr: u32) -> Option<u32> {
        self.memory.get(&addr).copied()
    }

    /// Store a value without going through the protocol
    pub fn poke(&mut self, addr: u32, value: u32) {
        self.memory.insert(addr, value);
    }

    /// Every accepted frame, in order
    pub fn frames(&self) -> &[[u8; FRAME_LEN]] {
        &self.frames
    }

    /// Total time requested through `delay_ms`
    pub fn delayed_ms(&self) -> u64 {
        self.delayed_ms
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    fn decode(frame: &[u8]) -> Result<[u8; FRAME_LEN]> {
        <[u8; FRAME_LEN]>::try_from(frame).map_err(|_| {
            Error::Transport(format!(
                "frame must be {} bytes, got {}",
                FRAME_LEN,
                frame.len()
            ))
        })
    }
}

impl BusMaster for DummyBus {
    fn send(&mut self, frame: &[u8], read_back: bool) -> Result<Option<Vec<u8>>> {
        if let Some(limit) = self.config.fail_after {
            if self.frames.len() >= limit {
                return Err(Error::Transport("dummy bus disconnected".into()));
            }
        }

        let frame = Self::decode(frame)?;
        let payload = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);

        match frame[0] {
            SET_ADDR => self.addr_latch = payload,
            SET_BUS_DATA => self.data_latch = payload,
            BUS_WRITE => {
                log::trace!(
                    "dummy: mem[0x{:08X}] = 0x{:08X}",
                    self.addr_latch,
                    self.data_latch
                );
                self.memory.insert(self.addr_latch, self.data_latch);
            }
            BUS_READ => {
                self.data_latch = self.peek(self.addr_latch).unwrap_or(self.config.fill);
            }
            GET_BUS_DATA => {}
            other => {
                return Err(Error::Transport(format!(
                    "dummy: unsupported opcode 0x{:02X}",
                    other
                )))
            }
        }
        self.frames.push(frame);

        if !read_back {
            return Ok(None);
        }

        // Opcode byte echoes; the payload shifts out the data latch for
        // GET_BUS_DATA and zeros for everything else.
        let mut rx = Vec::with_capacity(FRAME_LEN);
        rx.push(frame[0]);
        if frame[0] == GET_BUS_DATA {
            rx.extend_from_slice(&self.data_latch.to_be_bytes());
        } else {
            rx.extend_from_slice(&[0; 4]);
        }
        log::trace!("dummy: {} -> {:02X?}", opcodes::name(frame[0]), rx);
        Ok(Some(rx))
    }

    fn delay_ms(&mut self, ms: u64) {
        self.delayed_ms += ms;
        if self.config.real_delay && ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }
}

/// Dummy gpio output; remembers every level it was driven to
#[derive(Debug, Default)]
pub struct DummyPin {
    history: Vec<bool>,
}

impl DummyPin {
    /// Create a pin that starts low
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level (low if never driven)
    pub fn level(&self) -> bool {
        self.history.last().copied().unwrap_or(false)
    }

    /// All levels written, in order
    pub fn history(&self) -> &[bool] {
        &self.history
    }
}

impl GpioOutput for DummyPin {
    fn set_pin(&mut self, level: bool) -> Result<()> {
        self.history.push(level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbcom_core::{BusWord, Command, GbProto, Runner, Script};
    use std::time::Instant;

    #[test]
    fn test_write_then_read() {
        let mut proto = GbProto::new(DummyBus::new_default(), DummyPin::new());

        let addr = BusWord::from(0x0000_1000u32);
        let data = BusWord::from(0x1234_5678u32);
        proto.write_int(addr, data).unwrap();
        assert_eq!(proto.read_int(addr).unwrap(), data);

        let (bus, _) = proto.into_inner();
        assert_eq!(bus.peek(0x1000), Some(0x1234_5678));
    }

    #[test]
    fn test_unwritten_address_reads_fill() {
        let config = DummyConfig {
            fill: 0xA5A5_A5A5,
            ..Default::default()
        };
        let mut proto = GbProto::new(DummyBus::new(config), DummyPin::new());
        let value = proto.read_int(BusWord::from(0xDEAD_BEEFu32)).unwrap();
        assert_eq!(value.value(), 0xA5A5_A5A5);
    }

    #[test]
    fn test_rejects_bad_frames() {
        let mut bus = DummyBus::new_default();
        assert!(matches!(
            bus.send(&[SET_ADDR, 0, 0], false),
            Err(Error::Transport(_))
        ));
        assert!(matches!(
            bus.send(&[0x77, 0, 0, 0, 0], false),
            Err(Error::Transport(_))
        ));
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_end_to_end_script() {
        let script = Script::parse(
            "op addr data\n\
             wi 00000010 000000FF\n\
             ri 00000010\n\
             s 50\n",
        );
        assert!(script.diagnostics().is_empty());
        assert_eq!(script.len(), 3);

        let mut bus = DummyBus::new_default();
        let mut pin = DummyPin::new();
        let mut out = Vec::new();

        let start = Instant::now();
        let summary = Runner::new(&mut bus, &mut pin, &mut out)
            .run(&script)
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(
            bus.frames(),
            &[
                [0xA0, 0x00, 0x00, 0x00, 0x10],
                [0x60, 0x00, 0x00, 0x00, 0xFF],
                [0x1F, 0x00, 0x00, 0x00, 0x00],
                [0xA0, 0x00, 0x00, 0x00, 0x10],
                [0x30, 0x00, 0x00, 0x00, 0x00],
                [0x50, 0x00, 0x00, 0x00, 0x00],
            ]
        );
        assert_eq!(summary.reads.len(), 1);
        assert_eq!(summary.reads[0].value.value(), 0x0000_00FF);
        assert_eq!(String::from_utf8(out).unwrap(), "0x000000FF\n");
        assert_eq!(bus.delayed_ms(), 50);
        assert!(elapsed >= Duration::from_millis(50));
    }

    #[test]
    fn test_gpio_script() {
        let script = Script::parse("op addr data\ng P0 1\ns 0\ng P0 0\ng P0 x\n");
        let mut bus = DummyBus::new_default();
        let mut pin = DummyPin::new();

        Runner::new(&mut bus, &mut pin, std::io::sink())
            .run(&script)
            .unwrap();

        assert_eq!(pin.history(), &[true, false, true]);
        assert!(pin.level());
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_disconnect_aborts_run() {
        let config = DummyConfig {
            fail_after: Some(4),
            real_delay: false,
            ..Default::default()
        };
        let script = Script::parse("op addr data\nwi 1 2\nri 1\nwi 3 4\n");
        let mut bus = DummyBus::new(config);
        let mut pin = DummyPin::new();
        let mut out = Vec::new();

        let result = Runner::new(&mut bus, &mut pin, &mut out).run(&script);
        assert!(matches!(result, Err(Error::Transport(_))));
        // write done, read aborted after SET_ADDR, last write never started
        assert_eq!(bus.frames().len(), 4);
        assert_eq!(bus.peek(3), None);
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_rows_are_skipped() {
        let script = Script::parse("op addr data\nxx 1 2\nwi 5 6\nri\nri 5\n");
        assert_eq!(script.commands()[0], Command::Unknown);
        assert_eq!(script.commands()[2], Command::Unknown);

        let mut bus = DummyBus::new_default();
        let mut pin = DummyPin::new();
        let summary = Runner::new(&mut bus, &mut pin, std::io::sink())
            .run(&script)
            .unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.executed, 2);
        assert_eq!(summary.reads[0].value.value(), 6);
    }
}
