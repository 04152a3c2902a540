//! Sequential command execution
//!
//! The runner walks a script front to back. Each command finishes before the
//! next one starts; sleeps block the thread so the target can settle.
//! Unknown commands are skipped with a warning, and the first transport
//! error ends the run.

use std::io::Write;

use crate::bus::{BusMaster, GbProto, GpioOutput};
use crate::command::{BusWord, Command};
use crate::error::Result;

/// One completed bus read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusRead {
    /// Address that was read
    pub address: BusWord,
    /// Value returned by the bus
    pub value: BusWord,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Commands that were executed
    pub executed: usize,
    /// Unknown commands that were skipped
    pub skipped: usize,
    /// Read results, in command order
    pub reads: Vec<BusRead>,
}

/// Executes commands against a bus master and gpio line
///
/// Read results are written to `out`, one `0x`-prefixed hex value per line.
pub struct Runner<M, G, W> {
    proto: GbProto<M, G>,
    out: W,
}

impl<M, G, W> Runner<M, G, W>
where
    M: BusMaster,
    G: GpioOutput,
    W: Write,
{
    /// Create a runner
    pub fn new(master: M, gpio: G, out: W) -> Self {
        Self {
            proto: GbProto::new(master, gpio),
            out,
        }
    }

    /// Run every command in order
    ///
    /// Stops at the first transport error; commands after it are not
    /// executed.
    pub fn run<'a, I>(&mut self, commands: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = &'a Command>,
    {
        let mut summary = RunSummary::default();

        for (idx, command) in commands.into_iter().enumerate() {
            log::debug!("[{}] {}", idx, command);
            match command {
                Command::Sleep { duration_ms } => self.proto.delay_ms(*duration_ms),
                Command::Gpio { pin, level } => self.proto.set_gpio(pin, *level)?,
                Command::Write { address, data } => self.proto.write_int(*address, *data)?,
                Command::Read { address } => {
                    let value = self.proto.read_int(*address)?;
                    writeln!(self.out, "{}", value)?;
                    summary.reads.push(BusRead {
                        address: *address,
                        value,
                    });
                }
                Command::Unknown => {
                    log::warn!("Skipping unknown command #{}", idx);
                    summary.skipped += 1;
                    continue;
                }
            }
            summary.executed += 1;
        }

        self.out.flush()?;
        Ok(summary)
    }

    /// Give back the transports and the output
    pub fn into_parts(self) -> (M, G, W) {
        let (master, gpio) = self.proto.into_inner();
        (master, gpio, self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::script::Script;
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Frame(u8),
        Delay(u64),
        Pin(bool),
    }

    /// Minimal bus controller model; logs every event
    #[derive(Default)]
    struct Fake {
        events: Vec<Event>,
        addr: [u8; 4],
        data: [u8; 4],
        mem: HashMap<[u8; 4], [u8; 4]>,
        fail_on: Option<u8>,
        real_delay: bool,
    }

    impl BusMaster for Fake {
        fn send(&mut self, frame: &[u8], read_back: bool) -> Result<Option<Vec<u8>>> {
            let op = frame[0];
            if self.fail_on == Some(op) {
                return Err(Error::Transport("unplugged".into()));
            }
            self.events.push(Event::Frame(op));
            let payload = [frame[1], frame[2], frame[3], frame[4]];
            match op {
                0xA0 => self.addr = payload,
                0x60 => self.data = payload,
                0x1F => {
                    self.mem.insert(self.addr, self.data);
                }
                0x30 => self.data = self.mem.get(&self.addr).copied().unwrap_or([0; 4]),
                _ => {}
            }
            Ok(read_back.then(|| {
                let mut rx = vec![op];
                rx.extend_from_slice(&self.data);
                rx
            }))
        }

        fn delay_ms(&mut self, ms: u64) {
            self.events.push(Event::Delay(ms));
            if self.real_delay {
                std::thread::sleep(Duration::from_millis(ms));
            }
        }
    }

    #[derive(Default)]
    struct Pin(Vec<bool>);

    impl GpioOutput for Pin {
        fn set_pin(&mut self, level: bool) -> Result<()> {
            self.0.push(level);
            Ok(())
        }
    }

    #[test]
    fn test_write_read_sleep() {
        let script = Script::parse("op addr data\nwi 00000010 000000FF\nri 00000010\ns 50\n");
        let mut fake = Fake::default();
        let mut pin = Pin::default();
        let mut out = Vec::new();

        let summary = Runner::new(&mut fake, &mut pin, &mut out)
            .run(&script)
            .unwrap();

        assert_eq!(summary.executed, 3);
        assert_eq!(summary.skipped, 0);
        assert_eq!(
            summary.reads,
            vec![BusRead {
                address: BusWord::from(0x10u32),
                value: BusWord::from(0xFFu32),
            }]
        );
        assert_eq!(String::from_utf8(out).unwrap(), "0x000000FF\n");
        assert_eq!(
            fake.events,
            vec![
                Event::Frame(0xA0),
                Event::Frame(0x60),
                Event::Frame(0x1F),
                Event::Frame(0xA0),
                Event::Frame(0x30),
                Event::Frame(0x50),
                Event::Delay(50),
            ]
        );
    }

    #[test]
    fn test_gpio_and_unknown() {
        let script = Script::parse("op addr data\ng P0 1\nzz 0 0\ng P0 0\n");
        let mut fake = Fake::default();
        let mut pin = Pin::default();

        let summary = Runner::new(&mut fake, &mut pin, std::io::sink())
            .run(&script)
            .unwrap();

        assert_eq!(summary.executed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(pin.0, vec![true, false]);
        assert!(fake.events.is_empty());
    }

    #[test]
    fn test_transport_error_stops_run() {
        let script = Script::parse("op addr data\ng P0 1\nri 10\ng P0 0\n");
        let mut fake = Fake {
            fail_on: Some(0x30),
            ..Default::default()
        };
        let mut pin = Pin::default();
        let mut out = Vec::new();

        let err = Runner::new(&mut fake, &mut pin, &mut out)
            .run(&script)
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        // The trailing gpio write never happens
        assert_eq!(pin.0, vec![true]);
        assert_eq!(fake.events, vec![Event::Frame(0xA0)]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_sleep_blocks() {
        let script = Script::parse("op addr\ns 100\nri 0\n");
        let mut fake = Fake {
            real_delay: true,
            ..Default::default()
        };
        let mut pin = Pin::default();

        let start = Instant::now();
        Runner::new(&mut fake, &mut pin, std::io::sink())
            .run(&script)
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(fake.events[0], Event::Delay(100));
        assert_eq!(fake.events[1], Event::Frame(0xA0));
    }

    #[test]
    fn test_default_delay_sleeps() {
        struct Silent;
        impl BusMaster for Silent {
            fn send(&mut self, _frame: &[u8], _read_back: bool) -> Result<Option<Vec<u8>>> {
                Ok(None)
            }
        }

        let start = Instant::now();
        Silent.delay_ms(20);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_reads_in_command_order() {
        let script =
            Script::parse("op addr data\nwi 1 A\nwi 2 B\nri 2\nri 1\nri 3\n");
        let mut fake = Fake::default();
        let mut pin = Pin::default();
        let mut out = Vec::new();

        let summary = Runner::new(&mut fake, &mut pin, &mut out)
            .run(script.iter())
            .unwrap();

        let values: Vec<u32> = summary.reads.iter().map(|r| r.value.value()).collect();
        assert_eq!(values, vec![0xB, 0xA, 0]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0x0000000B\n0x0000000A\n0x00000000\n"
        );
    }
}
