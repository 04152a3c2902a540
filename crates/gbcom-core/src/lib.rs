//! gbcom-core - Bus command protocol engine
//!
//! This crate contains everything gbcom needs to turn a text script into
//! traffic on an external address/data bus, independent of the USB bridge
//! that carries it:
//!
//! - [`script`]: parses the columnar script format into a [`Script`]
//! - [`command`]: the typed [`Command`] model and its construction rules
//! - [`bus`]: opcode framing ([`GbProto`]) and the transport traits
//! - [`runner`]: sequential execution of a script against a transport
//!
//! # Example
//!
//! ```ignore
//! use gbcom_core::{Runner, Script};
//!
//! let script = Script::parse("op addr data\nwi 00000010 000000FF\nri 00000010\n");
//! let mut runner = Runner::new(&mut master, &mut gpio, std::io::stdout());
//! let summary = runner.run(&script)?;
//! println!("{} commands executed", summary.executed);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod command;
pub mod error;
pub mod runner;
pub mod script;

pub use bus::{BusMaster, GbProto, GpioOutput};
pub use command::{BusWord, Command};
pub use error::{Error, Result};
pub use runner::{BusRead, RunSummary, Runner};
pub use script::{Diagnostic, Script};
