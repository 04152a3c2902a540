//! Bus access through the bridge
//!
//! The target bus is never touched directly. Every operation is an opcode
//! frame clocked out over the bridge's SPI master link, interpreted by the
//! bus controller on the other side. [`GbProto`] builds those frames and
//! [`BusMaster`]/[`GpioOutput`] abstract the bridge.

pub mod opcodes;
mod proto;
mod traits;

pub use proto::GbProto;
pub use traits::{BusMaster, GpioOutput};
