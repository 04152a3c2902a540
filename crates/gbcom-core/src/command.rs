//! Typed bus commands
//!
//! A script row is turned into exactly one [`Command`]. Each variant carries
//! only the operands it needs, so there is no way to ask a sleep for its
//! address.
//!
//! The script format shares two operand columns between all operations:
//!
//! | op   | `addr` column         | `data` column        |
//! |------|-----------------------|----------------------|
//! | `s`  | duration (decimal ms) | -                    |
//! | `g`  | pin identifier        | level (truthy token) |
//! | `wi` | bus address (hex)     | bus data (hex)       |
//! | `ri` | bus address (hex)     | -                    |

use std::collections::HashMap;
use std::fmt;

use crate::script::Diagnostic;

/// Column holding the operation code
pub const FIELD_OPERATION: &str = "op";
/// Column holding the address (or sleep duration, or pin id)
pub const FIELD_ADDR: &str = "addr";
/// Column holding the data (or gpio level)
pub const FIELD_DATA: &str = "data";

/// Operation code: sleep
pub const OP_SLEEP: &str = "s";
/// Operation code: drive the GPIO pin
pub const OP_GPIO: &str = "g";
/// Operation code: bus write
pub const OP_WRITE: &str = "wi";
/// Operation code: bus read
pub const OP_READ: &str = "ri";

/// Field name to raw token mapping for one data row
pub type Record<'a> = HashMap<&'a str, &'a str>;

/// A 32-bit bus address or data value, stored most significant byte first
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BusWord([u8; 4]);

impl BusWord {
    /// Wrap raw big-endian bytes
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Parse hexadecimal text
    ///
    /// An optional `0x`/`0X` prefix and single `_` separators between digits
    /// are accepted, so `10`, `0x10` and `0000_0010` are the same word.
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(rest) => rest.strip_prefix('_').unwrap_or(rest),
            None => text,
        };
        let digits = strip_separators(digits)?;
        u32::from_str_radix(&digits, 16).ok().map(Self::from)
    }

    /// The four bytes as sent on the wire
    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }

    /// The value as an integer
    pub const fn value(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl From<u32> for BusWord {
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl From<BusWord> for u32 {
    fn from(word: BusWord) -> Self {
        word.value()
    }
}

impl fmt::Display for BusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.value())
    }
}

/// One operation from a script
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Pause execution
    Sleep {
        /// Pause length in milliseconds
        duration_ms: u64,
    },
    /// Drive the bridge's GPIO output
    Gpio {
        /// Pin identifier as written in the script
        pin: String,
        /// Requested logic level
        level: bool,
    },
    /// Write `data` to bus `address`
    Write {
        /// Bus address
        address: BusWord,
        /// Value to write
        data: BusWord,
    },
    /// Read bus `address`
    Read {
        /// Bus address
        address: BusWord,
    },
    /// Row that could not be turned into a command; never executed
    Unknown,
}

impl Command {
    /// Build a command from one data row
    ///
    /// `line` is the 1-based line number used in the returned diagnostic.
    pub fn from_record(record: &Record<'_>, line: usize) -> Result<Self, Diagnostic> {
        let op = required(record, FIELD_OPERATION, "", line)?;

        match op {
            OP_SLEEP => {
                let raw = required(record, FIELD_ADDR, op, line)?;
                let duration_ms = strip_separators(raw)
                    .and_then(|digits| digits.parse::<u64>().ok())
                    .ok_or_else(|| invalid(line, FIELD_ADDR, raw, "decimal milliseconds"))?;
                Ok(Command::Sleep { duration_ms })
            }
            OP_GPIO => {
                let pin = required(record, FIELD_ADDR, op, line)?;
                let level = required(record, FIELD_DATA, op, line)?;
                Ok(Command::Gpio {
                    pin: pin.to_string(),
                    level: truthy(level),
                })
            }
            OP_WRITE => {
                let address = hex_word(record, FIELD_ADDR, op, line)?;
                let data = hex_word(record, FIELD_DATA, op, line)?;
                Ok(Command::Write { address, data })
            }
            OP_READ => {
                let address = hex_word(record, FIELD_ADDR, op, line)?;
                Ok(Command::Read { address })
            }
            other => Err(Diagnostic::UnknownOp {
                line,
                op: other.to_string(),
            }),
        }
    }

    /// Whether the runner will act on this command
    pub fn is_executable(&self) -> bool {
        !matches!(self, Command::Unknown)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Sleep { duration_ms } => write!(f, "sleep {} ms", duration_ms),
            Command::Gpio { pin, level } => write!(f, "gpio {} = {}", pin, *level as u8),
            Command::Write { address, data } => write!(f, "write {} <- {}", address, data),
            Command::Read { address } => write!(f, "read {}", address),
            Command::Unknown => write!(f, "unknown"),
        }
    }
}

fn required<'a>(
    record: &Record<'a>,
    field: &'static str,
    op: &str,
    line: usize,
) -> Result<&'a str, Diagnostic> {
    record
        .get(field)
        .copied()
        .ok_or_else(|| Diagnostic::MissingField {
            line,
            op: op.to_string(),
            field,
        })
}

fn hex_word(
    record: &Record<'_>,
    field: &'static str,
    op: &str,
    line: usize,
) -> Result<BusWord, Diagnostic> {
    let raw = required(record, field, op, line)?;
    BusWord::from_hex(raw).ok_or_else(|| invalid(line, field, raw, "32-bit hexadecimal"))
}

fn invalid(line: usize, field: &'static str, value: &str, expected: &'static str) -> Diagnostic {
    Diagnostic::InvalidOperand {
        line,
        field,
        value: value.to_string(),
        expected,
    }
}

/// Drop `_` digit separators, rejecting leading, trailing or doubled ones
fn strip_separators(digits: &str) -> Option<String> {
    if digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    Some(digits.replace('_', ""))
}

/// Truthiness of a gpio level token
///
/// Decimal tokens (ASCII digits, `_` separators allowed) are compared
/// against zero of any width. Every other non-empty token counts as high,
/// including digits outside ASCII such as `０`.
fn truthy(token: &str) -> bool {
    match strip_separators(token) {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.bytes().any(|b| b != b'0')
        }
        _ => !token.is_empty(),
    }
}
