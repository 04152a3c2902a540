//! Bus controller opcodes
//!
//! Every frame is one opcode byte followed by a 4-byte big-endian payload.
//! Opcodes without an operand send a zero payload.

/// Latch the payload as the bus address
pub const SET_ADDR: u8 = 0xA0;
/// Strobe the bus read line; the controller latches the value at the
/// current address
pub const BUS_READ: u8 = 0x30;
/// Strobe the bus write line with the current address and data
pub const BUS_WRITE: u8 = 0x1F;
/// Latch the payload as the bus data
pub const SET_BUS_DATA: u8 = 0x60;
/// Shift out the latched bus data
pub const GET_BUS_DATA: u8 = 0x50;

/// Payload size in bytes
pub const PAYLOAD_LEN: usize = 4;
/// Total frame size in bytes
pub const FRAME_LEN: usize = 1 + PAYLOAD_LEN;

/// Build a frame for `opcode` with the given payload
pub const fn frame(opcode: u8, payload: [u8; PAYLOAD_LEN]) -> [u8; FRAME_LEN] {
    [opcode, payload[0], payload[1], payload[2], payload[3]]
}

/// Human-readable opcode name for logging
pub fn name(opcode: u8) -> &'static str {
    match opcode {
        SET_ADDR => "SET_ADDR",
        BUS_READ => "BUS_READ",
        BUS_WRITE => "BUS_WRITE",
        SET_BUS_DATA => "SET_BUS_DATA",
        GET_BUS_DATA => "GET_BUS_DATA",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        assert_eq!(
            frame(SET_ADDR, [0xDE, 0xAD, 0xBE, 0xEF]),
            [0xA0, 0xDE, 0xAD, 0xBE, 0xEF]
        );
        assert_eq!(frame(BUS_WRITE, [0; 4]), [0x1F, 0, 0, 0, 0]);
        assert_eq!(name(GET_BUS_DATA), "GET_BUS_DATA");
        assert_eq!(name(0x00), "UNKNOWN");
    }
}
