//! Transmission control characters.
//!
//! These five bytes are the entire wire-format contract and must stay
//! bit-exact. A transmission composes as SOH, STX, payload, ETX, EOT; the
//! receive side is left to the consumer.

/// Null terminator, also the sentinel written for an absent payload.
pub const NUL: u8 = 0x00;

/// Start of header.
pub const SOH: u8 = 0x01;

/// Start of text.
pub const STX: u8 = 0x02;

/// End of text.
pub const ETX: u8 = 0x03;

/// End of transmission.
pub const EOT: u8 = 0x04;

/// Mnemonic for a control byte, for log lines.
pub fn control_name(byte: u8) -> Option<&'static str> {
    match byte {
        NUL => Some("NUL"),
        SOH => Some("SOH"),
        STX => Some("STX"),
        ETX => Some("ETX"),
        EOT => Some("EOT"),
        _ => None,
    }
}
