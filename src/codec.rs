//! NEC address/command packing and validation.
//!
//! A NEC data frame carries 32 bits, sent least significant bit first:
//!
//! | Bits    | Content            |
//! |---------|--------------------|
//! | 0..8    | address, low byte  |
//! | 8..16   | address, high byte |
//! | 16..24  | command            |
//! | 24..32  | inverted command   |
//!
//! The raw `u32` code used throughout this crate holds those bytes in that
//! order, lowest byte first.
//!
//! ## 8-bit and extended addresses
//!
//! The original protocol sends 8-bit addresses followed by their inverse,
//! while the extended variant uses the second byte as the upper half of a
//! 16-bit address. The two forms are told apart by checking whether the high
//! byte is the inverse of the low byte. An extended address that happens to
//! have that shape is therefore indistinguishable from an 8-bit one and
//! decodes to its low byte:
//!
//! ```rust
//! use irnec::codec::{decode_raw, encode_raw};
//!
//! assert_eq!(decode_raw(encode_raw(0xF00D, 0x12)).address, 0xF00D);
//! // 0xDF is the inverse of 0x20
//! assert_eq!(decode_raw(encode_raw(0xDF20, 0x12)).address, 0x0020);
//! ```

use crate::error::Error;

/// Result of splitting a raw code with [`decode_raw`].
///
/// The fields are filled in even when the code is not valid; check
/// [`valid`](Decoded::valid) before trusting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Decoded {
    /// Whether the command byte is the inverse of the inverted command byte
    pub valid: bool,
    /// Resolved device address
    pub address: u16,
    /// Command byte
    pub command: u8,
}

impl Decoded {
    /// Returns `(address, command)` if the code passed validation.
    pub fn checked(self, code: u32) -> Result<(u16, u8), Error> {
        if self.valid {
            Ok((self.address, self.command))
        } else {
            Err(Error::Checksum { code })
        }
    }
}

/// Splits a raw NEC code into its address and command, checking the command inverse.
pub fn decode_raw(code: u32) -> Decoded {
    let [low, high, command, inverted] = code.to_le_bytes();
    Decoded {
        valid: command == !inverted,
        address: make_address(low, high),
        command,
    }
}

/// Assembles a raw NEC code from an address and command.
pub fn encode_raw(address: u16, command: u8) -> u32 {
    let (low, high) = split_address(address);
    u32::from_le_bytes([low, high, command, !command])
}

/// Splits an address into the low and high bytes sent on the wire.
///
/// Addresses in the 8-bit range are sent with their inverse as the high byte.
pub fn split_address(address: u16) -> (u8, u8) {
    let [low, high] = address.to_le_bytes();
    if high == 0 { (low, !low) } else { (low, high) }
}

/// Assembles an address from the low and high bytes received on the wire.
///
/// A high byte equal to the inverse of the low byte marks an 8-bit address.
pub fn make_address(low: u8, high: u8) -> u16 {
    if high == !low {
        u16::from(low)
    } else {
        u16::from_le_bytes([low, high])
    }
}
