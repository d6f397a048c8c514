//! CRC-16/CCITT as used by the CRC-16 encapsulation command class.
//!
//! Polynomial 0x1021, processed MSB first with no final XOR. The checksum
//! covers the command class byte 0x56 as well, so `crc16` starts from the
//! state reached after feeding 0x56 into the nominal 0x1D0F seed.

const POLY: u16 = 0x1021;

/// Nominal seed.
pub const CRC16_SEED: u16 = 0x1D0F;

/// State after `CRC16_SEED` has absorbed the 0x56 class byte.
pub const CRC16_ENCAP_INIT: u16 = 0xF6AF;

/// Continue a CRC from `init` over `data`.
#[must_use]
pub fn crc16_with(init: u16, data: &[u8]) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Checksum of an encapsulated frame body (everything after the 0x56 byte,
/// before the two checksum bytes).
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    crc16_with(CRC16_ENCAP_INIT, data)
}
