#![ doc = include_str!( concat!( env!( "CARGO_MANIFEST_DIR" ), "/", "README.md" ) ) ]
#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod config;
pub mod consts;
pub mod frame;
pub mod server;
pub mod transport;

mod vector;
pub use vector::VectorTrait;

mod error;
pub use error::{ErrorKind, ExceptionCode};

pub use config::SlaveConfig;
pub use server::{Outcome, RtuSlave};


/// Standard Modbus RTU frame buffer
///
/// As max length of a Modbus RTU frame is 256 bytes (253 PDU bytes, unit id and two CRC bytes),
/// the frame buffer is a fixed [u8; 256] array.
pub type ModbusFrameBuf = [u8; consts::MAX_FRAME_LEN];

/// Calculate Modbus CRC-16 (polynomial 0xA001, reflected) over the first `data_length` bytes of
/// the frame
///
/// The returned value is the raw accumulator. On the wire it is sent low byte first, use
/// [`crc16_bytes`] to get the transmitted pair.
pub fn calc_crc16(frame: &[u8], data_length: usize) -> u16 {
    let mut crc: u16 = 0xffff;
    for i in frame.iter().take(data_length) {
        crc ^= u16::from(*i);
        for _ in 0..8 {
            if (crc & 0x0001) == 0 {
                crc >>= 1;
            } else {
                crc >>= 1;
                crc ^= 0xA001;
            }
        }
    }
    crc
}

/// CRC bytes in wire order (low, high)
#[inline]
pub fn crc16_bytes(frame: &[u8], data_length: usize) -> [u8; 2] {
    calc_crc16(frame, data_length).to_le_bytes()
}

/// Verify the trailing CRC of a complete frame
///
/// Frames shorter than the CRC itself never verify.
pub fn check_crc16(frame: &[u8]) -> bool {
    let Some(data_length) = frame.len().checked_sub(consts::CRC_LEN) else {
        return false;
    };
    frame.get(data_length..) == Some(&crc16_bytes(frame, data_length)[..])
}
