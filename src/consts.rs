//! MODBUS RTU Constants

// MODBUS Functions
pub const MODBUS_GET_HOLDINGS: u8 = 0x03;
pub const MODBUS_SET_HOLDING: u8 = 0x06;
pub const MODBUS_SET_HOLDINGS_BULK: u8 = 0x10;

// MODBUS Errors
pub const MODBUS_ERROR_ILLEGAL_FUNCTION: u8 = 1;
pub const MODBUS_ERROR_ILLEGAL_DATA_ADDRESS: u8 = 2;
pub const MODBUS_ERROR_ILLEGAL_DATA_VALUE: u8 = 3;
pub const MODBUS_ERROR_SLAVE_DEVICE_FAILURE: u8 = 4;

/// Set in the function byte of an exception response
pub const MODBUS_EXCEPTION_FLAG: u8 = 0x80;

// Register count limits, derived from the 256-byte frame ceiling
pub const MAX_READ_HOLDINGS: u16 = 125;
pub const MAX_WRITE_HOLDINGS: u16 = 123;

// Frame geometry
pub const MAX_FRAME_LEN: usize = 256;
pub const CRC_LEN: usize = 2;
/// unit + function + CRC
pub const MIN_FRAME_LEN: usize = 4;

// Valid slave (unit) addresses. 0 is broadcast and is not served.
pub const MIN_UNIT_ID: u8 = 1;
pub const MAX_UNIT_ID: u8 = 247;

// Line timing
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// start + 8 data + parity + stop
pub const BITS_PER_CHAR: u32 = 11;
/// Above this baud rate the inter-frame silence is fixed
pub const FIXED_SILENCE_BAUD: u32 = 19_200;
pub const FIXED_SILENCE_US: u64 = 1750;
