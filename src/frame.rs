//! RTU frame codec
//!
//! Requests are decoded through named accessors over the received bytes. Responses are always
//! built from scratch and CRC-stamped, request bytes are never forwarded.

use crate::consts::{
    CRC_LEN, MAX_FRAME_LEN, MIN_FRAME_LEN, MODBUS_EXCEPTION_FLAG, MODBUS_GET_HOLDINGS,
    MODBUS_SET_HOLDING, MODBUS_SET_HOLDINGS_BULK,
};
use crate::{crc16_bytes, ErrorKind, ExceptionCode, VectorTrait};

/// Supported Modbus functions
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FunctionCode {
    ReadHoldingRegisters = MODBUS_GET_HOLDINGS,
    WriteSingleRegister = MODBUS_SET_HOLDING,
    WriteMultipleRegisters = MODBUS_SET_HOLDINGS_BULK,
}

impl FunctionCode {
    #[inline]
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FunctionCode {
    type Error = ErrorKind;

    fn try_from(func: u8) -> Result<Self, Self::Error> {
        match func {
            MODBUS_GET_HOLDINGS => Ok(FunctionCode::ReadHoldingRegisters),
            MODBUS_SET_HOLDING => Ok(FunctionCode::WriteSingleRegister),
            MODBUS_SET_HOLDINGS_BULK => Ok(FunctionCode::WriteMultipleRegisters),
            _ => Err(ErrorKind::IllegalFunction),
        }
    }
}

/// Decoded view over a received frame which passed the CRC and unit checks
///
/// Field accessors return `None` when the frame is too short to hold the field.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Request<'a> {
    pub unit_id: u8,
    /// raw function byte, may be unsupported
    pub func: u8,
    /// payload between the function byte and the CRC
    data: &'a [u8],
}

impl<'a> Request<'a> {
    /// Parse a raw frame
    ///
    /// Strictly in order: length, CRC, unit id. Errors mean the frame must be dropped without
    /// a reply:
    ///
    /// * **FrameBroken** shorter than unit + function + CRC
    /// * **FrameOverflow** longer than 256 bytes
    /// * **FrameCRCError** checksum mismatch
    /// * **UnitMismatch** frame is addressed to another slave
    pub fn parse(raw: &'a [u8], unit_id: u8) -> Result<Self, ErrorKind> {
        if raw.len() < MIN_FRAME_LEN {
            return Err(ErrorKind::FrameBroken);
        }
        if raw.len() > MAX_FRAME_LEN {
            return Err(ErrorKind::FrameOverflow);
        }
        let (body, crc) = raw.split_at(raw.len() - CRC_LEN);
        if crc != &crc16_bytes(body, body.len())[..] {
            return Err(ErrorKind::FrameCRCError);
        }
        let [unit, func, data @ ..] = body else {
            return Err(ErrorKind::FrameBroken);
        };
        if *unit != unit_id {
            return Err(ErrorKind::UnitMismatch);
        }
        Ok(Self {
            unit_id: *unit,
            func: *func,
            data,
        })
    }

    pub fn function(&self) -> Result<FunctionCode, ErrorKind> {
        FunctionCode::try_from(self.func)
    }

    /// Payload bytes (without unit, function and CRC)
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn word(&self, pos: usize) -> Option<u16> {
        self.data
            .get(pos..pos + 2)
            .and_then(|val| val.try_into().ok())
            .map(u16::from_be_bytes)
    }

    /// Starting register (target register for write-single)
    pub fn reg(&self) -> Option<u16> {
        self.word(0)
    }

    /// Register count of read / write-multiple
    pub fn count(&self) -> Option<u16> {
        self.word(2)
    }

    /// Value of write-single
    pub fn value(&self) -> Option<u16> {
        self.word(2)
    }

    /// Byte count field of write-multiple
    pub fn byte_count(&self) -> Option<u8> {
        self.data.get(4).copied()
    }

    /// Register data of write-multiple, exactly `byte_count` bytes
    pub fn values(&self) -> Option<&'a [u8]> {
        let bytes = usize::from(self.byte_count()?);
        self.data.get(5..5 + bytes)
    }
}

/// Response frame builder
///
/// ```
/// use rtuslave::frame::Response;
/// use rtuslave::ExceptionCode;
///
/// let mut buf: heapless::Vec<u8, 256> = heapless::Vec::new();
/// let mut response = Response::new(1, &mut buf);
/// response.exception(0x05, ExceptionCode::IllegalFunction).unwrap();
/// let len = response.finalize().unwrap();
/// assert_eq!(&buf[..len], &[0x01, 0x85, 0x01, 0x83, 0x50]);
/// ```
pub struct Response<'a, V: VectorTrait<u8>> {
    unit_id: u8,
    out: &'a mut V,
}

impl<'a, V: VectorTrait<u8>> Response<'a, V> {
    pub fn new(unit_id: u8, out: &'a mut V) -> Self {
        out.clear();
        Self { unit_id, out }
    }

    /// unit, function, byte count. Register values are appended with
    /// [`push_register`](Self::push_register).
    pub fn read_header(&mut self, count: u16) -> Result<(), ErrorKind> {
        let bytes = u8::try_from(count << 1).map_err(|_| ErrorKind::OOB)?;
        self.out
            .extend(&[self.unit_id, FunctionCode::ReadHoldingRegisters.value(), bytes])
    }

    /// Big-endian register value
    #[inline]
    pub fn push_register(&mut self, value: u16) -> Result<(), ErrorKind> {
        self.out.extend(&value.to_be_bytes())
    }

    /// unit, function, register, count or value
    pub fn echo(&mut self, func: FunctionCode, reg: u16, word: u16) -> Result<(), ErrorKind> {
        let [reg_hi, reg_lo] = reg.to_be_bytes();
        let [word_hi, word_lo] = word.to_be_bytes();
        self.out.extend(&[
            self.unit_id,
            func.value(),
            reg_hi,
            reg_lo,
            word_hi,
            word_lo,
        ])
    }

    /// unit, function | 0x80, exception code
    pub fn exception(&mut self, func: u8, code: ExceptionCode) -> Result<(), ErrorKind> {
        self.out
            .extend(&[self.unit_id, func | MODBUS_EXCEPTION_FLAG, code.code()])
    }

    /// Append the CRC, returns the complete frame length
    pub fn finalize(self) -> Result<usize, ErrorKind> {
        let len = self.out.len();
        if len + CRC_LEN > MAX_FRAME_LEN {
            return Err(ErrorKind::OOB);
        }
        let crc = crc16_bytes(self.out.as_slice(), len);
        self.out.extend(&crc)?;
        Ok(self.out.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_crc(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc16_bytes(body, body.len()));
        frame
    }

    #[test]
    fn test_parse_read_request() {
        let raw = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B];
        let request = Request::parse(&raw, 1).unwrap();
        assert_eq!(request.unit_id, 1);
        assert_eq!(request.function(), Ok(FunctionCode::ReadHoldingRegisters));
        assert_eq!(request.reg(), Some(0));
        assert_eq!(request.count(), Some(2));
        assert_eq!(request.byte_count(), None);
    }

    #[test]
    fn test_parse_drops() {
        let raw = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B];
        assert_eq!(Request::parse(&raw, 2), Err(ErrorKind::UnitMismatch));
        let mut broken = raw;
        broken[7] ^= 0x01;
        assert_eq!(Request::parse(&broken, 1), Err(ErrorKind::FrameCRCError));
        assert_eq!(Request::parse(&raw[..3], 1), Err(ErrorKind::FrameBroken));
        assert_eq!(Request::parse(&[0; 257], 1), Err(ErrorKind::FrameOverflow));
    }

    #[test]
    fn test_crc_checked_before_unit() {
        // a corrupted frame for another unit is a CRC error, not a foreign frame
        let mut raw = with_crc(&[0x02, 0x03, 0x00, 0x00, 0x00, 0x01]);
        raw[3] = 0xff;
        assert_eq!(Request::parse(&raw, 1), Err(ErrorKind::FrameCRCError));
    }

    #[test]
    fn test_write_multiple_fields() {
        let raw = with_crc(&[0x11, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]);
        let request = Request::parse(&raw, 0x11).unwrap();
        assert_eq!(request.reg(), Some(1));
        assert_eq!(request.count(), Some(2));
        assert_eq!(request.byte_count(), Some(4));
        assert_eq!(request.values(), Some(&[0x00, 0x0A, 0x01, 0x02][..]));
        // byte count claims more than was received
        let raw = with_crc(&[0x11, 0x10, 0x00, 0x01, 0x00, 0x02, 0x06, 0x00, 0x0A]);
        let request = Request::parse(&raw, 0x11).unwrap();
        assert_eq!(request.values(), None);
    }

    #[test]
    fn test_build_frames() {
        let mut buf = Vec::new();
        let mut response = Response::new(0x11, &mut buf);
        response.echo(FunctionCode::WriteSingleRegister, 1, 3).unwrap();
        assert_eq!(response.finalize(), Ok(8));
        assert_eq!(buf, [0x11, 0x06, 0x00, 0x01, 0x00, 0x03, 0x9A, 0x9B]);

        let mut response = Response::new(0x01, &mut buf);
        response.read_header(2).unwrap();
        response.push_register(11).unwrap();
        response.push_register(22).unwrap();
        response.finalize().unwrap();
        assert_eq!(&buf[..7], &[0x01, 0x03, 0x04, 0x00, 0x0B, 0x00, 0x16]);
        assert!(crate::check_crc16(&buf));
    }
}
