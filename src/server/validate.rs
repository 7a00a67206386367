use crate::consts::{MAX_READ_HOLDINGS, MAX_WRITE_HOLDINGS};
use crate::frame::{FunctionCode, Request};
use crate::ExceptionCode;

/// Validated register operation, safe to apply to a bank of the size it was checked against
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Operation<'a> {
    ReadHoldings { reg: u16, count: u16 },
    WriteHolding { reg: u16, value: u16 },
    /// `values` holds exactly `2 * count` bytes
    WriteHoldings { reg: u16, count: u16, values: &'a [u8] },
}

impl Operation<'_> {
    pub fn function(&self) -> FunctionCode {
        match self {
            Operation::ReadHoldings { .. } => FunctionCode::ReadHoldingRegisters,
            Operation::WriteHolding { .. } => FunctionCode::WriteSingleRegister,
            Operation::WriteHoldings { .. } => FunctionCode::WriteMultipleRegisters,
        }
    }

    /// Registers the operation modifies, `None` for reads
    pub fn changes(&self) -> Option<Changes> {
        match *self {
            Operation::ReadHoldings { .. } => None,
            Operation::WriteHolding { reg, .. } => Some(Changes { reg, count: 1 }),
            Operation::WriteHoldings { reg, count, .. } => Some(Changes { reg, count }),
        }
    }
}

/// Range of holding registers changed by a write
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Changes {
    pub reg: u16,
    pub count: u16,
}

/// Check a request against the register bank size
///
/// Rules, in order:
///
/// * function must be read-holdings, write-single or write-multiple: **IllegalFunction**
/// * write-single target must be below `regs_size`: **IllegalDataAddress**
/// * count must be 1..=125 for reads, 1..=123 for writes, a write-multiple byte count must match
///   the count and the data received: **IllegalDataValue**
/// * `reg + count` must not exceed `regs_size`: **IllegalDataAddress**
///
/// A supported request too short to hold its fields is an **IllegalDataValue**.
pub fn validate<'a>(request: &Request<'a>, regs_size: u16) -> Result<Operation<'a>, ExceptionCode> {
    let func = request
        .function()
        .map_err(|_| ExceptionCode::IllegalFunction)?;
    let reg = request.reg().ok_or(ExceptionCode::IllegalDataValue)?;
    match func {
        FunctionCode::WriteSingleRegister => {
            if reg >= regs_size {
                return Err(ExceptionCode::IllegalDataAddress);
            }
            let value = request.value().ok_or(ExceptionCode::IllegalDataValue)?;
            Ok(Operation::WriteHolding { reg, value })
        }
        FunctionCode::ReadHoldingRegisters => {
            let count = checked_count(request, MAX_READ_HOLDINGS)?;
            check_bounds(reg, count, regs_size)?;
            Ok(Operation::ReadHoldings { reg, count })
        }
        FunctionCode::WriteMultipleRegisters => {
            let count = checked_count(request, MAX_WRITE_HOLDINGS)?;
            if request.byte_count().map(u16::from) != Some(count << 1) {
                return Err(ExceptionCode::IllegalDataValue);
            }
            let values = request.values().ok_or(ExceptionCode::IllegalDataValue)?;
            check_bounds(reg, count, regs_size)?;
            Ok(Operation::WriteHoldings { reg, count, values })
        }
    }
}

fn checked_count(request: &Request<'_>, max: u16) -> Result<u16, ExceptionCode> {
    match request.count() {
        Some(count) if (1..=max).contains(&count) => Ok(count),
        _ => Err(ExceptionCode::IllegalDataValue),
    }
}

#[inline]
fn check_bounds(reg: u16, count: u16, regs_size: u16) -> Result<(), ExceptionCode> {
    if u32::from(reg) + u32::from(count) > u32::from(regs_size) {
        Err(ExceptionCode::IllegalDataAddress)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc16_bytes;

    fn validate_frame(body: &[u8], regs_size: u16) -> Result<Operation<'static>, ExceptionCode> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc16_bytes(body, body.len()));
        let frame: &'static [u8] = Vec::leak(frame);
        let request = Request::parse(frame, body[0]).unwrap();
        validate(&request, regs_size)
    }

    #[test]
    fn test_unsupported_function() {
        for func in [0x01, 0x02, 0x04, 0x05, 0x0F, 0x17, 0x2B, 0x7F] {
            assert_eq!(
                validate_frame(&[0x01, func, 0x00, 0x00, 0x00, 0x01], 10),
                Err(ExceptionCode::IllegalFunction)
            );
        }
        // function check comes before any payload decoding
        assert_eq!(
            validate_frame(&[0x01, 0x2B], 10),
            Err(ExceptionCode::IllegalFunction)
        );
    }

    #[test]
    fn test_read_bounds() {
        assert_eq!(
            validate_frame(&[0x01, 0x03, 0x00, 0x08, 0x00, 0x02], 10),
            Ok(Operation::ReadHoldings { reg: 8, count: 2 })
        );
        assert_eq!(
            validate_frame(&[0x01, 0x03, 0x00, 0x09, 0x00, 0x02], 10),
            Err(ExceptionCode::IllegalDataAddress)
        );
        assert_eq!(
            validate_frame(&[0x01, 0x03, 0xFF, 0xFF, 0x00, 0x7D], 10),
            Err(ExceptionCode::IllegalDataAddress)
        );
        assert_eq!(
            validate_frame(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x00], 10),
            Err(ExceptionCode::IllegalDataValue)
        );
        // count is checked before the address range
        assert_eq!(
            validate_frame(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x7E], 10),
            Err(ExceptionCode::IllegalDataValue)
        );
        assert_eq!(
            validate_frame(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x7D], 125),
            Ok(Operation::ReadHoldings { reg: 0, count: 125 })
        );
        assert_eq!(
            validate_frame(&[0x01, 0x03, 0x00, 0x00], 10),
            Err(ExceptionCode::IllegalDataValue)
        );
    }

    #[test]
    fn test_write_single() {
        assert_eq!(
            validate_frame(&[0x01, 0x06, 0x00, 0x09, 0xAB, 0xCD], 10),
            Ok(Operation::WriteHolding {
                reg: 9,
                value: 0xABCD
            })
        );
        assert_eq!(
            validate_frame(&[0x01, 0x06, 0x00, 0x0A, 0x00, 0x01], 10),
            Err(ExceptionCode::IllegalDataAddress)
        );
        assert_eq!(
            validate_frame(&[0x01, 0x06, 0x00, 0x01], 10),
            Err(ExceptionCode::IllegalDataValue)
        );
    }

    #[test]
    fn test_write_multiple() {
        assert_eq!(
            validate_frame(&[0x01, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0, 1, 0, 2], 10),
            Ok(Operation::WriteHoldings {
                reg: 1,
                count: 2,
                values: &[0, 1, 0, 2]
            })
        );
        assert_eq!(
            validate_frame(&[0x01, 0x10, 0x00, 0x00, 0x00, 0x7C, 0x00], 1000),
            Err(ExceptionCode::IllegalDataValue)
        );
        // byte count disagrees with count
        assert_eq!(
            validate_frame(&[0x01, 0x10, 0x00, 0x01, 0x00, 0x02, 0x02, 0, 1], 10),
            Err(ExceptionCode::IllegalDataValue)
        );
        // data shorter than byte count
        assert_eq!(
            validate_frame(&[0x01, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0, 1], 10),
            Err(ExceptionCode::IllegalDataValue)
        );
        assert_eq!(
            validate_frame(&[0x01, 0x10, 0x00, 0x09, 0x00, 0x02, 0x04, 0, 1, 0, 2], 10),
            Err(ExceptionCode::IllegalDataAddress)
        );
    }
}
