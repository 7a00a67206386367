use crate::consts::{
    MODBUS_ERROR_ILLEGAL_DATA_ADDRESS, MODBUS_ERROR_ILLEGAL_DATA_VALUE,
    MODBUS_ERROR_ILLEGAL_FUNCTION, MODBUS_ERROR_SLAVE_DEVICE_FAILURE,
};

#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// output buffer exhausted
    OOB,
    /// register index outside of the bank
    OOBContext,
    FrameBroken,
    FrameCRCError,
    FrameOverflow,
    UnitMismatch,
    InvalidConfig,
    TransportError,
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    SlaveDeviceFailure,
}

impl ErrorKind {
    /// Modbus exception carried by the error, if any
    pub fn exception_code(self) -> Option<ExceptionCode> {
        match self {
            ErrorKind::IllegalFunction => Some(ExceptionCode::IllegalFunction),
            ErrorKind::IllegalDataAddress => Some(ExceptionCode::IllegalDataAddress),
            ErrorKind::IllegalDataValue => Some(ExceptionCode::IllegalDataValue),
            ErrorKind::SlaveDeviceFailure => Some(ExceptionCode::ServerFailure),
            _ => None,
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &str = match self {
            ErrorKind::OOB => "OUT OF BUFFER",
            ErrorKind::OOBContext => "OUT OF BUFFER IN REGISTER BANK",
            ErrorKind::FrameBroken => "FRAME BROKEN",
            ErrorKind::FrameCRCError => "FRAME CRC ERROR",
            ErrorKind::FrameOverflow => "FRAME EXCEEDS 256 BYTES",
            ErrorKind::UnitMismatch => "FRAME ADDRESSED TO ANOTHER UNIT",
            ErrorKind::InvalidConfig => "INVALID SLAVE CONFIGURATION",
            ErrorKind::TransportError => "SERIAL TRANSPORT ERROR",
            ErrorKind::IllegalFunction => "MODBUS ERROR CODE 01 - ILLEGAL FUNCTION",
            ErrorKind::IllegalDataAddress => "MODBUS ERROR CODE 02 - ILLEGAL DATA ADDRESS",
            ErrorKind::IllegalDataValue => "MODBUS ERROR CODE 03 - ILLEGAL DATA VALUE",
            ErrorKind::SlaveDeviceFailure => "MODBUS ERROR CODE 04 - SLAVE DEVICE FAILURE",
        };
        write!(f, "{}", msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ErrorKind {}

/// Exception codes the slave reports back to the master
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = MODBUS_ERROR_ILLEGAL_FUNCTION,
    IllegalDataAddress = MODBUS_ERROR_ILLEGAL_DATA_ADDRESS,
    IllegalDataValue = MODBUS_ERROR_ILLEGAL_DATA_VALUE,
    ServerFailure = MODBUS_ERROR_SLAVE_DEVICE_FAILURE,
}

impl ExceptionCode {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            MODBUS_ERROR_ILLEGAL_FUNCTION => Some(ExceptionCode::IllegalFunction),
            MODBUS_ERROR_ILLEGAL_DATA_ADDRESS => Some(ExceptionCode::IllegalDataAddress),
            MODBUS_ERROR_ILLEGAL_DATA_VALUE => Some(ExceptionCode::IllegalDataValue),
            MODBUS_ERROR_SLAVE_DEVICE_FAILURE => Some(ExceptionCode::ServerFailure),
            _ => None,
        }
    }
}

impl From<ExceptionCode> for ErrorKind {
    fn from(code: ExceptionCode) -> Self {
        match code {
            ExceptionCode::IllegalFunction => ErrorKind::IllegalFunction,
            ExceptionCode::IllegalDataAddress => ErrorKind::IllegalDataAddress,
            ExceptionCode::IllegalDataValue => ErrorKind::IllegalDataValue,
            ExceptionCode::ServerFailure => ErrorKind::SlaveDeviceFailure,
        }
    }
}
