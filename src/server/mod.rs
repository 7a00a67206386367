pub mod assembler;
pub mod context;
pub mod storage;
pub mod validate;

use log::{debug, trace, warn};

use crate::config::SlaveConfig;
use crate::consts::MAX_FRAME_LEN;
use crate::frame::{FunctionCode, Request, Response};
use crate::transport::{transmit, Clock, Transport};
use crate::{ErrorKind, ExceptionCode, VectorTrait};

use assembler::FrameAssembler;
use context::RegisterBank;
pub use validate::{validate, Changes, Operation};

#[cfg(feature = "with_bincode")]
use bincode::{Decode, Encode};
#[cfg(feature = "with_serde")]
use serde::{Deserialize, Serialize};

/// Apply a validated operation to the bank and build the response frame into `out`
///
/// Returns the length of the CRC-stamped response. Writes are all-or-nothing, the bank range is
/// checked before the first register changes.
///
/// Errors here happen only if the bank is smaller than the size the operation was validated
/// against (**OOBContext**), or the bank refuses a value, or `out` is too small (**OOB**).
pub fn dispatch<B, V>(
    op: Operation<'_>,
    regs: &mut B,
    unit_id: u8,
    out: &mut V,
) -> Result<usize, ErrorKind>
where
    B: RegisterBank + ?Sized,
    V: VectorTrait<u8>,
{
    let mut response = Response::new(unit_id, out);
    match op {
        Operation::ReadHoldings { reg, count } => {
            regs.check_range(reg, count)?;
            response.read_header(count)?;
            for i in reg..reg + count {
                response.push_register(regs.get_holding(i)?)?;
            }
        }
        Operation::WriteHolding { reg, value } => {
            regs.set_holding(reg, value)?;
            response.echo(FunctionCode::WriteSingleRegister, reg, value)?;
        }
        Operation::WriteHoldings { reg, count, values } => {
            regs.set_holdings_from_u8(reg, values)?;
            response.echo(FunctionCode::WriteMultipleRegisters, reg, count)?;
        }
    }
    response.finalize()
}

/// Result of one [`RtuSlave::service`] call
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// no complete frame on the line yet
    NoActivity,
    /// request served, response of this many bytes sent
    FrameProcessed(usize),
    /// exception response sent
    Exception(ExceptionCode),
    /// frame dropped without reply: CRC error, foreign unit, overflow or transport failure
    NoReply(ErrorKind),
}

/// Serial line diagnostic counters
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with_bincode", derive(Encode, Decode))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Counters {
    /// frames seen on the bus
    pub bus_messages: u32,
    pub crc_errors: u32,
    /// frames addressed to this slave
    pub slave_messages: u32,
    pub exceptions: u32,
    pub overruns: u32,
    /// addressed frames which got no reply
    pub no_responses: u32,
}

/// Modbus RTU slave engine
///
/// Owns the transport, the clock and all protocol state. The application calls
/// [`service`](Self::service) from its main loop, lending the register bank for the call.
///
/// ```
/// use core::time::Duration;
/// use rtuslave::transport::{Clock, Transport};
/// use rtuslave::{ErrorKind, Outcome, RtuSlave, SlaveConfig};
///
/// struct Uart;
///
/// impl Transport for Uart {
///     fn bytes_available(&mut self) -> usize { 0 }
///     fn read_byte(&mut self) -> Option<u8> { None }
///     fn write_bytes(&mut self, _buf: &[u8]) -> Result<(), ErrorKind> { Ok(()) }
/// }
///
/// struct Ticks;
///
/// impl Clock for Ticks {
///     fn now(&self) -> Duration { Duration::ZERO }
/// }
///
/// let mut regs = [0u16; 10];
/// let mut slave = RtuSlave::new(SlaveConfig::new(1, 10), Uart, Ticks).unwrap();
/// assert_eq!(slave.service(&mut regs), Outcome::NoActivity);
/// ```
pub struct RtuSlave<T: Transport, C: Clock> {
    config: SlaveConfig,
    transport: T,
    clock: C,
    assembler: FrameAssembler,
    response: heapless::Vec<u8, MAX_FRAME_LEN>,
    counters: Counters,
    last_changes: Option<Changes>,
}

impl<T: Transport, C: Clock> RtuSlave<T, C> {
    pub fn new(config: SlaveConfig, transport: T, clock: C) -> Result<Self, ErrorKind> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            clock,
            assembler: FrameAssembler::new(config.silence_interval()),
            response: heapless::Vec::new(),
            counters: Counters::default(),
            last_changes: None,
        })
    }

    #[inline]
    pub fn config(&self) -> &SlaveConfig {
        &self.config
    }

    #[inline]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = Counters::default();
    }

    /// Restore counters, e.g. saved before a reboot. Counters wrap around at `u32::MAX`.
    pub fn set_counters(&mut self, counters: Counters) {
        self.counters = counters;
    }

    /// Registers changed by the last successful write
    #[inline]
    pub fn last_changes(&self) -> Option<Changes> {
        self.last_changes
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[inline]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.clock)
    }

    /// Poll the line and serve at most one request
    ///
    /// Never blocks waiting for bytes. The only blocking part is the transmission of a reply.
    pub fn service<B: RegisterBank + ?Sized>(&mut self, regs: &mut B) -> Outcome {
        let now = self.clock.now();
        match self.assembler.poll(&mut self.transport, now) {
            Ok(0) => Outcome::NoActivity,
            Ok(_) => {
                let outcome = self.process(regs);
                self.assembler.reset();
                outcome
            }
            Err(e) => {
                self.counters.overruns = self.counters.overruns.wrapping_add(1);
                Outcome::NoReply(e)
            }
        }
    }

    fn process<B: RegisterBank + ?Sized>(&mut self, regs: &mut B) -> Outcome {
        self.counters.bus_messages = self.counters.bus_messages.wrapping_add(1);
        let unit_id = self.config.unit_id;
        let request = match Request::parse(self.assembler.frame(), unit_id) {
            Ok(request) => request,
            Err(e) => {
                match e {
                    ErrorKind::FrameCRCError => {
                        self.counters.crc_errors = self.counters.crc_errors.wrapping_add(1);
                        debug!("RTU frame dropped: {}", e);
                    }
                    _ => trace!("RTU frame dropped: {}", e),
                }
                return Outcome::NoReply(e);
            }
        };
        self.counters.slave_messages = self.counters.slave_messages.wrapping_add(1);
        let regs_size = self.config.holdings.min(regs.holdings_len());
        let result = validate(&request, regs_size).and_then(|op| {
            let len = dispatch(op, regs, unit_id, &mut self.response).map_err(|e| {
                warn!("function {:#04x} failed after validation: {}", request.func, e);
                ExceptionCode::ServerFailure
            })?;
            self.last_changes = op.changes().or(self.last_changes);
            Ok(len)
        });
        let outcome = match result {
            Ok(len) => Outcome::FrameProcessed(len),
            Err(code) => {
                debug!("function {:#04x} exception {}", request.func, code.code());
                self.counters.exceptions = self.counters.exceptions.wrapping_add(1);
                let mut response = Response::new(unit_id, &mut self.response);
                if let Err(e) = response
                    .exception(request.func, code)
                    .and_then(|()| response.finalize())
                {
                    self.counters.no_responses = self.counters.no_responses.wrapping_add(1);
                    return Outcome::NoReply(e);
                }
                Outcome::Exception(code)
            }
        };
        if let Err(e) = transmit(
            &mut self.transport,
            self.response.as_slice(),
            self.config.half_duplex,
            self.config.turnaround(),
        ) {
            warn!("RTU reply not sent: {}", e);
            self.counters.no_responses = self.counters.no_responses.wrapping_add(1);
            return Outcome::NoReply(ErrorKind::TransportError);
        }
        outcome
    }
}
