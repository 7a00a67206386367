//! Serial line abstraction the engine is driven through
//!
//! UART setup and the concrete transceiver pin belong to the board support code. The engine only
//! sees the operations below.

use core::time::Duration;

use crate::ErrorKind;

/// Byte-oriented, half-duplex serial line
pub trait Transport {
    /// Bytes waiting in the receive buffer
    fn bytes_available(&mut self) -> usize;

    /// Take one received byte, `None` if the receive buffer is empty
    fn read_byte(&mut self) -> Option<u8>;

    /// Queue bytes for transmission
    fn write_bytes(&mut self, buf: &[u8]) -> Result<(), ErrorKind>;

    /// Block until the last queued byte has left the shift register
    ///
    /// Must be bounded: the worst case is one frame at the configured baud rate.
    fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }

    /// Drive the RS-485 transceiver into transmit mode
    fn assert_tx_enable(&mut self) {}

    /// Return the RS-485 transceiver to receive mode
    fn deassert_tx_enable(&mut self) {}

    /// Busy-wait, used for the transmit turnaround
    fn delay(&mut self, _duration: Duration) {}
}

/// Monotonic time source for the inter-frame silence timer
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin, never decreasing
    fn now(&self) -> Duration;
}

/// [`Clock`] backed by [`std::time::Instant`]
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Send a complete frame
///
/// In half-duplex mode transmit-enable is asserted for the turnaround, the frame is written,
/// the line is flushed and transmit-enable is released. It is released on write errors too, a
/// slave stuck in transmit mode jams the bus.
pub fn transmit<T: Transport + ?Sized>(
    transport: &mut T,
    frame: &[u8],
    half_duplex: bool,
    turnaround: Duration,
) -> Result<(), ErrorKind> {
    if half_duplex {
        transport.assert_tx_enable();
        transport.delay(turnaround);
    }
    let result = transport
        .write_bytes(frame)
        .and_then(|()| transport.flush());
    if half_duplex {
        transport.deassert_tx_enable();
    }
    result
}
