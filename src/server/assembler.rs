use core::time::Duration;

use log::{debug, warn};

use crate::consts::MAX_FRAME_LEN;
use crate::transport::Transport;
use crate::{ErrorKind, ModbusFrameBuf};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssemblerState {
    /// no bytes received since the last frame
    Idle,
    /// bytes arriving, silence timer running
    Accumulating,
    /// the line has been quiet for the silence interval, frame is complete
    Settled,
    /// frame overflowed, bytes are dropped until the line is quiet
    Discarding,
}

/// Delimits RTU frames by bus silence
///
/// RTU frames carry no length field. Each poll drains every byte the transport holds; the frame is
/// complete once the byte count has not changed for the silence interval.
pub struct FrameAssembler {
    buf: ModbusFrameBuf,
    len: usize,
    state: AssemblerState,
    last_change: Duration,
    silence: Duration,
    discarded: usize,
}

impl FrameAssembler {
    pub fn new(silence: Duration) -> Self {
        Self {
            buf: [0; MAX_FRAME_LEN],
            len: 0,
            state: AssemblerState::Idle,
            last_change: Duration::ZERO,
            silence,
            discarded: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    #[inline]
    pub fn silence(&self) -> Duration {
        self.silence
    }

    /// Poll the transport
    ///
    /// Returns `Ok(0)` while no frame is ready and the frame length once the line has settled.
    /// A settled frame is returned again on every poll until [`reset`](Self::reset) is called.
    ///
    /// Errors:
    ///
    /// * **FrameOverflow** more than 256 bytes arrived without a silence gap. The assembler
    ///   switches to [`AssemblerState::Discarding`] and drops every byte until the line has been
    ///   quiet for the silence interval. The error is returned once per overflowed frame.
    pub fn poll<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        now: Duration,
    ) -> Result<usize, ErrorKind> {
        match self.state {
            AssemblerState::Settled => return Ok(self.len),
            AssemblerState::Discarding => {
                self.poll_discarding(transport, now);
                return Ok(0);
            }
            AssemblerState::Idle | AssemblerState::Accumulating => {}
        }
        let mut received = false;
        while transport.bytes_available() > 0 {
            let Some(byte) = transport.read_byte() else {
                break;
            };
            let Some(slot) = self.buf.get_mut(self.len) else {
                warn!("RTU frame overflow, discarding until the line is quiet");
                self.discarded = self.len + 1 + Self::drain(transport);
                self.len = 0;
                self.state = AssemblerState::Discarding;
                self.last_change = now;
                return Err(ErrorKind::FrameOverflow);
            };
            *slot = byte;
            self.len += 1;
            received = true;
        }
        if received {
            self.state = AssemblerState::Accumulating;
            self.last_change = now;
            return Ok(0);
        }
        if self.state == AssemblerState::Accumulating
            && now.saturating_sub(self.last_change) >= self.silence
        {
            self.state = AssemblerState::Settled;
            return Ok(self.len);
        }
        Ok(0)
    }

    /// Received bytes of the current frame
    pub fn frame(&self) -> &[u8] {
        self.buf.get(..self.len).unwrap_or_default()
    }

    /// Drop the current frame and wait for the next one
    pub fn reset(&mut self) {
        self.len = 0;
        self.discarded = 0;
        self.state = AssemblerState::Idle;
    }

    fn poll_discarding<T: Transport + ?Sized>(&mut self, transport: &mut T, now: Duration) {
        let dropped = Self::drain(transport);
        if dropped > 0 {
            self.discarded = self.discarded.saturating_add(dropped);
            self.last_change = now;
        } else if now.saturating_sub(self.last_change) >= self.silence {
            debug!("RTU overflowed frame dropped, {} bytes", self.discarded);
            self.discarded = 0;
            self.state = AssemblerState::Idle;
        }
    }

    /// Read and drop everything the transport holds, returns the number of bytes dropped
    fn drain<T: Transport + ?Sized>(transport: &mut T) -> usize {
        let mut dropped = 0;
        while transport.bytes_available() > 0 {
            if transport.read_byte().is_none() {
                break;
            }
            dropped += 1;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Line {
        rx: VecDeque<u8>,
    }

    impl Transport for Line {
        fn bytes_available(&mut self) -> usize {
            self.rx.len()
        }
        fn read_byte(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
        fn write_bytes(&mut self, _buf: &[u8]) -> Result<(), ErrorKind> {
            Ok(())
        }
    }

    const SILENCE: Duration = Duration::from_micros(4000);

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_settles_after_silence() {
        let mut line = Line::default();
        let mut asm = FrameAssembler::new(SILENCE);
        assert_eq!(asm.poll(&mut line, ms(0)), Ok(0));
        assert_eq!(asm.state(), AssemblerState::Idle);

        line.rx.extend([0x01, 0x03, 0x00]);
        assert_eq!(asm.poll(&mut line, ms(1)), Ok(0));
        assert_eq!(asm.state(), AssemblerState::Accumulating);
        // more bytes restart the timer
        line.rx.extend([0x00, 0x00, 0x02, 0xC4, 0x0B]);
        assert_eq!(asm.poll(&mut line, ms(4)), Ok(0));
        assert_eq!(asm.poll(&mut line, ms(7)), Ok(0));
        assert_eq!(asm.poll(&mut line, ms(8)), Ok(8));
        assert_eq!(asm.state(), AssemblerState::Settled);
        assert_eq!(asm.frame(), &[0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]);

        // not drained until reset
        line.rx.extend([0x01]);
        assert_eq!(asm.poll(&mut line, ms(9)), Ok(8));
        assert_eq!(line.rx.len(), 1);
        asm.reset();
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert!(asm.frame().is_empty());
    }

    #[test]
    fn test_overflow() {
        let mut line = Line::default();
        let mut asm = FrameAssembler::new(SILENCE);
        line.rx.extend(core::iter::repeat(0xAA).take(256));
        assert_eq!(asm.poll(&mut line, ms(0)), Ok(0));
        assert_eq!(asm.frame().len(), 256);
        line.rx.extend(core::iter::repeat(0xAA).take(10));
        assert_eq!(asm.poll(&mut line, ms(1)), Err(ErrorKind::FrameOverflow));
        assert_eq!(asm.state(), AssemblerState::Discarding);
        assert!(line.rx.is_empty());
        assert!(asm.frame().is_empty());
        // quiet line ends the discard
        assert_eq!(asm.poll(&mut line, ms(100)), Ok(0));
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert_eq!(asm.poll(&mut line, ms(200)), Ok(0));
    }

    #[test]
    fn test_overflow_tail_over_several_polls() {
        let mut line = Line::default();
        let mut asm = FrameAssembler::new(SILENCE);
        line.rx.extend(core::iter::repeat(0x55).take(260));
        assert_eq!(asm.poll(&mut line, ms(0)), Err(ErrorKind::FrameOverflow));
        // the rest of the oversized frame keeps coming in bursts shorter than the silence
        for t in 1..=3 {
            line.rx.extend(core::iter::repeat(0x55).take(40));
            assert_eq!(asm.poll(&mut line, ms(t)), Ok(0));
            assert_eq!(asm.state(), AssemblerState::Discarding);
            assert!(line.rx.is_empty());
        }
        assert_eq!(asm.poll(&mut line, ms(6)), Ok(0));
        assert_eq!(asm.state(), AssemblerState::Discarding);
        assert_eq!(asm.poll(&mut line, ms(7)), Ok(0));
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert!(asm.frame().is_empty());

        // next frame is assembled normally
        line.rx.extend([0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]);
        assert_eq!(asm.poll(&mut line, ms(8)), Ok(0));
        assert_eq!(asm.poll(&mut line, ms(12)), Ok(8));
    }
}
