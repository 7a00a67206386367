//! Slave identity and line timing

use core::time::Duration;

use crate::consts::{
    BITS_PER_CHAR, DEFAULT_BAUD_RATE, FIXED_SILENCE_BAUD, FIXED_SILENCE_US, MAX_UNIT_ID,
    MIN_UNIT_ID,
};
use crate::ErrorKind;

#[cfg(feature = "with_bincode")]
use bincode::{Decode, Encode};
#[cfg(feature = "with_serde")]
use serde::{Deserialize, Serialize};

/// Per-device configuration, set once at startup
///
/// ```
/// use rtuslave::SlaveConfig;
///
/// let config = SlaveConfig::new(1, 10)
///     .with_baud_rate(19_200)
///     .with_half_duplex(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with_bincode", derive(Encode, Decode))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveConfig {
    /// slave address, 1..=247
    pub unit_id: u8,
    /// number of holding registers exposed to the master
    pub holdings: u16,
    /// line speed, used to derive the inter-frame silence
    pub baud_rate: u32,
    /// drive the RS-485 transmit-enable signal around each reply
    pub half_duplex: bool,
}

impl SlaveConfig {
    pub const fn new(unit_id: u8, holdings: u16) -> Self {
        Self {
            unit_id,
            holdings,
            baud_rate: DEFAULT_BAUD_RATE,
            half_duplex: false,
        }
    }

    pub const fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub const fn with_half_duplex(mut self, half_duplex: bool) -> Self {
        self.half_duplex = half_duplex;
        self
    }

    pub fn validate(&self) -> Result<(), ErrorKind> {
        if !(MIN_UNIT_ID..=MAX_UNIT_ID).contains(&self.unit_id) || self.baud_rate == 0 {
            return Err(ErrorKind::InvalidConfig);
        }
        Ok(())
    }

    /// Time to transmit one 11-bit character
    pub fn char_time(&self) -> Duration {
        let baud = u64::from(self.baud_rate.max(1));
        Duration::from_micros(u64::from(BITS_PER_CHAR) * 1_000_000 / baud)
    }

    /// Bus silence that delimits a frame: 3.5 character times, fixed at 1.75 ms above 19200 baud
    ///
    /// The assembler only observes the line when polled, so the effective gap is this value plus
    /// up to one poll period. At high baud rates with a slow poll loop frames sent back to back
    /// may merge.
    pub fn silence_interval(&self) -> Duration {
        if self.baud_rate > FIXED_SILENCE_BAUD {
            Duration::from_micros(FIXED_SILENCE_US)
        } else {
            self.char_time() * 7 / 2
        }
    }

    /// Delay between asserting transmit-enable and the first reply byte
    pub fn turnaround(&self) -> Duration {
        self.silence_interval()
    }
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self::new(MIN_UNIT_ID, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_interval() {
        let config = SlaveConfig::new(1, 10);
        // 11 bits at 9600 baud = 1145 us per char
        assert_eq!(config.char_time(), Duration::from_micros(1145));
        assert_eq!(config.silence_interval(), Duration::from_nanos(4_007_500));
        let fast = config.with_baud_rate(115_200);
        assert_eq!(fast.silence_interval(), Duration::from_micros(1750));
        let edge = config.with_baud_rate(19_200);
        assert_eq!(edge.silence_interval(), Duration::from_nanos(2_002_000));
    }

    #[test]
    fn test_validate() {
        assert!(SlaveConfig::new(1, 10).validate().is_ok());
        assert!(SlaveConfig::new(247, 0).validate().is_ok());
        assert_eq!(
            SlaveConfig::new(0, 10).validate(),
            Err(ErrorKind::InvalidConfig)
        );
        assert_eq!(
            SlaveConfig::new(248, 10).validate(),
            Err(ErrorKind::InvalidConfig)
        );
        assert_eq!(
            SlaveConfig::new(1, 10).with_baud_rate(0).validate(),
            Err(ErrorKind::InvalidConfig)
        );
    }
}
