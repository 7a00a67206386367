use super::context::RegisterBank;
use crate::ErrorKind;

#[cfg(feature = "with_bincode")]
use bincode::{Decode, Encode};
#[cfg(feature = "with_serde")]
use serde::{Deserialize, Serialize};

/// Owned bank of `H` holding registers
///
/// Plain slices and arrays already implement [`RegisterBank`]. This type adds serialization so the
/// application can persist register contents (e.g. to flash) and restore them on boot.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with_bincode", derive(Encode, Decode))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HoldingStorage<const H: usize> {
    #[cfg_attr(feature = "with_serde", serde(with = "serde_arrays"))]
    holdings: [u16; H],
}

impl<const H: usize> HoldingStorage<H> {
    pub const fn new() -> Self {
        Self { holdings: [0; H] }
    }

    pub const fn from_holdings(holdings: [u16; H]) -> Self {
        Self { holdings }
    }

    pub fn holdings(&self) -> &[u16; H] {
        &self.holdings
    }

    pub fn holdings_mut(&mut self) -> &mut [u16; H] {
        &mut self.holdings
    }

    pub fn clear_holdings(&mut self) {
        self.holdings = [0; H];
    }
}

impl<const H: usize> Default for HoldingStorage<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const H: usize> RegisterBank for HoldingStorage<H> {
    #[inline]
    fn holdings_len(&self) -> u16 {
        self.holdings.holdings_len()
    }
    #[inline]
    fn get_holding(&self, reg: u16) -> Result<u16, ErrorKind> {
        self.holdings.get_holding(reg)
    }
    #[inline]
    fn set_holding(&mut self, reg: u16, value: u16) -> Result<(), ErrorKind> {
        self.holdings.set_holding(reg, value)
    }
}
