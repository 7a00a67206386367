use crate::{ErrorKind, VectorTrait};
use ieee754::Ieee754;

/// Holding register bank the engine reads and writes
///
/// The bank is owned by the application and lent to the engine for one request cycle. Only the
/// three required methods touch storage, the rest are built on them. Bulk operations check the
/// whole range before the first register is touched, so a failed write leaves the bank as it was.
#[allow(clippy::module_name_repetitions)]
pub trait RegisterBank {
    /// Number of registers, indices are `0..holdings_len()`
    fn holdings_len(&self) -> u16;

    /// Get a single holding
    fn get_holding(&self, reg: u16) -> Result<u16, ErrorKind>;

    /// Set a single holding
    fn set_holding(&mut self, reg: u16, value: u16) -> Result<(), ErrorKind>;

    /// Check that `count` registers starting at `reg` exist
    fn check_range(&self, reg: u16, count: u16) -> Result<(), ErrorKind> {
        if u32::from(reg) + u32::from(count) > u32::from(self.holdings_len()) {
            Err(ErrorKind::OOBContext)
        } else {
            Ok(())
        }
    }

    /// Get holdings as big-endian bytes
    ///
    /// Note: result is always appended
    fn get_holdings_as_u8<V: VectorTrait<u8>>(
        &self,
        reg: u16,
        count: u16,
        result: &mut V,
    ) -> Result<(), ErrorKind> {
        self.check_range(reg, count)?;
        for i in reg..reg + count {
            result.extend(&self.get_holding(i)?.to_be_bytes())?;
        }
        Ok(())
    }

    /// Set holdings from big-endian bytes
    ///
    /// An odd number of bytes is rejected.
    fn set_holdings_from_u8(&mut self, reg: u16, values: &[u8]) -> Result<(), ErrorKind> {
        if values.len() % 2 != 0 {
            return Err(ErrorKind::IllegalDataValue);
        }
        let count = u16::try_from(values.len() / 2).map_err(|_| ErrorKind::OOBContext)?;
        self.check_range(reg, count)?;
        for (current_reg, pair) in (reg..reg + count).zip(values.chunks_exact(2)) {
            self.set_holding(current_reg, u16::from_be_bytes([pair[0], pair[1]]))?;
        }
        Ok(())
    }

    /// Bulk get holdings
    ///
    /// Note: result is always appended
    fn get_holdings_bulk<V: VectorTrait<u16>>(
        &self,
        reg: u16,
        count: u16,
        result: &mut V,
    ) -> Result<(), ErrorKind> {
        self.check_range(reg, count)?;
        for i in reg..reg + count {
            result.push(self.get_holding(i)?)?;
        }
        Ok(())
    }

    /// Bulk set holdings
    fn set_holdings_bulk(&mut self, reg: u16, values: &[u16]) -> Result<(), ErrorKind> {
        let count = u16::try_from(values.len()).map_err(|_| ErrorKind::OOBContext)?;
        self.check_range(reg, count)?;
        for (i, value) in (reg..reg + count).zip(values) {
            self.set_holding(i, *value)?;
        }
        Ok(())
    }

    /// Get two holdings as u32
    ///
    /// Returns 32-bit value (big-endian)
    fn get_holdings_as_u32(&self, reg: u16) -> Result<u32, ErrorKind> {
        self.check_range(reg, 2)?;
        Ok((u32::from(self.get_holding(reg)?) << 16) + u32::from(self.get_holding(reg + 1)?))
    }

    /// Set two holdings from u32
    ///
    /// Uses 32-bit value to set two registers (big-endian)
    #[allow(clippy::cast_possible_truncation)]
    fn set_holdings_from_u32(&mut self, reg: u16, value: u32) -> Result<(), ErrorKind> {
        self.set_holdings_bulk(reg, &[(value >> 16) as u16, value as u16])
    }

    /// Get two holding registers as IEEE754 32-bit float
    fn get_holdings_as_f32(&self, reg: u16) -> Result<f32, ErrorKind> {
        Ok(Ieee754::from_bits(self.get_holdings_as_u32(reg)?))
    }

    /// Set IEEE 754 f32 to two holding registers
    fn set_holdings_from_f32(&mut self, reg: u16, value: f32) -> Result<(), ErrorKind> {
        self.set_holdings_from_u32(reg, value.bits())
    }
}

#[inline]
fn slice_len<T>(slice: &[T]) -> u16 {
    u16::try_from(slice.len()).unwrap_or(u16::MAX)
}

// Signed banks store the same 16 bits, the master sees two's complement.
macro_rules! impl_register_bank {
    ($t: ty) => {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
        impl RegisterBank for [$t] {
            #[inline]
            fn holdings_len(&self) -> u16 {
                slice_len(self)
            }
            #[inline]
            fn get_holding(&self, reg: u16) -> Result<u16, ErrorKind> {
                self.get(usize::from(reg))
                    .map(|v| *v as u16)
                    .ok_or(ErrorKind::OOBContext)
            }
            #[inline]
            fn set_holding(&mut self, reg: u16, value: u16) -> Result<(), ErrorKind> {
                let slot = self.get_mut(usize::from(reg)).ok_or(ErrorKind::OOBContext)?;
                *slot = value as $t;
                Ok(())
            }
        }

        impl<const N: usize> RegisterBank for [$t; N] {
            #[inline]
            fn holdings_len(&self) -> u16 {
                self.as_slice().holdings_len()
            }
            #[inline]
            fn get_holding(&self, reg: u16) -> Result<u16, ErrorKind> {
                self.as_slice().get_holding(reg)
            }
            #[inline]
            fn set_holding(&mut self, reg: u16, value: u16) -> Result<(), ErrorKind> {
                self.as_mut_slice().set_holding(reg, value)
            }
        }

        #[cfg(any(feature = "std", test))]
        impl RegisterBank for Vec<$t> {
            #[inline]
            fn holdings_len(&self) -> u16 {
                self.as_slice().holdings_len()
            }
            #[inline]
            fn get_holding(&self, reg: u16) -> Result<u16, ErrorKind> {
                self.as_slice().get_holding(reg)
            }
            #[inline]
            fn set_holding(&mut self, reg: u16, value: u16) -> Result<(), ErrorKind> {
                self.as_mut_slice().set_holding(reg, value)
            }
        }
    };
}

impl_register_bank!(u16);
impl_register_bank!(i16);
