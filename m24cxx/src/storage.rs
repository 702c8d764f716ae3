//! `embedded-storage` support.
//!
//! The storage traits are all-or-nothing: a range that does not fit in the
//! array is rejected instead of shortened, and a read that stops early is an
//! error.

use embedded_hal::i2c::I2c;
use embedded_storage::{ReadStorage, Storage};

use crate::{Clock, Error, M24};

impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> M24<I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
    C: Clock,
{
    /// Start address of `[offset, offset + len)`, if the range fits in the array
    fn checked_range(offset: u32, len: usize) -> Result<u16, Error<I2C::Error>> {
        let in_range = usize::try_from(offset)
            .ok()
            .and_then(|start| Some((start, start.checked_add(len)?)))
            .is_some_and(|(start, end)| end <= CAPACITY && (len == 0 || start < CAPACITY));
        if !in_range {
            return Err(Error::AddressOutOfRange { address: offset });
        }
        Ok(offset as u16)
    }
}

impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> ReadStorage
    for M24<I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
    C: Clock,
{
    type Error = Error<I2C::Error>;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let address = Self::checked_range(offset, bytes.len())?;
        if bytes.is_empty() {
            return Ok(());
        }

        let transferred = M24::read(self, address, bytes)?;
        if transferred < bytes.len() {
            return Err(Error::Truncated {
                requested: bytes.len(),
                transferred,
            });
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        CAPACITY
    }
}

impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> Storage
    for M24<I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
    C: Clock,
{
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let address = Self::checked_range(offset, bytes.len())?;
        if bytes.is_empty() {
            return Ok(());
        }

        M24::write(self, address, bytes)?;
        Ok(())
    }
}
