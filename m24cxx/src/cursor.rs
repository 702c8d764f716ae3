//! Sequential access on top of the random access API.
//!
//! A [`Cursor`] borrows the device and tracks two positions, one for reading
//! and one for writing, so a log can be appended to and replayed through the
//! same cursor. Positions only ever advance by the number of bytes the device
//! reported as transferred.

use embedded_hal::i2c::I2c;
use embedded_io::{ErrorType, Read, Seek, SeekFrom, Write};

use crate::{Clock, Error, M24};

/// Stream view of an [`M24`] device.
///
/// Implements the blocking `embedded_io` traits:
///
/// - `Read` reads at the read position (returns 0 at the end of the array)
/// - `Write` writes directly at the write position
/// - `Write::flush` commits the device's write buffer
/// - `Seek` moves both positions; `SeekFrom::Current` is relative to the
///   read position
pub struct Cursor<'a, I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> {
    device: &'a mut M24<I2C, C, CAPACITY, PAGE_SIZE>,
    read_position: usize,
    write_position: usize,
}

impl<'a, I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> Cursor<'a, I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
    C: Clock,
{
    /// Create a cursor with both positions at the start of the array
    pub fn new(device: &'a mut M24<I2C, C, CAPACITY, PAGE_SIZE>) -> Self {
        Self {
            device,
            read_position: 0,
            write_position: 0,
        }
    }

    /// Get the current read position
    pub fn read_position(&self) -> usize {
        self.read_position
    }

    /// Get the current write position
    pub fn write_position(&self) -> usize {
        self.write_position
    }

    /// Bytes left between the read position and the end of the array
    pub fn available(&self) -> usize {
        CAPACITY.saturating_sub(self.read_position)
    }

    /// Move the read position
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressOutOfRange`] if `index` is not inside the array.
    pub fn seek_read(&mut self, index: usize) -> Result<usize, Error<I2C::Error>> {
        self.read_position = Self::checked(index)?.into();
        Ok(index)
    }

    /// Move the write position
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressOutOfRange`] if `index` is not inside the array.
    pub fn seek_write(&mut self, index: usize) -> Result<usize, Error<I2C::Error>> {
        self.write_position = Self::checked(index)?.into();
        Ok(index)
    }

    /// Read the byte at the read position and advance past it.
    ///
    /// Returns `None` at the end of the array.
    pub fn read_byte(&mut self) -> Result<Option<u8>, Error<I2C::Error>> {
        let byte = self.peek()?;
        if byte.is_some() {
            self.read_position += 1;
        }
        Ok(byte)
    }

    /// Read the byte at the read position without advancing.
    ///
    /// Successive calls return the same byte, as does the next `read_byte`.
    pub fn peek(&mut self) -> Result<Option<u8>, Error<I2C::Error>> {
        if self.read_position >= CAPACITY {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        match self.device.read(self.read_position as u16, &mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Write one byte at the write position and advance past it.
    ///
    /// Returns the number of bytes written.
    pub fn write_byte(&mut self, byte: u8) -> Result<usize, Error<I2C::Error>> {
        let address = Self::checked(self.write_position)?;
        let n = self.device.write(address, &[byte])?;
        self.write_position += n;
        Ok(n)
    }

    fn checked(index: usize) -> Result<u16, Error<I2C::Error>> {
        if index >= CAPACITY {
            return Err(Error::AddressOutOfRange {
                address: index as u32,
            });
        }
        Ok(index as u16)
    }
}

impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> ErrorType
    for Cursor<'_, I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
{
    type Error = Error<I2C::Error>;
}

impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> Read
    for Cursor<'_, I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
    C: Clock,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() || self.read_position >= CAPACITY {
            return Ok(0);
        }

        let n = self.device.read(self.read_position as u16, buf)?;
        self.read_position += n;
        Ok(n)
    }
}

impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> Write
    for Cursor<'_, I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
    C: Clock,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        let address = Self::checked(self.write_position)?;
        let n = self.device.write(address, buf)?;
        self.write_position += n;
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.device.flush()?;
        Ok(())
    }
}

impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> Seek
    for Cursor<'_, I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
    C: Clock,
{
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => i64::try_from(offset).unwrap_or(i64::MAX),
            SeekFrom::Current(offset) => (self.read_position as i64)
                .checked_add(offset)
                .ok_or(Error::InvalidSeek)?,
            SeekFrom::End(offset) => (CAPACITY as i64)
                .checked_add(offset)
                .ok_or(Error::InvalidSeek)?,
        };

        if new_pos < 0 || new_pos > CAPACITY as i64 {
            return Err(Error::InvalidSeek);
        }

        self.read_position = new_pos as usize;
        self.write_position = new_pos as usize;
        Ok(new_pos as u64)
    }
}
