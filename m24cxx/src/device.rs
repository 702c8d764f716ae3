//! M24Cxx device session.

use embedded_hal::i2c::I2c;

use crate::bounds::{capped_len, offset};
use crate::buffer::PageCache;
use crate::engine::PagedIo;
use crate::{Clock, Config, Cursor, Error};

/// Fixed device type identifier in the upper bits of the bus address
const DEVICE_TYPE_ID: u8 = 0b1010_000;

/// The chip enable pins E2..E0 select the lower three bits
const CHIP_ENABLE_MASK: u8 = 0b0000_111;

/// An M24Cxx EEPROM on an I2C bus.
///
/// # Type Parameters
///
/// - `I2C`: The bus, any [`embedded_hal::i2c::I2c`] implementation
/// - `C`: The [`Clock`] used to time write cycles
/// - `CAPACITY`: Size of the memory array in bytes (at most 64 KiB)
/// - `PAGE_SIZE`: Size of a write page in bytes
///
/// Use one of the aliases ([`M24C64`], ...) rather than spelling out the
/// geometry.
///
/// # Buffered writes
///
/// [`buffered_write`](Self::buffered_write) collects consecutive bytes that
/// start on a page boundary and commits them as one page write, which turns
/// 32 transactions and 32 write cycles into one. Bytes stay in RAM until the
/// page is full, a non-contiguous write arrives, or [`flush`](Self::flush) is
/// called. Reads do not see bytes that are still buffered.
///
/// # Example
///
/// ```ignore
/// use m24cxx::{Config, M24C64, StdClock};
///
/// let mut eeprom = M24C64::new(i2c, StdClock::new(), 0x50, Config::default())?;
/// eeprom.write(0x0100, b"hello")?;
///
/// let mut buf = [0u8; 5];
/// eeprom.read(0x0100, &mut buf)?;
/// ```
pub struct M24<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> {
    io: PagedIo<I2C, C, CAPACITY, PAGE_SIZE>,
    cache: PageCache<PAGE_SIZE>,
    address: u8,
}

/// M24C32: 32 Kbit, 32 byte pages
pub type M24C32<I2C, C> = M24<I2C, C, 4096, 32>;

/// M24C64: 64 Kbit, 32 byte pages
pub type M24C64<I2C, C> = M24<I2C, C, 8192, 32>;

/// M24C128: 128 Kbit, 64 byte pages
pub type M24C128<I2C, C> = M24<I2C, C, 16384, 64>;

/// M24C256: 256 Kbit, 64 byte pages
pub type M24C256<I2C, C> = M24<I2C, C, 32768, 64>;

/// M24C512: 512 Kbit, 128 byte pages
pub type M24C512<I2C, C> = M24<I2C, C, 65536, 128>;

impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> M24<I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
    C: Clock,
{
    /// Size of the memory array in bytes
    pub const CAPACITY: usize = CAPACITY;

    /// Size of a write page in bytes
    pub const PAGE_SIZE: usize = PAGE_SIZE;

    /// Set up a device session.
    ///
    /// `address` is the 7-bit bus address, `0x50` to `0x57` depending on the
    /// chip enable pins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBusAddress`] for any other address.
    pub fn new(i2c: I2C, clock: C, address: u8, config: Config) -> Result<Self, Error<I2C::Error>> {
        const {
            assert!(PAGE_SIZE > 0, "page size must not be zero");
            assert!(
                CAPACITY % PAGE_SIZE == 0,
                "capacity must be a whole number of pages"
            );
            assert!(CAPACITY <= 1 << 16, "capacity exceeds two byte addressing");
        }

        if address & !CHIP_ENABLE_MASK != DEVICE_TYPE_ID {
            warn!("rejecting bus address {}", address);
            return Err(Error::InvalidBusAddress(address));
        }

        debug!(
            "M24Cxx at {}: {} bytes, {} byte pages",
            address,
            CAPACITY,
            PAGE_SIZE
        );

        Ok(Self {
            io: PagedIo::new(i2c, clock, address, &config),
            cache: PageCache::new(),
            address,
        })
    }

    /// Release the bus and clock, consuming the session
    ///
    /// # Warning
    /// Buffered bytes are lost. Call `flush()` first.
    pub fn release(self) -> (I2C, C) {
        if !self.cache.is_empty() {
            warn!("releasing with {} unflushed bytes", self.cache.len());
        }
        self.io.release()
    }

    /// The 7-bit bus address of the device
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Whether the bus can carry a full page write
    pub fn supports_page_write(&self) -> bool {
        self.io.supports_page_write()
    }

    /// Number of bytes waiting in the write buffer
    pub fn pending(&self) -> usize {
        self.cache.len()
    }

    /// Whether a write cycle may still be running inside the device
    pub fn is_write_pending(&self) -> bool {
        self.io.is_write_pending()
    }

    /// Check that `address` is inside the array and cap `len` to its end
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressOutOfRange`] if `address >= CAPACITY`.
    pub fn capped_len(&self, address: u16, len: usize) -> Result<usize, Error<I2C::Error>> {
        capped_len(address, len, CAPACITY)
    }

    /// Probe the device: true if it acknowledges its address.
    ///
    /// A device in the middle of a write cycle does not acknowledge.
    pub fn detect(&mut self) -> bool {
        self.io.detect()
    }

    /// Read into `buf` starting at `address`.
    ///
    /// Returns the number of bytes read. This is less than `buf.len()` when
    /// the read reaches the end of the array, or when the bus failed after
    /// part of the data arrived.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressOutOfRange`] before touching the bus if
    /// `address` is outside the array, and [`Error::I2c`] if no data could be
    /// read at all.
    pub fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<usize, Error<I2C::Error>> {
        self.io.read(address, buf)
    }

    /// Write `data` starting at `address`, bypassing the write buffer.
    ///
    /// Full aligned pages go out as page writes, everything else byte by byte.
    /// Returns the number of bytes written, which is less than `data.len()`
    /// only when the write reaches the end of the array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressOutOfRange`] if `address` is outside the array
    /// and [`Error::I2c`] if a transfer fails. Bytes written before a failure
    /// are not rolled back.
    pub fn write(&mut self, address: u16, data: &[u8]) -> Result<usize, Error<I2C::Error>> {
        self.io.write(address, data)
    }

    /// Write `data` at `address` through the page write buffer.
    ///
    /// Returns the number of bytes accepted, buffered or written directly.
    /// Buffered bytes reach the device when the page fills up, when a write
    /// to a different address arrives, or on [`flush`](Self::flush).
    ///
    /// Without page write support this is the same as [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// As for [`write`](Self::write); processing stops at the first error.
    pub fn buffered_write(&mut self, address: u16, data: &[u8]) -> Result<usize, Error<I2C::Error>> {
        let len = capped_len(address, data.len(), CAPACITY)?;

        if !self.io.supports_page_write() {
            return self.io.write(address, &data[..len]);
        }

        if usize::from(address) != self.cache.end() {
            self.flush()?;
        }

        for (i, &byte) in data[..len].iter().enumerate() {
            let at = offset(address, i);
            if !self.cache.is_empty() {
                if self.cache.push(byte) {
                    self.flush()?;
                }
            } else if usize::from(at) % PAGE_SIZE == 0 {
                self.cache.begin(at, byte);
            } else {
                self.io.write(at, &[byte])?;
            }
        }

        Ok(len)
    }

    /// Commit buffered bytes to the device.
    ///
    /// Returns the number of bytes written, 0 when nothing was buffered (in
    /// which case the bus is not touched).
    ///
    /// # Errors
    ///
    /// Returns [`Error::I2c`] if the write fails. The buffer is empty
    /// afterwards either way; failed bytes are not retried.
    pub fn flush(&mut self) -> Result<usize, Error<I2C::Error>> {
        match self.cache.take() {
            Some((start, bytes)) => {
                trace!("flushing {} buffered bytes at {}", bytes.len(), start);
                self.io.write(start, bytes)
            }
            None => Ok(0),
        }
    }

    /// Sequential access with independent read and write positions
    pub fn cursor(&mut self) -> Cursor<'_, I2C, C, CAPACITY, PAGE_SIZE> {
        Cursor::new(self)
    }
}

#[cfg(test)]
impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> M24<I2C, C, CAPACITY, PAGE_SIZE> {
    pub(crate) fn bus(&self) -> &I2C {
        self.io.bus()
    }

    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        self.io.bus_mut()
    }
}
