//! Paged read/write engine.
//!
//! Every transaction starts with the two byte memory address, high byte
//! first. Reads follow it with a repeated start, writes with the payload.
//!
//! A write burst may not cross a page boundary: the device keeps the upper
//! address bits and wraps the column, overwriting the start of the page. The
//! engine therefore only issues a page burst for a full, aligned page and
//! writes everything else one byte at a time.

use embedded_hal::i2c::{I2c, Operation, SevenBitAddress};

use crate::bounds::{capped_len, offset};
use crate::gate::WriteCycle;
use crate::{Clock, Config, Error};

/// Size of the memory address sent at the start of every transaction
pub(crate) const ADDRESS_LEN: usize = 2;

pub(crate) struct PagedIo<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> {
    i2c: I2C,
    clock: C,
    address: SevenBitAddress,
    max_transfer: usize,
    page_write: bool,
    cycle: WriteCycle,
}

impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> PagedIo<I2C, C, CAPACITY, PAGE_SIZE>
where
    I2C: I2c,
    C: Clock,
{
    pub(crate) fn new(i2c: I2C, clock: C, address: SevenBitAddress, config: &Config) -> Self {
        let page_write = config.max_transfer >= PAGE_SIZE + ADDRESS_LEN;
        if !page_write {
            debug!(
                "transfer limit {} below page size {}, using byte writes",
                config.max_transfer,
                PAGE_SIZE
            );
        }

        Self {
            i2c,
            clock,
            address,
            max_transfer: config.max_transfer,
            page_write,
            cycle: WriteCycle::new(config.write_cycle),
        }
    }

    pub(crate) fn release(self) -> (I2C, C) {
        (self.i2c, self.clock)
    }

    pub(crate) fn supports_page_write(&self) -> bool {
        self.page_write
    }

    pub(crate) fn is_write_pending(&self) -> bool {
        self.cycle.is_pending()
    }

    pub(crate) fn detect(&mut self) -> bool {
        self.i2c.write(self.address, &[]).is_ok()
    }

    /// Wait out a running write cycle, polling the device for early completion
    fn wait_write_cycle(&mut self) {
        let Self {
            i2c,
            clock,
            address,
            cycle,
            ..
        } = self;
        cycle.wait(&*clock, || i2c.write(*address, &[]).is_ok());
    }

    /// Read up to `buf.len()` bytes starting at `address`.
    ///
    /// Returns the number of bytes read. A bus failure after at least one
    /// successful chunk ends the read early with the count so far.
    pub(crate) fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<usize, Error<I2C::Error>> {
        let len = capped_len(address, buf.len(), CAPACITY)?;
        if len == 0 {
            return Ok(0);
        }

        self.wait_write_cycle();

        let chunk_max = self.max_transfer.max(1);
        let mut done = 0;
        while done < len {
            let chunk = (len - done).min(chunk_max);
            let header = offset(address, done).to_be_bytes();
            if let Err(e) = self
                .i2c
                .write_read(self.address, &header, &mut buf[done..done + chunk])
            {
                if done == 0 {
                    return Err(Error::I2c(e));
                }
                warn!("read stopped after {} of {} bytes", done, len);
                return Ok(done);
            }
            done += chunk;
        }

        trace!("read {} bytes at {}", len, address);
        Ok(len)
    }

    /// Write `data` starting at `address`.
    ///
    /// Returns the number of bytes written, capped at the end of the array.
    /// A bus failure aborts the write; bytes committed by earlier bursts stay
    /// written.
    pub(crate) fn write(&mut self, address: u16, data: &[u8]) -> Result<usize, Error<I2C::Error>> {
        let len = capped_len(address, data.len(), CAPACITY)?;

        let mut done = 0;
        while done < len {
            self.wait_write_cycle();

            let at = offset(address, done);
            let burst = if self.page_write
                && usize::from(at) % PAGE_SIZE == 0
                && len - done >= PAGE_SIZE
            {
                PAGE_SIZE
            } else {
                1
            };

            self.write_burst(at, &data[done..done + burst])?;
            done += burst;
        }

        trace!("wrote {} bytes at {}", len, address);
        Ok(len)
    }

    fn write_burst(&mut self, address: u16, payload: &[u8]) -> Result<(), Error<I2C::Error>> {
        let header = address.to_be_bytes();
        self.i2c
            .transaction(
                self.address,
                &mut [Operation::Write(&header), Operation::Write(payload)],
            )
            .inspect_err(|_| warn!("write of {} bytes at {} failed", payload.len(), address))?;

        self.cycle.start(&self.clock);
        Ok(())
    }
}

#[cfg(test)]
impl<I2C, C, const CAPACITY: usize, const PAGE_SIZE: usize> PagedIo<I2C, C, CAPACITY, PAGE_SIZE> {
    pub(crate) fn bus(&self) -> &I2C {
        &self.i2c
    }

    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }
}
