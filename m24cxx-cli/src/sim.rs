//! Simulated M24Cxx EEPROM
//!
//! An [`I2c`] target that behaves like the real part closely enough to run
//! the driver on a host:
//!
//! - the first two bytes of a write set the address pointer
//! - data bytes wrap inside the addressed page
//! - reads continue from the pointer and roll over at the end of the array
//! - the device does not acknowledge while a write cycle is running
//!
//! The memory array is a plain byte image, so it can be loaded from and saved
//! to a file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};
use log::{debug, trace};
use m24cxx::{Clock, StdClock};

/// Internal programming time of the simulated part.
///
/// Real parts usually finish well inside the 5 ms worst case.
pub const SIMULATED_WRITE_TIME: Duration = Duration::from_millis(2);

/// Value of an erased byte
pub const ERASED: u8 = 0xFF;

/// An M24Cxx living in memory.
pub struct SimulatedEeprom<C = StdClock> {
    memory: Vec<u8>,
    page_size: usize,
    address: SevenBitAddress,
    pointer: usize,
    clock: C,
    write_time: Duration,
    busy_until: Option<Duration>,
    writes: usize,
}

impl<C: Clock> SimulatedEeprom<C> {
    /// Create a device backed by `memory`, answering at `0x50`.
    ///
    /// # Errors
    ///
    /// Fails if the image is not a whole number of pages or does not fit two
    /// byte addressing.
    pub fn new(memory: Vec<u8>, page_size: usize, clock: C) -> Result<Self> {
        ensure!(page_size > 0, "page size must not be zero");
        ensure!(
            !memory.is_empty() && memory.len() % page_size == 0,
            "image size {} is not a multiple of the {} byte page",
            memory.len(),
            page_size
        );
        ensure!(
            memory.len() <= 1 << 16,
            "image size {} exceeds 64 KiB",
            memory.len()
        );

        Ok(Self {
            memory,
            page_size,
            address: 0x50,
            pointer: 0,
            clock,
            write_time: SIMULATED_WRITE_TIME,
            busy_until: None,
            writes: 0,
        })
    }

    /// Create an erased device of `capacity` bytes
    pub fn blank(capacity: usize, page_size: usize, clock: C) -> Result<Self> {
        Self::new(vec![ERASED; capacity], page_size, clock)
    }

    /// Load the memory array from an image file
    pub fn open(path: &Path, page_size: usize, clock: C) -> Result<Self> {
        let memory =
            fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))?;
        debug!("loaded {} byte image from {}", memory.len(), path.display());
        Self::new(memory, page_size, clock)
            .with_context(|| format!("Invalid image: {}", path.display()))
    }

    /// Write the memory array to an image file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.memory)
            .with_context(|| format!("Failed to write image: {}", path.display()))
    }

    /// Answer at a different bus address (chip enable pins)
    pub fn with_address(mut self, address: SevenBitAddress) -> Self {
        self.address = address;
        self
    }

    /// Change the internal programming time
    pub fn with_write_time(mut self, write_time: Duration) -> Self {
        self.write_time = write_time;
        self
    }

    /// The memory array
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Consume the device, returning the memory array
    pub fn into_memory(self) -> Vec<u8> {
        self.memory
    }

    /// Number of write cycles the device has gone through
    pub fn write_cycles(&self) -> usize {
        self.writes
    }

    fn is_busy(&self) -> bool {
        self.busy_until
            .is_some_and(|until| self.clock.now() < until)
    }

    fn set_pointer(&mut self, header: &[u8]) -> Result<(), ErrorKind> {
        match *header {
            [] => Ok(()),
            [high, low] => {
                self.pointer = usize::from(u16::from_be_bytes([high, low])) % self.memory.len();
                Ok(())
            }
            _ => Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)),
        }
    }

    fn read_sequential(&mut self, buf: &mut [u8]) {
        trace!("read {} bytes at {}", buf.len(), self.pointer);
        for byte in buf {
            *byte = self.memory[self.pointer];
            self.pointer = (self.pointer + 1) % self.memory.len();
        }
    }

    fn program(&mut self, data: &[u8]) {
        let page = self.pointer - self.pointer % self.page_size;
        let mut column = self.pointer % self.page_size;

        if column + data.len() > self.page_size {
            debug!(
                "{} byte write at {} wraps inside page {}",
                data.len(),
                self.pointer,
                page
            );
        }

        for &byte in data {
            self.memory[page + column] = byte;
            column = (column + 1) % self.page_size;
        }

        self.pointer = page + column;
        self.writes += 1;
        self.busy_until = Some(self.clock.now() + self.write_time);
        trace!("programmed {} bytes in page {}", data.len(), page);
    }
}

impl<C> ErrorType for SimulatedEeprom<C> {
    type Error = ErrorKind;
}

impl<C: Clock> I2c for SimulatedEeprom<C> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address || self.is_busy() {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        // Adjacent writes form one frame; a read after a write is a repeated
        // start, so the bytes written so far only set the pointer
        let mut frame = Vec::new();
        for operation in operations {
            match operation {
                Operation::Write(bytes) => frame.extend_from_slice(bytes),
                Operation::Read(buf) => {
                    self.set_pointer(&frame)?;
                    frame.clear();
                    self.read_sequential(buf);
                }
            }
        }

        match frame.len() {
            0..=2 => self.set_pointer(&frame),
            _ => {
                self.set_pointer(&frame[..2])?;
                self.program(&frame[2..]);
                Ok(())
            }
        }
    }
}
